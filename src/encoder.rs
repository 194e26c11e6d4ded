//! ASDU object section encoding.
//!
//! Builds the wire form of one or more [`InformationObject`]s of a single
//! type identifier. The engine uses this for the control direction; the
//! monitor types are encoded too so every catalog entry round-trips.

use bytes::BytesMut;

use crate::error::{MasterError, Result};
use crate::parser::NORMALIZED_SCALE;
use crate::types::{
    Asdu, AsduHeader, InformationObject, Ioa, ObjectValue, Quality, TypeId, Vsq,
};

/// Encode a batch of objects sharing one type identifier into an ASDU.
///
/// With `sequence` set the objects must carry consecutive addresses and only
/// the first IOA is written.
pub fn encode_asdu(objects: &[InformationObject], sequence: bool) -> Result<Asdu> {
    let first = objects
        .first()
        .ok_or(MasterError::invalid_asdu_static("no objects to encode"))?;
    if objects.len() > 127 {
        return Err(MasterError::invalid_asdu_static("more than 127 objects"));
    }

    let type_id = first.type_id;
    let mut body = BytesMut::with_capacity(
        objects.len() * (Ioa::SIZE + type_id.object_size()),
    );

    for (index, object) in objects.iter().enumerate() {
        if object.type_id != type_id {
            return Err(MasterError::invalid_asdu_static(
                "mixed type identifiers in one ASDU",
            ));
        }
        if sequence {
            if index == 0 {
                Ioa::new(object.address).write_to(&mut body);
            } else if object.address != (first.address + index as u32) & 0x00FF_FFFF {
                return Err(MasterError::invalid_asdu_static(
                    "sequence addressing requires consecutive IOAs",
                ));
            }
        } else {
            Ioa::new(object.address).write_to(&mut body);
        }
        encode_element(object, &mut body)?;
    }

    let header = AsduHeader {
        type_id,
        vsq: Vsq::new(objects.len() as u8, sequence),
        cause: first.cot,
        negative: first.negative,
        test: first.test,
        originator: first.originator,
        common_address: first.common_address,
    };
    Ok(Asdu::new(header, body.freeze()))
}

/// Encode a single object into an ASDU with individual addressing.
pub fn encode_single(object: &InformationObject) -> Result<Asdu> {
    encode_asdu(std::slice::from_ref(object), false)
}

/// Clamp and round onto the wire int16 of a normalized value.
fn normalized_to_wire(value: f64) -> i16 {
    (value.clamp(-1.0, 1.0) * NORMALIZED_SCALE).round() as i16
}

/// Clamp and round onto the wire int16 of a scaled value.
fn scaled_to_wire(value: f64) -> i16 {
    value.clamp(i16::MIN as f64, i16::MAX as f64).round() as i16
}

fn encode_element(object: &InformationObject, buf: &mut BytesMut) -> Result<()> {
    let before = buf.len();
    let type_id = object.type_id;

    match (&object.value, type_id) {
        (ObjectValue::Single(on), TypeId::SinglePoint | TypeId::SinglePointTime) => {
            buf.extend_from_slice(&[*on as u8 | object.quality.flag_bits()]);
        }
        (ObjectValue::Double(state), TypeId::DoublePoint | TypeId::DoublePointTime) => {
            buf.extend_from_slice(&[state.as_u8() | object.quality.flag_bits()]);
        }
        (
            ObjectValue::Step { value, transient },
            TypeId::StepPosition | TypeId::StepPositionTime,
        ) => {
            let vti = (*value as u8 & 0x7F) | if *transient { 0x80 } else { 0 };
            buf.extend_from_slice(&[vti, object.quality.to_qds()]);
        }
        (ObjectValue::Bitstring(bits), TypeId::Bitstring | TypeId::BitstringTime) => {
            buf.extend_from_slice(&bits.to_le_bytes());
            buf.extend_from_slice(&[object.quality.to_qds()]);
        }
        (
            ObjectValue::Normalized(value),
            TypeId::MeasuredNormalized | TypeId::MeasuredNormalizedTime,
        ) => {
            buf.extend_from_slice(&normalized_to_wire(*value).to_le_bytes());
            buf.extend_from_slice(&[object.quality.to_qds()]);
        }
        (ObjectValue::Normalized(value), TypeId::MeasuredNormalizedNoQuality) => {
            buf.extend_from_slice(&normalized_to_wire(*value).to_le_bytes());
        }
        (ObjectValue::Scaled(value), TypeId::MeasuredScaled | TypeId::MeasuredScaledTime) => {
            buf.extend_from_slice(&scaled_to_wire(*value).to_le_bytes());
            buf.extend_from_slice(&[object.quality.to_qds()]);
        }
        (ObjectValue::Short(value), TypeId::MeasuredShort | TypeId::MeasuredShortTime) => {
            buf.extend_from_slice(&(*value as f32).to_le_bytes());
            buf.extend_from_slice(&[object.quality.to_qds()]);
        }
        (
            ObjectValue::Counter(reading),
            TypeId::IntegratedTotals | TypeId::IntegratedTotalsTime,
        ) => {
            buf.extend_from_slice(&reading.value.to_le_bytes());
            buf.extend_from_slice(&[reading.flags_byte()]);
        }
        (ObjectValue::StatusChange(scd), TypeId::PackedSinglePoint) => {
            buf.extend_from_slice(&scd.status.to_le_bytes());
            buf.extend_from_slice(&scd.change.to_le_bytes());
            buf.extend_from_slice(&[object.quality.to_qds()]);
        }
        (
            ObjectValue::ProtectionEvent { state, elapsed_invalid },
            TypeId::ProtectionEventTime,
        ) => {
            let sep = state.as_u8()
                | if *elapsed_invalid { 0x08 } else { 0 }
                | object.quality.flag_bits();
            buf.extend_from_slice(&[sep]);
            buf.extend_from_slice(&object.elapsed.unwrap_or_default().to_bytes());
        }
        (
            ObjectValue::ProtectionStart { events, elapsed_invalid },
            TypeId::ProtectionStartTime,
        ) => {
            buf.extend_from_slice(&[events.0]);
            buf.extend_from_slice(&[qdp_byte(&object.quality, *elapsed_invalid)]);
            buf.extend_from_slice(&object.elapsed.unwrap_or_default().to_bytes());
        }
        (
            ObjectValue::ProtectionOutput { circuits, elapsed_invalid },
            TypeId::ProtectionOutputTime,
        ) => {
            buf.extend_from_slice(&[circuits.0]);
            buf.extend_from_slice(&[qdp_byte(&object.quality, *elapsed_invalid)]);
            buf.extend_from_slice(&object.elapsed.unwrap_or_default().to_bytes());
        }
        (
            ObjectValue::EndOfInit { cause, after_parameter_change },
            TypeId::EndOfInit,
        ) => {
            buf.extend_from_slice(&[(cause & 0x7F)
                | if *after_parameter_change { 0x80 } else { 0 }]);
        }
        (
            ObjectValue::SingleCommand { on, qualifier },
            TypeId::SingleCommand | TypeId::SingleCommandTime,
        ) => {
            buf.extend_from_slice(&[*on as u8 | qualifier.command_bits()]);
        }
        (
            ObjectValue::DoubleCommand { state, qualifier },
            TypeId::DoubleCommand | TypeId::DoubleCommandTime,
        ) => {
            buf.extend_from_slice(&[state.as_u8() | qualifier.command_bits()]);
        }
        (
            ObjectValue::RegulatingStep { direction, qualifier },
            TypeId::RegulatingStep | TypeId::RegulatingStepTime,
        ) => {
            buf.extend_from_slice(&[direction.as_u8() | qualifier.command_bits()]);
        }
        (
            ObjectValue::SetpointNormalized { value, qualifier },
            TypeId::SetpointNormalized | TypeId::SetpointNormalizedTime,
        ) => {
            buf.extend_from_slice(&normalized_to_wire(*value).to_le_bytes());
            buf.extend_from_slice(&[qualifier.to_byte()]);
        }
        (
            ObjectValue::SetpointScaled { value, qualifier },
            TypeId::SetpointScaled | TypeId::SetpointScaledTime,
        ) => {
            buf.extend_from_slice(&scaled_to_wire(*value).to_le_bytes());
            buf.extend_from_slice(&[qualifier.to_byte()]);
        }
        (
            ObjectValue::SetpointShort { value, qualifier },
            TypeId::SetpointShort | TypeId::SetpointShortTime,
        ) => {
            buf.extend_from_slice(&(*value as f32).to_le_bytes());
            buf.extend_from_slice(&[qualifier.to_byte()]);
        }
        (
            ObjectValue::BitstringCommand(bits),
            TypeId::BitstringCommand | TypeId::BitstringCommandTime,
        ) => {
            buf.extend_from_slice(&bits.to_le_bytes());
        }
        (ObjectValue::Interrogation { qualifier }, TypeId::Interrogation) => {
            buf.extend_from_slice(&[*qualifier]);
        }
        (ObjectValue::CounterInterrogation(qualifier), TypeId::CounterInterrogation) => {
            buf.extend_from_slice(&[qualifier.to_byte()]);
        }
        (ObjectValue::Empty, TypeId::ReadCommand) => {}
        (ObjectValue::Empty, TypeId::ClockSync) => {
            let time = object
                .timestamp
                .ok_or(MasterError::invalid_asdu_static("clock sync without time"))?;
            buf.extend_from_slice(&time.to_bytes());
        }
        (ObjectValue::ResetProcess { qualifier }, TypeId::ResetProcess) => {
            buf.extend_from_slice(&[*qualifier]);
        }
        (ObjectValue::TestCommand { counter }, TypeId::TestCommand) => {
            buf.extend_from_slice(&counter.to_le_bytes());
        }
        (
            ObjectValue::ParameterNormalized { value, qualifier },
            TypeId::ParameterNormalized,
        ) => {
            buf.extend_from_slice(&normalized_to_wire(*value).to_le_bytes());
            buf.extend_from_slice(&[qualifier.to_byte()]);
        }
        (ObjectValue::ParameterScaled { value, qualifier }, TypeId::ParameterScaled) => {
            buf.extend_from_slice(&scaled_to_wire(*value).to_le_bytes());
            buf.extend_from_slice(&[qualifier.to_byte()]);
        }
        (ObjectValue::ParameterShort { value, qualifier }, TypeId::ParameterShort) => {
            buf.extend_from_slice(&(*value as f32).to_le_bytes());
            buf.extend_from_slice(&[qualifier.to_byte()]);
        }
        (ObjectValue::ParameterActivation { qualifier }, TypeId::ParameterActivation) => {
            buf.extend_from_slice(&[*qualifier]);
        }
        _ => {
            return Err(MasterError::invalid_asdu_static(
                "payload variant does not match type identifier",
            ));
        }
    }

    if type_id.has_time_tag() {
        let time = object
            .timestamp
            .ok_or(MasterError::invalid_asdu_static("time-tagged type without time"))?;
        buf.extend_from_slice(&time.to_bytes());
    }

    debug_assert_eq!(buf.len() - before, type_id.object_size());
    Ok(())
}

/// QDP octet from quality flags plus the EI bit.
fn qdp_byte(quality: &Quality, elapsed_invalid: bool) -> u8 {
    quality.flag_bits() | if elapsed_invalid { 0x08 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_asdu;
    use crate::types::{
        Cause, CommandQualifier, CounterQualifier, CounterReading, Cp16Time2a, Cp56Time2a,
        DoublePointValue, OutputCircuit, ParameterQualifier, SetpointQualifier, StartEvents,
        StatusChange, StepDirection,
    };

    fn sample_time() -> Cp56Time2a {
        Cp56Time2a {
            milliseconds: 41_250,
            minutes: 17,
            hours: 9,
            day: 28,
            day_of_week: 2,
            month: 7,
            year: 26,
            invalid: false,
            summer_time: true,
        }
    }

    fn roundtrip(object: InformationObject) {
        let asdu = encode_single(&object).unwrap();
        let decoded = parse_asdu(&asdu).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], object, "roundtrip mismatch for {}", object.type_id);
    }

    fn monitor_object(type_id: TypeId, address: u32, value: ObjectValue) -> InformationObject {
        let mut object = InformationObject::new(type_id, address, value);
        object.common_address = 7;
        object.cot = Cause::Spontaneous;
        if type_id.has_time_tag() {
            object.timestamp = Some(sample_time());
        }
        object
    }

    #[test]
    fn test_roundtrip_single_point() {
        let mut object = monitor_object(TypeId::SinglePoint, 1001, ObjectValue::Single(true));
        object.quality.substituted = true;
        roundtrip(object);
    }

    #[test]
    fn test_roundtrip_double_point_with_time() {
        roundtrip(monitor_object(
            TypeId::DoublePointTime,
            42,
            ObjectValue::Double(DoublePointValue::Faulty),
        ));
    }

    #[test]
    fn test_roundtrip_step_position() {
        for value in [-64i8, -1, 0, 1, 63] {
            roundtrip(monitor_object(
                TypeId::StepPosition,
                9,
                ObjectValue::Step { value, transient: value < 0 },
            ));
        }
    }

    #[test]
    fn test_roundtrip_bitstring() {
        roundtrip(monitor_object(
            TypeId::BitstringTime,
            77,
            ObjectValue::Bitstring(0xDEAD_BEEF),
        ));
    }

    #[test]
    fn test_roundtrip_normalized_wire_values() {
        // Values that came off the wire round-trip exactly.
        for raw in [-32767i16, -12345, 0, 1, 32767] {
            roundtrip(monitor_object(
                TypeId::MeasuredNormalized,
                5,
                ObjectValue::Normalized(raw as f64 / NORMALIZED_SCALE),
            ));
        }
    }

    #[test]
    fn test_roundtrip_normalized_no_quality() {
        roundtrip(monitor_object(
            TypeId::MeasuredNormalizedNoQuality,
            6,
            ObjectValue::Normalized(-16384.0 / NORMALIZED_SCALE),
        ));
    }

    #[test]
    fn test_roundtrip_scaled_and_short() {
        roundtrip(monitor_object(TypeId::MeasuredScaled, 2, ObjectValue::Scaled(-1234.0)));
        roundtrip(monitor_object(TypeId::MeasuredShortTime, 3, ObjectValue::Short(230.25)));
    }

    #[test]
    fn test_roundtrip_counter() {
        let mut object = monitor_object(
            TypeId::IntegratedTotalsTime,
            6000,
            ObjectValue::Counter(CounterReading {
                value: -5,
                sequence: 30,
                carry: true,
                adjusted: true,
                invalid: true,
            }),
        );
        // The BCR invalid bit is mirrored into the quality on decode.
        object.quality.invalid = true;
        roundtrip(object);
    }

    #[test]
    fn test_roundtrip_status_change() {
        roundtrip(monitor_object(
            TypeId::PackedSinglePoint,
            11,
            ObjectValue::StatusChange(StatusChange { status: 0xF0F0, change: 0x0F0F }),
        ));
    }

    #[test]
    fn test_roundtrip_protection_types() {
        let mut object = monitor_object(
            TypeId::ProtectionEventTime,
            21,
            ObjectValue::ProtectionEvent {
                state: DoublePointValue::Off,
                elapsed_invalid: false,
            },
        );
        object.elapsed = Some(Cp16Time2a(900));
        roundtrip(object);

        let mut object = monitor_object(
            TypeId::ProtectionStartTime,
            22,
            ObjectValue::ProtectionStart {
                events: StartEvents::from_byte(0x15),
                elapsed_invalid: true,
            },
        );
        object.elapsed = Some(Cp16Time2a(20));
        roundtrip(object);

        let mut object = monitor_object(
            TypeId::ProtectionOutputTime,
            23,
            ObjectValue::ProtectionOutput {
                circuits: OutputCircuit::from_byte(0x0B),
                elapsed_invalid: false,
            },
        );
        object.elapsed = Some(Cp16Time2a(65535));
        roundtrip(object);
    }

    #[test]
    fn test_roundtrip_end_of_init() {
        roundtrip(monitor_object(
            TypeId::EndOfInit,
            0,
            ObjectValue::EndOfInit { cause: 2, after_parameter_change: false },
        ));
    }

    #[test]
    fn test_roundtrip_commands() {
        roundtrip(monitor_object(
            TypeId::SingleCommand,
            100,
            ObjectValue::SingleCommand {
                on: true,
                qualifier: CommandQualifier { qualifier: 1, select: true },
            },
        ));
        roundtrip(monitor_object(
            TypeId::DoubleCommandTime,
            101,
            ObjectValue::DoubleCommand {
                state: DoublePointValue::On,
                qualifier: CommandQualifier::EXECUTE,
            },
        ));
        roundtrip(monitor_object(
            TypeId::RegulatingStep,
            102,
            ObjectValue::RegulatingStep {
                direction: StepDirection::Higher,
                qualifier: CommandQualifier::SELECT,
            },
        ));
        roundtrip(monitor_object(
            TypeId::SetpointShortTime,
            103,
            ObjectValue::SetpointShort {
                value: 49.5,
                qualifier: SetpointQualifier { qualifier: 0, select: false },
            },
        ));
        roundtrip(monitor_object(
            TypeId::BitstringCommand,
            104,
            ObjectValue::BitstringCommand(0x1234_5678),
        ));
    }

    #[test]
    fn test_roundtrip_system_types() {
        roundtrip(monitor_object(
            TypeId::Interrogation,
            0,
            ObjectValue::Interrogation { qualifier: 20 },
        ));
        roundtrip(monitor_object(
            TypeId::CounterInterrogation,
            0,
            ObjectValue::CounterInterrogation(CounterQualifier::GENERAL),
        ));
        roundtrip(monitor_object(TypeId::ReadCommand, 500, ObjectValue::Empty));
        roundtrip(monitor_object(
            TypeId::ResetProcess,
            0,
            ObjectValue::ResetProcess { qualifier: 1 },
        ));

        let mut object = monitor_object(TypeId::ClockSync, 0, ObjectValue::Empty);
        object.timestamp = Some(sample_time());
        roundtrip(object);

        let mut object = monitor_object(
            TypeId::TestCommand,
            0,
            ObjectValue::TestCommand { counter: 4711 },
        );
        object.timestamp = Some(sample_time());
        roundtrip(object);
    }

    #[test]
    fn test_roundtrip_parameters() {
        roundtrip(monitor_object(
            TypeId::ParameterScaled,
            31,
            ObjectValue::ParameterScaled {
                value: 250.0,
                qualifier: ParameterQualifier {
                    kind: 1,
                    local_change: false,
                    not_in_operation: true,
                },
            },
        ));
        roundtrip(monitor_object(
            TypeId::ParameterActivation,
            32,
            ObjectValue::ParameterActivation { qualifier: 3 },
        ));
    }

    #[test]
    fn test_sequence_encoding() {
        let objects: Vec<_> = (0..3)
            .map(|i| {
                let mut o = monitor_object(
                    TypeId::SinglePoint,
                    200 + i,
                    ObjectValue::Single(i % 2 == 0),
                );
                o.cot = Cause::InterrogatedStation;
                o
            })
            .collect();
        let asdu = encode_asdu(&objects, true).unwrap();
        assert!(asdu.header.vsq.sequence);
        assert_eq!(asdu.header.vsq.count, 3);
        // 3-byte IOA once, then one SIQ per point.
        assert_eq!(asdu.body.len(), 6);

        let decoded = parse_asdu(&asdu).unwrap();
        assert_eq!(decoded, objects);
    }

    #[test]
    fn test_sequence_requires_consecutive_addresses() {
        let a = monitor_object(TypeId::SinglePoint, 10, ObjectValue::Single(true));
        let b = monitor_object(TypeId::SinglePoint, 12, ObjectValue::Single(false));
        assert!(encode_asdu(&[a, b], true).is_err());
    }

    #[test]
    fn test_mixed_types_rejected() {
        let a = monitor_object(TypeId::SinglePoint, 10, ObjectValue::Single(true));
        let b = monitor_object(TypeId::DoublePoint, 11, ObjectValue::Double(DoublePointValue::On));
        assert!(encode_asdu(&[a, b], false).is_err());
    }

    #[test]
    fn test_variant_type_mismatch_rejected() {
        let object = monitor_object(TypeId::SingleCommand, 10, ObjectValue::Single(true));
        assert!(encode_single(&object).is_err());
    }

    #[test]
    fn test_missing_time_tag_rejected() {
        let mut object = monitor_object(TypeId::SinglePointTime, 1, ObjectValue::Single(true));
        object.timestamp = None;
        assert!(encode_single(&object).is_err());
    }

    #[test]
    fn test_normalized_clamping() {
        assert_eq!(normalized_to_wire(2.0), 32767);
        assert_eq!(normalized_to_wire(-2.0), -32767);
        assert_eq!(normalized_to_wire(0.0), 0);
        assert_eq!(scaled_to_wire(1e9), i16::MAX);
        assert_eq!(scaled_to_wire(-1e9), i16::MIN);
    }

    #[test]
    fn test_interrogation_wire_bytes() {
        let mut object = InformationObject::interrogation(20);
        object.common_address = 1;
        object.cot = Cause::Activation;
        let asdu = encode_single(&object).unwrap();
        let mut buf = BytesMut::new();
        asdu.encode_to(&mut buf);
        assert_eq!(
            &buf[..],
            &[0x64, 0x01, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x14]
        );
    }
}
