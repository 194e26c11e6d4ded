//! ASDU object section decoding.
//!
//! [`parse_asdu`] turns the raw object section of an ASDU into one
//! [`InformationObject`] per element, with the identifier fields copied into
//! every record. The section length is validated against the declared object
//! count before anything is decoded; a mismatch is a
//! [`MasterError::PayloadMismatch`] and the connection is expected to drop.

use crate::error::{MasterError, Result};
use crate::types::{
    Asdu, Cp16Time2a, Cp56Time2a, CounterQualifier, CounterReading, DoublePointValue,
    InformationObject, Ioa, ObjectValue, OutputCircuit, ParameterQualifier, Quality,
    SetpointQualifier, StartEvents, StatusChange, StepDirection, TypeId,
};
use crate::types::CommandQualifier;

/// Divisor mapping the wire int16 of a normalized value onto [-1, 1].
pub(crate) const NORMALIZED_SCALE: f64 = 32767.0;

/// Decode every information object of an ASDU.
///
/// Objects inherit the identifier fields (type, cause, P/N, T, OA, CA). With
/// SQ set the first IOA addresses the first element and the rest follow
/// consecutively.
pub fn parse_asdu(asdu: &Asdu) -> Result<Vec<InformationObject>> {
    let header = &asdu.header;
    let type_id = header.type_id;
    let count = header.vsq.count as usize;
    let size = type_id.object_size();

    let expected = if header.vsq.sequence {
        Ioa::SIZE + count * size
    } else {
        count * (Ioa::SIZE + size)
    };
    if asdu.body.len() != expected || count == 0 {
        return Err(MasterError::PayloadMismatch {
            type_id: type_id.as_u8(),
            expected,
            actual: asdu.body.len(),
        });
    }

    let data = asdu.body.as_ref();
    let mut objects = Vec::with_capacity(count);
    let mut offset = 0;
    let mut address = 0u32;

    for index in 0..count {
        if header.vsq.sequence {
            if index == 0 {
                address = Ioa::from_slice(&data[offset..])?.value();
                offset += Ioa::SIZE;
            } else {
                address = (address + 1) & 0x00FF_FFFF;
            }
        } else {
            address = Ioa::from_slice(&data[offset..])?.value();
            offset += Ioa::SIZE;
        }

        let element = &data[offset..offset + size];
        offset += size;

        let mut object = InformationObject::new(type_id, address, ObjectValue::Empty);
        object.common_address = header.common_address;
        object.cot = header.cause;
        object.negative = header.negative;
        object.test = header.test;
        object.originator = header.originator;
        decode_element(type_id, element, &mut object)?;
        objects.push(object);
    }

    Ok(objects)
}

/// Decode one element payload into the prepared record.
fn decode_element(type_id: TypeId, data: &[u8], object: &mut InformationObject) -> Result<()> {
    match type_id {
        TypeId::SinglePoint | TypeId::SinglePointTime => {
            object.value = ObjectValue::Single(data[0] & 0x01 != 0);
            object.quality = Quality::from_siq(data[0]);
            take_time_tag(type_id, &data[1..], object)?;
        }
        TypeId::DoublePoint | TypeId::DoublePointTime => {
            object.value = ObjectValue::Double(DoublePointValue::from_u8(data[0]));
            object.quality = Quality::from_siq(data[0]);
            take_time_tag(type_id, &data[1..], object)?;
        }
        TypeId::StepPosition | TypeId::StepPositionTime => {
            // VTI: 7-bit two's complement value plus transient bit.
            object.value = ObjectValue::Step {
                value: ((data[0] << 1) as i8) >> 1,
                transient: data[0] & 0x80 != 0,
            };
            object.quality = Quality::from_qds(data[1]);
            take_time_tag(type_id, &data[2..], object)?;
        }
        TypeId::Bitstring | TypeId::BitstringTime => {
            object.value = ObjectValue::Bitstring(u32::from_le_bytes([
                data[0], data[1], data[2], data[3],
            ]));
            object.quality = Quality::from_qds(data[4]);
            take_time_tag(type_id, &data[5..], object)?;
        }
        TypeId::MeasuredNormalized | TypeId::MeasuredNormalizedTime => {
            let raw = i16::from_le_bytes([data[0], data[1]]);
            object.value = ObjectValue::Normalized(raw as f64 / NORMALIZED_SCALE);
            object.quality = Quality::from_qds(data[2]);
            take_time_tag(type_id, &data[3..], object)?;
        }
        TypeId::MeasuredNormalizedNoQuality => {
            let raw = i16::from_le_bytes([data[0], data[1]]);
            object.value = ObjectValue::Normalized(raw as f64 / NORMALIZED_SCALE);
        }
        TypeId::MeasuredScaled | TypeId::MeasuredScaledTime => {
            let raw = i16::from_le_bytes([data[0], data[1]]);
            object.value = ObjectValue::Scaled(raw as f64);
            object.quality = Quality::from_qds(data[2]);
            take_time_tag(type_id, &data[3..], object)?;
        }
        TypeId::MeasuredShort | TypeId::MeasuredShortTime => {
            let raw = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            object.value = ObjectValue::Short(raw as f64);
            object.quality = Quality::from_qds(data[4]);
            take_time_tag(type_id, &data[5..], object)?;
        }
        TypeId::IntegratedTotals | TypeId::IntegratedTotalsTime => {
            let value = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            let reading = CounterReading::flags_from_byte(value, data[4]);
            object.quality.invalid = reading.invalid;
            object.value = ObjectValue::Counter(reading);
            take_time_tag(type_id, &data[5..], object)?;
        }
        TypeId::PackedSinglePoint => {
            object.value = ObjectValue::StatusChange(StatusChange {
                status: u16::from_le_bytes([data[0], data[1]]),
                change: u16::from_le_bytes([data[2], data[3]]),
            });
            object.quality = Quality::from_qds(data[4]);
        }
        TypeId::ProtectionEventTime => {
            // SEP octet: event state, elapsed-invalid, then the quality bits.
            object.value = ObjectValue::ProtectionEvent {
                state: DoublePointValue::from_u8(data[0]),
                elapsed_invalid: data[0] & 0x08 != 0,
            };
            object.quality = Quality::from_qdp(data[0]);
            object.elapsed = Some(Cp16Time2a::from_bytes(&data[1..3])?);
            take_time_tag(type_id, &data[3..], object)?;
        }
        TypeId::ProtectionStartTime => {
            object.value = ObjectValue::ProtectionStart {
                events: StartEvents::from_byte(data[0]),
                elapsed_invalid: data[1] & 0x08 != 0,
            };
            object.quality = Quality::from_qdp(data[1]);
            object.elapsed = Some(Cp16Time2a::from_bytes(&data[2..4])?);
            take_time_tag(type_id, &data[4..], object)?;
        }
        TypeId::ProtectionOutputTime => {
            object.value = ObjectValue::ProtectionOutput {
                circuits: OutputCircuit::from_byte(data[0]),
                elapsed_invalid: data[1] & 0x08 != 0,
            };
            object.quality = Quality::from_qdp(data[1]);
            object.elapsed = Some(Cp16Time2a::from_bytes(&data[2..4])?);
            take_time_tag(type_id, &data[4..], object)?;
        }
        TypeId::EndOfInit => {
            object.value = ObjectValue::EndOfInit {
                cause: data[0] & 0x7F,
                after_parameter_change: data[0] & 0x80 != 0,
            };
        }
        TypeId::SingleCommand | TypeId::SingleCommandTime => {
            object.value = ObjectValue::SingleCommand {
                on: data[0] & 0x01 != 0,
                qualifier: CommandQualifier::from_command_byte(data[0]),
            };
            take_time_tag(type_id, &data[1..], object)?;
        }
        TypeId::DoubleCommand | TypeId::DoubleCommandTime => {
            object.value = ObjectValue::DoubleCommand {
                state: DoublePointValue::from_u8(data[0]),
                qualifier: CommandQualifier::from_command_byte(data[0]),
            };
            take_time_tag(type_id, &data[1..], object)?;
        }
        TypeId::RegulatingStep | TypeId::RegulatingStepTime => {
            object.value = ObjectValue::RegulatingStep {
                direction: StepDirection::from_u8(data[0]),
                qualifier: CommandQualifier::from_command_byte(data[0]),
            };
            take_time_tag(type_id, &data[1..], object)?;
        }
        TypeId::SetpointNormalized | TypeId::SetpointNormalizedTime => {
            let raw = i16::from_le_bytes([data[0], data[1]]);
            object.value = ObjectValue::SetpointNormalized {
                value: raw as f64 / NORMALIZED_SCALE,
                qualifier: SetpointQualifier::from_byte(data[2]),
            };
            take_time_tag(type_id, &data[3..], object)?;
        }
        TypeId::SetpointScaled | TypeId::SetpointScaledTime => {
            let raw = i16::from_le_bytes([data[0], data[1]]);
            object.value = ObjectValue::SetpointScaled {
                value: raw as f64,
                qualifier: SetpointQualifier::from_byte(data[2]),
            };
            take_time_tag(type_id, &data[3..], object)?;
        }
        TypeId::SetpointShort | TypeId::SetpointShortTime => {
            let raw = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            object.value = ObjectValue::SetpointShort {
                value: raw as f64,
                qualifier: SetpointQualifier::from_byte(data[4]),
            };
            take_time_tag(type_id, &data[5..], object)?;
        }
        TypeId::BitstringCommand | TypeId::BitstringCommandTime => {
            object.value = ObjectValue::BitstringCommand(u32::from_le_bytes([
                data[0], data[1], data[2], data[3],
            ]));
            take_time_tag(type_id, &data[4..], object)?;
        }
        TypeId::Interrogation => {
            object.value = ObjectValue::Interrogation { qualifier: data[0] };
        }
        TypeId::CounterInterrogation => {
            object.value =
                ObjectValue::CounterInterrogation(CounterQualifier::from_byte(data[0]));
        }
        TypeId::ReadCommand => {
            object.value = ObjectValue::Empty;
        }
        TypeId::ClockSync => {
            object.value = ObjectValue::Empty;
            object.timestamp = Some(Cp56Time2a::from_bytes(data)?);
        }
        TypeId::ResetProcess => {
            object.value = ObjectValue::ResetProcess { qualifier: data[0] };
        }
        TypeId::TestCommand => {
            object.value = ObjectValue::TestCommand {
                counter: u16::from_le_bytes([data[0], data[1]]),
            };
            take_time_tag(type_id, &data[2..], object)?;
        }
        TypeId::ParameterNormalized => {
            let raw = i16::from_le_bytes([data[0], data[1]]);
            object.value = ObjectValue::ParameterNormalized {
                value: raw as f64 / NORMALIZED_SCALE,
                qualifier: ParameterQualifier::from_byte(data[2]),
            };
        }
        TypeId::ParameterScaled => {
            let raw = i16::from_le_bytes([data[0], data[1]]);
            object.value = ObjectValue::ParameterScaled {
                value: raw as f64,
                qualifier: ParameterQualifier::from_byte(data[2]),
            };
        }
        TypeId::ParameterShort => {
            let raw = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            object.value = ObjectValue::ParameterShort {
                value: raw as f64,
                qualifier: ParameterQualifier::from_byte(data[4]),
            };
        }
        TypeId::ParameterActivation => {
            object.value = ObjectValue::ParameterActivation { qualifier: data[0] };
        }
    }
    Ok(())
}

/// Consume the trailing CP56Time2a of time-tagged types.
fn take_time_tag(type_id: TypeId, rest: &[u8], object: &mut InformationObject) -> Result<()> {
    if type_id.has_time_tag() {
        object.timestamp = Some(Cp56Time2a::from_bytes(rest)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AsduHeader, Cause, Vsq};
    use bytes::Bytes;

    fn asdu(type_id: TypeId, count: u8, sequence: bool, cause: Cause, body: &[u8]) -> Asdu {
        Asdu::new(
            AsduHeader {
                type_id,
                vsq: Vsq::new(count, sequence),
                cause,
                negative: false,
                test: false,
                originator: 0,
                common_address: 1,
            },
            Bytes::copy_from_slice(body),
        )
    }

    #[test]
    fn test_single_point() {
        // IOA=1001, SPI on, blocked.
        let asdu = asdu(
            TypeId::SinglePoint,
            1,
            false,
            Cause::Spontaneous,
            &[0xE9, 0x03, 0x00, 0x11],
        );
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].address, 1001);
        assert_eq!(objects[0].value, ObjectValue::Single(true));
        assert!(objects[0].quality.blocked);
        assert_eq!(objects[0].common_address, 1);
        assert_eq!(objects[0].cot, Cause::Spontaneous);
    }

    #[test]
    fn test_single_point_sequence_addressing() {
        // Three points from IOA=100 with SQ set.
        let asdu = asdu(
            TypeId::SinglePoint,
            3,
            true,
            Cause::InterrogatedStation,
            &[0x64, 0x00, 0x00, 0x00, 0x01, 0x80],
        );
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(objects.len(), 3);
        assert_eq!(objects[0].address, 100);
        assert_eq!(objects[1].address, 101);
        assert_eq!(objects[2].address, 102);
        assert_eq!(objects[1].value, ObjectValue::Single(true));
        assert!(objects[2].quality.invalid);
    }

    #[test]
    fn test_double_point() {
        let asdu = asdu(
            TypeId::DoublePoint,
            1,
            false,
            Cause::Spontaneous,
            &[0xD0, 0x07, 0x00, 0x02],
        );
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(objects[0].address, 2000);
        assert_eq!(objects[0].value, ObjectValue::Double(DoublePointValue::On));
    }

    #[test]
    fn test_step_position_sign_extension() {
        // VTI 0x7F = -1 with transient clear; 0xC0 = -64 transient set.
        let asdu = asdu(
            TypeId::StepPosition,
            2,
            false,
            Cause::Spontaneous,
            &[
                0x01, 0x00, 0x00, 0x7F, 0x00, // IOA=1
                0x02, 0x00, 0x00, 0xC0, 0x00, // IOA=2
            ],
        );
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(
            objects[0].value,
            ObjectValue::Step { value: -1, transient: false }
        );
        assert_eq!(
            objects[1].value,
            ObjectValue::Step { value: -64, transient: true }
        );
    }

    #[test]
    fn test_measured_normalized_scaling() {
        // 32767 -> 1.0, -32767 -> -1.0.
        let asdu = asdu(
            TypeId::MeasuredNormalized,
            2,
            false,
            Cause::Cyclic,
            &[
                0x01, 0x00, 0x00, 0xFF, 0x7F, 0x00, // IOA=1, +32767
                0x02, 0x00, 0x00, 0x01, 0x80, 0x00, // IOA=2, -32767
            ],
        );
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(objects[0].value, ObjectValue::Normalized(1.0));
        assert_eq!(objects[1].value, ObjectValue::Normalized(-1.0));
    }

    #[test]
    fn test_measured_short_float() {
        let mut body = vec![0xB8, 0x0B, 0x00]; // IOA=3000
        body.extend_from_slice(&23.5f32.to_le_bytes());
        body.push(0x00);
        let asdu = asdu(TypeId::MeasuredShort, 1, false, Cause::Spontaneous, &body);
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(objects[0].address, 3000);
        assert_eq!(objects[0].value.as_f64(), Some(23.5));
    }

    #[test]
    fn test_measured_short_with_time() {
        let time = Cp56Time2a {
            milliseconds: 1500,
            minutes: 10,
            hours: 8,
            day: 2,
            day_of_week: 5,
            month: 8,
            year: 26,
            invalid: false,
            summer_time: false,
        };
        let mut body = vec![0x01, 0x00, 0x00];
        body.extend_from_slice(&(-2.25f32).to_le_bytes());
        body.push(0x80); // invalid
        body.extend_from_slice(&time.to_bytes());
        let asdu = asdu(TypeId::MeasuredShortTime, 1, false, Cause::Spontaneous, &body);
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(objects[0].value.as_f64(), Some(-2.25));
        assert!(objects[0].quality.invalid);
        assert_eq!(objects[0].timestamp, Some(time));
    }

    #[test]
    fn test_integrated_totals() {
        let asdu = asdu(
            TypeId::IntegratedTotals,
            1,
            false,
            Cause::CounterGeneral,
            &[
                0x70, 0x17, 0x00, // IOA=6000
                0x40, 0xE2, 0x01, 0x00, // 123456
                0x25, // sequence 5, carry
            ],
        );
        let objects = parse_asdu(&asdu).unwrap();
        match objects[0].value {
            ObjectValue::Counter(reading) => {
                assert_eq!(reading.value, 123_456);
                assert_eq!(reading.sequence, 5);
                assert!(reading.carry);
                assert!(!reading.adjusted);
                assert!(!reading.invalid);
            }
            ref other => panic!("expected counter, got {other:?}"),
        }
    }

    #[test]
    fn test_packed_single_point_status_change() {
        let asdu = asdu(
            TypeId::PackedSinglePoint,
            1,
            false,
            Cause::Background,
            &[0x01, 0x00, 0x00, 0x34, 0x12, 0x78, 0x56, 0x00],
        );
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(
            objects[0].value,
            ObjectValue::StatusChange(StatusChange { status: 0x1234, change: 0x5678 })
        );
    }

    #[test]
    fn test_protection_event() {
        let time = Cp56Time2a {
            milliseconds: 250,
            minutes: 1,
            hours: 2,
            day: 3,
            day_of_week: 1,
            month: 4,
            year: 25,
            invalid: false,
            summer_time: false,
        };
        let mut body = vec![0x05, 0x00, 0x00]; // IOA=5
        body.push(0x0A); // ES=On(2), EI set
        body.extend_from_slice(&Cp16Time2a(750).to_bytes());
        body.extend_from_slice(&time.to_bytes());
        let asdu = asdu(TypeId::ProtectionEventTime, 1, false, Cause::Spontaneous, &body);
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(
            objects[0].value,
            ObjectValue::ProtectionEvent {
                state: DoublePointValue::On,
                elapsed_invalid: true,
            }
        );
        assert_eq!(objects[0].elapsed, Some(Cp16Time2a(750)));
        assert_eq!(objects[0].timestamp, Some(time));
    }

    #[test]
    fn test_end_of_init() {
        let asdu = asdu(
            TypeId::EndOfInit,
            1,
            false,
            Cause::Initialized,
            &[0x00, 0x00, 0x00, 0x81],
        );
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(
            objects[0].value,
            ObjectValue::EndOfInit { cause: 1, after_parameter_change: true }
        );
    }

    #[test]
    fn test_single_command_echo() {
        // ACTCON echo of a select single command, SCS on.
        let asdu = asdu(
            TypeId::SingleCommand,
            1,
            false,
            Cause::ActivationConfirm,
            &[0x64, 0x00, 0x00, 0x81],
        );
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(objects[0].address, 100);
        assert_eq!(
            objects[0].value,
            ObjectValue::SingleCommand {
                on: true,
                qualifier: CommandQualifier { qualifier: 0, select: true },
            }
        );
        assert_eq!(objects[0].cot, Cause::ActivationConfirm);
    }

    #[test]
    fn test_interrogation_qualifier() {
        let asdu = asdu(
            TypeId::Interrogation,
            1,
            false,
            Cause::ActivationConfirm,
            &[0x00, 0x00, 0x00, 0x14],
        );
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(objects[0].value, ObjectValue::Interrogation { qualifier: 20 });
    }

    #[test]
    fn test_test_command() {
        let time = Cp56Time2a::now();
        let mut body = vec![0x00, 0x00, 0x00, 0x2A, 0x00];
        body.extend_from_slice(&time.to_bytes());
        let asdu = asdu(TypeId::TestCommand, 1, false, Cause::ActivationConfirm, &body);
        let objects = parse_asdu(&asdu).unwrap();
        assert_eq!(objects[0].value, ObjectValue::TestCommand { counter: 42 });
        assert_eq!(objects[0].timestamp, Some(time));
    }

    #[test]
    fn test_parameter_normalized() {
        let asdu = asdu(
            TypeId::ParameterNormalized,
            1,
            false,
            Cause::Activation,
            &[0x01, 0x00, 0x00, 0xFF, 0x7F, 0x01],
        );
        let objects = parse_asdu(&asdu).unwrap();
        match objects[0].value {
            ObjectValue::ParameterNormalized { value, qualifier } => {
                assert_eq!(value, 1.0);
                assert_eq!(qualifier.kind, 1);
                assert!(!qualifier.local_change);
            }
            ref other => panic!("expected parameter, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_mismatch_rejected() {
        // M_ME_NC_1 declares two objects but carries bytes for one.
        let asdu = asdu(
            TypeId::MeasuredShort,
            2,
            false,
            Cause::Spontaneous,
            &[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        );
        match parse_asdu(&asdu) {
            Err(MasterError::PayloadMismatch { type_id, expected, actual }) => {
                assert_eq!(type_id, 13);
                assert_eq!(expected, 16);
                assert_eq!(actual, 8);
            }
            other => panic!("expected payload mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_count_rejected() {
        let asdu = asdu(TypeId::SinglePoint, 0, false, Cause::Spontaneous, &[]);
        assert!(parse_asdu(&asdu).is_err());
    }

    #[test]
    fn test_sequence_length_check() {
        // SQ=1, 3 single points: 3 (IOA) + 3*1 = 6 bytes expected.
        let asdu = asdu(
            TypeId::SinglePoint,
            3,
            true,
            Cause::InterrogatedStation,
            &[0x64, 0x00, 0x00, 0x00, 0x01], // one byte short
        );
        assert!(matches!(
            parse_asdu(&asdu),
            Err(MasterError::PayloadMismatch { .. })
        ));
    }
}
