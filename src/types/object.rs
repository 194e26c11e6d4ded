//! The uniform information object record and its value variants.
//!
//! Every decoded ASDU element and every command submitted by the host is an
//! [`InformationObject`]. The per-type payload lives in [`ObjectValue`], a
//! tagged variant; fields that do not apply to a type identifier hold their
//! identity values and encode as zero on the wire.

use crate::types::cot::Cause;
use crate::types::time::{Cp16Time2a, Cp56Time2a};
use crate::types::type_id::TypeId;

/// Quality descriptor bits shared by the monitored types.
///
/// Wire positions are normative: OV bit 0, BL bit 4, SB bit 5, NT bit 6,
/// IV bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quality {
    /// OV: value beyond its predefined range
    pub overflow: bool,
    /// BL: blocked for transmission
    pub blocked: bool,
    /// SB: substituted by an operator or automatic source
    pub substituted: bool,
    /// NT: not topical (stale)
    pub not_topical: bool,
    /// IV: invalid
    pub invalid: bool,
}

impl Quality {
    /// Quality with every flag clear.
    pub const GOOD: Self = Self {
        overflow: false,
        blocked: false,
        substituted: false,
        not_topical: false,
        invalid: false,
    };

    /// Decode an SIQ/DIQ octet (no overflow bit there).
    #[inline]
    pub const fn from_siq(byte: u8) -> Self {
        Self {
            overflow: false,
            blocked: byte & 0x10 != 0,
            substituted: byte & 0x20 != 0,
            not_topical: byte & 0x40 != 0,
            invalid: byte & 0x80 != 0,
        }
    }

    /// Decode a QDS octet.
    #[inline]
    pub const fn from_qds(byte: u8) -> Self {
        Self {
            overflow: byte & 0x01 != 0,
            blocked: byte & 0x10 != 0,
            substituted: byte & 0x20 != 0,
            not_topical: byte & 0x40 != 0,
            invalid: byte & 0x80 != 0,
        }
    }

    /// Decode a QDP octet (protection types; EI is handled by the caller).
    #[inline]
    pub const fn from_qdp(byte: u8) -> Self {
        Self {
            overflow: false,
            blocked: byte & 0x10 != 0,
            substituted: byte & 0x20 != 0,
            not_topical: byte & 0x40 != 0,
            invalid: byte & 0x80 != 0,
        }
    }

    /// BL/SB/NT/IV bits in their SIQ/DIQ/QDS positions.
    #[inline]
    pub const fn flag_bits(&self) -> u8 {
        (self.blocked as u8) << 4
            | (self.substituted as u8) << 5
            | (self.not_topical as u8) << 6
            | (self.invalid as u8) << 7
    }

    /// Encode as a QDS octet.
    #[inline]
    pub const fn to_qds(&self) -> u8 {
        self.flag_bits() | self.overflow as u8
    }

    /// True if every flag is clear.
    #[inline]
    pub const fn is_good(&self) -> bool {
        !self.overflow && !self.blocked && !self.substituted && !self.not_topical && !self.invalid
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_good() {
            return f.write_str("good");
        }
        let mut sep = "";
        for (set, tag) in [
            (self.overflow, "OV"),
            (self.blocked, "BL"),
            (self.substituted, "SB"),
            (self.not_topical, "NT"),
            (self.invalid, "IV"),
        ] {
            if set {
                write!(f, "{sep}{tag}")?;
                sep = "|";
            }
        }
        Ok(())
    }
}

/// Double-point information / double command state (2 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DoublePointValue {
    /// Intermediate or not valid (00)
    Indeterminate = 0,
    /// Determined OFF (01)
    Off = 1,
    /// Determined ON (10)
    On = 2,
    /// Indeterminate or faulty (11)
    Faulty = 3,
}

impl DoublePointValue {
    /// Decode the low two bits.
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Indeterminate,
            1 => Self::Off,
            2 => Self::On,
            _ => Self::Faulty,
        }
    }

    /// Raw two-bit value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Regulating step command state (2 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StepDirection {
    /// Not permitted (00)
    NotPermitted = 0,
    /// Next step lower (01)
    Lower = 1,
    /// Next step higher (10)
    Higher = 2,
    /// Not permitted (11)
    Reserved = 3,
}

impl StepDirection {
    /// Decode the low two bits.
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::NotPermitted,
            1 => Self::Lower,
            2 => Self::Higher,
            _ => Self::Reserved,
        }
    }

    /// Raw two-bit value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Qualifier of command (QU, 5 bits) plus the select/execute bit.
///
/// Packed into SCO/DCO/RCO octets as bits 2..=6 and bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandQualifier {
    /// QU: 0 = no additional definition, 1 = short pulse, 2 = long pulse,
    /// 3 = persistent
    pub qualifier: u8,
    /// SE: true = select, false = execute
    pub select: bool,
}

impl CommandQualifier {
    /// Execute with QU = 0.
    pub const EXECUTE: Self = Self { qualifier: 0, select: false };

    /// Select with QU = 0.
    pub const SELECT: Self = Self { qualifier: 0, select: true };

    /// Extract from an SCO/DCO/RCO octet.
    #[inline]
    pub const fn from_command_byte(byte: u8) -> Self {
        Self {
            qualifier: (byte >> 2) & 0x1F,
            select: byte & 0x80 != 0,
        }
    }

    /// QU and SE bits in command-octet position.
    #[inline]
    pub const fn command_bits(&self) -> u8 {
        ((self.qualifier & 0x1F) << 2) | (self.select as u8) << 7
    }
}

/// Qualifier of set-point command (QL, 7 bits) plus select/execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetpointQualifier {
    /// QL: 0 = default
    pub qualifier: u8,
    /// SE: true = select, false = execute
    pub select: bool,
}

impl SetpointQualifier {
    /// Decode a QOS octet.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            qualifier: byte & 0x7F,
            select: byte & 0x80 != 0,
        }
    }

    /// Encode as a QOS octet.
    #[inline]
    pub const fn to_byte(&self) -> u8 {
        (self.qualifier & 0x7F) | (self.select as u8) << 7
    }
}

/// Qualifier of counter interrogation (QCC): request in bits 0..=5 and
/// freeze in bits 6..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterQualifier {
    /// RQT: 0 = none, 1..=4 group, 5 = general
    pub request: u8,
    /// FRZ: 0 = read, 1 = freeze, 2 = freeze and reset, 3 = reset
    pub freeze: u8,
}

impl CounterQualifier {
    /// General counter request without freeze.
    pub const GENERAL: Self = Self { request: 5, freeze: 0 };

    /// Decode a QCC octet.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            request: byte & 0x3F,
            freeze: (byte >> 6) & 0x03,
        }
    }

    /// Encode as a QCC octet.
    #[inline]
    pub const fn to_byte(&self) -> u8 {
        (self.request & 0x3F) | (self.freeze & 0x03) << 6
    }
}

/// Qualifier of parameter of measured value (QPM): KPA in bits 0..=5,
/// LPC in bit 6, POP in bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterQualifier {
    /// KPA: kind of parameter (1 = threshold, 2 = smoothing factor, ...)
    pub kind: u8,
    /// LPC: local parameter changed
    pub local_change: bool,
    /// POP: parameter not in operation
    pub not_in_operation: bool,
}

impl ParameterQualifier {
    /// Decode a QPM octet.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            kind: byte & 0x3F,
            local_change: byte & 0x40 != 0,
            not_in_operation: byte & 0x80 != 0,
        }
    }

    /// Encode as a QPM octet.
    #[inline]
    pub const fn to_byte(&self) -> u8 {
        (self.kind & 0x3F)
            | (self.local_change as u8) << 6
            | (self.not_in_operation as u8) << 7
    }
}

/// Binary counter reading: 32-bit count plus the sequence/flags octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterReading {
    /// Counter value
    pub value: i32,
    /// Sequence number (5 bits)
    pub sequence: u8,
    /// CY: carry occurred in the period
    pub carry: bool,
    /// CA: counter was adjusted in the period
    pub adjusted: bool,
    /// IV: reading invalid
    pub invalid: bool,
}

impl CounterReading {
    /// Decode the sequence/flags octet.
    #[inline]
    pub const fn flags_from_byte(value: i32, byte: u8) -> Self {
        Self {
            value,
            sequence: byte & 0x1F,
            carry: byte & 0x20 != 0,
            adjusted: byte & 0x40 != 0,
            invalid: byte & 0x80 != 0,
        }
    }

    /// Encode the sequence/flags octet.
    #[inline]
    pub const fn flags_byte(&self) -> u8 {
        (self.sequence & 0x1F)
            | (self.carry as u8) << 5
            | (self.adjusted as u8) << 6
            | (self.invalid as u8) << 7
    }
}

/// Status and status-change-detection word (M_PS_NA_1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusChange {
    /// 16 status bits
    pub status: u16,
    /// 16 change-detection bits
    pub change: u16,
}

/// Start events of protection equipment (SPE octet, bits 0..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartEvents(pub u8);

impl StartEvents {
    /// Mask to the six defined bits.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte & 0x3F)
    }

    /// GS: general start
    #[inline]
    pub const fn general(&self) -> bool {
        self.0 & 0x01 != 0
    }

    /// SL1..SL3: start of operation in phase L1/L2/L3
    #[inline]
    pub const fn phase(&self, phase: u8) -> bool {
        matches!(phase, 1..=3) && self.0 & (1 << phase) != 0
    }

    /// SIE: start of operation in earth current
    #[inline]
    pub const fn earth(&self) -> bool {
        self.0 & 0x10 != 0
    }

    /// SRD: start in reverse direction
    #[inline]
    pub const fn reverse(&self) -> bool {
        self.0 & 0x20 != 0
    }
}

/// Output circuit information of protection equipment (OCI octet, bits 0..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputCircuit(pub u8);

impl OutputCircuit {
    /// Mask to the four defined bits.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte & 0x0F)
    }

    /// GC: general command to output circuit
    #[inline]
    pub const fn general(&self) -> bool {
        self.0 & 0x01 != 0
    }

    /// CL1..CL3: command to output circuit of phase L1/L2/L3
    #[inline]
    pub const fn phase(&self, phase: u8) -> bool {
        matches!(phase, 1..=3) && self.0 & (1 << phase) != 0
    }
}

/// Per-type payload of an information object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectValue {
    /// No payload (C_RD_NA_1, and C_CS_NA_1 whose time rides in the
    /// record's timestamp field)
    Empty,
    /// Single-point state (M_SP_*)
    Single(bool),
    /// Double-point state (M_DP_*)
    Double(DoublePointValue),
    /// Step position -64..=63 with transient flag (M_ST_*)
    Step {
        value: i8,
        transient: bool,
    },
    /// Bitstring of 32 bits (M_BO_*)
    Bitstring(u32),
    /// Normalized measured value, widened from the wire int16 (M_ME_NA/TD/ND)
    Normalized(f64),
    /// Scaled measured value, widened from the wire int16 (M_ME_NB/TE)
    Scaled(f64),
    /// Short floating point measured value, widened (M_ME_NC/TF)
    Short(f64),
    /// Integrated totals (M_IT_*)
    Counter(CounterReading),
    /// Packed single points with change detection (M_PS_NA_1)
    StatusChange(StatusChange),
    /// Single event of protection equipment (M_EP_TD_1)
    ProtectionEvent {
        state: DoublePointValue,
        elapsed_invalid: bool,
    },
    /// Packed start events of protection equipment (M_EP_TE_1)
    ProtectionStart {
        events: StartEvents,
        elapsed_invalid: bool,
    },
    /// Packed output circuit information (M_EP_TF_1)
    ProtectionOutput {
        circuits: OutputCircuit,
        elapsed_invalid: bool,
    },
    /// End of initialization (M_EI_NA_1): cause of initialization and the
    /// changed-parameters flag
    EndOfInit {
        cause: u8,
        after_parameter_change: bool,
    },
    /// Single command (C_SC_*)
    SingleCommand {
        on: bool,
        qualifier: CommandQualifier,
    },
    /// Double command (C_DC_*)
    DoubleCommand {
        state: DoublePointValue,
        qualifier: CommandQualifier,
    },
    /// Regulating step command (C_RC_*)
    RegulatingStep {
        direction: StepDirection,
        qualifier: CommandQualifier,
    },
    /// Set-point command, normalized (C_SE_NA/TA)
    SetpointNormalized {
        value: f64,
        qualifier: SetpointQualifier,
    },
    /// Set-point command, scaled (C_SE_NB/TB)
    SetpointScaled {
        value: f64,
        qualifier: SetpointQualifier,
    },
    /// Set-point command, short floating point (C_SE_NC/TC)
    SetpointShort {
        value: f64,
        qualifier: SetpointQualifier,
    },
    /// Bitstring command (C_BO_*)
    BitstringCommand(u32),
    /// Interrogation command (C_IC_NA_1): QOI, 20 = station, 21..=36 = group
    Interrogation {
        qualifier: u8,
    },
    /// Counter interrogation command (C_CI_NA_1)
    CounterInterrogation(CounterQualifier),
    /// Reset process command (C_RP_NA_1)
    ResetProcess {
        qualifier: u8,
    },
    /// Test command with incrementing test sequence counter (C_TS_TA_1)
    TestCommand {
        counter: u16,
    },
    /// Parameter of measured value, normalized (P_ME_NA_1)
    ParameterNormalized {
        value: f64,
        qualifier: ParameterQualifier,
    },
    /// Parameter of measured value, scaled (P_ME_NB_1)
    ParameterScaled {
        value: f64,
        qualifier: ParameterQualifier,
    },
    /// Parameter of measured value, short floating point (P_ME_NC_1)
    ParameterShort {
        value: f64,
        qualifier: ParameterQualifier,
    },
    /// Parameter activation (P_AC_NA_1)
    ParameterActivation {
        qualifier: u8,
    },
}

impl ObjectValue {
    /// Numeric view of the payload, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Single(on) => Some(*on as u8 as f64),
            Self::Double(dp) => match dp {
                DoublePointValue::Off => Some(0.0),
                DoublePointValue::On => Some(1.0),
                _ => Some(f64::NAN),
            },
            Self::Step { value, .. } => Some(*value as f64),
            Self::Bitstring(bits) => Some(*bits as f64),
            Self::Normalized(v) | Self::Scaled(v) | Self::Short(v) => Some(*v),
            Self::Counter(reading) => Some(reading.value as f64),
            Self::SetpointNormalized { value, .. }
            | Self::SetpointScaled { value, .. }
            | Self::SetpointShort { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Boolean view for the two-state payloads.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Single(on) => Some(*on),
            Self::Double(DoublePointValue::Off) => Some(false),
            Self::Double(DoublePointValue::On) => Some(true),
            _ => None,
        }
    }

    /// Select/execute bit for the command payloads.
    pub fn select(&self) -> Option<bool> {
        match self {
            Self::SingleCommand { qualifier, .. }
            | Self::DoubleCommand { qualifier, .. }
            | Self::RegulatingStep { qualifier, .. } => Some(qualifier.select),
            Self::SetpointNormalized { qualifier, .. }
            | Self::SetpointScaled { qualifier, .. }
            | Self::SetpointShort { qualifier, .. } => Some(qualifier.select),
            _ => None,
        }
    }
}

/// The uniform record surfaced to the host and consumed for commands.
///
/// One record per information object; the ASDU header fields (type, cause,
/// addresses, flags) are copied into every record so a single value is
/// self-describing.
#[derive(Debug, Clone, PartialEq)]
pub struct InformationObject {
    /// Information object address (24 bits on the wire, all bits preserved)
    pub address: u32,
    /// Common address of the owning ASDU
    pub common_address: u16,
    /// Type identifier
    pub type_id: TypeId,
    /// Cause of transmission
    pub cot: Cause,
    /// P/N: negative confirmation
    pub negative: bool,
    /// T: test flag
    pub test: bool,
    /// Originator address
    pub originator: u8,
    /// Per-type payload
    pub value: ObjectValue,
    /// Quality descriptor (monitored types)
    pub quality: Quality,
    /// CP56Time2a tag, present when the type carries one
    pub timestamp: Option<Cp56Time2a>,
    /// CP16Time2a elapsed/relay time (protection types)
    pub elapsed: Option<Cp16Time2a>,
}

impl InformationObject {
    /// Bare record with the given type, address and payload.
    pub fn new(type_id: TypeId, address: u32, value: ObjectValue) -> Self {
        Self {
            address,
            common_address: 0,
            type_id,
            cot: Cause::Activation,
            negative: false,
            test: false,
            originator: 0,
            value,
            quality: Quality::GOOD,
            timestamp: None,
            elapsed: None,
        }
    }

    /// Single command C_SC_NA_1.
    pub fn single_command(address: u32, on: bool, select: bool) -> Self {
        Self::new(
            TypeId::SingleCommand,
            address,
            ObjectValue::SingleCommand {
                on,
                qualifier: CommandQualifier { qualifier: 0, select },
            },
        )
    }

    /// Double command C_DC_NA_1.
    pub fn double_command(address: u32, state: DoublePointValue, select: bool) -> Self {
        Self::new(
            TypeId::DoubleCommand,
            address,
            ObjectValue::DoubleCommand {
                state,
                qualifier: CommandQualifier { qualifier: 0, select },
            },
        )
    }

    /// Regulating step command C_RC_NA_1.
    pub fn regulating_step(address: u32, direction: StepDirection, select: bool) -> Self {
        Self::new(
            TypeId::RegulatingStep,
            address,
            ObjectValue::RegulatingStep {
                direction,
                qualifier: CommandQualifier { qualifier: 0, select },
            },
        )
    }

    /// Normalized set-point command C_SE_NA_1.
    pub fn setpoint_normalized(address: u32, value: f64, select: bool) -> Self {
        Self::new(
            TypeId::SetpointNormalized,
            address,
            ObjectValue::SetpointNormalized {
                value,
                qualifier: SetpointQualifier { qualifier: 0, select },
            },
        )
    }

    /// Scaled set-point command C_SE_NB_1.
    pub fn setpoint_scaled(address: u32, value: f64, select: bool) -> Self {
        Self::new(
            TypeId::SetpointScaled,
            address,
            ObjectValue::SetpointScaled {
                value,
                qualifier: SetpointQualifier { qualifier: 0, select },
            },
        )
    }

    /// Short floating point set-point command C_SE_NC_1.
    pub fn setpoint_short(address: u32, value: f64, select: bool) -> Self {
        Self::new(
            TypeId::SetpointShort,
            address,
            ObjectValue::SetpointShort {
                value,
                qualifier: SetpointQualifier { qualifier: 0, select },
            },
        )
    }

    /// Bitstring command C_BO_NA_1.
    pub fn bitstring_command(address: u32, bits: u32) -> Self {
        Self::new(
            TypeId::BitstringCommand,
            address,
            ObjectValue::BitstringCommand(bits),
        )
    }

    /// Interrogation command C_IC_NA_1 with the given QOI.
    pub fn interrogation(qualifier: u8) -> Self {
        Self::new(TypeId::Interrogation, 0, ObjectValue::Interrogation { qualifier })
    }

    /// Counter interrogation command C_CI_NA_1.
    pub fn counter_interrogation(qualifier: CounterQualifier) -> Self {
        Self::new(
            TypeId::CounterInterrogation,
            0,
            ObjectValue::CounterInterrogation(qualifier),
        )
    }

    /// Clock synchronization command C_CS_NA_1.
    pub fn clock_sync(time: Cp56Time2a) -> Self {
        let mut object = Self::new(TypeId::ClockSync, 0, ObjectValue::Empty);
        object.timestamp = Some(time);
        object
    }

    /// Read command C_RD_NA_1.
    pub fn read_command(address: u32) -> Self {
        Self::new(TypeId::ReadCommand, address, ObjectValue::Empty)
    }

    /// Reset process command C_RP_NA_1.
    pub fn reset_process(qualifier: u8) -> Self {
        Self::new(TypeId::ResetProcess, 0, ObjectValue::ResetProcess { qualifier })
    }

    /// Test command C_TS_TA_1 with the given test sequence counter.
    pub fn test_command(counter: u16, time: Cp56Time2a) -> Self {
        let mut object = Self::new(TypeId::TestCommand, 0, ObjectValue::TestCommand { counter });
        object.timestamp = Some(time);
        object
    }

    /// Parameter of measured value, normalized (P_ME_NA_1).
    pub fn parameter_normalized(address: u32, value: f64, qualifier: ParameterQualifier) -> Self {
        Self::new(
            TypeId::ParameterNormalized,
            address,
            ObjectValue::ParameterNormalized { value, qualifier },
        )
    }

    /// Parameter of measured value, scaled (P_ME_NB_1).
    pub fn parameter_scaled(address: u32, value: f64, qualifier: ParameterQualifier) -> Self {
        Self::new(
            TypeId::ParameterScaled,
            address,
            ObjectValue::ParameterScaled { value, qualifier },
        )
    }

    /// Parameter of measured value, short floating point (P_ME_NC_1).
    pub fn parameter_short(address: u32, value: f64, qualifier: ParameterQualifier) -> Self {
        Self::new(
            TypeId::ParameterShort,
            address,
            ObjectValue::ParameterShort { value, qualifier },
        )
    }

    /// Parameter activation P_AC_NA_1.
    pub fn parameter_activation(address: u32, qualifier: u8) -> Self {
        Self::new(
            TypeId::ParameterActivation,
            address,
            ObjectValue::ParameterActivation { qualifier },
        )
    }

    /// Attach a time tag and lift the type identifier to its time-tagged
    /// variant when one exists (C_SC_NA_1 becomes C_SC_TA_1 and so on).
    pub fn with_timestamp(mut self, time: Cp56Time2a) -> Self {
        self.type_id = match self.type_id {
            TypeId::SingleCommand => TypeId::SingleCommandTime,
            TypeId::DoubleCommand => TypeId::DoubleCommandTime,
            TypeId::RegulatingStep => TypeId::RegulatingStepTime,
            TypeId::SetpointNormalized => TypeId::SetpointNormalizedTime,
            TypeId::SetpointScaled => TypeId::SetpointScaledTime,
            TypeId::SetpointShort => TypeId::SetpointShortTime,
            TypeId::BitstringCommand => TypeId::BitstringCommandTime,
            other => other,
        };
        self.timestamp = Some(time);
        self
    }
}

impl std::fmt::Display for InformationObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} IOA={} CA={} cot={}",
            self.type_id, self.address, self.common_address, self.cot
        )?;
        if let Some(v) = self.value.as_f64() {
            write!(f, " value={v}")?;
        }
        if self.negative {
            f.write_str(" NEG")?;
        }
        if !self.quality.is_good() {
            write!(f, " [{}]", self.quality)?;
        }
        Ok(())
    }
}
