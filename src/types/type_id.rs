//! Type identification (TI) catalog.
//!
//! The type identifier is the first octet of an ASDU and selects the wire
//! layout of every information object it carries.

use crate::error::{MasterError, Result};

/// ASDU type identifier.
///
/// Covers the monitor, control and parameter directions of the companion
/// standard as used between a controlling station and substation RTUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    // Process information, monitor direction
    /// Single-point information (M_SP_NA_1)
    SinglePoint = 1,
    /// Double-point information (M_DP_NA_1)
    DoublePoint = 3,
    /// Step position information (M_ST_NA_1)
    StepPosition = 5,
    /// Bitstring of 32 bits (M_BO_NA_1)
    Bitstring = 7,
    /// Measured value, normalized (M_ME_NA_1)
    MeasuredNormalized = 9,
    /// Measured value, scaled (M_ME_NB_1)
    MeasuredScaled = 11,
    /// Measured value, short floating point (M_ME_NC_1)
    MeasuredShort = 13,
    /// Integrated totals (M_IT_NA_1)
    IntegratedTotals = 15,
    /// Packed single points with status change detection (M_PS_NA_1)
    PackedSinglePoint = 20,
    /// Measured value, normalized, without quality (M_ME_ND_1)
    MeasuredNormalizedNoQuality = 21,

    // Process information with CP56Time2a, monitor direction
    /// Single-point information with time tag (M_SP_TB_1)
    SinglePointTime = 30,
    /// Double-point information with time tag (M_DP_TB_1)
    DoublePointTime = 31,
    /// Step position information with time tag (M_ST_TB_1)
    StepPositionTime = 32,
    /// Bitstring of 32 bits with time tag (M_BO_TB_1)
    BitstringTime = 33,
    /// Measured value, normalized, with time tag (M_ME_TD_1)
    MeasuredNormalizedTime = 34,
    /// Measured value, scaled, with time tag (M_ME_TE_1)
    MeasuredScaledTime = 35,
    /// Measured value, short floating point, with time tag (M_ME_TF_1)
    MeasuredShortTime = 36,
    /// Integrated totals with time tag (M_IT_TB_1)
    IntegratedTotalsTime = 37,
    /// Event of protection equipment with time tag (M_EP_TD_1)
    ProtectionEventTime = 38,
    /// Packed start events of protection equipment with time tag (M_EP_TE_1)
    ProtectionStartTime = 39,
    /// Packed output circuit information with time tag (M_EP_TF_1)
    ProtectionOutputTime = 40,

    // Process information, control direction
    /// Single command (C_SC_NA_1)
    SingleCommand = 45,
    /// Double command (C_DC_NA_1)
    DoubleCommand = 46,
    /// Regulating step command (C_RC_NA_1)
    RegulatingStep = 47,
    /// Set-point command, normalized (C_SE_NA_1)
    SetpointNormalized = 48,
    /// Set-point command, scaled (C_SE_NB_1)
    SetpointScaled = 49,
    /// Set-point command, short floating point (C_SE_NC_1)
    SetpointShort = 50,
    /// Bitstring of 32 bits command (C_BO_NA_1)
    BitstringCommand = 51,
    /// Single command with time tag (C_SC_TA_1)
    SingleCommandTime = 58,
    /// Double command with time tag (C_DC_TA_1)
    DoubleCommandTime = 59,
    /// Regulating step command with time tag (C_RC_TA_1)
    RegulatingStepTime = 60,
    /// Set-point command, normalized, with time tag (C_SE_TA_1)
    SetpointNormalizedTime = 61,
    /// Set-point command, scaled, with time tag (C_SE_TB_1)
    SetpointScaledTime = 62,
    /// Set-point command, short floating point, with time tag (C_SE_TC_1)
    SetpointShortTime = 63,
    /// Bitstring of 32 bits command with time tag (C_BO_TA_1)
    BitstringCommandTime = 64,

    // System information
    /// End of initialization (M_EI_NA_1)
    EndOfInit = 70,
    /// Interrogation command (C_IC_NA_1)
    Interrogation = 100,
    /// Counter interrogation command (C_CI_NA_1)
    CounterInterrogation = 101,
    /// Read command (C_RD_NA_1)
    ReadCommand = 102,
    /// Clock synchronization command (C_CS_NA_1)
    ClockSync = 103,
    /// Reset process command (C_RP_NA_1)
    ResetProcess = 105,
    /// Test command with time tag (C_TS_TA_1)
    TestCommand = 107,

    // Parameters
    /// Parameter of measured value, normalized (P_ME_NA_1)
    ParameterNormalized = 110,
    /// Parameter of measured value, scaled (P_ME_NB_1)
    ParameterScaled = 111,
    /// Parameter of measured value, short floating point (P_ME_NC_1)
    ParameterShort = 112,
    /// Parameter activation (P_AC_NA_1)
    ParameterActivation = 113,
}

impl TypeId {
    /// Create a TypeId from the raw octet.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::SinglePoint),
            3 => Ok(Self::DoublePoint),
            5 => Ok(Self::StepPosition),
            7 => Ok(Self::Bitstring),
            9 => Ok(Self::MeasuredNormalized),
            11 => Ok(Self::MeasuredScaled),
            13 => Ok(Self::MeasuredShort),
            15 => Ok(Self::IntegratedTotals),
            20 => Ok(Self::PackedSinglePoint),
            21 => Ok(Self::MeasuredNormalizedNoQuality),
            30 => Ok(Self::SinglePointTime),
            31 => Ok(Self::DoublePointTime),
            32 => Ok(Self::StepPositionTime),
            33 => Ok(Self::BitstringTime),
            34 => Ok(Self::MeasuredNormalizedTime),
            35 => Ok(Self::MeasuredScaledTime),
            36 => Ok(Self::MeasuredShortTime),
            37 => Ok(Self::IntegratedTotalsTime),
            38 => Ok(Self::ProtectionEventTime),
            39 => Ok(Self::ProtectionStartTime),
            40 => Ok(Self::ProtectionOutputTime),
            45 => Ok(Self::SingleCommand),
            46 => Ok(Self::DoubleCommand),
            47 => Ok(Self::RegulatingStep),
            48 => Ok(Self::SetpointNormalized),
            49 => Ok(Self::SetpointScaled),
            50 => Ok(Self::SetpointShort),
            51 => Ok(Self::BitstringCommand),
            58 => Ok(Self::SingleCommandTime),
            59 => Ok(Self::DoubleCommandTime),
            60 => Ok(Self::RegulatingStepTime),
            61 => Ok(Self::SetpointNormalizedTime),
            62 => Ok(Self::SetpointScaledTime),
            63 => Ok(Self::SetpointShortTime),
            64 => Ok(Self::BitstringCommandTime),
            70 => Ok(Self::EndOfInit),
            100 => Ok(Self::Interrogation),
            101 => Ok(Self::CounterInterrogation),
            102 => Ok(Self::ReadCommand),
            103 => Ok(Self::ClockSync),
            105 => Ok(Self::ResetProcess),
            107 => Ok(Self::TestCommand),
            110 => Ok(Self::ParameterNormalized),
            111 => Ok(Self::ParameterScaled),
            112 => Ok(Self::ParameterShort),
            113 => Ok(Self::ParameterActivation),
            _ => Err(MasterError::UnsupportedTypeId(value)),
        }
    }

    /// Raw octet value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Per-object payload size on the wire, excluding the 3-byte IOA.
    pub const fn object_size(self) -> usize {
        match self {
            Self::SinglePoint | Self::DoublePoint => 1,
            Self::StepPosition => 2,
            Self::Bitstring => 5,
            Self::MeasuredNormalized | Self::MeasuredScaled => 3,
            Self::MeasuredShort => 5,
            Self::IntegratedTotals => 5,
            Self::PackedSinglePoint => 5,
            Self::MeasuredNormalizedNoQuality => 2,
            Self::SinglePointTime | Self::DoublePointTime => 8,
            Self::StepPositionTime => 9,
            Self::BitstringTime => 12,
            Self::MeasuredNormalizedTime | Self::MeasuredScaledTime => 10,
            Self::MeasuredShortTime => 12,
            Self::IntegratedTotalsTime => 12,
            Self::ProtectionEventTime => 10,
            Self::ProtectionStartTime | Self::ProtectionOutputTime => 11,
            Self::SingleCommand | Self::DoubleCommand | Self::RegulatingStep => 1,
            Self::SetpointNormalized | Self::SetpointScaled => 3,
            Self::SetpointShort => 5,
            Self::BitstringCommand => 4,
            Self::SingleCommandTime | Self::DoubleCommandTime | Self::RegulatingStepTime => 8,
            Self::SetpointNormalizedTime | Self::SetpointScaledTime => 10,
            Self::SetpointShortTime => 12,
            Self::BitstringCommandTime => 11,
            Self::EndOfInit => 1,
            Self::Interrogation | Self::CounterInterrogation => 1,
            Self::ReadCommand => 0,
            Self::ClockSync => 7,
            Self::ResetProcess => 1,
            Self::TestCommand => 9,
            Self::ParameterNormalized | Self::ParameterScaled => 3,
            Self::ParameterShort => 5,
            Self::ParameterActivation => 1,
        }
    }

    /// True for types flowing from the RTU to the master.
    #[inline]
    pub const fn is_monitor(self) -> bool {
        matches!(self.as_u8(), 1..=40 | 70)
    }

    /// True for types flowing from the master to the RTU.
    #[inline]
    pub const fn is_control(self) -> bool {
        matches!(self.as_u8(), 45..=64 | 100..=107 | 110..=113)
    }

    /// True for the process command types (TI 45..=64).
    #[inline]
    pub const fn is_process_command(self) -> bool {
        matches!(self.as_u8(), 45..=64)
    }

    /// True for the parameter types P_ME_NA/NB/NC_1 and P_AC_NA_1.
    #[inline]
    pub const fn is_parameter(self) -> bool {
        matches!(self.as_u8(), 110..=113)
    }

    /// True if objects of this type end with a CP56Time2a time tag.
    #[inline]
    pub const fn has_time_tag(self) -> bool {
        matches!(self.as_u8(), 30..=40 | 58..=64 | 107)
    }

    /// IEC standard mnemonic, e.g. `M_SP_NA_1`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SinglePoint => "M_SP_NA_1",
            Self::DoublePoint => "M_DP_NA_1",
            Self::StepPosition => "M_ST_NA_1",
            Self::Bitstring => "M_BO_NA_1",
            Self::MeasuredNormalized => "M_ME_NA_1",
            Self::MeasuredScaled => "M_ME_NB_1",
            Self::MeasuredShort => "M_ME_NC_1",
            Self::IntegratedTotals => "M_IT_NA_1",
            Self::PackedSinglePoint => "M_PS_NA_1",
            Self::MeasuredNormalizedNoQuality => "M_ME_ND_1",
            Self::SinglePointTime => "M_SP_TB_1",
            Self::DoublePointTime => "M_DP_TB_1",
            Self::StepPositionTime => "M_ST_TB_1",
            Self::BitstringTime => "M_BO_TB_1",
            Self::MeasuredNormalizedTime => "M_ME_TD_1",
            Self::MeasuredScaledTime => "M_ME_TE_1",
            Self::MeasuredShortTime => "M_ME_TF_1",
            Self::IntegratedTotalsTime => "M_IT_TB_1",
            Self::ProtectionEventTime => "M_EP_TD_1",
            Self::ProtectionStartTime => "M_EP_TE_1",
            Self::ProtectionOutputTime => "M_EP_TF_1",
            Self::SingleCommand => "C_SC_NA_1",
            Self::DoubleCommand => "C_DC_NA_1",
            Self::RegulatingStep => "C_RC_NA_1",
            Self::SetpointNormalized => "C_SE_NA_1",
            Self::SetpointScaled => "C_SE_NB_1",
            Self::SetpointShort => "C_SE_NC_1",
            Self::BitstringCommand => "C_BO_NA_1",
            Self::SingleCommandTime => "C_SC_TA_1",
            Self::DoubleCommandTime => "C_DC_TA_1",
            Self::RegulatingStepTime => "C_RC_TA_1",
            Self::SetpointNormalizedTime => "C_SE_TA_1",
            Self::SetpointScaledTime => "C_SE_TB_1",
            Self::SetpointShortTime => "C_SE_TC_1",
            Self::BitstringCommandTime => "C_BO_TA_1",
            Self::EndOfInit => "M_EI_NA_1",
            Self::Interrogation => "C_IC_NA_1",
            Self::CounterInterrogation => "C_CI_NA_1",
            Self::ReadCommand => "C_RD_NA_1",
            Self::ClockSync => "C_CS_NA_1",
            Self::ResetProcess => "C_RP_NA_1",
            Self::TestCommand => "C_TS_TA_1",
            Self::ParameterNormalized => "P_ME_NA_1",
            Self::ParameterScaled => "P_ME_NB_1",
            Self::ParameterShort => "P_ME_NC_1",
            Self::ParameterActivation => "P_AC_NA_1",
        }
    }

    /// All supported type identifiers, in wire-value order.
    pub const ALL: [TypeId; 46] = [
        Self::SinglePoint,
        Self::DoublePoint,
        Self::StepPosition,
        Self::Bitstring,
        Self::MeasuredNormalized,
        Self::MeasuredScaled,
        Self::MeasuredShort,
        Self::IntegratedTotals,
        Self::PackedSinglePoint,
        Self::MeasuredNormalizedNoQuality,
        Self::SinglePointTime,
        Self::DoublePointTime,
        Self::StepPositionTime,
        Self::BitstringTime,
        Self::MeasuredNormalizedTime,
        Self::MeasuredScaledTime,
        Self::MeasuredShortTime,
        Self::IntegratedTotalsTime,
        Self::ProtectionEventTime,
        Self::ProtectionStartTime,
        Self::ProtectionOutputTime,
        Self::SingleCommand,
        Self::DoubleCommand,
        Self::RegulatingStep,
        Self::SetpointNormalized,
        Self::SetpointScaled,
        Self::SetpointShort,
        Self::BitstringCommand,
        Self::SingleCommandTime,
        Self::DoubleCommandTime,
        Self::RegulatingStepTime,
        Self::SetpointNormalizedTime,
        Self::SetpointScaledTime,
        Self::SetpointShortTime,
        Self::BitstringCommandTime,
        Self::EndOfInit,
        Self::Interrogation,
        Self::CounterInterrogation,
        Self::ReadCommand,
        Self::ClockSync,
        Self::ResetProcess,
        Self::TestCommand,
        Self::ParameterNormalized,
        Self::ParameterScaled,
        Self::ParameterShort,
        Self::ParameterActivation,
    ];
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all() {
        for ti in TypeId::ALL {
            assert_eq!(TypeId::from_u8(ti.as_u8()).unwrap(), ti);
        }
    }

    #[test]
    fn test_unsupported_values() {
        for value in [0u8, 2, 6, 14, 22, 29, 41, 44, 52, 57, 65, 69, 99, 104, 106, 108, 114, 255]
        {
            assert!(
                TypeId::from_u8(value).is_err(),
                "value {value} should be unsupported"
            );
        }
    }

    #[test]
    fn test_object_sizes_match_catalog() {
        assert_eq!(TypeId::SinglePoint.object_size(), 1);
        assert_eq!(TypeId::StepPosition.object_size(), 2);
        assert_eq!(TypeId::Bitstring.object_size(), 5);
        assert_eq!(TypeId::MeasuredNormalized.object_size(), 3);
        assert_eq!(TypeId::MeasuredShort.object_size(), 5);
        assert_eq!(TypeId::IntegratedTotals.object_size(), 5);
        assert_eq!(TypeId::MeasuredNormalizedNoQuality.object_size(), 2);
        assert_eq!(TypeId::MeasuredShortTime.object_size(), 12);
        assert_eq!(TypeId::ProtectionEventTime.object_size(), 10);
        assert_eq!(TypeId::ProtectionStartTime.object_size(), 11);
        assert_eq!(TypeId::Interrogation.object_size(), 1);
        assert_eq!(TypeId::ClockSync.object_size(), 7);
        assert_eq!(TypeId::TestCommand.object_size(), 9);
        assert_eq!(TypeId::ReadCommand.object_size(), 0);
    }

    #[test]
    fn test_time_tagged_types() {
        for ti in [
            TypeId::SinglePointTime,
            TypeId::MeasuredShortTime,
            TypeId::ProtectionOutputTime,
            TypeId::SingleCommandTime,
            TypeId::BitstringCommandTime,
            TypeId::TestCommand,
        ] {
            assert!(ti.has_time_tag(), "{ti} should carry a time tag");
            // The tag accounts for 7 of the payload bytes.
            assert!(ti.object_size() >= 7);
        }
        assert!(!TypeId::SinglePoint.has_time_tag());
        assert!(!TypeId::ClockSync.has_time_tag());
    }

    #[test]
    fn test_direction_predicates() {
        assert!(TypeId::SinglePoint.is_monitor());
        assert!(TypeId::EndOfInit.is_monitor());
        assert!(!TypeId::SingleCommand.is_monitor());

        assert!(TypeId::SingleCommand.is_control());
        assert!(TypeId::Interrogation.is_control());
        assert!(TypeId::ParameterActivation.is_control());
        assert!(!TypeId::MeasuredShort.is_control());

        assert!(TypeId::SingleCommand.is_process_command());
        assert!(TypeId::BitstringCommandTime.is_process_command());
        assert!(!TypeId::Interrogation.is_process_command());

        assert!(TypeId::ParameterNormalized.is_parameter());
        assert!(TypeId::ParameterActivation.is_parameter());
        assert!(!TypeId::SetpointNormalized.is_parameter());
        assert!(!TypeId::ParameterShort.is_process_command());
    }

    #[test]
    fn test_names() {
        assert_eq!(TypeId::SinglePoint.name(), "M_SP_NA_1");
        assert_eq!(TypeId::MeasuredShort.name(), "M_ME_NC_1");
        assert_eq!(TypeId::PackedSinglePoint.name(), "M_PS_NA_1");
        assert_eq!(TypeId::TestCommand.name(), "C_TS_TA_1");
        assert_eq!(TypeId::ParameterActivation.name(), "P_AC_NA_1");
        assert_eq!(TypeId::MeasuredShortTime.to_string(), "M_ME_TF_1");
    }
}
