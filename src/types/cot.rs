//! Cause of transmission (COT).
//!
//! The third ASDU header octet: cause in the low 6 bits, P/N in bit 6 and
//! the test flag in bit 7. The flag bits are handled by the ASDU header;
//! this enum models the 6-bit cause only.

use crate::error::{MasterError, Result};

/// Cause of transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Cause {
    /// Periodic, cyclic
    Cyclic = 1,
    /// Background scan
    Background = 2,
    /// Spontaneous
    Spontaneous = 3,
    /// Initialized
    Initialized = 4,
    /// Request or requested
    Request = 5,
    /// Activation
    Activation = 6,
    /// Activation confirmation
    ActivationConfirm = 7,
    /// Deactivation
    Deactivation = 8,
    /// Deactivation confirmation
    DeactivationConfirm = 9,
    /// Activation termination
    ActivationTerm = 10,
    /// Return information caused by a remote command
    ReturnRemote = 11,
    /// Return information caused by a local command
    ReturnLocal = 12,
    /// File transfer
    FileTransfer = 13,
    /// Interrogated by station interrogation
    InterrogatedStation = 20,
    /// Interrogated by group 1 interrogation
    InterrogatedGroup1 = 21,
    /// Interrogated by group 2 interrogation
    InterrogatedGroup2 = 22,
    /// Interrogated by group 3 interrogation
    InterrogatedGroup3 = 23,
    /// Interrogated by group 4 interrogation
    InterrogatedGroup4 = 24,
    /// Interrogated by group 5 interrogation
    InterrogatedGroup5 = 25,
    /// Interrogated by group 6 interrogation
    InterrogatedGroup6 = 26,
    /// Interrogated by group 7 interrogation
    InterrogatedGroup7 = 27,
    /// Interrogated by group 8 interrogation
    InterrogatedGroup8 = 28,
    /// Interrogated by group 9 interrogation
    InterrogatedGroup9 = 29,
    /// Interrogated by group 10 interrogation
    InterrogatedGroup10 = 30,
    /// Interrogated by group 11 interrogation
    InterrogatedGroup11 = 31,
    /// Interrogated by group 12 interrogation
    InterrogatedGroup12 = 32,
    /// Interrogated by group 13 interrogation
    InterrogatedGroup13 = 33,
    /// Interrogated by group 14 interrogation
    InterrogatedGroup14 = 34,
    /// Interrogated by group 15 interrogation
    InterrogatedGroup15 = 35,
    /// Interrogated by group 16 interrogation
    InterrogatedGroup16 = 36,
    /// Requested by general counter request
    CounterGeneral = 37,
    /// Requested by group 1 counter request
    CounterGroup1 = 38,
    /// Requested by group 2 counter request
    CounterGroup2 = 39,
    /// Requested by group 3 counter request
    CounterGroup3 = 40,
    /// Requested by group 4 counter request
    CounterGroup4 = 41,
    /// Unknown type identification
    UnknownType = 44,
    /// Unknown cause of transmission
    UnknownCause = 45,
    /// Unknown common address of ASDU
    UnknownCommonAddress = 46,
    /// Unknown information object address
    UnknownAddress = 47,
}

impl Cause {
    /// Decode the low 6 bits of the COT octet.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value & 0x3F {
            1 => Ok(Self::Cyclic),
            2 => Ok(Self::Background),
            3 => Ok(Self::Spontaneous),
            4 => Ok(Self::Initialized),
            5 => Ok(Self::Request),
            6 => Ok(Self::Activation),
            7 => Ok(Self::ActivationConfirm),
            8 => Ok(Self::Deactivation),
            9 => Ok(Self::DeactivationConfirm),
            10 => Ok(Self::ActivationTerm),
            11 => Ok(Self::ReturnRemote),
            12 => Ok(Self::ReturnLocal),
            13 => Ok(Self::FileTransfer),
            n @ 20..=36 => {
                // 20 is the station interrogation, 21..=36 the groups.
                Ok(match n {
                    20 => Self::InterrogatedStation,
                    21 => Self::InterrogatedGroup1,
                    22 => Self::InterrogatedGroup2,
                    23 => Self::InterrogatedGroup3,
                    24 => Self::InterrogatedGroup4,
                    25 => Self::InterrogatedGroup5,
                    26 => Self::InterrogatedGroup6,
                    27 => Self::InterrogatedGroup7,
                    28 => Self::InterrogatedGroup8,
                    29 => Self::InterrogatedGroup9,
                    30 => Self::InterrogatedGroup10,
                    31 => Self::InterrogatedGroup11,
                    32 => Self::InterrogatedGroup12,
                    33 => Self::InterrogatedGroup13,
                    34 => Self::InterrogatedGroup14,
                    35 => Self::InterrogatedGroup15,
                    _ => Self::InterrogatedGroup16,
                })
            }
            37 => Ok(Self::CounterGeneral),
            38 => Ok(Self::CounterGroup1),
            39 => Ok(Self::CounterGroup2),
            40 => Ok(Self::CounterGroup3),
            41 => Ok(Self::CounterGroup4),
            44 => Ok(Self::UnknownType),
            45 => Ok(Self::UnknownCause),
            46 => Ok(Self::UnknownCommonAddress),
            47 => Ok(Self::UnknownAddress),
            _ => Err(MasterError::protocol_static("unknown cause of transmission")),
        }
    }

    /// Raw 6-bit value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for responses to a station or group interrogation (20..=36).
    #[inline]
    pub const fn is_interrogation_response(self) -> bool {
        matches!(self.as_u8(), 20..=36)
    }

    /// True for responses to a counter interrogation (37..=41).
    #[inline]
    pub const fn is_counter_response(self) -> bool {
        matches!(self.as_u8(), 37..=41)
    }

    /// True for the negative-acknowledge mirror causes (44..=47).
    #[inline]
    pub const fn is_unknown_mirror(self) -> bool {
        matches!(self.as_u8(), 44..=47)
    }

    /// Readable name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cyclic => "cyclic",
            Self::Background => "background scan",
            Self::Spontaneous => "spontaneous",
            Self::Initialized => "initialized",
            Self::Request => "request",
            Self::Activation => "activation",
            Self::ActivationConfirm => "activation confirm",
            Self::Deactivation => "deactivation",
            Self::DeactivationConfirm => "deactivation confirm",
            Self::ActivationTerm => "activation termination",
            Self::ReturnRemote => "return info (remote command)",
            Self::ReturnLocal => "return info (local command)",
            Self::FileTransfer => "file transfer",
            Self::InterrogatedStation => "interrogated by station",
            Self::InterrogatedGroup1 => "interrogated by group 1",
            Self::InterrogatedGroup2 => "interrogated by group 2",
            Self::InterrogatedGroup3 => "interrogated by group 3",
            Self::InterrogatedGroup4 => "interrogated by group 4",
            Self::InterrogatedGroup5 => "interrogated by group 5",
            Self::InterrogatedGroup6 => "interrogated by group 6",
            Self::InterrogatedGroup7 => "interrogated by group 7",
            Self::InterrogatedGroup8 => "interrogated by group 8",
            Self::InterrogatedGroup9 => "interrogated by group 9",
            Self::InterrogatedGroup10 => "interrogated by group 10",
            Self::InterrogatedGroup11 => "interrogated by group 11",
            Self::InterrogatedGroup12 => "interrogated by group 12",
            Self::InterrogatedGroup13 => "interrogated by group 13",
            Self::InterrogatedGroup14 => "interrogated by group 14",
            Self::InterrogatedGroup15 => "interrogated by group 15",
            Self::InterrogatedGroup16 => "interrogated by group 16",
            Self::CounterGeneral => "requested by general counter request",
            Self::CounterGroup1 => "requested by group 1 counter",
            Self::CounterGroup2 => "requested by group 2 counter",
            Self::CounterGroup3 => "requested by group 3 counter",
            Self::CounterGroup4 => "requested by group 4 counter",
            Self::UnknownType => "unknown type identification",
            Self::UnknownCause => "unknown cause of transmission",
            Self::UnknownCommonAddress => "unknown common address",
            Self::UnknownAddress => "unknown information object address",
        }
    }
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let values: Vec<u8> = (1..=13).chain(20..=41).chain(44..=47).collect();
        for v in values {
            let cause = Cause::from_u8(v).unwrap();
            assert_eq!(cause.as_u8(), v, "roundtrip failed for {v}");
        }
    }

    #[test]
    fn test_invalid_values() {
        for v in [0u8, 14, 15, 19, 42, 43, 48, 63] {
            assert!(Cause::from_u8(v).is_err(), "value {v} should be rejected");
        }
    }

    #[test]
    fn test_flag_bits_are_masked() {
        // P/N and T bits live above the cause and must not change decoding.
        assert_eq!(Cause::from_u8(0x46).unwrap(), Cause::Activation);
        assert_eq!(Cause::from_u8(0x83).unwrap(), Cause::Spontaneous);
        assert_eq!(Cause::from_u8(0xC7).unwrap(), Cause::ActivationConfirm);
    }

    #[test]
    fn test_classifiers() {
        assert!(Cause::InterrogatedStation.is_interrogation_response());
        assert!(Cause::InterrogatedGroup16.is_interrogation_response());
        assert!(!Cause::Spontaneous.is_interrogation_response());

        assert!(Cause::CounterGeneral.is_counter_response());
        assert!(Cause::CounterGroup4.is_counter_response());
        assert!(!Cause::InterrogatedStation.is_counter_response());

        assert!(Cause::UnknownType.is_unknown_mirror());
        assert!(Cause::UnknownAddress.is_unknown_mirror());
        assert!(!Cause::ActivationConfirm.is_unknown_mirror());
    }

    #[test]
    fn test_names() {
        assert_eq!(Cause::Activation.to_string(), "activation");
        assert_eq!(Cause::ActivationTerm.to_string(), "activation termination");
        assert_eq!(Cause::InterrogatedStation.to_string(), "interrogated by station");
    }
}
