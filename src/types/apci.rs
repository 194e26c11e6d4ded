//! APCI: the four control octets heading every APDU.
//!
//! The low two bits of control octet 1 classify the frame: I-format
//! (bit 0 clear) carries both sequence numbers and an ASDU, S-format (01)
//! acknowledges only, U-format (11) carries one of six control actions.

use crate::error::{MasterError, Result};

/// APDU start byte.
pub const START_BYTE: u8 = 0x68;

/// Smallest legal value of the APDU length octet (four control octets).
pub const MIN_APDU_LENGTH: usize = 4;

/// Largest legal value of the APDU length octet.
pub const MAX_APDU_LENGTH: usize = 253;

/// Sequence numbers are 15 bits wide.
pub const SEQ_MODULO: u16 = 1 << 15;

/// The six U-format control actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UControl {
    /// STARTDT act
    StartDtAct,
    /// STARTDT con
    StartDtCon,
    /// STOPDT act
    StopDtAct,
    /// STOPDT con
    StopDtCon,
    /// TESTFR act
    TestFrAct,
    /// TESTFR con
    TestFrCon,
}

impl UControl {
    /// Value of control octet 1 for this action.
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::StartDtAct => 0x07,
            Self::StartDtCon => 0x0B,
            Self::StopDtAct => 0x13,
            Self::StopDtCon => 0x23,
            Self::TestFrAct => 0x43,
            Self::TestFrCon => 0x83,
        }
    }

    /// Classify control octet 1; anything outside the six defined values is
    /// an [`MasterError::UnknownControl`].
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x07 => Ok(Self::StartDtAct),
            0x0B => Ok(Self::StartDtCon),
            0x13 => Ok(Self::StopDtAct),
            0x23 => Ok(Self::StopDtCon),
            0x43 => Ok(Self::TestFrAct),
            0x83 => Ok(Self::TestFrCon),
            other => Err(MasterError::UnknownControl(other)),
        }
    }

    /// Readable name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::StartDtAct => "STARTDT act",
            Self::StartDtCon => "STARTDT con",
            Self::StopDtAct => "STOPDT act",
            Self::StopDtCon => "STOPDT con",
            Self::TestFrAct => "TESTFR act",
            Self::TestFrCon => "TESTFR con",
        }
    }
}

/// Decoded control field of an APDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    /// Information transfer: N(S), N(R) and exactly one ASDU
    I { send_seq: u16, recv_seq: u16 },
    /// Supervisory acknowledgement: N(R) only
    S { recv_seq: u16 },
    /// Unnumbered control action
    U(UControl),
}

impl Apci {
    /// I-format control field.
    #[inline]
    pub const fn i(send_seq: u16, recv_seq: u16) -> Self {
        Self::I { send_seq, recv_seq }
    }

    /// S-format control field.
    #[inline]
    pub const fn s(recv_seq: u16) -> Self {
        Self::S { recv_seq }
    }

    /// U-format control field.
    #[inline]
    pub const fn u(control: UControl) -> Self {
        Self::U(control)
    }

    /// Classify and decode four control octets.
    pub fn parse(control: &[u8]) -> Result<Self> {
        if control.len() < 4 {
            return Err(MasterError::framing_static("control field truncated"));
        }
        let c1 = control[0];
        if c1 & 0x01 == 0 {
            Ok(Self::I {
                send_seq: (control[1] as u16) << 7 | (c1 >> 1) as u16,
                recv_seq: (control[3] as u16) << 7 | (control[2] >> 1) as u16,
            })
        } else if c1 & 0x03 == 0x01 {
            Ok(Self::S {
                recv_seq: (control[3] as u16) << 7 | (control[2] >> 1) as u16,
            })
        } else {
            Ok(Self::U(UControl::from_u8(c1)?))
        }
    }

    /// Encode the four control octets.
    pub fn encode(&self) -> [u8; 4] {
        match *self {
            Self::I { send_seq, recv_seq } => [
                (send_seq << 1) as u8,
                (send_seq >> 7) as u8,
                (recv_seq << 1) as u8,
                (recv_seq >> 7) as u8,
            ],
            Self::S { recv_seq } => [0x01, 0x00, (recv_seq << 1) as u8, (recv_seq >> 7) as u8],
            Self::U(control) => [control.as_u8(), 0x00, 0x00, 0x00],
        }
    }

    /// N(S) carried by an I-format frame.
    #[inline]
    pub const fn send_seq(&self) -> Option<u16> {
        match self {
            Self::I { send_seq, .. } => Some(*send_seq),
            _ => None,
        }
    }

    /// N(R) carried by an I- or S-format frame.
    #[inline]
    pub const fn recv_seq(&self) -> Option<u16> {
        match self {
            Self::I { recv_seq, .. } | Self::S { recv_seq } => Some(*recv_seq),
            _ => None,
        }
    }

    /// True for I-format.
    #[inline]
    pub const fn is_information(&self) -> bool {
        matches!(self, Self::I { .. })
    }
}

impl std::fmt::Display for Apci {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I { send_seq, recv_seq } => write!(f, "I(S={send_seq}, R={recv_seq})"),
            Self::S { recv_seq } => write!(f, "S(R={recv_seq})"),
            Self::U(control) => write!(f, "U({})", control.name()),
        }
    }
}
