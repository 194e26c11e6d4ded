//! Error types for the IEC 60870-5-104 master engine.

use std::borrow::Cow;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, MasterError>;

/// IEC 60870-5-104 master error kinds.
///
/// Uses `Cow<'static, str>` payloads so static messages allocate nothing.
#[derive(Debug, Error)]
pub enum MasterError {
    /// TCP closed under us or a send failed
    #[error("transport down: {0}")]
    TransportDown(Cow<'static, str>),

    /// Not connected (or STARTDT not confirmed)
    #[error("not connected")]
    NotConnected,

    /// Bad start byte, length out of range, or truncated APDU
    #[error("framing error: {0}")]
    Framing(Cow<'static, str>),

    /// Received N(S) does not match V(R) while order checking is on
    #[error("sequence violation: expected N(S)={expected}, got {actual}")]
    SequenceViolation { expected: u16, actual: u16 },

    /// U-format control octet outside the six defined values
    #[error("unknown U-format control octet: 0x{0:02X}")]
    UnknownControl(u8),

    /// ASDU type identifier not in the catalog
    #[error("unsupported type identifier: {0}")]
    UnsupportedTypeId(u8),

    /// Declared object count does not match the payload length for the TI
    #[error("payload mismatch for TI {type_id}: expected {expected} bytes, got {actual}")]
    PayloadMismatch {
        type_id: u8,
        expected: usize,
        actual: usize,
    },

    /// k unacknowledged I-frames outstanding, send refused
    #[error("send window exhausted (k={0})")]
    WindowExhausted(u16),

    /// No ACTCONFIRM for a command within the supervision time
    #[error("command timed out (IOA {0})")]
    CommandTimeout(u32),

    /// No ACTTERM for a general interrogation within the retry time
    #[error("general interrogation timed out")]
    GiTimeout,

    /// Violation of the APCI/ASDU rules not covered by a more specific kind
    #[error("protocol error: {0}")]
    Protocol(Cow<'static, str>),

    /// Invalid ASDU structure
    #[error("invalid ASDU: {0}")]
    InvalidAsdu(Cow<'static, str>),

    /// I/O error from the transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MasterError {
    /// Framing error with a static message (zero allocation).
    #[inline]
    pub const fn framing_static(msg: &'static str) -> Self {
        Self::Framing(Cow::Borrowed(msg))
    }

    /// Framing error with a dynamic message.
    #[inline]
    pub fn framing(msg: impl Into<String>) -> Self {
        Self::Framing(Cow::Owned(msg.into()))
    }

    /// Protocol error with a static message (zero allocation).
    #[inline]
    pub const fn protocol_static(msg: &'static str) -> Self {
        Self::Protocol(Cow::Borrowed(msg))
    }

    /// Protocol error with a dynamic message.
    #[inline]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(Cow::Owned(msg.into()))
    }

    /// Invalid-ASDU error with a static message (zero allocation).
    #[inline]
    pub const fn invalid_asdu_static(msg: &'static str) -> Self {
        Self::InvalidAsdu(Cow::Borrowed(msg))
    }

    /// Transport-down error with a static message.
    #[inline]
    pub const fn transport_static(msg: &'static str) -> Self {
        Self::TransportDown(Cow::Borrowed(msg))
    }

    /// True if this error must terminate the connection: framing, sequence,
    /// unknown control, payload mismatch and transport loss are fatal.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TransportDown(_)
                | Self::Framing(_)
                | Self::SequenceViolation { .. }
                | Self::UnknownControl(_)
                | Self::PayloadMismatch { .. }
                | Self::Protocol(_)
                | Self::InvalidAsdu(_)
                | Self::Io(_)
        )
    }

    /// True if the error is local to a single ASDU or send attempt and the
    /// connection survives it.
    #[inline]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedTypeId(_)
                | Self::WindowExhausted(_)
                | Self::CommandTimeout(_)
                | Self::GiTimeout
                | Self::NotConnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MasterError::NotConnected;
        assert_eq!(err.to_string(), "not connected");

        let err = MasterError::UnsupportedTypeId(250);
        assert_eq!(err.to_string(), "unsupported type identifier: 250");

        let err = MasterError::SequenceViolation {
            expected: 3,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "sequence violation: expected N(S)=3, got 5"
        );

        let err = MasterError::UnknownControl(0x21);
        assert_eq!(err.to_string(), "unknown U-format control octet: 0x21");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(MasterError::framing_static("short").is_fatal());
        assert!(MasterError::SequenceViolation { expected: 0, actual: 1 }.is_fatal());
        assert!(MasterError::UnknownControl(0xFF).is_fatal());
        assert!(
            MasterError::PayloadMismatch { type_id: 13, expected: 8, actual: 5 }.is_fatal()
        );
        assert!(MasterError::transport_static("peer closed").is_fatal());

        assert!(!MasterError::UnsupportedTypeId(200).is_fatal());
        assert!(!MasterError::WindowExhausted(12).is_fatal());
    }

    #[test]
    fn test_local_classification() {
        assert!(MasterError::UnsupportedTypeId(200).is_local());
        assert!(MasterError::WindowExhausted(12).is_local());
        assert!(MasterError::CommandTimeout(100).is_local());
        assert!(MasterError::GiTimeout.is_local());

        assert!(!MasterError::framing_static("bad length").is_local());
        assert!(!MasterError::protocol_static("unexpected STARTDT con").is_local());
    }

    #[test]
    fn test_io_error_conversion() {
        use std::io::{Error as IoError, ErrorKind};
        let io_err = IoError::new(ErrorKind::BrokenPipe, "broken pipe");
        let err: MasterError = io_err.into();
        assert!(err.is_fatal());
        match err {
            MasterError::Io(e) => assert_eq!(e.kind(), ErrorKind::BrokenPipe),
            other => panic!("expected Io variant, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_mismatch_display() {
        let err = MasterError::PayloadMismatch {
            type_id: 13,
            expected: 8,
            actual: 6,
        };
        let text = err.to_string();
        assert!(text.contains("TI 13"));
        assert!(text.contains('8'));
        assert!(text.contains('6'));
    }
}
