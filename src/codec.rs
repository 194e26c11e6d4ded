//! APDU framing codec.
//!
//! Implements [`Decoder`]/[`Encoder`] so the frame layer is usable both by
//! the synchronous engine (which feeds its private reassembly buffer) and by
//! an async host wrapping a stream in `tokio_util::codec::Framed`.
//!
//! Receive framing: scan for the start byte, read the length octet, wait for
//! the complete APDU. Bytes ahead of a start byte are discarded with a
//! warning; a length octet outside 4..=253 is a framing error and the caller
//! is expected to drop the connection.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::MasterError;
use crate::types::{Apci, Asdu, UControl, MAX_APDU_LENGTH, MIN_APDU_LENGTH, START_BYTE};

/// A complete APDU: control information plus the ASDU carried by I-frames.
///
/// Decoded frames keep their wire bytes in `raw`. An I-frame whose type
/// identifier is outside the catalog decodes with `asdu` unset: the frame is
/// valid at the control layer and the raw bytes feed the host's raw-APDU
/// hook.
#[derive(Debug, Clone, PartialEq)]
pub struct Apdu {
    /// Control field
    pub apci: Apci,
    /// Payload, present on I-format frames with a supported type
    pub asdu: Option<Asdu>,
    /// Wire bytes as received; empty on locally built frames
    pub raw: Bytes,
}

impl Apdu {
    /// I-format APDU carrying an ASDU.
    pub fn information(send_seq: u16, recv_seq: u16, asdu: Asdu) -> Self {
        Self {
            apci: Apci::i(send_seq, recv_seq),
            asdu: Some(asdu),
            raw: Bytes::new(),
        }
    }

    /// S-format acknowledgement.
    pub fn supervisory(recv_seq: u16) -> Self {
        Self {
            apci: Apci::s(recv_seq),
            asdu: None,
            raw: Bytes::new(),
        }
    }

    /// U-format control frame.
    pub fn unnumbered(control: UControl) -> Self {
        Self {
            apci: Apci::u(control),
            asdu: None,
            raw: Bytes::new(),
        }
    }
}

impl std::fmt::Display for Apdu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.apci)?;
        if let Some(asdu) = &self.asdu {
            write!(f, " {asdu}")?;
        }
        Ok(())
    }
}

/// Hex dump of a frame for the TX/RX logs.
///
/// Renders space-separated uppercase octets, e.g. `68 04 07 00 00 00`.
pub struct HexFrame<'a>(pub &'a [u8]);

impl std::fmt::Display for HexFrame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        for byte in self.0 {
            write!(f, "{sep}{byte:02X}")?;
            sep = " ";
        }
        Ok(())
    }
}

/// Frame codec holding the partial-frame state between reads.
#[derive(Debug, Clone, Default)]
pub struct ApduCodec {
    state: DecodeState,
}

#[derive(Debug, Clone, Copy, Default)]
enum DecodeState {
    #[default]
    Start,
    Length,
    Body {
        length: usize,
    },
}

impl ApduCodec {
    /// Fresh codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any partial-frame state (used when a connection is torn down).
    pub fn reset(&mut self) {
        self.state = DecodeState::Start;
    }
}

impl Decoder for ApduCodec {
    type Item = Apdu;
    type Error = MasterError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Apdu>, MasterError> {
        loop {
            match self.state {
                DecodeState::Start => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    if src[0] != START_BYTE {
                        match src.iter().position(|&b| b == START_BYTE) {
                            Some(pos) => {
                                warn!(discarded = pos, "skipping bytes ahead of start byte");
                                src.advance(pos);
                            }
                            None => {
                                warn!(discarded = src.len(), "no start byte in received data");
                                src.clear();
                                return Ok(None);
                            }
                        }
                    }
                    self.state = DecodeState::Length;
                }

                DecodeState::Length => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    let length = src[1] as usize;
                    if !(MIN_APDU_LENGTH..=MAX_APDU_LENGTH).contains(&length) {
                        self.state = DecodeState::Start;
                        return Err(MasterError::framing(format!(
                            "APDU length {length} outside {MIN_APDU_LENGTH}..={MAX_APDU_LENGTH}"
                        )));
                    }
                    self.state = DecodeState::Body { length };
                }

                DecodeState::Body { length } => {
                    let total = 2 + length;
                    if src.len() < total {
                        return Ok(None);
                    }
                    let frame = src.split_to(total).freeze();
                    self.state = DecodeState::Start;

                    let apci = Apci::parse(&frame[2..6])?;
                    let asdu = if apci.is_information() {
                        if frame.len() <= 6 {
                            return Err(MasterError::framing_static("I-frame without ASDU"));
                        }
                        match Asdu::parse(frame.slice(6..)) {
                            Ok(asdu) => Some(asdu),
                            Err(MasterError::UnsupportedTypeId(type_id)) => {
                                warn!(type_id, "ASDU type outside catalog");
                                None
                            }
                            Err(err) => return Err(err),
                        }
                    } else {
                        if frame.len() > 6 {
                            return Err(MasterError::framing_static(
                                "payload on S- or U-format frame",
                            ));
                        }
                        None
                    };

                    return Ok(Some(Apdu { apci, asdu, raw: frame }));
                }
            }
        }
    }
}

impl Encoder<Apdu> for ApduCodec {
    type Error = MasterError;

    fn encode(&mut self, item: Apdu, dst: &mut BytesMut) -> Result<(), MasterError> {
        let asdu_len = item.asdu.as_ref().map_or(0, Asdu::encoded_len);
        let apdu_len = 4 + asdu_len;
        if apdu_len > MAX_APDU_LENGTH {
            return Err(MasterError::framing_static("ASDU too large for one APDU"));
        }

        dst.reserve(2 + apdu_len);
        dst.extend_from_slice(&[START_BYTE, apdu_len as u8]);
        dst.extend_from_slice(&item.apci.encode());
        if let Some(asdu) = &item.asdu {
            asdu.encode_to(dst);
        }
        Ok(())
    }
}
