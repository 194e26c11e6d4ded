//! ASDU structure: variable structure qualifier, object address and the
//! six-octet data unit identifier.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{MasterError, Result};
use crate::types::cot::Cause;
use crate::types::type_id::TypeId;

/// Variable structure qualifier: object count in the low 7 bits, SQ in bit 7.
///
/// With SQ set, one IOA is transmitted and the remaining objects take
/// consecutive addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vsq {
    /// Number of information objects (1..=127)
    pub count: u8,
    /// SQ: consecutive addressing
    pub sequence: bool,
}

impl Vsq {
    /// Construct from count and SQ flag.
    #[inline]
    pub const fn new(count: u8, sequence: bool) -> Self {
        Self { count, sequence }
    }

    /// Decode the VSQ octet.
    #[inline]
    pub const fn from_u8(byte: u8) -> Self {
        Self {
            count: byte & 0x7F,
            sequence: byte & 0x80 != 0,
        }
    }

    /// Encode the VSQ octet.
    #[inline]
    pub const fn as_u8(&self) -> u8 {
        (self.count & 0x7F) | if self.sequence { 0x80 } else { 0 }
    }
}

/// Information object address: 24 bits on the wire, little-endian.
///
/// All 24 bits are accepted and preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ioa(pub u32);

impl Ioa {
    /// Wire size in bytes.
    pub const SIZE: usize = 3;

    /// Keep the low 24 bits.
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value & 0x00FF_FFFF)
    }

    /// Decode three little-endian bytes.
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(MasterError::invalid_asdu_static("IOA truncated"));
        }
        Ok(Self(
            bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16,
        ))
    }

    /// Append the three address bytes to a buffer.
    #[inline]
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8((self.0 & 0xFF) as u8);
        buf.put_u8((self.0 >> 8 & 0xFF) as u8);
        buf.put_u8((self.0 >> 16 & 0xFF) as u8);
    }

    /// Raw address value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Ioa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The six-octet data unit identifier heading every ASDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsduHeader {
    /// Type identifier
    pub type_id: TypeId,
    /// Variable structure qualifier
    pub vsq: Vsq,
    /// Cause of transmission (low 6 bits of the COT octet)
    pub cause: Cause,
    /// P/N bit: negative confirmation
    pub negative: bool,
    /// T bit: test
    pub test: bool,
    /// Originator address
    pub originator: u8,
    /// Common address of ASDU, little-endian 16 bits
    pub common_address: u16,
}

impl AsduHeader {
    /// Wire size in bytes.
    pub const SIZE: usize = 6;

    /// Header for `count` objects with individual addressing.
    pub fn new(type_id: TypeId, count: u8, cause: Cause, common_address: u16) -> Self {
        Self {
            type_id,
            vsq: Vsq::new(count, false),
            cause,
            negative: false,
            test: false,
            originator: 0,
            common_address,
        }
    }

    /// Decode the six identifier octets.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(MasterError::invalid_asdu_static("ASDU identifier truncated"));
        }
        Ok(Self {
            type_id: TypeId::from_u8(data[0])?,
            vsq: Vsq::from_u8(data[1]),
            cause: Cause::from_u8(data[2])?,
            negative: data[2] & 0x40 != 0,
            test: data[2] & 0x80 != 0,
            originator: data[3],
            common_address: u16::from_le_bytes([data[4], data[5]]),
        })
    }

    /// Append the six identifier octets to a buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.type_id.as_u8());
        buf.put_u8(self.vsq.as_u8());
        buf.put_u8(
            self.cause.as_u8()
                | if self.negative { 0x40 } else { 0 }
                | if self.test { 0x80 } else { 0 },
        );
        buf.put_u8(self.originator);
        buf.put_u16_le(self.common_address);
    }
}

/// A raw ASDU: the identifier plus the undecoded object section.
///
/// Object decoding into [`crate::InformationObject`]s is the parser's job;
/// keeping the body as [`Bytes`] lets unsupported types pass through to the
/// raw-APDU hook untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Asdu {
    /// Data unit identifier
    pub header: AsduHeader,
    /// Object section (IOAs and per-type payloads)
    pub body: Bytes,
}

impl Asdu {
    /// Assemble from parts.
    pub fn new(header: AsduHeader, body: Bytes) -> Self {
        Self { header, body }
    }

    /// Decode identifier + body from the bytes following the APCI.
    pub fn parse(data: Bytes) -> Result<Self> {
        let header = AsduHeader::parse(&data)?;
        Ok(Self {
            header,
            body: data.slice(AsduHeader::SIZE..),
        })
    }

    /// Append identifier and body to a buffer.
    pub fn encode_to(&self, buf: &mut BytesMut) {
        self.header.encode(buf);
        buf.put_slice(&self.body);
    }

    /// Encoded size in bytes.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        AsduHeader::SIZE + self.body.len()
    }
}

impl std::fmt::Display for Asdu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} n={}{} cot={}{} CA={}",
            self.header.type_id,
            self.header.vsq.count,
            if self.header.vsq.sequence { " SQ" } else { "" },
            self.header.cause,
            if self.header.negative { " NEG" } else { "" },
            self.header.common_address
        )
    }
}
