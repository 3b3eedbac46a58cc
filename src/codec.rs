// ABOUTME: SMS PDU codec errors plus the low-level hex and cursor helpers shared by encoder and decoder
// ABOUTME: Keeps wire-format failures separate from serial session failures so callers can recover locally

use bytes::{Buf, Bytes};
use std::io::Cursor;
use thiserror::Error;

/// Maximum number of digits allowed in a TP-DA / TP-OA address (3GPP 23.040 9.1.2.5)
pub const MAX_ADDRESS_DIGITS: usize = 20;

/// Maximum number of parts a concatenated message may be split into
pub const MAX_PARTS: usize = 255;

/// Errors raised while building outbound SMS-SUBMIT PDUs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Recipient number is empty")]
    EmptyRecipient,

    #[error("Invalid character {0:?} in recipient number")]
    InvalidAddress(char),

    #[error("Recipient number has {0} digits, at most 20 are allowed")]
    AddressTooLong(usize),

    #[error("Character {0:?} cannot be encoded as UCS2")]
    UnsupportedCharacter(char),

    #[error("Message needs {0} parts, at most 255 are allowed")]
    TooManyParts(usize),
}

/// Errors raised while parsing a received PDU line
///
/// Everything except `UnsupportedPduType` describes a malformed PDU: bad hex
/// parity, truncated fields or values outside what 3GPP 23.040 allows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("PDU hex string has odd length {0}")]
    OddLength(usize),

    #[error("Invalid hex character {character:?} at index {index}")]
    InvalidHex { character: char, index: usize },

    #[error("PDU truncated while reading {0}")]
    Truncated(&'static str),

    #[error("Invalid semi-octet {nibble:#x} in {field}")]
    InvalidSemiOctet { nibble: u8, field: &'static str },

    #[error("Invalid service centre timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unrecognized data coding scheme {0:#04x}")]
    UnrecognizedDcs(u8),

    #[error("Unsupported PDU type (TP-MTI {0:#04b})")]
    UnsupportedPduType(u8),
}

impl DecodeError {
    /// True when the input itself is broken rather than merely of a type we do not handle
    pub fn is_malformed(&self) -> bool {
        !matches!(self, DecodeError::UnsupportedPduType(_))
    }
}

/// Decode a PDU line (surrounding whitespace ignored) into raw octets
pub fn decode_hex(line: &str) -> Result<Vec<u8>, DecodeError> {
    let line = line.trim();
    hex::decode(line).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { c, index } => DecodeError::InvalidHex {
            character: c,
            index,
        },
        _ => DecodeError::OddLength(line.len()),
    })
}

/// Encode octets as the uppercase hex the modem expects after `AT+CMGS`
pub fn encode_hex(octets: &[u8]) -> String {
    hex::encode_upper(octets)
}

/// Decode a single octet
pub fn decode_u8(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<u8, DecodeError> {
    if buf.remaining() < 1 {
        return Err(DecodeError::Truncated(field));
    }
    Ok(buf.get_u8())
}

/// Decode `len` octets
pub fn decode_bytes(
    buf: &mut Cursor<&[u8]>,
    len: usize,
    field: &'static str,
) -> Result<Bytes, DecodeError> {
    if buf.remaining() < len {
        return Err(DecodeError::Truncated(field));
    }
    Ok(buf.copy_to_bytes(len))
}

/// Decode one nibble-swapped BCD octet into its two-digit value (00-99)
pub fn decode_swapped_bcd(octet: u8, field: &'static str) -> Result<u8, DecodeError> {
    let tens = octet & 0x0F;
    let units = octet >> 4;
    for nibble in [tens, units] {
        if nibble > 9 {
            return Err(DecodeError::InvalidSemiOctet { nibble, field });
        }
    }
    Ok(tens * 10 + units)
}

/// Encode a two-digit value (00-99) as a nibble-swapped BCD octet
pub fn encode_swapped_bcd(value: u8) -> u8 {
    let value = value % 100;
    ((value % 10) << 4) | (value / 10)
}
