// ABOUTME: Semi-octet phone number addresses (TP-DA, TP-OA and SMSC) with type-of-number handling
// ABOUTME: Preserves the international/national distinction across encode and decode

use crate::codec::{self, DecodeError, EncodeError, MAX_ADDRESS_DIGITS};
use crate::datatypes::gsm7;
use crate::datatypes::{NumericPlanIndicator, TypeOfNumber};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// A phone number (or alphanumeric sender id) as carried in a PDU address field
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PhoneNumber {
    digits: String,
    ton: TypeOfNumber,
    npi: NumericPlanIndicator,
}

impl PhoneNumber {
    /// Parses a dialable number. A leading `+` marks it international;
    /// spaces and dashes are ignored. Digits, `*` and `#` are accepted.
    pub fn parse(number: &str) -> Result<Self, EncodeError> {
        let number = number.trim();
        let (ton, rest) = match number.strip_prefix('+') {
            Some(rest) => (TypeOfNumber::International, rest),
            None => (TypeOfNumber::Unknown, number),
        };

        let digits: String = rest.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        if digits.is_empty() {
            return Err(EncodeError::EmptyRecipient);
        }
        if let Some(c) = digits.chars().find(|c| semi_octet_for(*c).is_none()) {
            return Err(EncodeError::InvalidAddress(c));
        }
        if digits.len() > MAX_ADDRESS_DIGITS {
            return Err(EncodeError::AddressTooLong(digits.len()));
        }

        Ok(Self {
            digits,
            ton,
            npi: NumericPlanIndicator::Isdn,
        })
    }

    /// Digits (or alphanumeric text) without any `+` prefix
    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn type_of_number(&self) -> TypeOfNumber {
        self.ton
    }

    pub fn numeric_plan(&self) -> NumericPlanIndicator {
        self.npi
    }

    pub fn is_international(&self) -> bool {
        self.ton == TypeOfNumber::International
    }

    /// Type-of-address octet: extension bit, TON, NPI
    pub fn type_of_address(&self) -> u8 {
        0x80 | ((self.ton as u8) << 4) | (self.npi as u8)
    }

    /// Encodes the address as a TP-DA / TP-OA field:
    /// semi-octet count, type of address, swapped digits.
    pub fn encode(&self, buf: &mut BytesMut) {
        if self.ton == TypeOfNumber::Alphanumeric {
            let septets: Vec<u8> = self
                .digits
                .chars()
                .filter_map(gsm7::septets_for)
                .flat_map(|s| {
                    let mut out = Vec::with_capacity(2);
                    s.push_to(&mut out);
                    out
                })
                .collect();
            let packed = gsm7::pack(&septets, 0);
            buf.put_u8((septets.len() * 7).div_ceil(4) as u8);
            buf.put_u8(self.type_of_address());
            buf.put_slice(&packed);
            return;
        }

        buf.put_u8(self.digits.len() as u8);
        buf.put_u8(self.type_of_address());
        buf.put_slice(&encode_semi_octets(&self.digits));
    }

    /// Decodes a TP-OA / TP-DA field
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, DecodeError> {
        let length = codec::decode_u8(buf, "address length")? as usize;
        let toa = codec::decode_u8(buf, "type of address")?;
        let octets = codec::decode_bytes(buf, length.div_ceil(2), "address digits")?;
        let ton = TypeOfNumber::from_type_of_address(toa);
        let npi = NumericPlanIndicator::from_type_of_address(toa);

        let digits = if ton == TypeOfNumber::Alphanumeric {
            let septets = gsm7::unpack(&octets, 0, length * 4 / 7)
                .ok_or(DecodeError::Truncated("alphanumeric address"))?;
            gsm7::from_septets(&septets)
        } else {
            decode_semi_octets(&octets, "address digits")?
        };

        Ok(Self { digits, ton, npi })
    }

    /// Decodes the SMSC information prefix. A zero length means the modem
    /// omitted it.
    pub fn decode_smsc(buf: &mut Cursor<&[u8]>) -> Result<Option<Self>, DecodeError> {
        let length = codec::decode_u8(buf, "SMSC length")? as usize;
        if length == 0 {
            return Ok(None);
        }
        let toa = codec::decode_u8(buf, "SMSC type of address")?;
        let octets = codec::decode_bytes(buf, length - 1, "SMSC digits")?;

        Ok(Some(Self {
            digits: decode_semi_octets(&octets, "SMSC digits")?,
            ton: TypeOfNumber::from_type_of_address(toa),
            npi: NumericPlanIndicator::from_type_of_address(toa),
        }))
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_international() {
            write!(f, "+{}", self.digits)
        } else {
            write!(f, "{}", self.digits)
        }
    }
}

fn semi_octet_for(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        '*' => Some(0x0A),
        '#' => Some(0x0B),
        'a' => Some(0x0C),
        'b' => Some(0x0D),
        'c' => Some(0x0E),
        _ => None,
    }
}

fn char_for(nibble: u8) -> Option<char> {
    match nibble {
        0..=9 => Some((b'0' + nibble) as char),
        0x0A => Some('*'),
        0x0B => Some('#'),
        0x0C => Some('a'),
        0x0D => Some('b'),
        0x0E => Some('c'),
        _ => None,
    }
}

/// Swap digit pairs into octets, padding an odd count with the `F` filler
fn encode_semi_octets(digits: &str) -> Vec<u8> {
    let nibbles: Vec<u8> = digits.chars().filter_map(semi_octet_for).collect();
    nibbles
        .chunks(2)
        .map(|pair| {
            let low = pair[0];
            let high = pair.get(1).copied().unwrap_or(0x0F);
            (high << 4) | low
        })
        .collect()
}

fn decode_semi_octets(octets: &[u8], field: &'static str) -> Result<String, DecodeError> {
    let mut digits = String::with_capacity(octets.len() * 2);
    for (i, octet) in octets.iter().enumerate() {
        for nibble in [octet & 0x0F, octet >> 4] {
            match char_for(nibble) {
                Some(c) => digits.push(c),
                // filler, only valid in the final high nibble
                None if nibble == 0x0F && i == octets.len() - 1 => {}
                None => return Err(DecodeError::InvalidSemiOctet { nibble, field }),
            }
        }
    }
    Ok(digits)
}
