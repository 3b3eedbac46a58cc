// ABOUTME: User data header parsing and encoding, focused on the concatenated-message elements
// ABOUTME: Reference, total and sequence travel together in one Concatenation value or not at all

use crate::codec::DecodeError;
use bytes::{BufMut, Bytes, BytesMut};

/// Concatenated short message, 8-bit reference number
pub const IEI_CONCAT_8BIT: u8 = 0x00;
/// Concatenated short message, 16-bit reference number
pub const IEI_CONCAT_16BIT: u8 = 0x08;

/// Position of one part within a concatenated message
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Concatenation {
    pub reference: u16,
    pub total: u8,
    /// 1-based
    pub sequence: u8,
}

impl Concatenation {
    /// Returns `None` for the combinations 3GPP 23.040 says to ignore:
    /// a zero total, or a sequence of zero or beyond the total.
    pub fn new(reference: u16, total: u8, sequence: u8) -> Option<Self> {
        (total > 0 && sequence > 0 && sequence <= total).then_some(Self {
            reference,
            total,
            sequence,
        })
    }
}

/// Information element other than concatenation, kept verbatim
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InformationElement {
    pub identifier: u8,
    pub data: Bytes,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct UserDataHeader {
    pub concatenation: Option<Concatenation>,
    pub other: Vec<InformationElement>,
}

impl UserDataHeader {
    pub fn concatenated(concatenation: Concatenation) -> Self {
        Self {
            concatenation: Some(concatenation),
            other: Vec::new(),
        }
    }

    /// Length in octets including the leading UDHL octet
    pub fn encoded_len(&self) -> usize {
        1 + self.elements_len()
    }

    fn elements_len(&self) -> usize {
        let concat = match self.concatenation {
            Some(c) if c.reference > 0xFF => 6,
            Some(_) => 5,
            None => 0,
        };
        concat + self.other.iter().map(|ie| 2 + ie.data.len()).sum::<usize>()
    }

    /// Writes UDHL followed by every information element
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.elements_len() as u8);
        if let Some(c) = self.concatenation {
            if c.reference > 0xFF {
                buf.put_u8(IEI_CONCAT_16BIT);
                buf.put_u8(4);
                buf.put_u16(c.reference);
            } else {
                buf.put_u8(IEI_CONCAT_8BIT);
                buf.put_u8(3);
                buf.put_u8(c.reference as u8);
            }
            buf.put_u8(c.total);
            buf.put_u8(c.sequence);
        }
        for ie in &self.other {
            buf.put_u8(ie.identifier);
            buf.put_u8(ie.data.len() as u8);
            buf.put_slice(&ie.data);
        }
    }

    /// Parses the header at the start of the user data. Returns the header
    /// and the number of octets it occupies (UDHL + 1).
    pub fn decode(user_data: &[u8]) -> Result<(Self, usize), DecodeError> {
        let udhl = *user_data
            .first()
            .ok_or(DecodeError::Truncated("user data header length"))? as usize;
        let elements = user_data
            .get(1..1 + udhl)
            .ok_or(DecodeError::Truncated("user data header"))?;

        let mut header = UserDataHeader::default();
        let mut rest = elements;
        while !rest.is_empty() {
            let [identifier, len, tail @ ..] = rest else {
                return Err(DecodeError::Truncated("information element"));
            };
            let len = *len as usize;
            let data = tail
                .get(..len)
                .ok_or(DecodeError::Truncated("information element data"))?;

            match (*identifier, data) {
                (IEI_CONCAT_8BIT, [reference, total, sequence]) => {
                    header.concatenation =
                        Concatenation::new(u16::from(*reference), *total, *sequence);
                }
                (IEI_CONCAT_16BIT, [hi, lo, total, sequence]) => {
                    header.concatenation =
                        Concatenation::new(u16::from_be_bytes([*hi, *lo]), *total, *sequence);
                }
                _ => header.other.push(InformationElement {
                    identifier: *identifier,
                    data: Bytes::copy_from_slice(data),
                }),
            }
            rest = &tail[len..];
        }

        Ok((header, 1 + udhl))
    }
}
