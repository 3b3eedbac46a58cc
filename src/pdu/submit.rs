// ABOUTME: SMS-SUBMIT encoding: alphabet selection, concatenation splitting and TPDU construction
// ABOUTME: Produces the hex PDUs and TPDU lengths the modem expects for AT+CMGS

use crate::codec::{self, EncodeError, MAX_PARTS};
use crate::datatypes::gsm7::{self, Septets};
use crate::datatypes::{Alphabet, Concatenation, DataCoding, PhoneNumber, UserDataHeader};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

/// TP-MTI = SMS-SUBMIT, TP-VPF = relative
const FIRST_OCTET: u8 = 0x11;
/// TP-UDHI, set when the user data starts with a header
const UDHI: u8 = 0x40;
/// Relative validity period of four days
pub const DEFAULT_VALIDITY_PERIOD: u8 = 0xAA;

/// An SMS waiting to be sent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundSms {
    pub to: String,
    pub text: String,
}

impl OutboundSms {
    pub fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            text: text.into(),
        }
    }

    /// Alphabet the encoder will pick for this text
    pub fn alphabet(&self) -> Result<Alphabet, EncodeError> {
        choose_alphabet(&self.text)
    }
}

/// One encoded SMS-SUBMIT, ready for `AT+CMGS`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PduPart {
    octets: Bytes,
    /// 1-based position within the message
    pub sequence: u8,
    pub total: u8,
}

impl PduPart {
    /// Full PDU including the leading SMSC length octet
    pub fn octets(&self) -> &[u8] {
        &self.octets
    }

    /// Uppercase hex for transmission
    pub fn hex(&self) -> String {
        codec::encode_hex(&self.octets)
    }

    /// Octets after the SMSC length byte, the `AT+CMGS` argument
    pub fn tpdu_len(&self) -> usize {
        self.octets.len() - 1
    }
}

/// Text of one part before it is packed
enum Chunk {
    Septets(Vec<u8>),
    Ucs2(Vec<u16>),
}

/// Builds SMS-SUBMIT PDUs. Holds the concatenation reference counter, so
/// one encoder should be shared by everything sending through a modem.
#[derive(Debug)]
pub struct PduEncoder {
    next_reference: AtomicU8,
    validity_period: u8,
}

impl Default for PduEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PduEncoder {
    pub fn new() -> Self {
        Self {
            next_reference: AtomicU8::new(0),
            validity_period: DEFAULT_VALIDITY_PERIOD,
        }
    }

    /// Start the reference counter somewhere other than zero
    pub fn with_initial_reference(mut self, reference: u8) -> Self {
        self.next_reference = AtomicU8::new(reference);
        self
    }

    /// Override the relative TP-VP octet
    pub fn with_validity_period(mut self, validity_period: u8) -> Self {
        self.validity_period = validity_period;
        self
    }

    pub fn encode_sms(&self, sms: &OutboundSms) -> Result<Vec<PduPart>, EncodeError> {
        self.encode(&sms.to, &sms.text)
    }

    /// Encode `text` for `destination`, splitting into concatenated parts
    /// when it does not fit a single SMS
    pub fn encode(&self, destination: &str, text: &str) -> Result<Vec<PduPart>, EncodeError> {
        let address = PhoneNumber::parse(destination)?;
        let alphabet = choose_alphabet(text)?;
        let chunks = split(text, alphabet);
        if chunks.len() > MAX_PARTS {
            return Err(EncodeError::TooManyParts(chunks.len()));
        }

        let total = chunks.len() as u8;
        // wraps at 256
        let reference = (total > 1).then(|| self.next_reference.fetch_add(1, Ordering::Relaxed));
        debug!(
            "Encoding {} chars for {} as {} part(s), {}",
            text.chars().count(),
            address,
            total,
            alphabet.charset_name()
        );

        Ok(chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let sequence = index as u8 + 1;
                let header = reference
                    .and_then(|r| Concatenation::new(u16::from(r), total, sequence))
                    .map(UserDataHeader::concatenated);
                let octets = self.build(&address, alphabet, header.as_ref(), chunk);
                PduPart {
                    octets,
                    sequence,
                    total,
                }
            })
            .collect())
    }

    fn build(
        &self,
        address: &PhoneNumber,
        alphabet: Alphabet,
        header: Option<&UserDataHeader>,
        chunk: &Chunk,
    ) -> Bytes {
        let mut buf = BytesMut::with_capacity(180);

        // no SMSC: the modem uses its stored service centre
        buf.put_u8(0x00);
        buf.put_u8(if header.is_some() { FIRST_OCTET | UDHI } else { FIRST_OCTET });
        // TP-MR, assigned by the modem
        buf.put_u8(0x00);
        address.encode(&mut buf);
        buf.put_u8(0x00); // TP-PID
        buf.put_u8(DataCoding::for_alphabet(alphabet).to_byte());
        buf.put_u8(self.validity_period);

        let header_octets = header.map_or(0, UserDataHeader::encoded_len);
        match chunk {
            Chunk::Septets(septets) => {
                let (header_septets, fill_bits) = gsm7::header_alignment(header_octets);
                buf.put_u8((header_septets + septets.len()) as u8);
                if let Some(header) = header {
                    header.encode(&mut buf);
                }
                buf.put_slice(&gsm7::pack(septets, fill_bits));
            }
            Chunk::Ucs2(units) => {
                buf.put_u8((header_octets + units.len() * 2) as u8);
                if let Some(header) = header {
                    header.encode(&mut buf);
                }
                for unit in units {
                    buf.put_u16(*unit);
                }
            }
        }

        buf.freeze()
    }
}

/// 7-bit when every character is in the default alphabet or its extension
/// table, UCS2 otherwise. UCS2 cannot carry characters outside the BMP.
fn choose_alphabet(text: &str) -> Result<Alphabet, EncodeError> {
    if gsm7::is_encodable(text) {
        return Ok(Alphabet::Gsm7);
    }
    match text.chars().find(|c| u32::from(*c) > 0xFFFF) {
        Some(c) => Err(EncodeError::UnsupportedCharacter(c)),
        None => Ok(Alphabet::Ucs2),
    }
}

fn split(text: &str, alphabet: Alphabet) -> Vec<Chunk> {
    match alphabet {
        Alphabet::Ucs2 => {
            let units: Vec<u16> = text.encode_utf16().collect();
            if units.len() <= alphabet.single_part_capacity() {
                return vec![Chunk::Ucs2(units)];
            }
            units
                .chunks(alphabet.concatenated_capacity())
                .map(|c| Chunk::Ucs2(c.to_vec()))
                .collect()
        }
        _ => {
            let characters: Vec<Septets> = text.chars().filter_map(gsm7::septets_for).collect();
            let total: usize = characters.iter().map(Septets::len).sum();
            let capacity = if total <= alphabet.single_part_capacity() {
                alphabet.single_part_capacity()
            } else {
                alphabet.concatenated_capacity()
            };

            let mut chunks = Vec::new();
            let mut current = Vec::with_capacity(capacity);
            for septets in characters {
                // escape pairs stay together
                if current.len() + septets.len() > capacity {
                    chunks.push(Chunk::Septets(std::mem::take(&mut current)));
                }
                septets.push_to(&mut current);
            }
            if !current.is_empty() || chunks.is_empty() {
                chunks.push(Chunk::Septets(current));
            }
            chunks
        }
    }
}
