// ABOUTME: SMS-DELIVER decoding from the hex lines a modem lists in PDU mode
// ABOUTME: Walks SMSC, originating address, DCS, timestamp and user data into an InboundSms

use crate::codec::{self, DecodeError};
use crate::datatypes::gsm7;
use crate::datatypes::{
    Alphabet, Concatenation, DataCoding, PhoneNumber, UserDataHeader, decode_scts,
};
use chrono::{DateTime, FixedOffset, Utc};
use std::io::Cursor;
use std::str::FromStr;

/// TP-MTI mask in the first octet
const MTI_MASK: u8 = 0x03;
const MTI_DELIVER: u8 = 0x00;
/// TP-UDHI
const UDHI: u8 = 0x40;

/// A received SMS, or one part of a concatenated message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundSms {
    pub sender: PhoneNumber,
    pub smsc: Option<PhoneNumber>,
    /// Service centre timestamp with the offset it was sent with
    pub timestamp: DateTime<FixedOffset>,
    pub data_coding: DataCoding,
    pub protocol_id: u8,
    pub concatenation: Option<Concatenation>,
    pub text: String,
}

impl InboundSms {
    pub fn utc_timestamp(&self) -> DateTime<Utc> {
        self.timestamp.with_timezone(&Utc)
    }

    pub fn is_concatenated(&self) -> bool {
        self.concatenation.is_some()
    }
}

impl FromStr for InboundSms {
    type Err = DecodeError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        PduDecoder::decode(line)
    }
}

/// Parses SMS-DELIVER PDUs
pub struct PduDecoder;

impl PduDecoder {
    /// Decode one PDU line as listed by `AT+CMGL` in PDU mode
    pub fn decode(line: &str) -> Result<InboundSms, DecodeError> {
        let octets = codec::decode_hex(line)?;
        let mut buf = Cursor::new(&octets[..]);

        let smsc = PhoneNumber::decode_smsc(&mut buf)?;
        let first_octet = codec::decode_u8(&mut buf, "first octet")?;
        let mti = first_octet & MTI_MASK;
        if mti != MTI_DELIVER {
            return Err(DecodeError::UnsupportedPduType(mti));
        }

        let sender = PhoneNumber::decode(&mut buf)?;
        let protocol_id = codec::decode_u8(&mut buf, "TP-PID")?;
        let data_coding = DataCoding::from_byte(codec::decode_u8(&mut buf, "TP-DCS")?)?;
        let timestamp = decode_scts(&mut buf)?;
        let udl = codec::decode_u8(&mut buf, "TP-UDL")? as usize;
        let user_data = &octets[buf.position() as usize..];

        let (concatenation, text) =
            decode_user_data(user_data, udl, data_coding.alphabet(), first_octet & UDHI != 0)?;

        Ok(InboundSms {
            sender,
            smsc,
            timestamp,
            data_coding,
            protocol_id,
            concatenation,
            text,
        })
    }
}

fn decode_user_data(
    user_data: &[u8],
    udl: usize,
    alphabet: Alphabet,
    has_header: bool,
) -> Result<(Option<Concatenation>, String), DecodeError> {
    // 7-bit counts septets, the others count octets
    let ud_octets = match alphabet {
        Alphabet::Gsm7 => (udl * 7).div_ceil(8),
        _ => udl,
    };
    let user_data = user_data
        .get(..ud_octets)
        .ok_or(DecodeError::Truncated("TP-UD"))?;

    let (concatenation, header_octets) = if has_header {
        let (header, len) = UserDataHeader::decode(user_data)?;
        (header.concatenation, len)
    } else {
        (None, 0)
    };

    let text = match alphabet {
        Alphabet::Gsm7 => {
            let (header_septets, fill_bits) = gsm7::header_alignment(header_octets);
            let count = udl.saturating_sub(header_septets);
            let septets = gsm7::unpack(&user_data[header_octets..], fill_bits, count)
                .ok_or(DecodeError::Truncated("TP-UD"))?;
            gsm7::from_septets(&septets)
        }
        Alphabet::Ucs2 => {
            let body = user_data
                .get(header_octets..)
                .filter(|body| body.len() % 2 == 0)
                .ok_or(DecodeError::Truncated("TP-UD"))?;
            let units = body
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        Alphabet::EightBit => {
            let body = user_data
                .get(header_octets..)
                .ok_or(DecodeError::Truncated("TP-UD"))?;
            String::from_utf8_lossy(body).into_owned()
        }
    };

    Ok((concatenation, text))
}
