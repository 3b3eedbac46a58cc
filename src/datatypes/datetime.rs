// ABOUTME: Service centre timestamp (TP-SCTS) decoding into chrono date-times with explicit offsets
// ABOUTME: Recovers the quarter-hour timezone field, including its sign bit, from the swapped semi-octets

use crate::codec::{self, DecodeError};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Timelike};
use std::io::Cursor;

/// Number of octets in a TP-SCTS field
pub const SCTS_LEN: usize = 7;

const SECONDS_PER_QUARTER_HOUR: i32 = 15 * 60;

/// Decodes the seven TP-SCTS octets: year, month, day, hour, minute, second
/// as swapped BCD, then the timezone in quarter hours with bit 3 as the sign.
///
/// The returned value carries the recovered offset, so its UTC instant is the
/// wall-clock fields minus the offset.
pub fn decode_scts(buf: &mut Cursor<&[u8]>) -> Result<DateTime<FixedOffset>, DecodeError> {
    let octets = codec::decode_bytes(buf, SCTS_LEN, "TP-SCTS")?;

    let year = codec::decode_swapped_bcd(octets[0], "TP-SCTS year")?;
    let month = codec::decode_swapped_bcd(octets[1], "TP-SCTS month")?;
    let day = codec::decode_swapped_bcd(octets[2], "TP-SCTS day")?;
    let hour = codec::decode_swapped_bcd(octets[3], "TP-SCTS hour")?;
    let minute = codec::decode_swapped_bcd(octets[4], "TP-SCTS minute")?;
    let second = codec::decode_swapped_bcd(octets[5], "TP-SCTS second")?;
    let offset = decode_timezone(octets[6])?;

    let local = NaiveDate::from_ymd_opt(2000 + i32::from(year), month.into(), day.into())
        .and_then(|date| date.and_hms_opt(hour.into(), minute.into(), second.into()))
        .ok_or_else(|| {
            DecodeError::InvalidTimestamp(format!(
                "20{year:02}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            ))
        })?;

    local
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| DecodeError::InvalidTimestamp(format!("{local} at offset {offset}")))
}

/// Decodes the timezone octet. The low nibble holds the tens digit of the
/// quarter-hour count in bits 0-2 and the sign in bit 3; the high nibble
/// holds the units digit.
fn decode_timezone(octet: u8) -> Result<FixedOffset, DecodeError> {
    let tens = octet & 0x07;
    let units = octet >> 4;
    if units > 9 {
        return Err(DecodeError::InvalidSemiOctet {
            nibble: units,
            field: "TP-SCTS timezone",
        });
    }

    let quarters = i32::from(tens * 10 + units);
    let seconds = quarters * SECONDS_PER_QUARTER_HOUR;
    let seconds = if octet & 0x08 != 0 { -seconds } else { seconds };

    FixedOffset::east_opt(seconds)
        .ok_or_else(|| DecodeError::InvalidTimestamp(format!("timezone of {quarters} quarter hours")))
}

/// Encodes a date-time as TP-SCTS octets. The offset is truncated to whole
/// quarter hours and the year to its last two digits.
pub fn encode_scts(timestamp: &DateTime<FixedOffset>) -> [u8; SCTS_LEN] {
    let offset_seconds = timestamp.offset().fix().local_minus_utc();
    let quarters = (offset_seconds.abs() / SECONDS_PER_QUARTER_HOUR).min(79) as u8;
    let mut timezone = codec::encode_swapped_bcd(quarters);
    if offset_seconds < 0 {
        timezone |= 0x08;
    }

    [
        codec::encode_swapped_bcd((timestamp.year() % 100) as u8),
        codec::encode_swapped_bcd(timestamp.month() as u8),
        codec::encode_swapped_bcd(timestamp.day() as u8),
        codec::encode_swapped_bcd(timestamp.hour() as u8),
        codec::encode_swapped_bcd(timestamp.minute() as u8),
        codec::encode_swapped_bcd(timestamp.second() as u8),
        timezone,
    ]
}
