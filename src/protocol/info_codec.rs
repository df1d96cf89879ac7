use crate::core::error::ProtocolError;
use crate::models::device::TableSizes;
use chrono::{NaiveDate, NaiveDateTime};

/// Number of i32 counters at the head of a free-sizes reply
const SIZE_FIELDS: usize = 20;

fn ensure_len(payload: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if payload.len() < expected {
        return Err(ProtocolError::ShortPacket {
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

pub fn read_u32(payload: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    ensure_len(payload, offset + 4)?;
    Ok(u32::from_le_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ]))
}

/// Decode the counters of a `CMD_GET_FREE_SIZES` reply
pub fn decode_sizes(payload: &[u8]) -> Result<TableSizes, ProtocolError> {
    ensure_len(payload, SIZE_FIELDS * 4)?;

    let field = |i: usize| {
        let v = i32::from_le_bytes([
            payload[i * 4],
            payload[i * 4 + 1],
            payload[i * 4 + 2],
            payload[i * 4 + 3],
        ]);
        v.max(0) as u32
    };

    Ok(TableSizes {
        users: field(4),
        fingers: field(6),
        records: field(8),
        cards: field(12),
        fingers_capacity: field(14),
        users_capacity: field(15),
        records_capacity: field(16),
    })
}

/// Decode the packed device clock.
///
/// The value counts seconds in a calendar of 31-day months and 12-month
/// years starting at 2000-01-01.
pub fn decode_time(raw: u32) -> Option<NaiveDateTime> {
    let mut t = raw;
    let second = t % 60;
    t /= 60;
    let minute = t % 60;
    t /= 60;
    let hour = t % 24;
    t /= 24;
    let day = t % 31 + 1;
    t /= 31;
    let month = t % 12 + 1;
    t /= 12;
    let year = i32::try_from(t).ok()? + 2000;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Inverse of [`decode_time`], used to build device replies in tests
pub fn encode_time(time: &NaiveDateTime) -> u32 {
    use chrono::{Datelike, Timelike};

    let years = (time.year() - 2000).max(0) as u32;
    ((((years * 12 + (time.month() - 1)) * 31 + (time.day() - 1)) * 24 + time.hour()) * 60
        + time.minute())
        * 60
        + time.second()
}

/// Text reply up to the first NUL
pub fn decode_text(payload: &[u8]) -> String {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).trim().to_string()
}

/// Value of a `~Key=value` options reply
pub fn decode_option(payload: &[u8]) -> Option<String> {
    let text = decode_text(payload);
    let value = match text.split_once('=') {
        Some((_, value)) => value,
        None => text.as_str(),
    };
    let value = value.replace('=', "").trim().to_string();

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Payload of `CMD_DATA_WRRQ`: `<i8 1, u16 command, i32 fct, i32 ext>`
pub fn buffered_read_request(command: u16, fct: u8, ext: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(11);
    buf.push(1);
    buf.extend_from_slice(&command.to_le_bytes());
    buf.extend_from_slice(&i32::from(fct).to_le_bytes());
    buf.extend_from_slice(&ext.to_le_bytes());
    buf
}

/// Payload of `CMD_DATA_RDY`: `<i32 start, i32 size>`
pub fn chunk_request(start: u32, size: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    buf.extend_from_slice(&start.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf
}

/// Payload of `CMD_STARTENROLL` over TCP: `<user_id[24], i8 finger, i8 1>`
pub fn enroll_request(user_id: &str, finger: u8) -> Result<Vec<u8>, ProtocolError> {
    let bytes = user_id.as_bytes();
    if bytes.len() > 24 {
        return Err(ProtocolError::FieldTooLong {
            field: "user_id",
            len: bytes.len(),
            max: 24,
        });
    }

    let mut buf = Vec::with_capacity(26);
    buf.extend_from_slice(bytes);
    buf.resize(24, 0);
    buf.push(finger);
    buf.push(1);
    Ok(buf)
}
