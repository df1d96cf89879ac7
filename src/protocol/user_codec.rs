use crate::core::error::ProtocolError;
use crate::models::user::{Privilege, UserRecord};

/// Entry size of firmware with 24-byte names
pub const EXTENDED_ENTRY_LEN: usize = 72;
/// Entry size of older firmware with 8-byte names
pub const COMPACT_ENTRY_LEN: usize = 28;

/// On-device layout of one user-table entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserLayout {
    /// `uid u16, privilege u8, password[5], name[8], card u32, pad,
    /// group u8, timezone i16, user_id u32`
    Compact,
    /// `uid u16, privilege u8, password[8], name[24], card u32, pad,
    /// group[7], pad, user_id[24]`
    Extended,
}

impl UserLayout {
    pub fn entry_len(self) -> usize {
        match self {
            UserLayout::Compact => COMPACT_ENTRY_LEN,
            UserLayout::Extended => EXTENDED_ENTRY_LEN,
        }
    }

    /// Infer the layout from the table byte size and the user count
    pub fn from_table(total_size: u32, user_count: u32) -> Self {
        if user_count > 0 && total_size / user_count == COMPACT_ENTRY_LEN as u32 {
            UserLayout::Compact
        } else {
            UserLayout::Extended
        }
    }
}

/// Read a NUL-terminated text field
fn text_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Write `value` into a zero-padded field of exactly `width` bytes
fn put_text(buf: &mut Vec<u8>, field: &'static str, value: &str, width: usize) -> Result<(), ProtocolError> {
    let bytes = value.as_bytes();
    if bytes.len() > width {
        return Err(ProtocolError::FieldTooLong {
            field,
            len: bytes.len(),
            max: width,
        });
    }

    buf.extend_from_slice(bytes);
    buf.resize(buf.len() + (width - bytes.len()), 0);
    Ok(())
}

/// Names are cut to the field width on a character boundary
fn put_name(buf: &mut Vec<u8>, name: &str, width: usize) {
    let mut end = name.len().min(width);
    while !name.is_char_boundary(end) {
        end -= 1;
    }

    buf.extend_from_slice(&name.as_bytes()[..end]);
    buf.resize(buf.len() + (width - end), 0);
}

fn numeric_field(field: &'static str, value: &str) -> Result<u32, ProtocolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    trimmed.parse::<u32>().map_err(|_| ProtocolError::NonNumericField {
        field,
        value: value.to_string(),
    })
}

/// Decode every complete entry in a user-table buffer
pub fn decode_users(data: &[u8], layout: UserLayout) -> Vec<UserRecord> {
    data.chunks_exact(layout.entry_len())
        .map(|entry| match layout {
            UserLayout::Compact => decode_compact(entry),
            UserLayout::Extended => decode_extended(entry),
        })
        .collect()
}

fn decode_compact(entry: &[u8]) -> UserRecord {
    let uid = u16::from_le_bytes([entry[0], entry[1]]);
    let privilege = Privilege(entry[2]);
    let password = text_field(&entry[3..8]);
    let name = text_field(&entry[8..16]).trim().to_string();
    let card = u32::from_le_bytes([entry[16], entry[17], entry[18], entry[19]]);
    let group_id = entry[21].to_string();
    let user_id = u32::from_le_bytes([entry[24], entry[25], entry[26], entry[27]]).to_string();

    UserRecord {
        uid,
        name,
        user_id,
        privilege,
        password,
        group_id,
        card,
    }
}

fn decode_extended(entry: &[u8]) -> UserRecord {
    let uid = u16::from_le_bytes([entry[0], entry[1]]);
    let privilege = Privilege(entry[2]);
    let password = text_field(&entry[3..11]);
    let name = text_field(&entry[11..35]).trim().to_string();
    let card = u32::from_le_bytes([entry[35], entry[36], entry[37], entry[38]]);
    let group_id = text_field(&entry[40..47]).trim().to_string();
    let user_id = text_field(&entry[48..72]);

    UserRecord {
        uid,
        name,
        user_id,
        privilege,
        password,
        group_id,
        card,
    }
}

/// Encode a full record for `CMD_USER_WRQ`
pub fn encode_user(user: &UserRecord, layout: UserLayout) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::with_capacity(layout.entry_len());
    buf.extend_from_slice(&user.uid.to_le_bytes());
    buf.push(user.privilege.as_u8());

    match layout {
        UserLayout::Compact => {
            let group = numeric_field("group_id", &user.group_id)?;
            let group = u8::try_from(group).map_err(|_| ProtocolError::NonNumericField {
                field: "group_id",
                value: user.group_id.clone(),
            })?;
            let user_id = numeric_field("user_id", &user.user_id)?;

            put_text(&mut buf, "password", &user.password, 5)?;
            put_name(&mut buf, &user.name, 8);
            buf.extend_from_slice(&user.card.to_le_bytes());
            buf.push(0);
            buf.push(group);
            // timezone
            buf.extend_from_slice(&0u16.to_le_bytes());
            buf.extend_from_slice(&user_id.to_le_bytes());
        }
        UserLayout::Extended => {
            put_text(&mut buf, "password", &user.password, 8)?;
            put_name(&mut buf, &user.name, 24);
            buf.extend_from_slice(&user.card.to_le_bytes());
            buf.push(0);
            put_text(&mut buf, "group_id", &user.group_id, 7)?;
            buf.push(0);
            put_text(&mut buf, "user_id", &user.user_id, 24)?;
        }
    }

    debug_assert_eq!(buf.len(), layout.entry_len());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::merge::{merge, UserChanges};

    fn sample_user() -> UserRecord {
        UserRecord {
            uid: 5,
            name: "Maria Lopez".to_string(),
            user_id: "1005".to_string(),
            privilege: Privilege::ADMIN,
            password: "1234".to_string(),
            group_id: "1".to_string(),
            card: 987654,
        }
    }

    #[test]
    fn test_layout_from_table() {
        assert_eq!(UserLayout::from_table(28 * 3, 3), UserLayout::Compact);
        assert_eq!(UserLayout::from_table(72 * 3, 3), UserLayout::Extended);
        assert_eq!(UserLayout::from_table(0, 0), UserLayout::Extended);
    }

    #[test]
    fn test_extended_entry_offsets() {
        let buf = encode_user(&sample_user(), UserLayout::Extended).unwrap();

        assert_eq!(buf.len(), EXTENDED_ENTRY_LEN);
        assert_eq!(&buf[0..2], &[5, 0]);
        assert_eq!(buf[2], 14);
        assert_eq!(&buf[3..7], b"1234");
        assert_eq!(&buf[11..22], b"Maria Lopez");
        assert_eq!(&buf[35..39], &987654u32.to_le_bytes());
        assert_eq!(buf[40], b'1');
        assert_eq!(&buf[48..52], b"1005");
        assert_eq!(buf[52], 0);
    }

    #[test]
    fn test_extended_decode_matches_written_fields() {
        let user = sample_user();
        let buf = encode_user(&user, UserLayout::Extended).unwrap();

        let decoded = decode_users(&buf, UserLayout::Extended);
        assert_eq!(decoded, vec![user]);
    }

    #[test]
    fn test_compact_entry() {
        let mut user = sample_user();
        user.name = "Ann".to_string();

        let buf = encode_user(&user, UserLayout::Compact).unwrap();
        assert_eq!(buf.len(), COMPACT_ENTRY_LEN);
        assert_eq!(buf[21], 1);
        assert_eq!(&buf[24..28], &1005u32.to_le_bytes());

        let decoded = decode_users(&buf, UserLayout::Compact);
        assert_eq!(decoded[0].name, "Ann");
        assert_eq!(decoded[0].user_id, "1005");
        assert_eq!(decoded[0].card, 987654);
    }

    #[test]
    fn test_compact_rejects_text_user_id() {
        let mut user = sample_user();
        user.user_id = "EMP-7".to_string();

        assert!(matches!(
            encode_user(&user, UserLayout::Compact),
            Err(ProtocolError::NonNumericField { field: "user_id", .. })
        ));
    }

    #[test]
    fn test_password_too_long() {
        let mut user = sample_user();
        user.password = "123456789".to_string();

        assert!(matches!(
            encode_user(&user, UserLayout::Extended),
            Err(ProtocolError::FieldTooLong { field: "password", .. })
        ));
    }

    #[test]
    fn test_name_cut_on_char_boundary() {
        let mut user = sample_user();
        // 23 ASCII bytes followed by a two-byte character
        user.name = format!("{}é", "a".repeat(23));

        let buf = encode_user(&user, UserLayout::Extended).unwrap();
        let decoded = decode_users(&buf, UserLayout::Extended);
        assert_eq!(decoded[0].name, "a".repeat(23));
    }

    #[test]
    fn test_empty_name_survives_password_change() {
        let mut user = sample_user();
        user.name = String::new();
        let before = encode_user(&user, UserLayout::Extended).unwrap();

        let decoded = decode_users(&before, UserLayout::Extended).remove(0);
        assert_eq!(decoded.name, "");

        let merged = merge(&decoded, &UserChanges::password("9999"));
        let after = encode_user(&merged, UserLayout::Extended).unwrap();

        assert_eq!(&after[11..35], &before[11..35]);
        assert_eq!(&after[3..7], b"9999");
        assert_eq!(&after[35..], &before[35..]);
    }

    #[test]
    fn test_compact_empty_name_kept_raw() {
        let mut user = sample_user();
        user.name = String::new();
        let buf = encode_user(&user, UserLayout::Compact).unwrap();

        let decoded = decode_users(&buf, UserLayout::Compact).remove(0);
        assert_eq!(decoded.name, "");
        assert_eq!(encode_user(&decoded, UserLayout::Compact).unwrap(), buf);
    }

    #[test]
    fn test_trailing_partial_entry_ignored() {
        let mut buf = encode_user(&sample_user(), UserLayout::Extended).unwrap();
        buf.extend_from_slice(&[1, 2, 3]);

        assert_eq!(decode_users(&buf, UserLayout::Extended).len(), 1);
    }
}
