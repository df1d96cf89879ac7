use crate::core::error::ProtocolError;

use super::constants::{MACHINE_PREPARE_DATA_1, MACHINE_PREPARE_DATA_2, USHRT_MAX};

/// Length of the command header inside a frame
pub const HEADER_LEN: usize = 8;
/// Length of the TCP frame prefix (magic + payload length)
pub const FRAME_PREFIX_LEN: usize = 8;
/// Frames above this size are treated as corrupt
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// A decoded command or reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub command: u16,
    pub checksum: u16,
    pub session_id: u16,
    pub reply_id: u16,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::ShortPacket {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let word = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);

        Ok(Self {
            command: word(0),
            checksum: word(2),
            session_id: word(4),
            reply_id: word(6),
            payload: bytes[HEADER_LEN..].to_vec(),
        })
    }
}

/// Ones-complement sum of little-endian 16-bit words, folded at 65535
pub fn checksum(bytes: &[u8]) -> u16 {
    let max = i64::from(USHRT_MAX);
    let mut sum: i64 = 0;

    let mut words = bytes.chunks_exact(2);
    for pair in &mut words {
        sum += i64::from(u16::from_le_bytes([pair[0], pair[1]]));
        if sum > max {
            sum -= max;
        }
    }
    if let [last] = words.remainder() {
        sum += i64::from(*last);
    }

    while sum > max {
        sum -= max;
    }

    let mut sum = !sum;
    while sum < 0 {
        sum += max;
    }

    sum as u16
}

/// Next reply id after `reply_id`, wrapping below 65535
pub fn next_reply_id(reply_id: u16) -> u16 {
    let next = u32::from(reply_id) + 1;
    if next >= u32::from(USHRT_MAX) {
        (next - u32::from(USHRT_MAX)) as u16
    } else {
        next as u16
    }
}

/// Build a request packet.
///
/// The checksum is computed over the header carrying `reply_id`; the
/// header that goes on the wire carries the incremented id. Terminals
/// expect exactly this pairing.
pub fn encode_request(command: u16, session_id: u16, reply_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&command.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&session_id.to_le_bytes());
    buf.extend_from_slice(&reply_id.to_le_bytes());
    buf.extend_from_slice(payload);

    let sum = checksum(&buf);
    buf[2..4].copy_from_slice(&sum.to_le_bytes());
    buf[6..8].copy_from_slice(&next_reply_id(reply_id).to_le_bytes());

    buf
}

/// Wrap a packet in the TCP frame prefix
pub fn frame(packet: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FRAME_PREFIX_LEN + packet.len());
    buf.extend_from_slice(&MACHINE_PREPARE_DATA_1.to_le_bytes());
    buf.extend_from_slice(&MACHINE_PREPARE_DATA_2.to_le_bytes());
    buf.extend_from_slice(&(packet.len() as u32).to_le_bytes());
    buf.extend_from_slice(packet);
    buf
}

/// Validate a frame prefix and return the length of the packet that follows
pub fn parse_frame_prefix(prefix: &[u8; FRAME_PREFIX_LEN]) -> Result<u32, ProtocolError> {
    let magic_1 = u16::from_le_bytes([prefix[0], prefix[1]]);
    let magic_2 = u16::from_le_bytes([prefix[2], prefix[3]]);

    if magic_1 != MACHINE_PREPARE_DATA_1 || magic_2 != MACHINE_PREPARE_DATA_2 {
        return Err(ProtocolError::BadFrame(format!(
            "unexpected magic {}",
            hex::encode(&prefix[..4])
        )));
    }

    let len = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);
    if (len as usize) < HEADER_LEN {
        return Err(ProtocolError::ShortPacket {
            expected: HEADER_LEN,
            actual: len as usize,
        });
    }
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::Oversized(len));
    }

    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{CMD_ACK_OK, CMD_CONNECT};

    #[test]
    fn test_checksum_of_connect_request() {
        // CMD_CONNECT, session 0, reply id 65534, empty payload
        let header = [0xe8, 0x03, 0x00, 0x00, 0x00, 0x00, 0xfe, 0xff];
        // 0x03e8 + 0xfffe = 0x103e6 -> folded 0x03e7, complemented into 0xfc17
        assert_eq!(checksum(&header), 0xfc17);
    }

    #[test]
    fn test_checksum_odd_length() {
        assert_eq!(checksum(&[0x01]), 65534 - 1);
        assert_eq!(checksum(&[]), 65534);
    }

    #[test]
    fn test_next_reply_id_wraps() {
        assert_eq!(next_reply_id(0), 1);
        assert_eq!(next_reply_id(65533), 65534);
        assert_eq!(next_reply_id(65534), 0);
    }

    #[test]
    fn test_encode_request_layout() {
        let packet = encode_request(CMD_CONNECT, 0, 65534, &[]);

        assert_eq!(packet.len(), HEADER_LEN);
        assert_eq!(&packet[0..2], &[0xe8, 0x03]);
        assert_eq!(&packet[2..4], &0xfc17u16.to_le_bytes());
        assert_eq!(&packet[4..6], &[0, 0]);
        // Wire header carries the incremented (wrapped) id
        assert_eq!(&packet[6..8], &[0, 0]);
    }

    #[test]
    fn test_frame_prefix_roundtrip() {
        let packet = encode_request(CMD_ACK_OK, 7, 3, b"abc");
        let framed = frame(&packet);

        assert_eq!(&framed[..4], &[0x50, 0x50, 0x82, 0x7d]);

        let mut prefix = [0u8; FRAME_PREFIX_LEN];
        prefix.copy_from_slice(&framed[..FRAME_PREFIX_LEN]);
        assert_eq!(parse_frame_prefix(&prefix).unwrap(), 11);

        let decoded = Packet::decode(&framed[FRAME_PREFIX_LEN..]).unwrap();
        assert_eq!(decoded.command, CMD_ACK_OK);
        assert_eq!(decoded.session_id, 7);
        assert_eq!(decoded.reply_id, 4);
        assert_eq!(decoded.payload, b"abc");
    }

    #[test]
    fn test_frame_prefix_rejects_bad_magic() {
        let prefix = [0x47, 0x45, 0x54, 0x20, 8, 0, 0, 0];
        assert!(matches!(
            parse_frame_prefix(&prefix),
            Err(ProtocolError::BadFrame(_))
        ));
    }

    #[test]
    fn test_frame_prefix_rejects_bad_lengths() {
        let short = [0x50, 0x50, 0x82, 0x7d, 4, 0, 0, 0];
        assert!(matches!(
            parse_frame_prefix(&short),
            Err(ProtocolError::ShortPacket { .. })
        ));

        let huge = [0x50, 0x50, 0x82, 0x7d, 0xff, 0xff, 0xff, 0x7f];
        assert!(matches!(
            parse_frame_prefix(&huge),
            Err(ProtocolError::Oversized(_))
        ));
    }

    #[test]
    fn test_decode_short_packet() {
        assert!(Packet::decode(&[1, 2, 3]).is_err());
    }
}
