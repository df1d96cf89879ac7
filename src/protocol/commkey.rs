/// Derive the 4-byte auth key the terminal expects after `CMD_ACK_UNAUTH`.
///
/// The numeric device password is bit-reversed, offset by the session id,
/// XORed with `ZKSO`, half-swapped and finally mixed with the tick byte.
pub fn make_commkey(password: u32, session_id: u16, ticks: u8) -> [u8; 4] {
    let key = password
        .reverse_bits()
        .wrapping_add(u32::from(session_id));

    let b = key.to_le_bytes();
    let x = [b[0] ^ b'Z', b[1] ^ b'K', b[2] ^ b'S', b[3] ^ b'O'];
    let swapped = [x[2], x[3], x[0], x[1]];

    [swapped[0] ^ ticks, swapped[1] ^ ticks, ticks, swapped[3] ^ ticks]
}
