//! Fixed-width C string decoding

/// Decode a NUL-terminated fixed-width byte array.
///
/// Bytes after the first NUL are ignored. A buffer without a terminator is
/// used in full. Invalid UTF-8 is replaced, never rejected.
pub fn decode_c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Encode `value` into a fixed-width buffer, truncating so a NUL always fits.
pub fn encode_c_string<const N: usize>(value: &str) -> [u8; N] {
    let mut buffer = [0u8; N];
    let len = value.len().min(N.saturating_sub(1));
    buffer[..len].copy_from_slice(&value.as_bytes()[..len]);
    buffer
}
