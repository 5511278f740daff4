//! Interrupt exclusion filter.

/// Check whether `int_num` appears in a comma-separated exclusion list.
///
/// Tokens are compared case-insensitively against the two-digit hex form of
/// the interrupt number. Surrounding whitespace is ignored and tokens that
/// are not exactly two characters never match. Runs on every interrupt event
/// and does not allocate.
pub fn is_interrupt_excluded(list: &str, int_num: u8) -> bool {
    if list.is_empty() {
        return false;
    }
    let hex = hex_pair(int_num);
    list.split(',').any(|token| {
        let token = token.trim().as_bytes();
        token.len() == 2
            && token[0].to_ascii_uppercase() == hex[0]
            && token[1].to_ascii_uppercase() == hex[1]
    })
}

fn hex_pair(value: u8) -> [u8; 2] {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    [DIGITS[(value >> 4) as usize], DIGITS[(value & 0x0F) as usize]]
}
