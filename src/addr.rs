//! IPv4 address parsing and formatting for set keys.
//!
//! Keys are the big-endian numeric value of the address, so numeric order
//! is address order.

use std::net::Ipv4Addr;

/// Parse a dotted-quad address at the start of `s`.
///
/// Returns the key and the unparsed remainder. Exactly four octets are
/// required, each one to three decimal digits with value 0..=255. What
/// follows the last octet is not inspected.
pub fn parse_prefix(s: &str) -> Option<(u32, &str)> {
    let bytes = s.as_bytes();
    let mut pos = 0;
    let mut key: u32 = 0;

    for octet in 0..4 {
        if octet > 0 {
            if bytes.get(pos) != Some(&b'.') {
                return None;
            }
            pos += 1;
        }

        let start = pos;
        let mut value: u32 = 0;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() && pos - start < 3 {
            value = value * 10 + u32::from(bytes[pos] - b'0');
            pos += 1;
        }
        if pos == start || value > 255 {
            return None;
        }
        // A fourth digit means the octet is too long, not a terminator.
        if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            return None;
        }
        key = (key << 8) | value;
    }

    Some((key, &s[pos..]))
}

/// Parse a complete dotted-quad address, allowing surrounding whitespace.
pub fn parse(s: &str) -> Option<u32> {
    match parse_prefix(s.trim()) {
        Some((key, "")) => Some(key),
        _ => None,
    }
}

/// Render a key as a dotted quad.
pub fn format(key: u32) -> String {
    Ipv4Addr::from(key).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefix() {
        assert_eq!(parse_prefix("10.0.0.5"), Some((0x0A00_0005, "")));
        assert_eq!(
            parse_prefix("192.168.1.1 # home"),
            Some((0xC0A8_0101, " # home"))
        );
        assert_eq!(parse_prefix("255.255.255.255:x"), Some((u32::MAX, ":x")));
        assert_eq!(parse_prefix("0.0.0.0"), Some((0, "")));
    }

    #[test]
    fn test_parse_prefix_rejects() {
        assert_eq!(parse_prefix(""), None);
        assert_eq!(parse_prefix("10.0.0"), None);
        assert_eq!(parse_prefix("10.0.0."), None);
        assert_eq!(parse_prefix("256.0.0.1"), None);
        assert_eq!(parse_prefix("10.0.0.1000"), None);
        assert_eq!(parse_prefix("10..0.1"), None);
        assert_eq!(parse_prefix("a.b.c.d"), None);
        assert_eq!(parse_prefix(" 10.0.0.1"), None);
    }

    #[test]
    fn test_parse_whole() {
        assert_eq!(parse(" 8.8.8.8 "), Some(0x0808_0808));
        assert_eq!(parse("8.8.8.8x"), None);
    }

    #[test]
    fn test_format() {
        assert_eq!(format(0x0A00_0001), "10.0.0.1");
        assert_eq!(format(0), "0.0.0.0");
        assert_eq!(format(parse("172.16.254.3").unwrap()), "172.16.254.3");
    }
}
