//! Percent-encoding for reply delivery.
//!
//! Replies are injected into the page as
//! `JSON.parse(decodeURIComponent("<encoded>"))`. The encoded text sits inside
//! a double-quoted JS string literal, so every byte outside the URL query
//! allowed set (which excludes `"`, `\`, `%`, whitespace and control
//! characters) is escaped as `%XX` over its UTF-8 encoding.

/// Punctuation left unescaped, in addition to ASCII alphanumerics.
const QUERY_ALLOWED_PUNCTUATION: &[u8] = b"!$&'()*+,-./:;=?@_~";

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn is_query_allowed(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || QUERY_ALLOWED_PUNCTUATION.contains(&byte)
}

/// Percent-encode text with the URL query allowed character set.
pub fn percent_encode_query(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3 / 2);
    for &byte in text.as_bytes() {
        if is_query_allowed(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0x0F) as usize] as char);
        }
    }
    out
}

/// Decode `%XX` escapes, the way `decodeURIComponent` does.
///
/// Returns `None` for truncated or non-hex escapes and for byte sequences
/// that are not valid UTF-8.
pub fn percent_decode(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_characters_pass_through() {
        let text = "abcXYZ019!$&'()*+,-./:;=?@_~";
        assert_eq!(percent_encode_query(text), text);
    }

    #[test]
    fn test_string_literal_breakers_are_escaped() {
        let encoded = percent_encode_query("say \"hi\"\\\n%");
        assert_eq!(encoded, "say%20%22hi%22%5C%0A%25");
        assert!(!encoded.contains('"'));
        assert!(!encoded.contains('\\'));
    }

    #[test]
    fn test_json_braces_are_escaped() {
        assert_eq!(
            percent_encode_query(r#"{"code":0,"data":[1]}"#),
            "%7B%22code%22:0,%22data%22:%5B1%5D%7D"
        );
    }

    #[test]
    fn test_multibyte_utf8() {
        assert_eq!(percent_encode_query("é"), "%C3%A9");
        assert_eq!(percent_encode_query("你好"), "%E4%BD%A0%E5%A5%BD");
    }

    #[test]
    fn test_decode_round_trip() {
        let samples = ["", "plain", "quotes \" and \\ back", "emoji 🚀 \u{2028}", "50% </script>"];
        for sample in samples {
            assert_eq!(percent_decode(&percent_encode_query(sample)).as_deref(), Some(sample));
        }
    }

    #[test]
    fn test_decode_rejects_bad_escapes() {
        assert_eq!(percent_decode("%"), None);
        assert_eq!(percent_decode("%4"), None);
        assert_eq!(percent_decode("%ZZ"), None);
        assert_eq!(percent_decode("%C3"), None);
    }
}
