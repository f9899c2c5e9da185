//! Percent-encoding for `sid`/device-name path segments.
//!
//! Hand-rolled rather than pulled from the `percent-encoding` crate: the
//! original encodes every byte outside `[0-9A-Za-z]`, including `-_.~`,
//! which `percent_encoding::NON_ALPHANUMERIC` leaves unescaped by design.
//! Matching the wire contract exactly means matching this exact alphabet.

/// Percent-encodes `input`: `[0-9A-Za-z]` pass through verbatim, every
/// other byte becomes `%` followed by two uppercase hex digits.
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        if b.is_ascii_alphanumeric() {
            out.push(b as char);
        } else {
            out.push('%');
            out.push_str(&format!("{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphanumerics_pass_through() {
        assert_eq!(percent_encode("abcXYZ019"), "abcXYZ019");
    }

    #[test]
    fn idempotent_on_alphanumerics() {
        let once = percent_encode("abc123");
        let twice = percent_encode(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn escapes_space_and_slash() {
        assert_eq!(percent_encode("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn escapes_unreserved_punctuation_too() {
        // diverges intentionally from RFC 3986 "unreserved" characters
        assert_eq!(percent_encode("a-b_c.d~e"), "a%2Db%5Fc%2Ed%7Ee");
    }
}
