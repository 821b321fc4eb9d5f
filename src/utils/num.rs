use std::num::ParseIntError;

/// Parses a signed integer, picking the base from the literal's prefix.
///
/// `0x`/`0X` selects hexadecimal, `0o`/`0O` or a bare leading `0` octal,
/// `0b`/`0B` binary, anything else decimal. A leading `+` or `-` is allowed
/// before the prefix. Single underscores may separate digits, or follow a
/// prefix, as in `1_000` or `0x_ff`.
pub fn parse_int_auto(s: &str) -> Result<i64, ParseIntError> {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = split_prefix(body);
    if digits.starts_with(['+', '-']) || (radix == 10 && digits.starts_with('_')) {
        // a second sign, or a separator with no prefix before it
        return i64::from_str_radix("_", radix);
    }
    let digits = strip_separators(digits).unwrap_or_else(|| digits.to_string());
    if negative {
        i64::from_str_radix(&format!("-{}", digits), radix)
    } else {
        i64::from_str_radix(&digits, radix)
    }
}

fn split_prefix(body: &str) -> (u32, &str) {
    let bytes = body.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return (10, body);
    }
    match bytes[1] {
        b'x' | b'X' => (16, &body[2..]),
        b'o' | b'O' => (8, &body[2..]),
        b'b' | b'B' => (2, &body[2..]),
        _ => (8, &body[1..]),
    }
}

/// Removes `_` separators. Returns `None` when they are misplaced so the
/// caller feeds the raw text to the parser and gets its error.
fn strip_separators(digits: &str) -> Option<String> {
    if !digits.contains('_') {
        return Some(digits.to_string());
    }
    // a bare `0` prefix may be followed by an underscore, as in `0_755`
    let inner = digits.strip_prefix('_').unwrap_or(digits);
    if inner.is_empty() || inner.ends_with('_') || inner.starts_with('_') || inner.contains("__") {
        return None;
    }
    Some(inner.replace('_', ""))
}
