//! CAS Registry Number shape and checksum validation.
use once_cell::sync::Lazy;
use regex::Regex;

static CAS_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2,7}-\d{2}-\d$").expect("valid CAS shape regex"));

/// True when `s` looks like `XXXXXXX-YY-Z` (2-7 digits, 2 digits, 1 digit).
pub fn has_cas_shape(s: &str) -> bool {
    CAS_SHAPE.is_match(s)
}

/// Full CAS validation: shape plus modulo-10 check digit.
///
/// With digits `d1..dn` being the two blocks before the check digit, the sum
/// of `d(n+1-i) * i` over `i = 1..n` must equal the check digit modulo 10.
pub fn validate_cas(s: &str) -> bool {
    if !has_cas_shape(s) {
        return false;
    }
    let mut parts = s.split('-');
    let (block1, block2, check) = match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => return false,
    };
    let check_digit = match check.chars().next().and_then(|c| c.to_digit(10)) {
        Some(d) => d,
        None => return false,
    };
    let digits: Vec<u32> = block1
        .chars()
        .chain(block2.chars())
        .filter_map(|c| c.to_digit(10))
        .collect();
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| (i as u32 + 1) * d)
        .sum();
    sum % 10 == check_digit
}
