use once_cell::sync::Lazy;
use regex::Regex;

const COUNTRY_CODE: &str = "94";

static CANONICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+94\d{9}$").expect("valid regex"));

/// Normalize a Sri Lankan phone number to `+94XXXXXXXXX`.
///
/// Accepts local (`0771234567`), bare (`771234567`) and international
/// (`+94 77 123 4567`, `0094771234567`) forms with any punctuation.
/// Returns `None` when the digits do not make a nine-digit subscriber number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if let Some(rest) = digits.strip_prefix("00") {
        digits = rest.to_string();
    }

    let number = if digits.len() == 11 && digits.starts_with(COUNTRY_CODE) {
        format!("+{}", digits)
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("+{}{}", COUNTRY_CODE, rest)
    } else {
        format!("+{}{}", COUNTRY_CODE, digits)
    };

    CANONICAL.is_match(&number).then_some(number)
}
