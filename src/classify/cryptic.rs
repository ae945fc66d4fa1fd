//! Cryptic identifier detection
//!
//! Frameworks generate control names and ids that carry no meaning
//! (`a3f9c2e1-...`, `field_83920417`, `[d8e2a1f0][field3]`). A field whose
//! only identifying information looks like this gets a zero label quality.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use regex::Regex;
use std::sync::OnceLock;

use super::vocabulary::normalize_text;

/// Minimum length of an unbroken alphanumeric run treated as generated
pub const LONG_RUN_THRESHOLD: usize = 20;

/// Longest lowercase word identifier that is always considered readable
pub const READABLE_MAX_LEN: usize = 32;

/// Generated-identifier shapes (lazy initialized)
static CRYPTIC_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static READABLE_PATTERN: OnceLock<Regex> = OnceLock::new();
static BASE64_SHAPE: OnceLock<Regex> = OnceLock::new();

fn cryptic_patterns() -> &'static [Regex] {
    CRYPTIC_PATTERNS.get_or_init(|| {
        let long_run = format!(r"[A-Za-z0-9]{{{},}}", LONG_RUN_THRESHOLD);
        [
            // UUID
            r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
            // Long hex or alphanumeric run
            long_run.as_str(),
            // Bracketed index: [xxxxxxxx][field3]
            r"\[[A-Za-z0-9_-]{6,}\]\[[A-Za-z_]*\d*\]",
            // field_######## and friends
            r"(?i)^(field|input|fld|ctrl)[_-]?\d{6,}$",
            // React useId / generated colon ids
            r"^:[A-Za-z0-9]+:$",
            // Only digits
            r"^\d{4,}$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid cryptic pattern"))
        .collect()
    })
}

fn readable_pattern() -> &'static Regex {
    READABLE_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]+(?:[-_][a-z]+)*$").expect("invalid readable pattern")
    })
}

fn base64_shape() -> &'static Regex {
    BASE64_SHAPE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9+/]{16,}={0,2}$").expect("invalid base64 pattern")
    })
}

/// Whether an identifier looks machine generated
///
/// Empty strings are not cryptic.
pub fn is_cryptic(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    if value.len() <= READABLE_MAX_LEN
        && (readable_pattern().is_match(value) || reads_as_words(value))
    {
        return false;
    }
    cryptic_patterns().iter().any(|p| p.is_match(value)) || looks_like_base64(value)
}

/// camelCase or delimited identifiers made of two or more real words, with
/// optional numeric parts: `shippingAddress1`, `addressLine2City`
fn reads_as_words(value: &str) -> bool {
    let normalized = normalize_text(value);
    let mut words = 0;
    for token in normalized.split(' ') {
        if token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let is_word = token.len() >= 2
            && token.chars().all(|c| c.is_alphabetic())
            && token.chars().any(|c| "aeiouy".contains(c));
        if !is_word {
            return false;
        }
        words += 1;
    }
    words >= 2
}

/// Base64 payloads: the right alphabet, a mix of character classes, and
/// an actual decode
fn looks_like_base64(value: &str) -> bool {
    if !base64_shape().is_match(value) {
        return false;
    }
    let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return false;
    }
    if value.ends_with('=') || value.len() % 4 == 0 {
        STANDARD.decode(value).is_ok()
    } else {
        STANDARD_NO_PAD.decode(value).is_ok()
    }
}
