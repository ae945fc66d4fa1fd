//! Canonical vocabulary
//!
//! Static tables mapping autocomplete tokens and free text to field purposes.
//! Free text is normalised first, then scanned with Aho-Corasick on word
//! boundaries; the longest phrase wins so "first name" beats "name".

use aho_corasick::AhoCorasick;
use std::sync::OnceLock;

use super::FieldPurpose;

/// Autocomplete tokens that qualify rather than name a field
const AUTOCOMPLETE_QUALIFIERS: &[&str] = &[
    "shipping", "billing", "home", "work", "mobile", "fax", "pager", "webauthn",
];

/// Autocomplete detail tokens, highest-trust source of purpose
static AUTOCOMPLETE_TOKENS: &[(&str, FieldPurpose)] = &[
    ("name", FieldPurpose::Name),
    ("honorific-prefix", FieldPurpose::Name),
    ("given-name", FieldPurpose::FirstName),
    ("additional-name", FieldPurpose::MiddleName),
    ("family-name", FieldPurpose::LastName),
    ("nickname", FieldPurpose::Name),
    ("email", FieldPurpose::Email),
    ("username", FieldPurpose::Username),
    ("current-password", FieldPurpose::Password),
    ("new-password", FieldPurpose::Password),
    ("organization", FieldPurpose::Company),
    ("organization-title", FieldPurpose::JobTitle),
    ("street-address", FieldPurpose::Address),
    ("address-line1", FieldPurpose::Address),
    ("address-line2", FieldPurpose::AddressLine2),
    ("address-line3", FieldPurpose::AddressLine2),
    ("address-level2", FieldPurpose::City),
    ("address-level1", FieldPurpose::State),
    ("postal-code", FieldPurpose::Zip),
    ("country", FieldPurpose::Country),
    ("country-name", FieldPurpose::Country),
    ("tel", FieldPurpose::Phone),
    ("tel-national", FieldPurpose::Phone),
    ("tel-local", FieldPurpose::Phone),
    ("url", FieldPurpose::Website),
    ("bday", FieldPurpose::Birthdate),
    ("bday-day", FieldPurpose::Birthdate),
    ("bday-month", FieldPurpose::Birthdate),
    ("bday-year", FieldPurpose::Birthdate),
    ("sex", FieldPurpose::Gender),
    ("cc-number", FieldPurpose::CardNumber),
    ("cc-exp", FieldPurpose::CardExpiry),
    ("cc-exp-month", FieldPurpose::CardExpiry),
    ("cc-exp-year", FieldPurpose::CardExpiry),
    ("cc-csc", FieldPurpose::CardCvc),
];

/// Normalised phrases and the purpose they indicate
static VOCABULARY: &[(&str, FieldPurpose)] = &[
    // Names
    ("first name", FieldPurpose::FirstName),
    ("firstname", FieldPurpose::FirstName),
    ("fname", FieldPurpose::FirstName),
    ("given name", FieldPurpose::FirstName),
    ("forename", FieldPurpose::FirstName),
    ("last name", FieldPurpose::LastName),
    ("lastname", FieldPurpose::LastName),
    ("lname", FieldPurpose::LastName),
    ("surname", FieldPurpose::LastName),
    ("family name", FieldPurpose::LastName),
    ("middle name", FieldPurpose::MiddleName),
    ("middle initial", FieldPurpose::MiddleName),
    ("full name", FieldPurpose::Name),
    ("fullname", FieldPurpose::Name),
    ("your name", FieldPurpose::Name),
    ("name", FieldPurpose::Name),
    // Contact
    ("email", FieldPurpose::Email),
    ("e mail", FieldPurpose::Email),
    ("email address", FieldPurpose::Email),
    ("emailaddress", FieldPurpose::Email),
    ("phone", FieldPurpose::Phone),
    ("phone number", FieldPurpose::Phone),
    ("phonenumber", FieldPurpose::Phone),
    ("telephone", FieldPurpose::Phone),
    ("tel", FieldPurpose::Phone),
    ("mobile", FieldPurpose::Phone),
    ("cell", FieldPurpose::Phone),
    // Address
    ("address", FieldPurpose::Address),
    ("street", FieldPurpose::Address),
    ("street address", FieldPurpose::Address),
    ("address line 1", FieldPurpose::Address),
    ("address 1", FieldPurpose::Address),
    ("address line 2", FieldPurpose::AddressLine2),
    ("address 2", FieldPurpose::AddressLine2),
    ("apartment", FieldPurpose::AddressLine2),
    ("apt", FieldPurpose::AddressLine2),
    ("suite", FieldPurpose::AddressLine2),
    ("city", FieldPurpose::City),
    ("town", FieldPurpose::City),
    ("locality", FieldPurpose::City),
    ("state", FieldPurpose::State),
    ("province", FieldPurpose::State),
    ("region", FieldPurpose::State),
    ("zip", FieldPurpose::Zip),
    ("zip code", FieldPurpose::Zip),
    ("zipcode", FieldPurpose::Zip),
    ("postal code", FieldPurpose::Zip),
    ("postalcode", FieldPurpose::Zip),
    ("postcode", FieldPurpose::Zip),
    ("country", FieldPurpose::Country),
    // Work
    ("company", FieldPurpose::Company),
    ("company name", FieldPurpose::Company),
    ("organization", FieldPurpose::Company),
    ("organisation", FieldPurpose::Company),
    ("employer", FieldPurpose::Company),
    ("job title", FieldPurpose::JobTitle),
    ("position", FieldPurpose::JobTitle),
    ("occupation", FieldPurpose::JobTitle),
    ("website", FieldPurpose::Website),
    ("web site", FieldPurpose::Website),
    ("homepage", FieldPurpose::Website),
    ("portfolio", FieldPurpose::Website),
    ("url", FieldPurpose::Website),
    // Personal
    ("date of birth", FieldPurpose::Birthdate),
    ("dateofbirth", FieldPurpose::Birthdate),
    ("birth date", FieldPurpose::Birthdate),
    ("birthday", FieldPurpose::Birthdate),
    ("dob", FieldPurpose::Birthdate),
    ("gender", FieldPurpose::Gender),
    ("sex", FieldPurpose::Gender),
    // Account
    ("username", FieldPurpose::Username),
    ("user name", FieldPurpose::Username),
    ("login", FieldPurpose::Username),
    ("user id", FieldPurpose::Username),
    ("password", FieldPurpose::Password),
    ("passcode", FieldPurpose::Password),
    // Payment
    ("card number", FieldPurpose::CardNumber),
    ("credit card", FieldPurpose::CardNumber),
    ("cc number", FieldPurpose::CardNumber),
    ("expiry", FieldPurpose::CardExpiry),
    ("expiration", FieldPurpose::CardExpiry),
    ("exp date", FieldPurpose::CardExpiry),
    ("cvv", FieldPurpose::CardCvc),
    ("cvc", FieldPurpose::CardCvc),
    ("security code", FieldPurpose::CardCvc),
    // Free text
    ("message", FieldPurpose::Message),
    ("comment", FieldPurpose::Message),
    ("comments", FieldPurpose::Message),
    ("bio", FieldPurpose::Message),
    ("about you", FieldPurpose::Message),
    ("cover letter", FieldPurpose::Message),
];

/// Compiled vocabulary matcher (lazy initialized)
static VOCABULARY_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();

fn vocabulary_matcher() -> &'static AhoCorasick {
    VOCABULARY_MATCHER.get_or_init(|| {
        // Pad with spaces so matches fall on word boundaries
        let patterns: Vec<String> = VOCABULARY
            .iter()
            .map(|(phrase, _)| format!(" {} ", phrase))
            .collect();
        AhoCorasick::new(&patterns).expect("Failed to build vocabulary automaton")
    })
}

/// Lowercase, split camelCase / snake_case / kebab-case into words, strip
/// punctuation, and collapse whitespace
pub fn normalize_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() {
            if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
                let next = chars.get(i + 1).copied();
                let camel = prev.is_lowercase() && c.is_uppercase();
                // "ZIPCode" -> "zip code"
                let acronym_end = prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase());
                let digit_edge = prev.is_alphabetic() && c.is_ascii_digit();
                if camel || acronym_end || digit_edge {
                    out.push(' ');
                }
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(' ');
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Purpose named by an `autocomplete` attribute value
pub fn purpose_from_autocomplete(value: &str) -> Option<FieldPurpose> {
    let token = value
        .split_whitespace()
        .map(|t| t.to_ascii_lowercase())
        .find(|t| !t.starts_with("section-") && !AUTOCOMPLETE_QUALIFIERS.contains(&t.as_str()))?;

    AUTOCOMPLETE_TOKENS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, purpose)| *purpose)
}

/// Purpose implied by an input `type` attribute
pub fn purpose_from_input_type(input_type: &str) -> Option<FieldPurpose> {
    match input_type.to_ascii_lowercase().as_str() {
        "email" => Some(FieldPurpose::Email),
        "tel" => Some(FieldPurpose::Phone),
        "url" => Some(FieldPurpose::Website),
        "password" => Some(FieldPurpose::Password),
        _ => None,
    }
}

/// Best vocabulary match in free text: the longest phrase, earliest on ties
pub fn match_vocabulary(text: &str) -> Option<FieldPurpose> {
    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return None;
    }
    let haystack = format!(" {} ", normalized);

    vocabulary_matcher()
        .find_overlapping_iter(&haystack)
        .max_by(|a, b| a.len().cmp(&b.len()).then(b.start().cmp(&a.start())))
        .map(|m| VOCABULARY[m.pattern().as_usize()].1)
}
