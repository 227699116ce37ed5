// sanitizer.rs
// Purpose: PII masking applied to every record before it leaves the dispatcher

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

/// Sentinel written over any value stored under a sensitive-named key.
pub const MASKED_SENTINEL: &str = "***MASKED***";

/// Sentinel returned when the matcher itself fails; never leak the raw value.
pub const UNPRINTABLE_SENTINEL: &str = "***UNPRINTABLE***";

/// Fixed-width mask for password/token/api-key shaped fragments.
const FRAGMENT_MASK: &str = "********";

/// Key-name substrings that force the whole value to be masked.
///
/// Matching is lower-cased substring containment; this coarse pass catches
/// shapes the pattern pass does not know about.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "auth",
    "key",
    "credential",
    "card",
    "ssn",
    "email",
    "phone",
    "address",
    "birth",
];

lazy_static! {
    // Ordered most-specific first: card and national id run before the
    // looser phone patterns so a broad match cannot swallow a narrow one.
    static ref CREDIT_CARD: Regex =
        Regex::new(r"\b(?:\d{4}[ -]){3}\d{4}\b|\b\d{13,16}\b").unwrap();
    static ref NATIONAL_ID: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
    static ref EMAIL: Regex = Regex::new(
        r"\b([A-Za-z0-9._%+-])([A-Za-z0-9._%+-]*)(@[A-Za-z0-9.-]+\.[A-Za-z]{2,})\b"
    )
    .unwrap();
    static ref PHONE_PAREN: Regex = Regex::new(r"\(\d{3}\)\s?\d{3}[- ]?\d{4}").unwrap();
    static ref PHONE_DASHED: Regex = Regex::new(r"\b\d{3}[-. ]\d{3}[-. ]\d{4}\b").unwrap();
    static ref IPV4: Regex = Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap();
    static ref SECRET_FRAGMENT: Regex = Regex::new(
        r#"(?i)\b(?:password|passwd|pwd|token|api[_-]?key|secret|auth)["']?\s*[:=]\s*["']?[^"'\s,;}]+["']?"#
    )
    .unwrap();
}

/// Mask PII-shaped substrings in a string, preserving surrounding text.
///
/// Total: on an internal matcher failure the opaque sentinel comes back
/// instead of the unmasked input.
pub fn mask_str(input: &str) -> String {
    match std::panic::catch_unwind(|| apply_patterns(input)) {
        Ok(masked) => masked,
        Err(_) => {
            log::warn!("sanitizer pattern pass failed; value replaced with opaque sentinel");
            eprintln!("[logship] sanitizer failure: value withheld from output");
            UNPRINTABLE_SENTINEL.to_string()
        }
    }
}

fn apply_patterns(input: &str) -> String {
    let pass = CREDIT_CARD.replace_all(input, |caps: &regex::Captures<'_>| {
        mask_digits_keep_last(&caps[0], 4)
    });
    let pass = NATIONAL_ID.replace_all(&pass, |caps: &regex::Captures<'_>| {
        mask_all_digits(&caps[0])
    });
    let pass = EMAIL.replace_all(&pass, "$1***$3");
    let pass = PHONE_PAREN.replace_all(&pass, |caps: &regex::Captures<'_>| {
        mask_all_digits(&caps[0])
    });
    let pass = PHONE_DASHED.replace_all(&pass, |caps: &regex::Captures<'_>| {
        mask_all_digits(&caps[0])
    });
    let pass = IPV4.replace_all(&pass, |caps: &regex::Captures<'_>| {
        mask_all_digits(&caps[0])
    });
    let pass = SECRET_FRAGMENT.replace_all(&pass, FRAGMENT_MASK);
    pass.into_owned()
}

/// Star every digit except the trailing `keep` digits; separators survive,
/// so grouped card numbers keep their 4-group shape.
fn mask_digits_keep_last(matched: &str, keep: usize) -> String {
    let total = matched.chars().filter(|c| c.is_ascii_digit()).count();
    let mut seen = 0usize;
    matched
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen > total.saturating_sub(keep) {
                    c
                } else {
                    '*'
                }
            } else {
                c
            }
        })
        .collect()
}

fn mask_all_digits(matched: &str) -> String {
    matched
        .chars()
        .map(|c| if c.is_ascii_digit() { '*' } else { c })
        .collect()
}

/// Recursively mask a structured value.
///
/// Two passes cooperate here: sensitive key names blank the entire value
/// whatever its shape, while the string pattern pass catches known PII
/// shapes hiding under innocent key names. Numbers, booleans and null pass
/// through unchanged.
pub fn mask_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut masked = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) {
                    masked.insert(key.clone(), Value::String(MASKED_SENTINEL.to_string()));
                } else {
                    masked.insert(key.clone(), mask_value(val));
                }
            }
            Value::Object(masked)
        }
        Value::Array(items) => Value::Array(items.iter().map(mask_value).collect()),
        Value::String(s) => Value::String(mask_str(s)),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|s| lower.contains(s))
}
