//! Sensitive-field masking for structured log output.
//!
//! This module filters account identifiers, monetary amounts, and secrets
//! out of arbitrary JSON values before they reach a log sink. It is a
//! best-effort defense for logging, not a security boundary: the original
//! value is never blocked from its intended use (signing, API calls), only
//! masked at the log-emission seam.

use serde_json::{Map, Value};

/// The replacement text for fully redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Character used when masking individual characters of a value.
const MASK_CHAR: char = '*';

/// Marker placed between the revealed head and tail of an account identifier.
const PARTIAL_MARKER: &str = "****";

/// Number of characters kept visible at each end of an account identifier.
const PARTIAL_REVEAL: usize = 4;

/// Identifiers shorter than this are masked entirely; revealing four
/// characters at each end would leave nothing hidden.
const PARTIAL_MIN_LEN: usize = 9;

/// How a matched field is masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskStrategy {
    /// Keep the first and last four characters, mask the middle.
    PartialReveal,
    /// Replace the whole value with [`REDACTED`].
    Replace,
}

/// A keyword rule mapping field-name fragments to a masking strategy.
pub struct MaskRule {
    pub keywords: &'static [&'static str],
    pub strategy: MaskStrategy,
}

/// The rule set is data, not scattered conditionals. Rules are evaluated
/// in order; the first keyword match wins. Secret-like names come first so
/// that a field such as `account_token` is fully redacted rather than
/// partially revealed.
pub const MASK_RULES: &[MaskRule] = &[
    MaskRule {
        keywords: &[
            "password",
            "secret",
            "token",
            "api_key",
            "private_key",
            "signature",
        ],
        strategy: MaskStrategy::Replace,
    },
    MaskRule {
        keywords: &["iban", "account_number", "bic", "swift"],
        strategy: MaskStrategy::PartialReveal,
    },
];

fn classify(key: &str) -> Option<MaskStrategy> {
    let key = key.to_ascii_lowercase();
    MASK_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| key.contains(kw)))
        .map(|rule| rule.strategy)
}

/// Walk a JSON value and return a copy with sensitive leaves masked.
///
/// Containers are recursed into; leaves are classified by their key name
/// (case-insensitive substring match). A leaf named `value` whose enclosing
/// object also carries a `currency` key is treated as a monetary amount and
/// has every digit masked. The input is never mutated, and this function
/// never fails: unclassified values pass through unchanged.
pub fn redact_sensitive(value: &Value) -> Value {
    match value {
        Value::Object(map) => redact_object(map),
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive).collect()),
        other => other.clone(),
    }
}

fn redact_object(map: &Map<String, Value>) -> Value {
    // A sibling `currency` key marks the object as a monetary amount
    let monetary = map.contains_key("currency");
    let mut out = Map::with_capacity(map.len());
    for (key, entry) in map {
        let masked = if monetary && key == "value" {
            mask_digits(entry)
        } else {
            match classify(key) {
                Some(MaskStrategy::Replace) => Value::String(REDACTED.to_string()),
                Some(MaskStrategy::PartialReveal) => mask_partial(entry),
                None => redact_sensitive(entry),
            }
        };
        out.insert(key.clone(), masked);
    }
    Value::Object(out)
}

fn mask_partial(entry: &Value) -> Value {
    match entry {
        Value::String(s) => Value::String(partial_reveal(s)),
        // Account-like containers are still walked for nested matches
        Value::Object(_) | Value::Array(_) => redact_sensitive(entry),
        // A numeric account identifier cannot be partially revealed safely
        _ => Value::String(REDACTED.to_string()),
    }
}

fn partial_reveal(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < PARTIAL_MIN_LEN {
        return chars.iter().map(|_| MASK_CHAR).collect();
    }
    let head: String = chars[..PARTIAL_REVEAL].iter().collect();
    let tail: String = chars[chars.len() - PARTIAL_REVEAL..].iter().collect();
    format!("{head}{PARTIAL_MARKER}{tail}")
}

// Digits are masked but punctuation and sign are preserved, so the output
// still leaks the digit count of the amount. Known limitation of the
// masking contract; callers that need a stricter policy must not log the
// amount at all.
fn mask_digits(entry: &Value) -> Value {
    let text = match entry {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return redact_sensitive(other),
    };
    Value::String(
        text.chars()
            .map(|c| if c.is_ascii_digit() { MASK_CHAR } else { c })
            .collect(),
    )
}
