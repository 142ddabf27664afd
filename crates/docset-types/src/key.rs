//! Rules for keys written through the single-document object path.
//!
//! A key is an opaque string, but it must not be empty and must not read as a
//! number: numeric keys collide with numeric ids that callers embed inside
//! their own namespaced keys (`category:5:tag:12`).

use crate::error::TypeError;

/// Validate a key for a single-document write.
///
/// ```
/// use docset_types::validate_object_key;
///
/// assert!(validate_object_key("category:5").is_ok());
/// assert!(validate_object_key("").is_err());
/// assert!(validate_object_key("42").is_err());
/// ```
pub fn validate_object_key(key: &str) -> Result<(), TypeError> {
    if key.is_empty() {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: "a valid key is required for this operation".into(),
        });
    }
    if is_numeric(key) {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: "key must be an alphanumeric value, found a number".into(),
        });
    }
    Ok(())
}

/// Whether a string reads as a finite or infinite number once trimmed.
///
/// Whitespace-only strings count as numeric (they read as zero).
fn is_numeric(s: &str) -> bool {
    let t = s.trim();
    if t.is_empty() {
        return true;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    match t.parse::<f64>() {
        Ok(n) if n.is_nan() => false,
        Ok(n) if n.is_infinite() => {
            let unsigned = t.trim_start_matches(['+', '-']);
            unsigned == "Infinity" || unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        }
        Ok(_) => true,
        Err(_) => false,
    }
}
