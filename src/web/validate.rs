//! Explicit field validation for public request bodies: length bounds and
//! control-character stripping, applied before anything reaches the store.

use crate::error::Error;

/// Strips ASCII/Unicode control characters (everything `char::is_control`
/// reports, which includes tab and newline) from user-supplied text.
pub fn strip_control_chars(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

pub fn bounded(field: &str, value: String, max_len: usize) -> Result<String, Error> {
    let cleaned = strip_control_chars(&value);
    if cleaned.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    if cleaned.len() > max_len {
        return Err(Error::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(cleaned)
}

pub fn bounded_optional(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Result<Option<String>, Error> {
    match value {
        None => Ok(None),
        Some(v) => {
            let cleaned = strip_control_chars(&v);
            if cleaned.len() > max_len {
                return Err(Error::validation(format!(
                    "{field} must be at most {max_len} characters"
                )));
            }
            Ok(Some(cleaned))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        assert_eq!(strip_control_chars("a\u{0}b\tc\n"), "abc");
    }

    #[test]
    fn bounded_rejects_empty_after_stripping() {
        assert!(bounded("name", "\u{0}".to_string(), 200).is_err());
    }

    #[test]
    fn bounded_rejects_over_length() {
        let long = "a".repeat(201);
        assert!(bounded("name", long, 200).is_err());
    }

    #[test]
    fn bounded_optional_passes_through_none() {
        assert_eq!(bounded_optional("phone", None, 64).unwrap(), None);
    }
}
