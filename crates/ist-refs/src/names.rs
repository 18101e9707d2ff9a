//! Tag and stream name validation.
//!
//! Valid tag names:
//! - 1 to 128 characters
//! - First character is an ASCII letter, digit, or `_`
//! - Remaining characters are ASCII letters, digits, `_`, `.`, or `-`
//!
//! Valid stream names:
//! - 1 to 253 characters of lowercase letters, digits, `-`, and `.`
//! - Must start and end with a letter or digit
//! - Must not contain `..`

use crate::error::{RefError, Result};

/// Maximum length of a tag name.
pub const MAX_TAG_LEN: usize = 128;

/// Maximum length of a stream name.
pub const MAX_STREAM_NAME_LEN: usize = 253;

/// Validate a tag name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use ist_refs::names::validate_tag_name;
///
/// assert!(validate_tag_name("latest").is_ok());
/// assert!(validate_tag_name("v1.2.3-rc_1").is_ok());
/// assert!(validate_tag_name("").is_err());
/// assert!(validate_tag_name("a:b").is_err());
/// ```
pub fn validate_tag_name(name: &str) -> Result<()> {
    let invalid = |reason: String| RefError::InvalidName {
        name: name.to_string(),
        reason,
    };

    let Some(first) = name.chars().next() else {
        return Err(invalid("tag name must not be empty".into()));
    };

    if name.len() > MAX_TAG_LEN {
        return Err(invalid(format!("must be at most {MAX_TAG_LEN} characters")));
    }

    if !(first.is_ascii_alphanumeric() || first == '_') {
        return Err(invalid(format!("must not start with {first:?}")));
    }

    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }

    Ok(())
}

/// Validate a stream name.
pub fn validate_stream_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| RefError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("stream name must not be empty"));
    }
    if name.len() > MAX_STREAM_NAME_LEN {
        return Err(invalid("stream name is too long"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.'))
    {
        return Err(invalid(
            "must consist of lowercase letters, digits, '-' and '.'",
        ));
    }
    let starts_ok = name.starts_with(|c: char| c.is_ascii_alphanumeric());
    let ends_ok = name.ends_with(|c: char| c.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return Err(invalid("must start and end with a letter or digit"));
    }
    if name.contains("..") {
        return Err(invalid("must not contain '..'"));
    }
    Ok(())
}
