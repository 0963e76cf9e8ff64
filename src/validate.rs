//! Input validation: email shape check and URL normalization.
//!
//! Both functions are pure. They run before any remote call so a bad
//! submission never costs a screenshot.

use crate::{NormalizedUrl, ValidationError};
use url::Url;

/// Validate both fields, email first, and return the normalized URL.
pub fn validate(email: &str, raw_url: &str) -> Result<NormalizedUrl, ValidationError> {
    validate_email(email)?;
    normalize_url(raw_url)
}

/// Accepts `local@domain.tld`: exactly one `@`, no whitespace, something
/// before the `@`, and a dot inside the domain with text on both sides.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || email.chars().any(is_space) {
        return Err(ValidationError::InvalidEmail);
    }

    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    // Any dot with at least one character either side will do
    let dotted = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !dotted {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Whitespace as browsers' regular expressions define `\s`: Unicode space
/// separators, line terminators and the byte order mark. U+0085 is not part
/// of that set.
fn is_space(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\u{0b}' | '\u{0c}' | '\r' | ' ' | '\u{a0}' | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}' | '\u{2029}' | '\u{202f}' | '\u{205f}' | '\u{3000}' | '\u{feff}'
    )
}

/// Parse `raw` as an absolute URL, retrying with an `https://` prefix.
///
/// The returned string is the canonical serialization, so `example.com`
/// becomes `https://example.com/`.
pub fn normalize_url(raw: &str) -> Result<NormalizedUrl, ValidationError> {
    if let Ok(url) = Url::parse(raw) {
        return Ok(NormalizedUrl::from_parsed(url));
    }

    Url::parse(&format!("https://{}", raw))
        .map(NormalizedUrl::from_parsed)
        .map_err(|_| ValidationError::InvalidUrl)
}
