//! Input validation for new links. Pure functions, no I/O.

use url::Url;

use crate::{NewLink, ValidationError};

/// Accepts absolute URLs that carry at least a scheme and an authority.
pub fn is_valid_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => url.has_host(),
        Err(_) => false,
    }
}

/// Check the URL and validity window of a create request, in that order.
/// Returns the validity as stored on the link.
pub fn validate_new_link(input: &NewLink) -> Result<u32, ValidationError> {
    let url = input.long_url.trim();
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    if !is_valid_url(url) {
        return Err(ValidationError::InvalidUrl);
    }
    validate_validity(input.validity_minutes)
}

/// Validity must be a positive number of minutes that fits the stored field.
pub fn validate_validity(minutes: i64) -> Result<u32, ValidationError> {
    if minutes <= 0 {
        return Err(ValidationError::InvalidValidity);
    }
    u32::try_from(minutes).map_err(|_| ValidationError::InvalidValidity)
}

/// A custom shortcode counts as absent when it is missing or whitespace.
pub fn custom_shortcode(input: &NewLink) -> Option<&str> {
    input
        .custom_shortcode
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
