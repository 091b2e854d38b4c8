pub mod health;
pub use self::health::health;

pub mod links;
pub mod oauth2;
pub mod root;

// common functions for the handlers
use axum::{
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use rand::{distributions::Slice, Rng};
use regex::Regex;
use std::sync::OnceLock;
use tracing::error;
use url::Url;

use super::error::ApiError;

pub const GENERATED_SLUG_LEN: usize = 8;

/// `create`, `health`, `oauth2` and `swagger-ui` are shadowed by fixed routes.
/// `api` and `api-docs` are held back as prefixes of the JSON API and its document.
pub const RESERVED_SLUGS: &[&str] = &["api", "api-docs", "create", "health", "oauth2", "swagger-ui"];

const SLUG_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l',
    'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4',
    '5', '6', '7', '8', '9', '_', '-',
];

fn slug_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").ok())
        .as_ref()
}

#[must_use]
pub fn valid_slug(slug: &str) -> bool {
    slug_pattern().is_some_and(|re| re.is_match(slug))
}

#[must_use]
pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

/// Random slug drawn from the URL-safe alphabet, so it always passes [`valid_slug`].
#[must_use]
pub fn generate_slug() -> String {
    let Ok(alphabet) = Slice::new(SLUG_ALPHABET) else {
        unreachable!("slug alphabet is not empty");
    };
    rand::thread_rng()
        .sample_iter(alphabet)
        .take(GENERATED_SLUG_LEN)
        .collect()
}

/// Resolve the slug for a new link: a trimmed, non-blank `name` or a generated one.
///
/// # Errors
/// Returns `InvalidInput` when the name has characters outside `A-Za-z0-9_-`
/// or collides with a fixed route.
pub fn resolve_slug(name: Option<&str>) -> Result<String, ApiError> {
    let name = name.map(str::trim).filter(|name| !name.is_empty());
    let Some(name) = name else {
        return Ok(generate_slug());
    };
    if !valid_slug(name) {
        return Err(ApiError::InvalidInput("Invalid name format"));
    }
    if is_reserved(name) {
        return Err(ApiError::InvalidInput("Name is reserved"));
    }
    Ok(name.to_string())
}

/// A destination must be an absolute http(s) URL. The trimmed input is kept verbatim.
///
/// # Errors
/// Returns `InvalidInput` when the destination is blank or not an http(s) URL.
pub fn validate_destination(destination: Option<&str>) -> Result<String, ApiError> {
    let destination = destination
        .map(str::trim)
        .filter(|destination| !destination.is_empty())
        .ok_or(ApiError::InvalidInput("Missing destination"))?;

    match Url::parse(destination) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(destination.to_string())
        }
        _ => Err(ApiError::InvalidInput("Invalid destination")),
    }
}

/// `302 Found` to `location`. axum's `Redirect` only offers 303/307/308.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(err) => {
            // Stored destinations passed URL parsing, so fall back to the normalized form.
            match Url::parse(location)
                .ok()
                .and_then(|url| HeaderValue::from_str(url.as_str()).ok())
            {
                Some(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
                None => {
                    error!("Failed to build Location header: {}", err);
                    ApiError::Internal("invalid redirect location".to_string()).into_response()
                }
            }
        }
    }
}
