//! Session credential extraction and the authentication gate.
//!
//! Flow Overview: read the `auth_token` cookie (or, failing that, an
//! `Authorization: Bearer` header), verify it with the token service, and
//! return the principal. Ownership of a particular link is checked by the
//! handler that knows which link is in play, never here.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, InvalidHeaderValue},
};

use super::error::ApiError;
use crate::token::TokenService;

pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Largest signed 32-bit value; browsers treat it as "never expires".
pub const AUTH_COOKIE_MAX_AGE: i64 = 2_147_483_647;

/// Identity proven by a valid session token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
}

/// Verify the request's session credential.
///
/// # Errors
/// Returns `ApiError::Unauthenticated` when no credential is present or it
/// fails verification for any reason.
pub fn require_auth(headers: &HeaderMap, tokens: &TokenService) -> Result<Principal, ApiError> {
    let token = extract_credential(headers).ok_or(ApiError::Unauthenticated)?;
    let email = tokens.verify(&token)?;
    Ok(Principal { email })
}

/// Like [`require_auth`] but yields `None` instead of an error.
pub fn optional_auth(headers: &HeaderMap, tokens: &TokenService) -> Option<Principal> {
    require_auth(headers, tokens).ok()
}

/// The cookie wins when both a cookie and a bearer header are sent.
pub(crate) fn extract_credential(headers: &HeaderMap) -> Option<String> {
    extract_cookie_token(headers).or_else(|| extract_bearer_token(headers))
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            let val = val.trim();
            if key.trim() == AUTH_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Build the `Set-Cookie` value carrying a freshly issued session token.
pub(crate) fn session_cookie(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{AUTH_COOKIE_NAME}={token}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={AUTH_COOKIE_MAX_AGE}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn tokens() -> TokenService {
        TokenService::new(SecretString::from("test-secret".to_string()))
    }

    fn headers(pairs: Vec<(axum::http::HeaderName, String)>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(name, HeaderValue::from_str(&value).unwrap());
        }
        headers
    }

    #[test]
    fn missing_credential_is_unauthenticated() {
        let result = require_auth(&HeaderMap::new(), &tokens());
        assert!(matches!(result, Err(ApiError::Unauthenticated)));
    }

    #[test]
    fn cookie_token_is_accepted() {
        let tokens = tokens();
        let token = tokens.issue("ada@example.org").unwrap();
        let headers = headers(vec![(COOKIE, format!("theme=dark; auth_token={token}; x=1"))]);
        assert_eq!(
            require_auth(&headers, &tokens).unwrap().email,
            "ada@example.org"
        );
    }

    #[test]
    fn bearer_token_is_accepted() {
        let tokens = tokens();
        let token = tokens.issue("ada@example.org").unwrap();
        let headers = headers(vec![(AUTHORIZATION, format!("Bearer {token}"))]);
        assert_eq!(
            require_auth(&headers, &tokens).unwrap().email,
            "ada@example.org"
        );
    }

    #[test]
    fn cookie_takes_precedence_over_bearer() {
        let tokens = tokens();
        let cookie = tokens.issue("cookie@example.org").unwrap();
        let bearer = tokens.issue("bearer@example.org").unwrap();
        let headers = headers(vec![
            (COOKIE, format!("auth_token={cookie}")),
            (AUTHORIZATION, format!("Bearer {bearer}")),
        ]);
        assert_eq!(
            require_auth(&headers, &tokens).unwrap().email,
            "cookie@example.org"
        );
    }

    #[test]
    fn invalid_cookie_does_not_fall_back_to_bearer() {
        let tokens = tokens();
        let bearer = tokens.issue("bearer@example.org").unwrap();
        let headers = headers(vec![
            (COOKIE, "auth_token=garbage".to_string()),
            (AUTHORIZATION, format!("Bearer {bearer}")),
        ]);
        assert!(matches!(
            require_auth(&headers, &tokens),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn empty_cookie_falls_back_to_bearer() {
        let tokens = tokens();
        let bearer = tokens.issue("bearer@example.org").unwrap();
        let headers = headers(vec![
            (COOKIE, "auth_token=".to_string()),
            (AUTHORIZATION, format!("Bearer {bearer}")),
        ]);
        assert_eq!(
            require_auth(&headers, &tokens).unwrap().email,
            "bearer@example.org"
        );
    }

    #[test]
    fn forged_token_is_unauthenticated() {
        let forged = TokenService::new(SecretString::from("other".to_string()))
            .issue("ada@example.org")
            .unwrap();
        let headers = headers(vec![(AUTHORIZATION, format!("Bearer {forged}"))]);
        assert!(optional_auth(&headers, &tokens()).is_none());
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("abc.def.ghi").unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "auth_token=abc.def.ghi; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=2147483647"
        );
    }
}
