//! Session tokens.
//!
//! Tokens are compact HS256 JWTs carrying `{ email, exp }`. They are signed with
//! a process-wide secret loaded once at startup. There is no revocation list:
//! a token stays valid until its `exp`, which is set to the last second of the
//! year 9999.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// 9999-12-31T23:59:59Z
pub const FAR_FUTURE_EXP: i64 = 253_402_300_799;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub email: String,
    pub exp: i64,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|_| TokenError::Malformed)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

/// Issues and verifies session tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    secret: SecretString,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(self.secret.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
    }

    /// Issue a token for `email` that expires at [`FAR_FUTURE_EXP`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the claims cannot be serialized.
    pub fn issue(&self, email: &str) -> Result<String, TokenError> {
        let claims = SessionClaims {
            email: email.to_string(),
            exp: FAR_FUTURE_EXP,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a token against the current time and return the embedded email.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` for structural problems, `InvalidSignature` when the
    /// MAC does not match and `Expired` once `exp` has passed.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc().unix_timestamp())
            .map(|claims| claims.email)
    }

    /// Verify a token as of `now_unix_seconds` and return its claims.
    ///
    /// # Errors
    ///
    /// See [`TokenService::verify`].
    pub fn verify_at(
        &self,
        token: &str,
        now_unix_seconds: i64,
    ) -> Result<SessionClaims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let claims_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let sig_b64 = parts.next().ok_or(TokenError::Malformed)?;
        if parts.next().is_some() {
            return Err(TokenError::Malformed);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(TokenError::Malformed);
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: SessionClaims = b64d_json(claims_b64)?;
        if claims.exp <= now_unix_seconds {
            return Err(TokenError::Expired);
        }
        if claims.email.is_empty() {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(SecretString::from(secret.to_string()))
    }

    #[test]
    fn issue_then_verify_returns_email() {
        let tokens = service("s3cret");
        let token = tokens.issue("ada@example.org").unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "ada@example.org");
    }

    #[test]
    fn token_has_three_segments_and_far_future_exp() {
        let tokens = service("s3cret");
        let token = tokens.issue("ada@example.org").unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = tokens.verify_at(&token, 0).unwrap();
        assert_eq!(claims.exp, FAR_FUTURE_EXP);
    }

    #[test]
    fn token_outlives_any_realistic_horizon() {
        let tokens = service("s3cret");
        let token = tokens.issue("ada@example.org").unwrap();
        // Year 9000.
        let far = 221_845_392_000;
        assert!(tokens.verify_at(&token, far).is_ok());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = service("one").issue("ada@example.org").unwrap();
        assert_eq!(
            service("two").verify(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let tokens = service("s3cret");
        let token = tokens.issue("ada@example.org").unwrap();
        let forged = b64e_json(&SessionClaims {
            email: "mallory@example.org".to_string(),
            exp: FAR_FUTURE_EXP,
        })
        .unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged;
        assert_eq!(
            tokens.verify(&parts.join(".")),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let tokens = service("s3cret");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert_eq!(tokens.verify(token), Err(TokenError::Malformed), "{token}");
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service("s3cret");
        let token = tokens
            .sign(&SessionClaims {
                email: "ada@example.org".to_string(),
                exp: 1_000,
            })
            .unwrap();
        assert_eq!(tokens.verify_at(&token, 1_000), Err(TokenError::Expired));
        assert!(tokens.verify_at(&token, 999).is_ok());
    }

    #[test]
    fn debug_redacts_secret() {
        let tokens = service("hunter2");
        assert!(!format!("{tokens:?}").contains("hunter2"));
    }
}
