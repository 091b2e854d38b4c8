//! OAuth authorization-code exchange against the upstream identity provider.
//!
//! Flow Overview:
//! 1) Redirect the browser to the authorization endpoint with our callback.
//! 2) Trade the returned `code` for an access token (server-to-server).
//! 3) Fetch the user's email from the userinfo endpoint.
//! 4) Accept the email only if its domain is on the allow-list.
//!
//! No retries and no explicit timeouts; outbound calls use the HTTP client's
//! defaults.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::APP_USER_AGENT;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const DEFAULT_SCOPE: &str = "openid email profile";

/// Path of the login/callback route relative to the public base URL.
pub const CALLBACK_PATH: &str = "/oauth2";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} returned {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("token response did not include an access token")]
    MissingAccessToken,
    #[error("userinfo response did not include an email")]
    MissingEmail,
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Clone)]
pub struct OAuthConfig {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    authorize_url: String,
    token_url: String,
    userinfo_url: String,
    scope: String,
    allowed_domains: Vec<String>,
}

impl OAuthConfig {
    /// `base_url` is this service's public origin; the callback is `<base_url>/oauth2`.
    #[must_use]
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        base_url: &str,
        allowed_domains: Vec<String>,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri: format!("{}{CALLBACK_PATH}", base_url.trim_end_matches('/')),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            userinfo_url: DEFAULT_USERINFO_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            allowed_domains: allowed_domains
                .iter()
                .map(|domain| normalize_domain(domain))
                .filter(|domain| !domain.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn with_authorize_url(mut self, url: String) -> Self {
        self.authorize_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: String) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_userinfo_url(mut self, url: String) -> Self {
        self.userinfo_url = url;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: String) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    #[must_use]
    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    /// True when the part after the last `@` equals one of the allowed domains
    /// (ASCII case-insensitive). Subdomains are not implied.
    #[must_use]
    pub fn is_allowed_email(&self, email: &str) -> bool {
        let Some((local, domain)) = email.trim().rsplit_once('@') else {
            return false;
        };
        !local.is_empty()
            && self
                .allowed_domains
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(domain))
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("scope", &self.scope)
            .field("allowed_domains", &self.allowed_domains)
            .finish()
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('@').to_ascii_lowercase()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: Client,
}

impl OAuthClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthError> {
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;
        Ok(Self { config, http })
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Where to send the browser to start a login.
    ///
    /// # Errors
    /// Returns an error if the configured authorization endpoint is not a URL.
    pub fn authorization_url(&self) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&self.config.authorize_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scope);
        Ok(url)
    }

    /// Trade an authorization code for an access token.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx response or a response
    /// without `access_token`.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<SecretString, OAuthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::Status {
                endpoint: "token endpoint",
                status,
            });
        }

        let body: TokenResponse = response.json().await?;
        if let Some(error) = body.error.as_deref() {
            debug!("token endpoint reported error: {error}");
        }
        body.access_token
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
            .ok_or(OAuthError::MissingAccessToken)
    }

    /// Fetch the authenticated user's email with an access token.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx response or a response
    /// without `email`.
    #[instrument(skip_all)]
    pub async fn fetch_email(&self, access_token: &SecretString) -> Result<String, OAuthError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::Status {
                endpoint: "userinfo endpoint",
                status,
            });
        }

        let user: UserInfo = response.json().await?;
        user.email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .ok_or(OAuthError::MissingEmail)
    }

    /// Run the code exchange and userinfo lookup, returning the upstream email.
    /// The domain allow-list is checked by the caller.
    ///
    /// # Errors
    /// See [`OAuthClient::exchange_code`] and [`OAuthClient::fetch_email`].
    pub async fn identify(&self, code: &str) -> Result<String, OAuthError> {
        let access_token = self.exchange_code(code).await?;
        self.fetch_email(&access_token).await
    }
}
