use axum::{
    extract::{Extension, Query},
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use super::found;
use crate::{
    api::{auth::session_cookie, error::ApiError},
    oauth::OAuthClient,
    token::TokenService,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// Login entry point and OAuth callback in one route: without `code` the
/// browser is sent upstream, with `code` the login is completed.
#[instrument(skip_all)]
pub async fn oauth2(
    Query(params): Query<CallbackParams>,
    oauth: Extension<Arc<OAuthClient>>,
    tokens: Extension<Arc<TokenService>>,
) -> Response {
    if let Some(error) = params.error {
        info!("Identity provider returned error: {}", error);
        return ApiError::InvalidInput("Sign in was not completed").into_response();
    }

    let code = params.code.filter(|code| !code.is_empty());
    let result = match code {
        None => oauth
            .authorization_url()
            .map(|url| found(url.as_str()))
            .map_err(ApiError::from),
        Some(code) => complete_login(&oauth, &tokens, &code).await,
    };

    match result {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn complete_login(
    oauth: &OAuthClient,
    tokens: &TokenService,
    code: &str,
) -> Result<Response, ApiError> {
    let email = oauth.identify(code).await?;

    if !oauth.config().is_allowed_email(&email) {
        info!("Rejected login from disallowed domain");
        return Err(ApiError::DomainNotAllowed(allowed_domains_label(
            oauth.config().allowed_domains(),
        )));
    }

    let token = tokens.issue(&email)?;
    let cookie = session_cookie(&token)
        .map_err(|err| ApiError::Internal(format!("invalid session cookie: {err}")))?;

    info!("Signed in {}", email);

    let mut response = found("/");
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}

/// `@a.org`, `@a.org and @b.org`, `@a.org, @b.org and @c.org`.
fn allowed_domains_label(domains: &[String]) -> String {
    let labels: Vec<String> = domains.iter().map(|domain| format!("@{domain}")).collect();
    match labels.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_label() {
        let domains = |list: &[&str]| list.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(allowed_domains_label(&domains(&[])), "");
        assert_eq!(allowed_domains_label(&domains(&["a.org"])), "@a.org");
        assert_eq!(
            allowed_domains_label(&domains(&["a.org", "b.org"])),
            "@a.org and @b.org"
        );
        assert_eq!(
            allowed_domains_label(&domains(&["a.org", "b.org", "c.org"])),
            "@a.org, @b.org and @c.org"
        );
    }
}
