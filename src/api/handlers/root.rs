use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{Html, IntoResponse},
};
use std::sync::Arc;

use crate::{
    api::{auth::optional_auth, views, ServerConfig},
    token::TokenService,
};

// axum handler for /
pub async fn root(
    headers: HeaderMap,
    tokens: Extension<Arc<TokenService>>,
    config: Extension<Arc<ServerConfig>>,
) -> impl IntoResponse {
    match optional_auth(&headers, &tokens) {
        Some(principal) => Html(views::dashboard(&principal.email, config.base_url())),
        None => Html(views::login()),
    }
}
