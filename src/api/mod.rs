use crate::{
    api::handlers::{health, links, oauth2, root},
    oauth::OAuthClient,
    store::SharedLinkStore,
    token::TokenService,
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, patch, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error;
pub(crate) mod handlers;
mod openapi;
pub mod views;

pub use openapi::openapi;

/// Public-facing settings shared by the handlers.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    base_url: String,
}

impl ServerConfig {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Public origin without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn short_url(&self, slug: &str) -> String {
        format!("{}/{slug}", self.base_url)
    }
}

/// Everything the handlers need, built once at startup.
#[derive(Clone)]
pub struct Services {
    pub store: SharedLinkStore,
    pub tokens: Arc<TokenService>,
    pub oauth: Arc<OAuthClient>,
    pub config: Arc<ServerConfig>,
}

/// Build the application router.
///
/// Fixed routes take priority over the single-segment redirect, so
/// `/<slug>/manage` and `/api/...` are never treated as slugs.
pub fn app(services: Services) -> Router {
    Router::new()
        .route("/", get(root::root))
        .route("/oauth2", get(oauth2::oauth2))
        .route("/create", post(links::create))
        .route("/health", get(health::health).options(health::health))
        .route("/api/links/:slug/clicks", get(links::clicks))
        .route(
            "/api/links/:slug",
            patch(links::update).delete(links::delete),
        )
        .route("/:slug/manage", get(links::manage))
        .route("/:slug", get(links::redirect))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(services.store))
                .layer(Extension(services.tokens))
                .layer(Extension(services.oauth))
                .layer(Extension(services.config)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, services: Services) -> Result<()> {
    let app = app(services);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_urls_join_on_single_slash() {
        let config = ServerConfig::new("https://lnk.example.org/");
        assert_eq!(config.base_url(), "https://lnk.example.org");
        assert_eq!(config.short_url("abc"), "https://lnk.example.org/abc");
    }
}
