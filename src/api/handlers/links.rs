//! Link creation, redirect, and owner-only management.

use axum::{
    extract::{Extension, Form, Path},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument, Span};
use utoipa::ToSchema;

use super::{found, resolve_slug, validate_destination};
use crate::{
    api::{auth::require_auth, error::ApiError, views, ServerConfig},
    store::{SharedLinkStore, StoreError},
    token::TokenService,
};

#[derive(Debug, Deserialize)]
pub struct CreateLinkForm {
    name: Option<String>,
    destination: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateLinkRequest {
    /// New absolute http(s) destination.
    destination: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ClicksResponse {
    pub clicks: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

// axum handler for POST /create
#[instrument(skip_all)]
pub async fn create(
    headers: HeaderMap,
    store: Extension<SharedLinkStore>,
    tokens: Extension<Arc<TokenService>>,
    form: Option<Form<CreateLinkForm>>,
) -> Response {
    let principal = match require_auth(&headers, &tokens) {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    let form = form.map(|Form(form)| form);
    let (name, destination) = form.map_or((None, None), |form| (form.name, form.destination));

    let destination = match validate_destination(destination.as_deref()) {
        Ok(destination) => destination,
        Err(err) => return err.into_response(),
    };

    let slug = match resolve_slug(name.as_deref()) {
        Ok(slug) => slug,
        Err(err) => return err.into_response(),
    };

    match store.create(&slug, &principal.email, &destination).await {
        Ok(link) => {
            info!("Created link {}", link.slug);
            found(&format!("/{}/manage", link.slug))
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

// axum handler for GET /:slug
#[instrument(skip(store))]
pub async fn redirect(Path(slug): Path<String>, store: Extension<SharedLinkStore>) -> Response {
    let link = match store.get(&slug).await {
        Ok(link) => link,
        Err(err) => return ApiError::from(err).into_response(),
    };

    // Counting never holds up or fails the redirect.
    let counter = Arc::clone(&store.0);
    tokio::spawn(
        async move {
            if let Err(err) = counter.increment_clicks(&slug).await {
                warn!("Failed to increment clicks for {}: {}", slug, err);
            }
        }
        .instrument(Span::current()),
    );

    found(&link.destination)
}

// axum handler for GET /:slug/manage
#[instrument(skip_all, fields(slug = %slug))]
pub async fn manage(
    Path(slug): Path<String>,
    headers: HeaderMap,
    store: Extension<SharedLinkStore>,
    tokens: Extension<Arc<TokenService>>,
    config: Extension<Arc<ServerConfig>>,
) -> Response {
    let principal = match require_auth(&headers, &tokens) {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    match store.get(&slug).await {
        Ok(link) if link.is_owned_by(&principal.email) => {
            Html(views::manage(&config.short_url(&link.slug), link.clicks)).into_response()
        }
        Ok(_) => ApiError::Forbidden.into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path= "/api/links/{slug}/clicks",
    params(("slug" = String, Path, description = "Short link identifier")),
    responses (
        (status = 200, description = "Current click count", body = ClicksResponse),
        (status = 404, description = "Link not found, reported as zero clicks", body = ClicksResponse),
    ),
    tag= "links"
)]
// axum handler for GET /api/links/:slug/clicks
#[instrument(skip(store))]
pub async fn clicks(Path(slug): Path<String>, store: Extension<SharedLinkStore>) -> Response {
    match store.get(&slug).await {
        Ok(link) => (StatusCode::OK, Json(ClicksResponse { clicks: link.clicks })).into_response(),
        Err(StoreError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, Json(ClicksResponse { clicks: 0 })).into_response()
        }
        Err(err) => {
            error!("Failed to read clicks for {}: {}", slug, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ClicksResponse { clicks: 0 }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    patch,
    path= "/api/links/{slug}",
    params(("slug" = String, Path, description = "Short link identifier")),
    request_body = UpdateLinkRequest,
    responses (
        (status = 200, description = "Destination updated", body = SuccessResponse),
        (status = 400, description = "Missing or invalid destination"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Requester is not the creator"),
        (status = 404, description = "Link not found"),
    ),
    tag= "links"
)]
// axum handler for PATCH /api/links/:slug
#[instrument(skip_all, fields(slug = %slug))]
pub async fn update(
    Path(slug): Path<String>,
    headers: HeaderMap,
    store: Extension<SharedLinkStore>,
    tokens: Extension<Arc<TokenService>>,
    payload: Option<Json<UpdateLinkRequest>>,
) -> Response {
    let principal = match require_auth(&headers, &tokens) {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    let destination = payload.and_then(|Json(request)| request.destination);
    let destination = match validate_destination(destination.as_deref()) {
        Ok(destination) => destination,
        Err(err) => return err.into_response(),
    };

    match store
        .update_destination(&slug, &destination, &principal.email)
        .await
    {
        Ok(()) => {
            info!("Updated destination of {}", slug);
            Json(SuccessResponse { success: true }).into_response()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[utoipa::path(
    delete,
    path= "/api/links/{slug}",
    params(("slug" = String, Path, description = "Short link identifier")),
    responses (
        (status = 200, description = "Link deleted", body = SuccessResponse),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Requester is not the creator"),
        (status = 404, description = "Link not found"),
    ),
    tag= "links"
)]
// axum handler for DELETE /api/links/:slug
#[instrument(skip_all, fields(slug = %slug))]
pub async fn delete(
    Path(slug): Path<String>,
    headers: HeaderMap,
    store: Extension<SharedLinkStore>,
    tokens: Extension<Arc<TokenService>>,
) -> Response {
    let principal = match require_auth(&headers, &tokens) {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    match store.delete(&slug, &principal.email).await {
        Ok(()) => {
            info!("Deleted link {}", slug);
            Json(SuccessResponse { success: true }).into_response()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}
