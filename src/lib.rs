//! # Shortlink (private URL shortener)
//!
//! `shortlink` maps short slugs to destination URLs for members of an
//! organization. Anyone holding a slug is redirected; only people who signed
//! in with an allowed email domain can create links, and only a link's creator
//! can change or delete it.
//!
//! ## Sessions
//!
//! Signing in goes through the organization's OAuth identity provider. On
//! success the service issues an HS256-signed session token carrying the
//! user's email and an expiry far in the future. The token travels in the
//! `auth_token` cookie or an `Authorization: Bearer` header. There is no
//! server-side session state and no revocation list: rotating the signing
//! secret is the only way to invalidate outstanding tokens.
//!
//! ## Links
//!
//! - **Slugs** match `[A-Za-z0-9_-]+`, are case-sensitive, and are either chosen by
//!   the creator or generated (8 characters).
//! - **Uniqueness** is enforced by the store's conditional insert; concurrent
//!   creates of the same slug have exactly one winner.
//! - **Clicks** are counted after the redirect is answered; a failed increment
//!   never fails the redirect.
//! - **Deletes** are hard deletes and free the slug for reuse.

pub mod api;
pub mod cli;
pub mod oauth;
pub mod store;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
