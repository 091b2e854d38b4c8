use crate::{
    api::{self, ServerConfig, Services},
    oauth::{OAuthClient, OAuthConfig},
    store,
    token::TokenService,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub base_url: String,
    pub jwt_secret: SecretString,
    pub oauth_client_id: String,
    pub oauth_client_secret: SecretString,
    pub oauth_authorize_url: String,
    pub oauth_token_url: String,
    pub oauth_userinfo_url: String,
    pub oauth_scope: String,
    pub allowed_domains: Vec<String>,
}

impl Args {
    fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig::new(
            self.oauth_client_id.clone(),
            self.oauth_client_secret.clone(),
            &self.base_url,
            self.allowed_domains.clone(),
        )
        .with_authorize_url(self.oauth_authorize_url.clone())
        .with_token_url(self.oauth_token_url.clone())
        .with_userinfo_url(self.oauth_userinfo_url.clone())
        .with_scope(self.oauth_scope.clone())
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the link store cannot be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let oauth = OAuthClient::new(args.oauth_config()).context("Failed to build OAuth client")?;
    info!("OAuth callback: {}", oauth.config().redirect_uri());

    let store = store::connect(&args.dsn).await?;

    let services = Services {
        store,
        tokens: Arc::new(TokenService::new(args.jwt_secret)),
        oauth: Arc::new(oauth),
        config: Arc::new(ServerConfig::new(&args.base_url)),
    };

    api::new(args.port, services).await
}
