use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::oauth::{DEFAULT_AUTHORIZE_URL, DEFAULT_SCOPE, DEFAULT_TOKEN_URL, DEFAULT_USERINFO_URL};

pub const ARG_OAUTH_CLIENT_ID: &str = "oauth-client-id";
pub const ARG_OAUTH_CLIENT_SECRET: &str = "oauth-client-secret";
pub const ARG_OAUTH_AUTHORIZE_URL: &str = "oauth-authorize-url";
pub const ARG_OAUTH_TOKEN_URL: &str = "oauth-token-url";
pub const ARG_OAUTH_USERINFO_URL: &str = "oauth-userinfo-url";
pub const ARG_OAUTH_SCOPE: &str = "oauth-scope";
pub const ARG_ALLOWED_DOMAINS: &str = "allowed-domains";

#[derive(Debug, Clone)]
pub struct Options {
    pub client_id: String,
    pub client_secret: SecretString,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scope: String,
    pub allowed_domains: Vec<String>,
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the client credentials or the domain allow-list are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // Helper to filter empty strings which clap might pass through if env vars are set to ""
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let Some(client_id) = get_non_empty(ARG_OAUTH_CLIENT_ID) else {
            anyhow::bail!("missing required argument: --{ARG_OAUTH_CLIENT_ID}");
        };
        let Some(client_secret) = get_non_empty(ARG_OAUTH_CLIENT_SECRET) else {
            anyhow::bail!("missing required argument: --{ARG_OAUTH_CLIENT_SECRET}");
        };

        let allowed_domains: Vec<String> = matches
            .get_many::<String>(ARG_ALLOWED_DOMAINS)
            .map(|values| {
                values
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if allowed_domains.is_empty() {
            anyhow::bail!("missing required argument: --{ARG_ALLOWED_DOMAINS}");
        }

        Ok(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            authorize_url: get_non_empty(ARG_OAUTH_AUTHORIZE_URL)
                .unwrap_or_else(|| DEFAULT_AUTHORIZE_URL.to_string()),
            token_url: get_non_empty(ARG_OAUTH_TOKEN_URL)
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            userinfo_url: get_non_empty(ARG_OAUTH_USERINFO_URL)
                .unwrap_or_else(|| DEFAULT_USERINFO_URL.to_string()),
            scope: get_non_empty(ARG_OAUTH_SCOPE).unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            allowed_domains,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OAUTH_CLIENT_ID)
                .long(ARG_OAUTH_CLIENT_ID)
                .help("OAuth client id registered with the identity provider")
                .env("SHORTLINK_OAUTH_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_OAUTH_CLIENT_SECRET)
                .long(ARG_OAUTH_CLIENT_SECRET)
                .help("OAuth client secret")
                .env("SHORTLINK_OAUTH_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_OAUTH_AUTHORIZE_URL)
                .long(ARG_OAUTH_AUTHORIZE_URL)
                .help("Authorization endpoint")
                .env("SHORTLINK_OAUTH_AUTHORIZE_URL")
                .default_value(DEFAULT_AUTHORIZE_URL),
        )
        .arg(
            Arg::new(ARG_OAUTH_TOKEN_URL)
                .long(ARG_OAUTH_TOKEN_URL)
                .help("Token endpoint")
                .env("SHORTLINK_OAUTH_TOKEN_URL")
                .default_value(DEFAULT_TOKEN_URL),
        )
        .arg(
            Arg::new(ARG_OAUTH_USERINFO_URL)
                .long(ARG_OAUTH_USERINFO_URL)
                .help("Userinfo endpoint")
                .env("SHORTLINK_OAUTH_USERINFO_URL")
                .default_value(DEFAULT_USERINFO_URL),
        )
        .arg(
            Arg::new(ARG_OAUTH_SCOPE)
                .long(ARG_OAUTH_SCOPE)
                .help("Scope requested at login")
                .env("SHORTLINK_OAUTH_SCOPE")
                .default_value(DEFAULT_SCOPE),
        )
        .arg(
            Arg::new(ARG_ALLOWED_DOMAINS)
                .long(ARG_ALLOWED_DOMAINS)
                .help("Comma separated email domains allowed to sign in, e.g. example.org,lsoc.org")
                .env("SHORTLINK_ALLOWED_DOMAINS")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
}
