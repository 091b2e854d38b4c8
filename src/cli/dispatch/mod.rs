//! Map validated CLI arguments to the action to run.

use crate::cli::{
    actions::{server::Args, Action},
    commands::{oauth, session, ARG_BASE_URL, ARG_DSN, ARG_PORT, DEFAULT_BASE_URL},
};
use anyhow::{Context, Result};
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let base_url = matches
        .get_one::<String>(ARG_BASE_URL)
        .map_or(DEFAULT_BASE_URL, String::as_str);
    let base_url = validate_base_url(base_url)?;

    let session_opts = session::Options::parse(matches)?;
    let oauth_opts = oauth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        base_url,
        jwt_secret: session_opts.jwt_secret,
        oauth_client_id: oauth_opts.client_id,
        oauth_client_secret: oauth_opts.client_secret,
        oauth_authorize_url: oauth_opts.authorize_url,
        oauth_token_url: oauth_opts.token_url,
        oauth_userinfo_url: oauth_opts.userinfo_url,
        oauth_scope: oauth_opts.scope,
        allowed_domains: oauth_opts.allowed_domains,
    }))
}

fn validate_base_url(base_url: &str) -> Result<String> {
    let parsed =
        Url::parse(base_url).with_context(|| format!("Invalid --{ARG_BASE_URL}: {base_url}"))?;
    if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
        anyhow::bail!("--{ARG_BASE_URL} must be an absolute http(s) URL: {base_url}");
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const REQUIRED_ENV: [(&str, Option<&str>); 5] = [
        ("SHORTLINK_DSN", Some("memory://")),
        ("SHORTLINK_JWT_SECRET", Some("jwt-secret")),
        ("SHORTLINK_OAUTH_CLIENT_ID", Some("client-id")),
        ("SHORTLINK_OAUTH_CLIENT_SECRET", Some("client-secret")),
        ("SHORTLINK_ALLOWED_DOMAINS", Some("example.org, lsoc.org")),
    ];

    fn with_env<F: FnOnce()>(overrides: &[(&'static str, Option<&'static str>)], test: F) {
        let mut vars: Vec<(&str, Option<&str>)> = REQUIRED_ENV.to_vec();
        vars.push(("SHORTLINK_BASE_URL", None));
        vars.push(("SHORTLINK_PORT", None));
        for (key, value) in overrides {
            vars.retain(|(existing, _)| existing != key);
            vars.push((*key, *value));
        }
        temp_env::with_vars(vars, test);
    }

    #[test]
    fn server_action_from_env() {
        with_env(&[], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["shortlink"]);
            let Action::Server(args) = handler(&matches).unwrap();
            assert_eq!(args.port, 8080);
            assert_eq!(args.dsn, "memory://");
            assert_eq!(args.base_url, DEFAULT_BASE_URL);
            assert_eq!(args.jwt_secret.expose_secret(), "jwt-secret");
            assert_eq!(args.oauth_client_id, "client-id");
            assert_eq!(args.allowed_domains, ["example.org", "lsoc.org"]);
            assert_eq!(args.oauth_scope, crate::oauth::DEFAULT_SCOPE);
        });
    }

    #[test]
    fn jwt_secret_required() {
        with_env(&[("SHORTLINK_JWT_SECRET", None)], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["shortlink"]);
            let err = handler(&matches).unwrap_err();
            assert!(err
                .to_string()
                .contains("missing required argument: --jwt-secret"));
        });
    }

    #[test]
    fn blank_jwt_secret_rejected() {
        with_env(&[("SHORTLINK_JWT_SECRET", Some("   "))], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["shortlink"]);
            assert!(handler(&matches).is_err());
        });
    }

    #[test]
    fn allowed_domains_required() {
        with_env(&[("SHORTLINK_ALLOWED_DOMAINS", None)], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["shortlink"]);
            let err = handler(&matches).unwrap_err();
            assert!(err
                .to_string()
                .contains("missing required argument: --allowed-domains"));
        });
    }

    #[test]
    fn oauth_client_id_required() {
        with_env(&[("SHORTLINK_OAUTH_CLIENT_ID", None)], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["shortlink"]);
            let err = handler(&matches).unwrap_err();
            assert!(err
                .to_string()
                .contains("missing required argument: --oauth-client-id"));
        });
    }

    #[test]
    fn base_url_must_be_http() {
        with_env(&[("SHORTLINK_BASE_URL", Some("ftp://lnk.example.org"))], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["shortlink"]);
            assert!(handler(&matches).is_err());
        });
        with_env(&[("SHORTLINK_BASE_URL", Some("lnk.example.org"))], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["shortlink"]);
            assert!(handler(&matches).is_err());
        });
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        with_env(&[("SHORTLINK_BASE_URL", Some("https://lnk.example.org/"))], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["shortlink"]);
            let Action::Server(args) = handler(&matches).unwrap();
            assert_eq!(args.base_url, "https://lnk.example.org");
        });
    }
}
