use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";

#[derive(Debug, Clone)]
pub struct Options {
    pub jwt_secret: SecretString,
}

impl Options {
    /// Parse session signing arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the signing secret is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let secret = matches.get_one::<String>(ARG_JWT_SECRET).cloned();
        let secret = match secret {
            Some(value) if !value.trim().is_empty() => value,
            _ => anyhow::bail!("missing required argument: --{ARG_JWT_SECRET}"),
        };

        Ok(Self {
            jwt_secret: SecretString::from(secret),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_JWT_SECRET)
            .long(ARG_JWT_SECRET)
            .help("HMAC key used to sign and verify session tokens")
            .long_help(
                "HMAC key used to sign and verify session tokens.\n\nTokens carry no practical expiry and there is no revocation list: rotating this key is the only way to sign everyone out.",
            )
            .env("SHORTLINK_JWT_SECRET")
            .hide_env_values(true),
    )
}
