use std::{env, time::Duration};

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8081";
const DEFAULT_BRIDGE_TARGET_ORIGIN: &str = "*";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

const ROBLOX_AUTHORIZE_URL: &str = "https://apis.roblox.com/oauth/v1/authorize";
const ROBLOX_TOKEN_URL: &str = "https://apis.roblox.com/oauth/v1/token";
const ROBLOX_USERS_API: &str = "https://users.roblox.com";
const ROBLOX_FRIENDS_API: &str = "https://friends.roblox.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable `{0}`")]
    InvalidVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub listen_addr: String,
    /// `None` when any of the server OAuth credentials is missing. The server
    /// still starts; the callback step reports a misconfiguration.
    pub oauth: Option<OAuthClientConfig>,
    pub bridge_target_origin: String,
    pub upstream_timeout: Duration,
    pub sweep_interval: Duration,
    pub roblox: RobloxEndpoints,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = non_empty_var("SERVER_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

        let oauth = OAuthClientConfig::from_env();

        let bridge_target_origin = non_empty_var("OAUTH_BRIDGE_TARGET_ORIGIN")
            .unwrap_or_else(|| DEFAULT_BRIDGE_TARGET_ORIGIN.to_string());

        let upstream_timeout = parse_positive_secs(
            "UPSTREAM_TIMEOUT_SECS",
            non_empty_var("UPSTREAM_TIMEOUT_SECS"),
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
        )?;

        let sweep_interval = parse_positive_secs(
            "HANDOFF_SWEEP_INTERVAL_SECS",
            non_empty_var("HANDOFF_SWEEP_INTERVAL_SECS"),
            DEFAULT_SWEEP_INTERVAL_SECS,
        )?;

        Ok(Self {
            listen_addr,
            oauth,
            bridge_target_origin,
            upstream_timeout,
            sweep_interval,
            roblox: RobloxEndpoints::default(),
        })
    }
}

/// Server-held credentials used for the authorization-code exchange.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
}

impl OAuthClientConfig {
    pub fn new(client_id: String, client_secret: SecretString, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    fn from_env() -> Option<Self> {
        let client_id = non_empty_var("OAUTH_CLIENT_ID");
        let client_secret = non_empty_var("OAUTH_CLIENT_SECRET");
        let redirect_uri = non_empty_var("OAUTH_REDIRECT_URI");

        match (client_id, client_secret, redirect_uri) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Some(Self::new(
                client_id,
                SecretString::new(client_secret.into()),
                redirect_uri,
            )),
            (None, None, None) => {
                tracing::warn!(
                    "OAUTH_CLIENT_ID, OAUTH_CLIENT_SECRET and OAUTH_REDIRECT_URI are not set, OAuth callbacks will fail"
                );
                None
            }
            (client_id, client_secret, redirect_uri) => {
                let missing: Vec<&str> = [
                    ("OAUTH_CLIENT_ID", client_id.is_none()),
                    ("OAUTH_CLIENT_SECRET", client_secret.is_none()),
                    ("OAUTH_REDIRECT_URI", redirect_uri.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                tracing::warn!(
                    missing = %missing.join(", "),
                    "OAuth client configuration incomplete, OAuth callbacks will fail"
                );
                None
            }
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

/// Upstream endpoints. Overridable so tests can point at a mock server.
#[derive(Debug, Clone)]
pub struct RobloxEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub users_api: String,
    pub friends_api: String,
}

impl RobloxEndpoints {
    /// Every endpoint rooted at `base`, using the upstream paths.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize_url: format!("{base}/oauth/v1/authorize"),
            token_url: format!("{base}/oauth/v1/token"),
            users_api: base.to_string(),
            friends_api: base.to_string(),
        }
    }
}

impl Default for RobloxEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: ROBLOX_AUTHORIZE_URL.to_string(),
            token_url: ROBLOX_TOKEN_URL.to_string(),
            users_api: ROBLOX_USERS_API.to_string(),
            friends_api: ROBLOX_FRIENDS_API.to_string(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_positive_secs(
    name: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default));
    };

    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidVar(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_fall_back_to_default_when_unset() {
        let parsed = parse_positive_secs("UPSTREAM_TIMEOUT_SECS", None, 10).unwrap();
        assert_eq!(parsed, Duration::from_secs(10));
    }

    #[test]
    fn seconds_must_be_positive_integers() {
        for raw in ["0", "-3", "ten", "1.5"] {
            let result = parse_positive_secs("UPSTREAM_TIMEOUT_SECS", Some(raw.into()), 10);
            assert!(
                matches!(result, Err(ConfigError::InvalidVar("UPSTREAM_TIMEOUT_SECS"))),
                "{raw}"
            );
        }

        let parsed = parse_positive_secs("UPSTREAM_TIMEOUT_SECS", Some(" 4 ".into()), 10).unwrap();
        assert_eq!(parsed, Duration::from_secs(4));
    }

    #[test]
    fn endpoints_share_a_mock_base() {
        let endpoints = RobloxEndpoints::with_base("http://127.0.0.1:9000/");
        assert_eq!(
            endpoints.token_url,
            "http://127.0.0.1:9000/oauth/v1/token"
        );
        assert_eq!(endpoints.users_api, "http://127.0.0.1:9000");
    }
}
