use std::sync::Arc;

use rand::{Rng, distr::Alphanumeric};
use reqwest::StatusCode;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::instrument;
use url::Url;
use utils::api::oauth::HandoffMessage;

use super::{
    handoff::{HandoffError, HandoffStore, TokenBundle},
    provider::{AuthorizationProvider, AuthorizeRequest, ExchangeError},
};
use crate::config::OAuthClientConfig;

const STATE_LENGTH: usize = 48;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("missing client_id or redirect_uri")]
    BadRequest,
    #[error("invalid state or missing code")]
    InvalidState,
    #[error("oauth server not configured")]
    ServerMisconfigured,
    #[error("token exchange rejected with status {status}")]
    UpstreamExchangeFailed { status: StatusCode, body: String },
    #[error("token exchange timed out")]
    UpstreamTimeout,
    #[error("token exchange failed: {0}")]
    Upstream(#[source] reqwest::Error),
}

impl From<ExchangeError> for FlowError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Rejected { status, body } => {
                FlowError::UpstreamExchangeFailed { status, body }
            }
            ExchangeError::Timeout => FlowError::UpstreamTimeout,
            ExchangeError::Transport(err) => FlowError::Upstream(err),
        }
    }
}

/// Redirect target and anti-forgery token for a freshly started flow.
#[derive(Debug, Clone)]
pub struct AuthorizationStart {
    pub authorize_url: Url,
    pub state: String,
}

/// Drives the authorization-code flow. Nothing is kept server-side between
/// `start` and `complete`: the state token round-trips through a cookie, and
/// the exchanged tokens only exist in the [`HandoffStore`] until redeemed.
pub struct OAuthFlowService {
    provider: Arc<dyn AuthorizationProvider>,
    store: Arc<HandoffStore>,
    credentials: Option<OAuthClientConfig>,
    bridge_target_origin: String,
}

impl OAuthFlowService {
    pub fn new(
        provider: Arc<dyn AuthorizationProvider>,
        store: Arc<HandoffStore>,
        credentials: Option<OAuthClientConfig>,
        bridge_target_origin: String,
    ) -> Self {
        Self {
            provider,
            store,
            credentials,
            bridge_target_origin,
        }
    }

    pub fn store(&self) -> Arc<HandoffStore> {
        Arc::clone(&self.store)
    }

    pub fn start(
        &self,
        client_id: Option<&str>,
        redirect_uri: Option<&str>,
        scope: Option<&str>,
    ) -> Result<AuthorizationStart, FlowError> {
        let (Some(client_id), Some(redirect_uri)) = (present(client_id), present(redirect_uri))
        else {
            return Err(FlowError::BadRequest);
        };
        let scope = present(scope).unwrap_or_else(|| self.provider.default_scope());

        let state = generate_state();
        let authorize_url = self.provider.authorize_url(AuthorizeRequest {
            client_id,
            redirect_uri,
            scope,
            state: &state,
        });

        tracing::info!(provider = self.provider.name(), "oauth flow started");

        Ok(AuthorizationStart {
            authorize_url,
            state,
        })
    }

    /// Validates the callback, exchanges the code and parks the tokens.
    /// Returns the handoff id the browser will redeem.
    #[instrument(name = "oauth_callback", skip_all, fields(provider = self.provider.name()))]
    pub async fn complete(
        &self,
        code: Option<&str>,
        state: Option<&str>,
        cookie_state: Option<&str>,
    ) -> Result<String, FlowError> {
        let (Some(code), Some(state), Some(cookie_state)) =
            (present(code), present(state), present(cookie_state))
        else {
            return Err(FlowError::InvalidState);
        };

        if !bool::from(state.as_bytes().ct_eq(cookie_state.as_bytes())) {
            tracing::warn!("oauth state does not match cookie");
            return Err(FlowError::InvalidState);
        }

        let credentials = self
            .credentials
            .as_ref()
            .ok_or(FlowError::ServerMisconfigured)?;

        let tokens = self.provider.exchange_code(code, credentials).await?;
        let handoff_id = self.store.put(tokens);

        tracing::info!(pending = self.store.len(), "oauth flow completed");

        Ok(handoff_id)
    }

    pub fn redeem(&self, handoff_id: &str) -> Result<TokenBundle, HandoffError> {
        self.store.take(handoff_id)
    }

    /// Page that hands `{ auth_id }` to the opener window and closes itself.
    pub fn bridge_page(&self, handoff_id: &str) -> String {
        let payload = script_json(&HandoffMessage {
            auth_id: handoff_id.to_string(),
        });
        let target_origin = script_json(&self.bridge_target_origin);

        format!(
            r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>OAuth Complete</title></head>
<body>
<script>
  (function () {{
    try {{
      var payload = {payload};
      if (window.opener && typeof window.opener.postMessage === 'function') {{
        window.opener.postMessage(payload, {target_origin});
      }}
    }} catch (e) {{}}
    setTimeout(function () {{ window.close(); }}, 500);
  }})();
</script>
OAuth complete. You can close this window.
</body>
</html>
"#
        )
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// JSON literal that is safe to inline inside a `<script>` element.
fn script_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
}
