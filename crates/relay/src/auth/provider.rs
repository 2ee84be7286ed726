use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::ACCEPT};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use super::handoff::TokenBundle;
use crate::config::{OAuthClientConfig, RobloxEndpoints};

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("token endpoint rejected the exchange with status {status}")]
    Rejected { status: StatusCode, body: String },
    #[error("token endpoint timed out")]
    Timeout,
    #[error("token exchange request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

/// Parameters of one authorization redirect.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizeRequest<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub scope: &'a str,
    pub state: &'a str,
}

#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn default_scope(&self) -> &'static str;
    fn authorize_url(&self, request: AuthorizeRequest<'_>) -> Url;
    async fn exchange_code(
        &self,
        code: &str,
        credentials: &OAuthClientConfig,
    ) -> Result<TokenBundle, ExchangeError>;
}

pub struct RobloxOAuthProvider {
    client: Client,
    authorize_url: Url,
    token_url: Url,
}

impl RobloxOAuthProvider {
    pub fn new(client: Client, endpoints: &RobloxEndpoints) -> anyhow::Result<Self> {
        let authorize_url = Url::parse(&endpoints.authorize_url)
            .with_context(|| format!("invalid authorize url `{}`", endpoints.authorize_url))?;
        let token_url = Url::parse(&endpoints.token_url)
            .with_context(|| format!("invalid token url `{}`", endpoints.token_url))?;
        Ok(Self {
            client,
            authorize_url,
            token_url,
        })
    }
}

#[async_trait]
impl AuthorizationProvider for RobloxOAuthProvider {
    fn name(&self) -> &'static str {
        "roblox"
    }

    fn default_scope(&self) -> &'static str {
        "openid profile"
    }

    fn authorize_url(&self, request: AuthorizeRequest<'_>) -> Url {
        let mut url = self.authorize_url.clone();
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("response_type", "code");
            qp.append_pair("client_id", request.client_id);
            qp.append_pair("redirect_uri", request.redirect_uri);
            qp.append_pair("scope", request.scope);
            qp.append_pair("state", request.state);
        }
        url
    }

    async fn exchange_code(
        &self,
        code: &str,
        credentials: &OAuthClientConfig,
    ) -> Result<TokenBundle, ExchangeError> {
        let response = self
            .client
            .post(self.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", credentials.redirect_uri()),
                ("client_id", credentials.client_id()),
                ("client_secret", credentials.client_secret().expose_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Rejected { status, body });
        }

        Ok(response.json::<TokenBundle>().await?)
    }
}
