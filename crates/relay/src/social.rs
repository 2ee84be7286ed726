//! Public Roblox user lookups: username resolution and friends lists.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::config::RobloxEndpoints;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("user not found")]
    NotFound,
    #[error("upstream responded with status {0}")]
    Upstream(StatusCode),
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for SocialError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

#[derive(Debug, Serialize)]
struct UsernameLookupRequest<'a> {
    usernames: [&'a str; 1],
    #[serde(rename = "excludeBannedUsers")]
    exclude_banned_users: bool,
}

#[derive(Debug, Deserialize)]
struct UsernameLookupResponse {
    #[serde(default)]
    data: Option<Vec<LookedUpUser>>,
}

#[derive(Debug, Deserialize)]
struct LookedUpUser {
    id: u64,
}

pub struct RobloxSocialClient {
    client: Client,
    users_api: String,
    friends_api: String,
}

impl RobloxSocialClient {
    pub fn new(client: Client, endpoints: &RobloxEndpoints) -> Self {
        Self {
            client,
            users_api: endpoints.users_api.trim_end_matches('/').to_string(),
            friends_api: endpoints.friends_api.trim_end_matches('/').to_string(),
        }
    }

    #[instrument(skip(self))]
    pub async fn resolve_username(&self, username: &str) -> Result<u64, SocialError> {
        let response = self
            .client
            .post(format!("{}/v1/usernames/users", self.users_api))
            .json(&UsernameLookupRequest {
                usernames: [username],
                exclude_banned_users: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "username lookup failed");
            return Err(SocialError::Upstream(status));
        }

        let body: UsernameLookupResponse = response.json().await?;
        body.data
            .and_then(|users| users.into_iter().next())
            .map(|user| user.id)
            .ok_or(SocialError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn list_friends(&self, user_id: &str) -> Result<Vec<Value>, SocialError> {
        let user_id = parse_user_id(user_id)?;

        let response = self
            .client
            .get(format!("{}/v1/users/{user_id}/friends", self.friends_api))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, user_id, "friends lookup failed");
            return Err(SocialError::Upstream(status));
        }

        let body: Value = response.json().await?;
        Ok(match body {
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(friends)) => friends,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        })
    }
}

/// Only positive integer literals may reach the request path.
fn parse_user_id(raw: &str) -> Result<u64, SocialError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(SocialError::InvalidArgument(format!(
            "user id `{raw}` must be a positive integer"
        )));
    }

    match trimmed.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(SocialError::InvalidArgument(format!(
            "user id `{raw}` must be a positive integer"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    use super::*;
    use crate::test_support::test_http_client;

    fn client(server: &MockServer) -> RobloxSocialClient {
        RobloxSocialClient::new(
            test_http_client(),
            &RobloxEndpoints::with_base(&server.uri()),
        )
    }

    #[test]
    fn user_id_validation() {
        assert_eq!(parse_user_id("123").unwrap(), 123);
        assert_eq!(parse_user_id(" 42 ").unwrap(), 42);
        for bad in ["abc", "0", "000", "-5", "+5", "12abc", "1.5", "", "1/../2"] {
            assert!(
                matches!(parse_user_id(bad), Err(SocialError::InvalidArgument(_))),
                "{bad}"
            );
        }
    }

    #[tokio::test]
    async fn list_friends_rejects_bad_ids_without_calling_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let social = client(&server);
        assert!(matches!(
            social.list_friends("abc").await,
            Err(SocialError::InvalidArgument(_))
        ));
        assert!(matches!(
            social.list_friends("0").await,
            Err(SocialError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn list_friends_returns_data_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/123/friends"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": 5 }] })))
            .expect(1)
            .mount(&server)
            .await;

        let friends = client(&server).list_friends("123").await.unwrap();
        assert_eq!(friends, vec![json!({ "id": 5 })]);
    }

    #[tokio::test]
    async fn list_friends_tolerates_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/7/friends"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "nope" })))
            .mount(&server)
            .await;

        let friends = client(&server).list_friends("7").await.unwrap();
        assert!(friends.is_empty());
    }

    #[tokio::test]
    async fn list_friends_maps_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/9/friends"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).list_friends("9").await.unwrap_err();
        assert!(matches!(err, SocialError::Upstream(StatusCode::SERVICE_UNAVAILABLE)));
    }

    #[tokio::test]
    async fn resolve_username_returns_first_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usernames/users"))
            .and(body_json(json!({
                "usernames": ["builderman"],
                "excludeBannedUsers": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": 156, "name": "builderman", "requestedUsername": "builderman" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server).resolve_username("builderman").await.unwrap();
        assert_eq!(id, 156);
    }

    #[tokio::test]
    async fn resolve_username_with_empty_result_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usernames/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let err = client(&server).resolve_username("ghost").await.unwrap_err();
        assert!(matches!(err, SocialError::NotFound));
    }

    #[tokio::test]
    async fn resolve_username_maps_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usernames/users"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server).resolve_username("busy").await.unwrap_err();
        assert!(matches!(err, SocialError::Upstream(StatusCode::TOO_MANY_REQUESTS)));
    }

    #[tokio::test]
    async fn slow_upstream_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/11/friends"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": [] }))
                    .set_delay(std::time::Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client(&server).list_friends("11").await.unwrap_err();
        assert!(matches!(err, SocialError::Timeout));
    }

    #[tokio::test]
    async fn unreadable_upstream_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usernames/users"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).resolve_username("garbled").await.unwrap_err();
        assert!(matches!(err, SocialError::Transport(_)));
    }
}
