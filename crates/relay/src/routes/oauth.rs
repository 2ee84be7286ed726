use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{error, warn};
use utils::api::oauth::TokenRedeemResponse;

use super::error::ErrorResponse;
use crate::{AppState, auth::FlowError};

pub(crate) const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_STATE_COOKIE_MAX_AGE_MINUTES: i64 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/oauth/start", get(authorize_start))
        .route("/oauth/callback", get(authorize_callback))
        .route("/oauth/token", get(missing_handoff_id))
        .route("/oauth/token/", get(missing_handoff_id))
        .route("/oauth/token/{id}", get(redeem_token))
}

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    scope: Option<String>,
}

pub async fn authorize_start(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<StartQuery>,
) -> Response {
    let flow = state.flow();

    match flow.start(
        query.client_id.as_deref(),
        query.redirect_uri.as_deref(),
        query.scope.as_deref(),
    ) {
        Ok(started) => (
            StatusCode::FOUND,
            jar.add(state_cookie(started.state)),
            [(header::LOCATION, started.authorize_url.to_string())],
        )
            .into_response(),
        Err(error) => flow_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub async fn authorize_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(provider_error) = query.error.as_deref() {
        warn!(
            error = provider_error,
            description = query.error_description.as_deref().unwrap_or_default(),
            "provider returned an authorization error"
        );
    }

    let flow = state.flow();
    let cookie_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    // The state token is spent whatever the outcome.
    let jar = jar.remove(Cookie::build((OAUTH_STATE_COOKIE, "")).path("/"));

    match flow
        .complete(
            query.code.as_deref(),
            query.state.as_deref(),
            cookie_state.as_deref(),
        )
        .await
    {
        Ok(handoff_id) => (jar, Html(flow.bridge_page(&handoff_id))).into_response(),
        Err(error) => (jar, flow_error_response(error)).into_response(),
    }
}

pub async fn redeem_token(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.flow().redeem(&id) {
        Ok(tokens) => Json(TokenRedeemResponse { tokens }).into_response(),
        Err(error) => ErrorResponse::from(error).into_response(),
    }
}

async fn missing_handoff_id() -> ErrorResponse {
    ErrorResponse::new(StatusCode::BAD_REQUEST, "missing_id")
}

fn state_cookie(value: String) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(OAUTH_STATE_COOKIE_MAX_AGE_MINUTES))
        .build()
}

/// Browser-facing failures are plain text; upstream detail stays in the logs.
fn flow_error_response(error: FlowError) -> Response {
    let (status, message) = classify_flow_error(&error);
    match &error {
        FlowError::UpstreamExchangeFailed { status, body } => {
            error!(%status, %body, "token exchange failed")
        }
        FlowError::Upstream(err) => error!(?err, "oauth callback error"),
        FlowError::UpstreamTimeout => warn!("token exchange timed out"),
        FlowError::ServerMisconfigured => error!("oauth callback reached without server credentials"),
        _ => {}
    }
    (status, message).into_response()
}

fn classify_flow_error(error: &FlowError) -> (StatusCode, &'static str) {
    match error {
        FlowError::BadRequest => (
            StatusCode::BAD_REQUEST,
            "Missing client_id or redirect_uri",
        ),
        FlowError::InvalidState => (StatusCode::BAD_REQUEST, "Invalid state or missing code"),
        FlowError::ServerMisconfigured => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "OAuth server not configured",
        ),
        FlowError::UpstreamExchangeFailed { .. } => {
            (StatusCode::BAD_GATEWAY, "Token exchange failed")
        }
        FlowError::UpstreamTimeout => (StatusCode::GATEWAY_TIMEOUT, "Token exchange timed out"),
        FlowError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error"),
    }
}
