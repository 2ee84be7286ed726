use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use utils::api::users::{FriendsResponse, ResolvedUserResponse};

use super::error::ErrorResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/by-username/{username}", get(resolve_username))
        .route("/users/{user_id}/friends", get(list_friends))
}

pub async fn resolve_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ResolvedUserResponse>, ErrorResponse> {
    let id = state.social().resolve_username(&username).await?;
    Ok(Json(ResolvedUserResponse { id }))
}

pub async fn list_friends(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<FriendsResponse>, ErrorResponse> {
    let data = state.social().list_friends(&user_id).await?;
    Ok(Json(FriendsResponse { data }))
}
