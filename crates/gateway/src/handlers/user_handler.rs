//! User handlers.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::{get, patch},
    Router,
};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::AppResult;
use domain::{ActiveState, Operation, UserResponse};

use crate::extractors::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Account state change (admin only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetActiveStateRequest {
    /// ACTIVE, INACTIVE or BLOCKED
    pub active_state: ActiveState,
}

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_current_user))
        .route("/:id/state", patch(set_active_state))
}

/// Get current authenticated user
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_current_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    // A cache outage degrades to a service call
    match state.cache.get_profile(&current_user.id).await {
        Ok(Some(user)) => return Ok(Json(user)),
        Ok(None) => {}
        Err(e) => warn!("Profile cache read failed: {}", e),
    }

    let user = state.user_client.get_user(current_user.id).await?;

    if let Err(e) = state.cache.set_profile(&user).await {
        warn!("Profile cache write failed: {}", e);
    }

    Ok(Json(user))
}

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of all users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_users(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    current_user.authorize(Operation::ListUsers)?;
    let users = state.user_client.list_users().await?;
    Ok(Json(users))
}

/// Activate, deactivate or block an account (admin only)
#[utoipa::path(
    patch,
    path = "/users/{id}/state",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = SetActiveStateRequest,
    responses(
        (status = 200, description = "Account state updated", body = UserResponse),
        (status = 400, description = "Unknown account state"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn set_active_state(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<SetActiveStateRequest>,
) -> AppResult<Json<UserResponse>> {
    current_user.authorize(Operation::SetAccountState)?;

    let user = state
        .user_client
        .set_active_state(id, payload.active_state)
        .await?;

    // The cached profile would still show the old state
    state.cache.invalidate_profile(&id).await?;

    info!(
        user_id = %id,
        active_state = %user.active_state,
        admin = %current_user.id,
        "Account state changed"
    );

    Ok(Json(user))
}
