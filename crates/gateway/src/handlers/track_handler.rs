//! Public tracking lookup.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};

use common::AppResult;
use domain::TrackingView;

use crate::state::AppState;

/// Create tracking routes
pub fn track_routes() -> Router<AppState> {
    Router::new().route("/:tracking_id", get(track_parcel))
}

/// Track a parcel by its tracking id (no authentication)
#[utoipa::path(
    get,
    path = "/track/{tracking_id}",
    tag = "Tracking",
    params(
        ("tracking_id" = String, Path, description = "Tracking id, e.g. TRK-20260504-123456")
    ),
    responses(
        (status = 200, description = "Public view of the parcel", body = TrackingView),
        (status = 400, description = "Malformed tracking id"),
        (status = 404, description = "No parcel with this tracking id")
    )
)]
pub async fn track_parcel(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> AppResult<Json<TrackingView>> {
    let view = state.parcel_client.track(tracking_id).await?;
    Ok(Json(view))
}
