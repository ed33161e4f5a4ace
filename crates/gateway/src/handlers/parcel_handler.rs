//! Parcel handlers.
//!
//! Role and ownership rules are enforced by parcel-service; these handlers
//! validate the payload shape and forward the caller identity.

use std::str::FromStr;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use common::AppResult;
use domain::{CreateParcel, ParcelQuery, ParcelResponse, ParcelStatus, UpdateParcel};

use crate::clients::{ParcelList, ParcelPage};
use crate::extractors::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// New parcel. `rate` is the fee per unit of weight.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateParcelRequest {
    #[validate(email(message = "Invalid receiver email format"))]
    #[schema(example = "receiver@example.com")]
    pub receiver_email: Option<String>,
    #[validate(length(min = 1, message = "Delivery address is required"))]
    #[schema(example = "12 Harbour St, Portsmouth")]
    pub address: String,
    #[validate(length(min = 1, message = "Contact phone is required"))]
    #[schema(example = "+15550100")]
    pub phone: String,
    #[validate(range(exclusive_min = 0.0, message = "Weight must be positive"))]
    #[schema(example = 5.0)]
    pub weight: Option<f64>,
    pub note: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Rate must be positive"))]
    #[schema(example = 10.0)]
    pub rate: f64,
}

/// Partial edit of a pending parcel.
///
/// `current_status` and `status_history` are accepted only so that an
/// attempt to set them is rejected explicitly.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateParcelRequest {
    #[validate(email(message = "Invalid receiver email format"))]
    pub receiver_email: Option<String>,
    #[validate(length(min = 1, message = "Delivery address cannot be empty"))]
    pub address: Option<String>,
    #[validate(length(min = 1, message = "Contact phone cannot be empty"))]
    pub phone: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Weight must be positive"))]
    pub weight: Option<f64>,
    pub note: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub current_status: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Object>)]
    pub status_history: Option<serde_json::Value>,
}

/// A key that is sent counts as set, even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Admin status change.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    #[schema(example = "IN_TRANSIT")]
    pub status: Option<String>,
}

/// Listing filters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParcelsParams {
    /// Only parcels currently in this status
    pub status: Option<String>,
    /// 1-based page number (default 1)
    pub page: Option<u64>,
    /// Page size (default 8, at most 100)
    pub limit: Option<u64>,
}

impl ListParcelsParams {
    /// Unknown statuses are rejected before they reach parcel-service.
    fn into_query(self) -> AppResult<ParcelQuery> {
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ParcelStatus::from_str)
            .transpose()?;
        Ok(ParcelQuery::new(status, self.page, self.limit))
    }
}

impl From<CreateParcelRequest> for CreateParcel {
    fn from(req: CreateParcelRequest) -> Self {
        Self {
            receiver_email: req.receiver_email,
            address: req.address,
            phone: req.phone,
            weight: req.weight,
            note: req.note,
            rate: req.rate,
        }
    }
}

impl From<UpdateParcelRequest> for UpdateParcel {
    fn from(req: UpdateParcelRequest) -> Self {
        Self {
            receiver_email: req.receiver_email,
            address: req.address,
            phone: req.phone,
            weight: req.weight,
            note: req.note,
            current_status: req.current_status.map(|value| match value {
                serde_json::Value::String(status) => status,
                other => other.to_string(),
            }),
            touches_status_history: req.status_history.is_some(),
        }
    }
}

/// Create parcel routes
pub fn parcel_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_parcels).post(create_parcel))
        .route("/incoming", get(incoming_parcels))
        .route("/delivery-history", get(delivery_history))
        .route(
            "/:id",
            get(get_parcel).patch(update_parcel).delete(delete_parcel),
        )
        .route("/:id/cancel", patch(cancel_parcel))
        .route("/:id/confirm", patch(confirm_delivery))
        .route("/:id/status", patch(update_parcel_status))
}

/// Create a parcel (sender only)
#[utoipa::path(
    post,
    path = "/parcels",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    request_body = CreateParcelRequest,
    responses(
        (status = 201, description = "Parcel created", body = ParcelResponse),
        (status = 400, description = "Missing or invalid field"),
        (status = 403, description = "Caller is not an active sender, or receiver is not a RECEIVER"),
        (status = 404, description = "Sender or receiver not found"),
        (status = 424, description = "Transaction aborted")
    )
)]
pub async fn create_parcel(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateParcelRequest>,
) -> AppResult<(StatusCode, Json<ParcelResponse>)> {
    let parcel = state
        .parcel_client
        .create_parcel(current_user.caller(), payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(parcel)))
}

/// List the parcels visible to the caller
#[utoipa::path(
    get,
    path = "/parcels",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    params(ListParcelsParams),
    responses(
        (status = 200, description = "One page of parcels", body = ParcelPage),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_parcels(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(params): Query<ListParcelsParams>,
) -> AppResult<Json<ParcelPage>> {
    let query = params.into_query()?;
    let page = state
        .parcel_client
        .list_parcels(current_user.caller(), query)
        .await?;
    Ok(Json(page))
}

/// Parcels addressed to the caller that are not delivered yet (receiver only)
#[utoipa::path(
    get,
    path = "/parcels/incoming",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Incoming parcels", body = ParcelList),
        (status = 403, description = "Receivers only")
    )
)]
pub async fn incoming_parcels(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<ParcelList>> {
    let parcels = state
        .parcel_client
        .incoming_parcels(current_user.caller())
        .await?;
    Ok(Json(parcels))
}

/// Delivered and confirmed parcels of the caller
#[utoipa::path(
    get,
    path = "/parcels/delivery-history",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Delivered parcels", body = ParcelList),
        (status = 403, description = "Not available to admins")
    )
)]
pub async fn delivery_history(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<ParcelList>> {
    let parcels = state
        .parcel_client
        .delivery_history(current_user.caller())
        .await?;
    Ok(Json(parcels))
}

/// Get one parcel
#[utoipa::path(
    get,
    path = "/parcels/{id}",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Parcel ID")),
    responses(
        (status = 200, description = "Parcel", body = ParcelResponse),
        (status = 403, description = "Parcel belongs to someone else"),
        (status = 404, description = "Parcel not found")
    )
)]
pub async fn get_parcel(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ParcelResponse>> {
    let parcel = state
        .parcel_client
        .get_parcel(current_user.caller(), id)
        .await?;
    Ok(Json(parcel))
}

/// Edit a pending parcel (owning sender)
#[utoipa::path(
    patch,
    path = "/parcels/{id}",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Parcel ID")),
    request_body = UpdateParcelRequest,
    responses(
        (status = 200, description = "Parcel updated", body = ParcelResponse),
        (status = 400, description = "Invalid field"),
        (status = 403, description = "Not the owning sender"),
        (status = 404, description = "Parcel or receiver not found"),
        (status = 409, description = "Status fields present or parcel not pending")
    )
)]
pub async fn update_parcel(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateParcelRequest>,
) -> AppResult<Json<ParcelResponse>> {
    let parcel = state
        .parcel_client
        .update_parcel(current_user.caller(), id, payload.into())
        .await?;
    Ok(Json(parcel))
}

/// Cancel a pending parcel (owning sender)
#[utoipa::path(
    patch,
    path = "/parcels/{id}/cancel",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Parcel ID")),
    responses(
        (status = 200, description = "Parcel cancelled", body = ParcelResponse),
        (status = 403, description = "Not the owning sender"),
        (status = 404, description = "Parcel not found"),
        (status = 409, description = "Parcel is not pending")
    )
)]
pub async fn cancel_parcel(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ParcelResponse>> {
    let parcel = state
        .parcel_client
        .cancel_parcel(current_user.caller(), id)
        .await?;
    Ok(Json(parcel))
}

/// Confirm receipt of a parcel (addressed receiver)
#[utoipa::path(
    patch,
    path = "/parcels/{id}/confirm",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Parcel ID")),
    responses(
        (status = 200, description = "Delivery confirmed", body = ParcelResponse),
        (status = 403, description = "Parcel is addressed to someone else"),
        (status = 404, description = "Parcel not found"),
        (status = 409, description = "Already confirmed, cancelled or blocked")
    )
)]
pub async fn confirm_delivery(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ParcelResponse>> {
    let parcel = state
        .parcel_client
        .confirm_delivery(current_user.caller(), id)
        .await?;
    Ok(Json(parcel))
}

/// Set a parcel's status (admin only)
#[utoipa::path(
    patch,
    path = "/parcels/{id}/status",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Parcel ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ParcelResponse),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Parcel not found"),
        (status = 409, description = "Status missing or unchanged")
    )
)]
pub async fn update_parcel_status(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateStatusRequest>,
) -> AppResult<Json<ParcelResponse>> {
    let parcel = state
        .parcel_client
        .update_status(current_user.caller(), id, payload.status)
        .await?;
    Ok(Json(parcel))
}

/// Soft-delete a parcel (owning sender or admin)
#[utoipa::path(
    delete,
    path = "/parcels/{id}",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Parcel ID")),
    responses(
        (status = 200, description = "Parcel deleted", body = ParcelResponse),
        (status = 403, description = "Not the owning sender"),
        (status = 404, description = "Parcel not found"),
        (status = 409, description = "Parcel is on its way")
    )
)]
pub async fn delete_parcel(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ParcelResponse>> {
    let parcel = state
        .parcel_client
        .delete_parcel(current_user.caller(), id)
        .await?;
    Ok(Json(parcel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn query_defaults_apply() {
        let query = assert_ok!(ListParcelsParams::default().into_query());
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 8);
        assert_eq!(query.status, None);
    }

    #[test]
    fn query_parses_status_and_caps_limit() {
        let params = ListParcelsParams {
            status: Some("delivered".to_string()),
            page: Some(3),
            limit: Some(500),
        };
        let query = assert_ok!(params.into_query());
        assert_eq!(query.status, Some(ParcelStatus::Delivered));
        assert_eq!(query.page, 3);
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn blank_status_filter_is_ignored() {
        let params = ListParcelsParams {
            status: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(assert_ok!(params.into_query()).status, None);
    }

    #[test]
    fn unknown_status_filter_is_rejected() {
        let params = ListParcelsParams {
            status: Some("LOST".to_string()),
            ..Default::default()
        };
        assert_err!(params.into_query());
    }

    #[test]
    fn status_history_in_update_is_flagged() {
        let payload: UpdateParcelRequest =
            serde_json::from_str(r#"{"note":"fragile","status_history":[]}"#).unwrap();
        let update = UpdateParcel::from(payload);
        assert!(update.touches_status());
        assert_eq!(update.note.as_deref(), Some("fragile"));
    }

    #[test]
    fn null_status_fields_in_update_are_flagged() {
        let payload: UpdateParcelRequest =
            serde_json::from_str(r#"{"note":"fragile","current_status":null}"#).unwrap();
        assert!(UpdateParcel::from(payload).touches_status());

        let payload: UpdateParcelRequest =
            serde_json::from_str(r#"{"status_history":null}"#).unwrap();
        assert!(UpdateParcel::from(payload).touches_status());

        let payload: UpdateParcelRequest = serde_json::from_str(r#"{"note":"fragile"}"#).unwrap();
        assert!(!UpdateParcel::from(payload).touches_status());
    }

    #[test]
    fn create_payload_maps_rate() {
        let payload: CreateParcelRequest = serde_json::from_str(
            r#"{"receiver_email":"r@example.com","address":"a","phone":"p","weight":5,"rate":10}"#,
        )
        .unwrap();
        assert!(payload.validate().is_ok());
        let input = CreateParcel::from(payload);
        assert_eq!(input.rate, 10.0);
        assert_eq!(input.weight, Some(5.0));
    }

    #[test]
    fn non_positive_weight_fails_validation() {
        let payload: CreateParcelRequest = serde_json::from_str(
            r#"{"receiver_email":"r@example.com","address":"a","phone":"p","weight":0,"rate":10}"#,
        )
        .unwrap();
        assert!(payload.validate().is_err());
    }
}
