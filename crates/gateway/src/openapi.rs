//! OpenAPI documentation.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::clients::{ParcelList, ParcelPage, TokenResponse};
use crate::handlers::auth_handler::{LoginRequest, RegisterRequest};
use crate::handlers::parcel_handler::{
    CreateParcelRequest, UpdateParcelRequest, UpdateStatusRequest,
};
use crate::handlers::user_handler::SetActiveStateRequest;
use domain::{
    ActiveState, PageMeta, ParcelDetails, ParcelResponse, ParcelStatus, SenderContact,
    StatusEntry, TrackedStatus, TrackingView, UserResponse, UserRole,
};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth_handler::register,
        crate::handlers::auth_handler::login,
        crate::handlers::user_handler::get_current_user,
        crate::handlers::user_handler::list_users,
        crate::handlers::user_handler::set_active_state,
        crate::handlers::parcel_handler::create_parcel,
        crate::handlers::parcel_handler::list_parcels,
        crate::handlers::parcel_handler::incoming_parcels,
        crate::handlers::parcel_handler::delivery_history,
        crate::handlers::parcel_handler::get_parcel,
        crate::handlers::parcel_handler::update_parcel,
        crate::handlers::parcel_handler::cancel_parcel,
        crate::handlers::parcel_handler::confirm_delivery,
        crate::handlers::parcel_handler::update_parcel_status,
        crate::handlers::parcel_handler::delete_parcel,
        crate::handlers::track_handler::track_parcel,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            TokenResponse,
            UserResponse,
            UserRole,
            ActiveState,
            SetActiveStateRequest,
            CreateParcelRequest,
            UpdateParcelRequest,
            UpdateStatusRequest,
            ParcelResponse,
            ParcelDetails,
            ParcelStatus,
            StatusEntry,
            PageMeta,
            ParcelPage,
            ParcelList,
            TrackingView,
            TrackedStatus,
            SenderContact,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration and login"),
        (name = "Users", description = "Profiles and account administration"),
        (name = "Parcels", description = "Parcel lifecycle"),
        (name = "Tracking", description = "Public tracking lookup"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/register",
            "/users/{id}/state",
            "/parcels",
            "/parcels/{id}/confirm",
            "/parcels/delivery-history",
            "/track/{tracking_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
