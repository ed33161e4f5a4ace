//! Route configuration.

use axum::{middleware, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{auth_routes, health_routes, parcel_routes, track_routes, user_routes};
use crate::middleware::{
    auth_middleware, rate_limit_auth_middleware, rate_limit_middleware,
    rate_limit_track_middleware,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no auth, no rate limit)
        .nest("/health", health_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public surfaces get the stricter limits
        .nest(
            "/auth",
            auth_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_auth_middleware,
            )),
        )
        .nest(
            "/track",
            track_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_track_middleware,
            )),
        )
        .nest("/users", authenticated(user_routes(), &state))
        .nest("/parcels", authenticated(parcel_routes(), &state))
        .with_state(state)
}

/// Bearer auth inside the general rate limit.
fn authenticated(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
}
