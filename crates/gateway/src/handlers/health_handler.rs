//! Health check handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: ServiceStatus,
}

/// Individual service status.
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub redis: ServiceHealth,
    pub parcel_service: ServiceHealth,
}

/// Service health with optional error message.
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    fn healthy() -> Self {
        Self {
            status: "healthy",
            error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy",
            error: Some(error.into()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

impl HealthResponse {
    fn from_services(services: ServiceStatus) -> Self {
        let all_healthy = services.redis.is_healthy() && services.parcel_service.is_healthy();
        Self {
            status: if all_healthy { "healthy" } else { "degraded" },
            services,
        }
    }

    fn status_code(&self) -> StatusCode {
        if self.status == "healthy" {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Create health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint - Redis and the parcel database.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let redis = match state.cache.ping().await {
        Ok(()) => ServiceHealth::healthy(),
        Err(e) => ServiceHealth::unhealthy(e.to_string()),
    };

    let parcel_service = match state.parcel_client.ping().await {
        Ok(true) => ServiceHealth::healthy(),
        Ok(false) => ServiceHealth::unhealthy("database unreachable"),
        Err(e) => ServiceHealth::unhealthy(e.to_string()),
    };

    let response = HealthResponse::from_services(ServiceStatus {
        redis,
        parcel_service,
    });
    (response.status_code(), Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_unhealthy_dependency_degrades() {
        let response = HealthResponse::from_services(ServiceStatus {
            redis: ServiceHealth::healthy(),
            parcel_service: ServiceHealth::unhealthy("database unreachable"),
        });
        assert_eq!(response.status, "degraded");
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn all_healthy_is_ok() {
        let response = HealthResponse::from_services(ServiceStatus {
            redis: ServiceHealth::healthy(),
            parcel_service: ServiceHealth::healthy(),
        });
        assert_eq!(response.status_code(), StatusCode::OK);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["services"]["redis"].get("error").is_none());
    }
}
