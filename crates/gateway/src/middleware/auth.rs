//! Authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{authorize, Caller, Operation, UserRole, BEARER_TOKEN_PREFIX};

use crate::state::AppState;

/// Current authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// Identity forwarded to parcel-service.
    pub fn caller(&self) -> Caller {
        Caller::new(self.id, self.role)
    }

    /// Reject the request unless the role may perform `operation`.
    pub fn authorize(&self, operation: Operation) -> AppResult<()> {
        authorize(self.role, operation).map_err(AppError::from)
    }
}

/// Authentication middleware that validates JWT tokens.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers())?;

    // Verify token via auth-service
    let claims = state
        .auth_client
        .verify_token(token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(CurrentUser {
        id: claims.user_id,
        email: claims.email,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Extract bearer token from Authorization header.
fn extract_token(headers: &HeaderMap) -> AppResult<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_TOKEN_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers("Bearer abc.def.ghi");
        assert_eq!(extract_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn other_schemes_are_unauthorized() {
        assert!(matches!(
            extract_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            extract_token(&headers("Bearer ")),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            extract_token(&HeaderMap::new()),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn current_user_checks_policy() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            email: "r@example.com".to_string(),
            role: UserRole::Receiver,
        };
        assert!(user.authorize(Operation::ConfirmDelivery).is_ok());
        assert!(matches!(
            user.authorize(Operation::CreateParcel),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(user.caller().role, UserRole::Receiver);
    }
}
