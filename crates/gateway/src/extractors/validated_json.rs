//! Validated JSON extractor.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use common::AppError;

/// JSON extractor that automatically validates the payload.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;

        value
            .validate()
            .map_err(|e| AppError::validation(first_message(&e)))?;

        Ok(ValidatedJson(value))
    }
}

/// Message of the alphabetically first failing field.
fn first_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields
        .into_iter()
        .find_map(|(field, errors)| {
            errors.first().map(|error| match &error.message {
                Some(msg) => msg.to_string(),
                None => format!("Invalid value for '{}'", field),
            })
        })
        .unwrap_or_else(|| "Validation failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Method, StatusCode},
        response::IntoResponse,
        routing::post,
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(email(message = "Invalid email format"))]
        email: String,
        #[validate(range(exclusive_min = 0.0, message = "Weight must be positive"))]
        weight: f64,
    }

    async fn echo(ValidatedJson(payload): ValidatedJson<Payload>) -> impl IntoResponse {
        payload.email
    }

    async fn send(body: &'static str) -> (StatusCode, String) {
        let app = Router::new().route("/", post(echo));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_payload_reaches_handler() {
        let (status, body) = send(r#"{"email":"a@example.com","weight":2.5}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "a@example.com");
    }

    #[tokio::test]
    async fn failed_rule_is_a_validation_error() {
        let (status, body) = send(r#"{"email":"a@example.com","weight":0}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("VALIDATION_ERROR"));
        assert!(body.contains("Weight must be positive"));
    }

    #[tokio::test]
    async fn first_field_in_order_is_reported() {
        let (status, body) = send(r#"{"email":"nope","weight":-1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Invalid email format"));
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let (status, body) = send(r#"{"email":"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("VALIDATION_ERROR"));
    }
}
