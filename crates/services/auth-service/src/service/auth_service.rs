//! Authentication service - registration, login and token verification.
//!
//! Uses the domain Password value object for hashing; users live in the
//! identity store behind [`UserServiceClient`].

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::client::UserServiceClient;
use common::{AppError, AppResult, JwtConfig};
use domain::{
    NewUser, Password, User, UserRole, MIN_NAME_LENGTH, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER,
};

/// Hash verified against when the email is unknown, so a miss costs the same
/// as a wrong password.
static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    Password::new("dummy-password-for-timing")
        .map(Password::into_string)
        .unwrap_or_default()
});

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful authentication
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    /// JWT access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token expiration time in seconds
    pub expires_in: i64,
}

/// Self-service registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    /// `SENDER` when absent
    pub role: Option<UserRole>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new sender or receiver
    async fn register(&self, registration: Registration) -> AppResult<User>;

    /// Login and return JWT token
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

/// Concrete implementation of AuthService using the identity store client.
pub struct Authenticator {
    user_client: Arc<dyn UserServiceClient>,
    jwt: JwtConfig,
}

impl Authenticator {
    /// Create new auth service instance
    pub fn new(user_client: Arc<dyn UserServiceClient>, jwt: JwtConfig) -> Self {
        Self { user_client, jwt }
    }

    /// Generate JWT token for a user
    fn generate_token(&self, user: &User) -> AppResult<TokenResponse> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.jwt.expiration_hours);

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt.secret.as_bytes()),
        )?;

        Ok(TokenResponse {
            access_token: token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.jwt.expiration_hours * SECONDS_PER_HOUR,
        })
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn register(&self, registration: Registration) -> AppResult<User> {
        let role = registration.role.unwrap_or(UserRole::Sender);
        if !role.is_self_assignable() {
            return Err(AppError::forbidden(format!(
                "{} accounts cannot be self-registered",
                role
            )));
        }

        let email = registration.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::validation("Email is required"));
        }
        let name = registration.name.trim().to_string();
        if name.chars().count() < MIN_NAME_LENGTH {
            return Err(AppError::validation("Name is required"));
        }

        // Soft-deleted accounts keep their email reserved
        if self
            .user_client
            .find_by_email_with_deleted(&email)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(&registration.password)?.into_string();

        let user = self
            .user_client
            .create(NewUser {
                email,
                password_hash,
                name,
                role,
                phone: registration.phone,
                address: registration.address,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let user = self
            .user_client
            .find_by_email_with_deleted(email.trim())
            .await?
            .filter(|user| !user.is_deleted());

        // Verify even when the user is missing so both paths take equally long.
        let stored = Password::from_hash(
            user.as_ref()
                .map(|u| u.password_hash.as_str())
                .unwrap_or(DUMMY_HASH.as_str()),
        );
        let password_valid = stored.verify(&password);

        let user = match user {
            Some(user) if password_valid => user,
            _ => return Err(AppError::InvalidCredentials),
        };

        if !user.can_sign_in() {
            return Err(AppError::forbidden(format!(
                "Account is {}",
                user.active_state.as_str().to_lowercase()
            )));
        }

        self.generate_token(&user)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt.secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockUserServiceClient;
    use domain::ActiveState;
    use tokio_test::{assert_err, assert_ok};

    const SECRET: &str = "test-secret-key-for-testing-only-32chars";

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: SECRET.to_string(),
            expiration_hours: 24,
        }
    }

    fn stored_user(email: &str, password: &str, state: ActiveState) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: Password::new(password).unwrap().into_string(),
            name: "Stored".to_string(),
            role: UserRole::Sender,
            active_state: state,
            phone: None,
            address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn registration(role: Option<UserRole>) -> Registration {
        Registration {
            email: "  New@Example.com ".to_string(),
            password: "long-enough-password".to_string(),
            name: "New User".to_string(),
            role,
            phone: Some("+15550100".to_string()),
            address: None,
        }
    }

    fn created_from(new: NewUser) -> User {
        User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: String::new(),
            name: new.name,
            role: new.role,
            active_state: ActiveState::Active,
            phone: new.phone,
            address: new.address,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn register_defaults_to_sender_and_normalises_email() {
        let mut client = MockUserServiceClient::new();
        client
            .expect_find_by_email_with_deleted()
            .withf(|email| email == "new@example.com")
            .returning(|_| Ok(None));
        client
            .expect_create()
            .withf(|new| new.role == UserRole::Sender && new.password_hash.starts_with("$argon2"))
            .returning(|new| Ok(created_from(new)));

        let auth = Authenticator::new(Arc::new(client), jwt());
        let user = assert_ok!(auth.register(registration(None)).await);

        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.role, UserRole::Sender);
    }

    #[tokio::test]
    async fn register_as_admin_is_forbidden() {
        let mut client = MockUserServiceClient::new();
        client.expect_create().never();

        let auth = Authenticator::new(Arc::new(client), jwt());
        let result = auth.register(registration(Some(UserRole::Admin))).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn register_existing_email_is_conflict() {
        let mut client = MockUserServiceClient::new();
        client
            .expect_find_by_email_with_deleted()
            .returning(|email| Ok(Some(stored_user(email, "whatever-pass", ActiveState::Active))));
        client.expect_create().never();

        let auth = Authenticator::new(Arc::new(client), jwt());
        let result = auth.register(registration(Some(UserRole::Receiver))).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn register_short_password_is_validation_error() {
        let mut client = MockUserServiceClient::new();
        client
            .expect_find_by_email_with_deleted()
            .returning(|_| Ok(None));

        let auth = Authenticator::new(Arc::new(client), jwt());
        let mut input = registration(None);
        input.password = "short".to_string();

        let result = auth.register(input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let user = stored_user("s@example.com", "correct-password", ActiveState::Active);
        let user_id = user.id;
        let mut client = MockUserServiceClient::new();
        client
            .expect_find_by_email_with_deleted()
            .returning(move |_| Ok(Some(user.clone())));

        let auth = Authenticator::new(Arc::new(client), jwt());
        let token = assert_ok!(
            auth.login("s@example.com".to_string(), "correct-password".to_string())
                .await
        );
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 24 * 3600);

        let claims = assert_ok!(auth.verify_token(&token.access_token));
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, UserRole::Sender);
    }

    #[tokio::test]
    async fn login_wrong_password_and_unknown_email_look_the_same() {
        let user = stored_user("s@example.com", "correct-password", ActiveState::Active);
        let mut client = MockUserServiceClient::new();
        client
            .expect_find_by_email_with_deleted()
            .returning(move |email| {
                Ok((email == "s@example.com").then(|| user.clone()))
            });

        let auth = Authenticator::new(Arc::new(client), jwt());

        let wrong = auth
            .login("s@example.com".to_string(), "wrong-password".to_string())
            .await;
        let unknown = auth
            .login("ghost@example.com".to_string(), "wrong-password".to_string())
            .await;

        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn login_blocked_account_is_forbidden() {
        let user = stored_user("s@example.com", "correct-password", ActiveState::Blocked);
        let mut client = MockUserServiceClient::new();
        client
            .expect_find_by_email_with_deleted()
            .returning(move |_| Ok(Some(user.clone())));

        let auth = Authenticator::new(Arc::new(client), jwt());
        let result = auth
            .login("s@example.com".to_string(), "correct-password".to_string())
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = Authenticator::new(
            Arc::new(MockUserServiceClient::new()),
            JwtConfig {
                secret: "another-secret-key-that-is-32-chars-long".to_string(),
                expiration_hours: 1,
            },
        );
        let user = stored_user("s@example.com", "correct-password", ActiveState::Active);
        let token = other.generate_token(&user).unwrap();

        let auth = Authenticator::new(Arc::new(MockUserServiceClient::new()), jwt());
        assert_err!(auth.verify_token(&token.access_token));
        assert_err!(auth.verify_token("not.a.jwt"));
    }
}
