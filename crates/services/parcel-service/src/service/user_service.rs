//! User service - identity store use cases.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{ActiveState, NewUser, User};

use crate::repository::UserRepository;

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Get live user by ID (excludes soft-deleted)
    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// Get user by email including soft-deleted, password hash included
    async fn get_user_by_email_with_deleted(&self, email: &str) -> AppResult<User>;

    /// List all live users
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Create a new user (internal use - password already hashed)
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    /// Change a live user's account state
    async fn set_active_state(&self, id: Uuid, state: ActiveState) -> AppResult<User>;
}

/// Concrete implementation of UserService using repository.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
}

impl UserManager {
    /// Create new user service instance with repository
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.repo.find_by_id(id).await?.ok_or_not_found("User")
    }

    async fn get_user_by_email_with_deleted(&self, email: &str) -> AppResult<User> {
        self.repo
            .find_by_email_with_deleted(email.trim())
            .await?
            .ok_or_not_found("User")
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repo.list().await
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        // Soft-deleted accounts keep their email reserved
        if self
            .repo
            .find_by_email_with_deleted(user.email.trim())
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Email"));
        }

        let user = self.repo.create(user).await?;
        info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    async fn set_active_state(&self, id: Uuid, state: ActiveState) -> AppResult<User> {
        let user = self.repo.set_active_state(id, state).await?;
        info!(user_id = %user.id, state = %state, "Account state changed");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use chrono::Utc;
    use domain::UserRole;
    use mockall::predicate::eq;
    use tokio_test::assert_ok;

    fn user(email: &str, deleted: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Test".to_string(),
            role: UserRole::Receiver,
            active_state: ActiveState::Active,
            phone: None,
            address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: deleted.then(Utc::now),
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Test".to_string(),
            role: UserRole::Receiver,
            phone: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_email_of_deleted_account() {
        let mut repo = MockUserRepository::new();
        let existing = user("taken@example.com", true);
        repo.expect_find_by_email_with_deleted()
            .withf(|email| email == "taken@example.com")
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_create().never();

        let service = UserManager::new(Arc::new(repo));
        let result = service.create_user(new_user("taken@example.com")).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn create_inserts_fresh_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email_with_deleted()
            .returning(|_| Ok(None));
        repo.expect_create()
            .times(1)
            .returning(|new| Ok(user(&new.email, false)));

        let service = UserManager::new(Arc::new(repo));
        let created = assert_ok!(service.create_user(new_user("fresh@example.com")).await);

        assert_eq!(created.email, "fresh@example.com");
    }

    #[tokio::test]
    async fn get_user_missing_is_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let service = UserManager::new(Arc::new(repo));
        let result = service.get_user(Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn set_active_state_passes_through() {
        let mut repo = MockUserRepository::new();
        let id = Uuid::new_v4();
        repo.expect_set_active_state()
            .with(eq(id), eq(ActiveState::Blocked))
            .returning(|_, state| {
                let mut blocked = user("r@example.com", false);
                blocked.active_state = state;
                Ok(blocked)
            });

        let service = UserManager::new(Arc::new(repo));
        let updated = assert_ok!(service.set_active_state(id, ActiveState::Blocked).await);

        assert!(updated.is_blocked());
    }
}
