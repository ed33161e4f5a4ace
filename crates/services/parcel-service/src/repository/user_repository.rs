//! User repository (identity store) with soft delete support.
//!
//! Queries are written once against [`ConnectionTrait`] and shared by the
//! pooled store and the transaction-bound repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::{AppResult, OptionExt};
use domain::{ActiveState, NewUser, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// By default, all query methods exclude soft-deleted records.
/// Use `*_with_deleted` variants to include them.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find live user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by ID including soft-deleted
    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by email including soft-deleted
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>>;

    /// Users with any of these ids, soft-deleted included
    async fn find_by_ids(&self, ids: Vec<Uuid>) -> AppResult<Vec<User>>;

    /// Insert a user
    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// Change the account state of a live user
    async fn set_active_state(&self, id: Uuid, state: ActiveState) -> AppResult<User>;

    /// List live users, oldest first
    async fn list(&self) -> AppResult<Vec<User>>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        find_by_id(&self.db, id, false).await
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>> {
        find_by_id(&self.db, id, true).await
    }

    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        find_by_email(&self.db, email).await
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        UserEntity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        create(&self.db, user).await
    }

    async fn set_active_state(&self, id: Uuid, state: ActiveState) -> AppResult<User> {
        let model = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_not_found("User")?;

        let mut active: ActiveModel = model.into();
        active.active_state = Set(state.as_str().to_string());
        active.updated_at = Set(chrono::Utc::now());

        User::try_from(active.update(&self.db).await?)
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        UserEntity::find()
            .filter(user::Column::DeletedAt.is_null())
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }
}

/// Transaction-bound user repository.
///
/// Borrows the open transaction, so it cannot outlive it.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUserRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Find user by ID including soft-deleted
    pub async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>> {
        find_by_id(self.txn, id, true).await
    }

    /// Find user by email including soft-deleted
    pub async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        find_by_email(self.txn, email).await
    }
}

async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    include_deleted: bool,
) -> AppResult<Option<User>> {
    let mut query = UserEntity::find_by_id(id);
    if !include_deleted {
        query = query.filter(user::Column::DeletedAt.is_null());
    }
    query.one(db).await?.map(User::try_from).transpose()
}

/// Emails are stored lowercased; soft-deleted users are included.
async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> AppResult<Option<User>> {
    UserEntity::find()
        .filter(user::Column::Email.eq(email.to_lowercase()))
        .one(db)
        .await?
        .map(User::try_from)
        .transpose()
}

async fn create<C: ConnectionTrait>(db: &C, user: NewUser) -> AppResult<User> {
    let now = chrono::Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(user.email.to_lowercase()),
        password_hash: Set(user.password_hash),
        name: Set(user.name),
        role: Set(user.role.as_str().to_string()),
        active_state: Set(ActiveState::Active.as_str().to_string()),
        phone: Set(user.phone),
        address: Set(user.address),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    User::try_from(active_model.insert(db).await?)
}
