//! Unit of Work: repository access plus a scoped transaction handle.
//!
//! A transaction is opened by [`UnitOfWork::transaction`], handed to the
//! closure as a borrowed [`TransactionContext`], and closed exactly once:
//! committed when the closure returns `Ok`, rolled back when it returns `Err`.
//! The context borrows the transaction, so no repository obtained from it can
//! outlive the commit or rollback.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};

use crate::repository::{
    ParcelRepository, ParcelStore, TxParcelRepository, TxUserRepository, UserRepository,
    UserStore,
};
use common::{AppError, AppResult};

/// Boxed future returned by a transaction body.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because of the generic transaction methods; tests
/// implement it over mocked repositories instead.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Pooled user repository
    fn users(&self) -> Arc<dyn UserRepository>;

    /// Pooled parcel repository
    fn parcels(&self) -> Arc<dyn ParcelRepository>;

    /// Execute a closure within a READ COMMITTED transaction.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;

    /// Execute a closure within a SERIALIZABLE transaction.
    async fn transaction_serializable<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;

    /// Check database connectivity.
    async fn ping(&self) -> AppResult<()>;
}

/// Repository access inside one open transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// User repository for this transaction
    pub fn users(&self) -> TxUserRepository<'a> {
        TxUserRepository::new(self.txn)
    }

    /// Parcel repository for this transaction
    pub fn parcels(&self) -> TxParcelRepository<'a> {
        TxParcelRepository::new(self.txn)
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
    parcel_repo: Arc<ParcelStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        let user_repo = Arc::new(UserStore::new(db.clone()));
        let parcel_repo = Arc::new(ParcelStore::new(db.clone()));
        Self {
            db,
            user_repo,
            parcel_repo,
        }
    }

    async fn execute_transaction<F, T>(&self, isolation: IsolationLevel, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(isolation), Some(AccessMode::ReadWrite))
            .await
            .map_err(|e| AppError::from(e).into_transaction_failure())?;

        let outcome = f(TransactionContext::new(&txn)).await;

        match outcome {
            Ok(result) => {
                txn.commit()
                    .await
                    .map_err(|e| AppError::from(e).into_transaction_failure())?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e.into_transaction_failure())
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn parcels(&self) -> Arc<dyn ParcelRepository> {
        self.parcel_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        self.execute_transaction(IsolationLevel::ReadCommitted, f)
            .await
    }

    async fn transaction_serializable<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        self.execute_transaction(IsolationLevel::Serializable, f)
            .await
    }

    async fn ping(&self) -> AppResult<()> {
        super::ping(&self.db).await.map_err(AppError::from)
    }
}
