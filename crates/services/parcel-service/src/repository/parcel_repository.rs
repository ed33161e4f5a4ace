//! Parcel repository (parcel store).
//!
//! A parcel is one `parcels` row plus its `parcel_status_history` rows. History
//! rows are only ever inserted; the status column is moved with a
//! compare-and-set so a concurrent transition cannot slip in between the read
//! and the write.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, Set,
};
use uuid::Uuid;

use super::entities::parcel::{self, Entity as ParcelEntity};
use super::entities::parcel_status::{self, Entity as StatusEntity};
use super::entities::user_parcel;
use common::{AppError, AppResult, OptionExt};
use domain::{Parcel, ParcelQuery, ParcelScope, ParcelStatus, StatusEntry, StatusHistory};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Status condition applied on top of a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFilter {
    Any,
    Is(ParcelStatus),
    In(Vec<ParcelStatus>),
    Not(ParcelStatus),
}

/// Read side of the parcel store, plus the non-transactional soft delete.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ParcelRepository: Send + Sync {
    /// Find a parcel by record id, soft-deleted included
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Parcel>>;

    /// Find a live parcel by its public tracking id
    async fn find_by_tracking_id(&self, tracking_id: &str) -> AppResult<Option<Parcel>>;

    /// One page of a scope, newest first, with the total count
    async fn page(&self, scope: ParcelScope, query: ParcelQuery) -> AppResult<(Vec<Parcel>, u64)>;

    /// Everything in a scope matching a status filter, newest first
    async fn find_all(&self, scope: ParcelScope, filter: StatusFilter) -> AppResult<Vec<Parcel>>;

    /// Set the soft-delete flag. History is not touched.
    async fn mark_deleted(&self, id: Uuid) -> AppResult<Parcel>;
}

/// Concrete implementation of ParcelRepository
pub struct ParcelStore {
    db: DatabaseConnection,
}

impl ParcelStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ParcelRepository for ParcelStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Parcel>> {
        find_by_id(&self.db, id).await
    }

    async fn find_by_tracking_id(&self, tracking_id: &str) -> AppResult<Option<Parcel>> {
        let model = ParcelEntity::find()
            .filter(parcel::Column::TrackingId.eq(tracking_id))
            .filter(parcel::Column::IsDeleted.eq(false))
            .one(&self.db)
            .await?;

        match model {
            Some(model) => Ok(assemble(&self.db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn page(&self, scope: ParcelScope, query: ParcelQuery) -> AppResult<(Vec<Parcel>, u64)> {
        let filter = query.status.map(StatusFilter::Is).unwrap_or(StatusFilter::Any);
        let select = scoped(&scope, &filter);

        let (total, models) = futures::try_join!(
            select.clone().count(&self.db),
            select
                .order_by_desc(parcel::Column::CreatedAt)
                .offset(query.offset())
                .limit(query.limit)
                .all(&self.db),
        )?;

        Ok((assemble(&self.db, models).await?, total))
    }

    async fn find_all(&self, scope: ParcelScope, filter: StatusFilter) -> AppResult<Vec<Parcel>> {
        let models = scoped(&scope, &filter)
            .order_by_desc(parcel::Column::CreatedAt)
            .all(&self.db)
            .await?;

        assemble(&self.db, models).await
    }

    async fn mark_deleted(&self, id: Uuid) -> AppResult<Parcel> {
        let result = ParcelEntity::update_many()
            .col_expr(parcel::Column::IsDeleted, Expr::value(true))
            .col_expr(parcel::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(parcel::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("Parcel"));
        }

        find_by_id(&self.db, id).await?.ok_or_not_found("Parcel")
    }
}

/// Transaction-bound parcel repository.
pub struct TxParcelRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxParcelRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Find a parcel by record id, soft-deleted included
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Parcel>> {
        find_by_id(self.txn, id).await
    }

    /// Insert a new parcel together with its whole history.
    pub async fn insert(&self, parcel: &Parcel) -> AppResult<()> {
        parcel::ActiveModel {
            id: Set(parcel.id),
            tracking_id: Set(parcel.tracking_id.clone()),
            sender_id: Set(parcel.sender_id),
            receiver_email: Set(parcel.receiver_email.clone()),
            address: Set(parcel.details.address.clone()),
            phone: Set(parcel.details.phone.clone()),
            weight: Set(parcel.details.weight),
            note: Set(parcel.details.note.clone()),
            fee: Set(parcel.fee),
            current_status: Set(parcel.current_status.as_str().to_string()),
            is_deleted: Set(parcel.is_deleted),
            created_at: Set(parcel.created_at),
            updated_at: Set(parcel.updated_at),
        }
        .insert(self.txn)
        .await?;

        for (seq, entry) in parcel.status_history.iter().enumerate() {
            insert_history_row(self.txn, parcel.id, seq, entry).await?;
        }
        Ok(())
    }

    /// Append the parcel to the sender's linked-parcel list.
    pub async fn link_to_sender(&self, sender_id: Uuid, parcel_id: Uuid) -> AppResult<()> {
        user_parcel::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(sender_id),
            parcel_id: Set(parcel_id),
            created_at: Set(Utc::now()),
        }
        .insert(self.txn)
        .await?;
        Ok(())
    }

    /// Write the editable fields of a parcel that is still `PENDING`.
    /// Status columns are never touched here.
    ///
    /// # Errors
    /// `InvalidState` when the stored parcel has left `PENDING` meanwhile.
    pub async fn save_details(&self, parcel: &Parcel) -> AppResult<()> {
        let result = ParcelEntity::update_many()
            .col_expr(
                parcel::Column::ReceiverEmail,
                Expr::value(parcel.receiver_email.clone()),
            )
            .col_expr(parcel::Column::Address, Expr::value(parcel.details.address.clone()))
            .col_expr(parcel::Column::Phone, Expr::value(parcel.details.phone.clone()))
            .col_expr(parcel::Column::Weight, Expr::value(parcel.details.weight))
            .col_expr(parcel::Column::Note, Expr::value(parcel.details.note.clone()))
            .col_expr(parcel::Column::UpdatedAt, Expr::value(parcel.updated_at))
            .filter(parcel::Column::Id.eq(parcel.id))
            .filter(parcel::Column::CurrentStatus.eq(ParcelStatus::Pending.as_str()))
            .exec(self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::invalid_state("Only pending parcels can be edited"));
        }
        Ok(())
    }

    /// Move `current_status` from `expected` to the entry's status and append
    /// the entry at position `seq`.
    ///
    /// # Errors
    /// `InvalidState` when the stored status is no longer `expected`.
    pub async fn record_transition(
        &self,
        parcel_id: Uuid,
        expected: ParcelStatus,
        entry: &StatusEntry,
        seq: usize,
    ) -> AppResult<()> {
        let result = ParcelEntity::update_many()
            .col_expr(
                parcel::Column::CurrentStatus,
                Expr::value(entry.status.as_str()),
            )
            .col_expr(parcel::Column::UpdatedAt, Expr::value(entry.updated_at))
            .filter(parcel::Column::Id.eq(parcel_id))
            .filter(parcel::Column::CurrentStatus.eq(expected.as_str()))
            .exec(self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::invalid_state(
                "Parcel status was changed by another request",
            ));
        }

        insert_history_row(self.txn, parcel_id, seq, entry).await
    }
}

async fn insert_history_row<C: ConnectionTrait>(
    db: &C,
    parcel_id: Uuid,
    seq: usize,
    entry: &StatusEntry,
) -> AppResult<()> {
    let seq = i32::try_from(seq).map_err(|_| AppError::internal("Status history too long"))?;
    parcel_status::ActiveModel {
        id: Set(Uuid::new_v4()),
        parcel_id: Set(parcel_id),
        seq: Set(seq),
        status: Set(entry.status.as_str().to_string()),
        updated_by: Set(entry.updated_by),
        updated_at: Set(entry.updated_at),
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<Parcel>> {
    match ParcelEntity::find_by_id(id).one(db).await? {
        Some(model) => Ok(assemble(db, vec![model]).await?.pop()),
        None => Ok(None),
    }
}

fn scoped(scope: &ParcelScope, filter: &StatusFilter) -> Select<ParcelEntity> {
    let mut select = ParcelEntity::find();

    select = match scope {
        ParcelScope::All => select,
        ParcelScope::SentBy(sender) => select.filter(parcel::Column::SenderId.eq(*sender)),
        ParcelScope::AddressedTo(email) => {
            select.filter(parcel::Column::ReceiverEmail.eq(email.to_lowercase()))
        }
    };
    if !scope.includes_deleted() {
        select = select.filter(parcel::Column::IsDeleted.eq(false));
    }

    match filter {
        StatusFilter::Any => select,
        StatusFilter::Is(status) => select.filter(parcel::Column::CurrentStatus.eq(status.as_str())),
        StatusFilter::In(statuses) => select.filter(
            parcel::Column::CurrentStatus.is_in(statuses.iter().map(|s| s.as_str())),
        ),
        StatusFilter::Not(status) => {
            select.filter(parcel::Column::CurrentStatus.ne(status.as_str()))
        }
    }
}

/// Load history rows for `models` in one query and build the parcels,
/// keeping the order of `models`.
async fn assemble<C: ConnectionTrait>(db: &C, models: Vec<parcel::Model>) -> AppResult<Vec<Parcel>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let rows = StatusEntity::find()
        .filter(parcel_status::Column::ParcelId.is_in(ids))
        .order_by_asc(parcel_status::Column::ParcelId)
        .order_by_asc(parcel_status::Column::Seq)
        .all(db)
        .await?;

    let mut by_parcel: HashMap<Uuid, Vec<StatusEntry>> = HashMap::new();
    for row in rows {
        let parcel_id = row.parcel_id;
        by_parcel
            .entry(parcel_id)
            .or_default()
            .push(StatusEntry::try_from(row)?);
    }

    models
        .into_iter()
        .map(|model| {
            let entries = by_parcel.remove(&model.id).unwrap_or_default();
            let history = StatusHistory::from_entries(entries)?;
            model.into_parcel(history)
        })
        .collect()
}
