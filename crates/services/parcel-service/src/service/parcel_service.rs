//! Parcel lifecycle engine.
//!
//! Every operation loads the records it needs, asks the access policy and the
//! status state machine, and writes through the unit of work. Creation, edits
//! and status transitions run inside one database transaction each; the
//! status moves with a compare-and-set together with its history row, so two
//! concurrent transitions on one parcel cannot both commit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{
    authorize, calculate_fee, check_weight, generate_tracking_id, is_valid_tracking_id, Caller,
    CreateParcel, Operation, Page, PageMeta, Parcel, ParcelDetails, ParcelQuery, ParcelScope,
    ParcelStatus, SenderContact, TrackingView, Transition, UpdateParcel, User, UserRole,
};

use crate::infra::UnitOfWork;
use crate::repository::{StatusFilter, TxParcelRepository};

/// Parcel lifecycle operations.
#[async_trait]
pub trait ParcelService: Send + Sync {
    /// Create a parcel for the calling sender and link it to them.
    async fn create_parcel(&self, caller: Caller, input: CreateParcel) -> AppResult<Parcel>;

    /// Edit a pending parcel's non-status fields (owning sender only).
    async fn update_parcel(
        &self,
        caller: Caller,
        parcel_id: Uuid,
        update: UpdateParcel,
    ) -> AppResult<Parcel>;

    /// Owning sender cancels a pending parcel.
    async fn cancel_parcel(&self, caller: Caller, parcel_id: Uuid) -> AppResult<Parcel>;

    /// Addressed receiver confirms delivery.
    async fn confirm_delivery(&self, caller: Caller, parcel_id: Uuid) -> AppResult<Parcel>;

    /// Admin forces a status.
    async fn update_status(
        &self,
        caller: Caller,
        parcel_id: Uuid,
        status: Option<ParcelStatus>,
    ) -> AppResult<Parcel>;

    /// Soft delete. No history entry is recorded.
    async fn delete_parcel(&self, caller: Caller, parcel_id: Uuid) -> AppResult<Parcel>;

    async fn get_parcel(&self, caller: Caller, parcel_id: Uuid) -> AppResult<Parcel>;

    async fn list_parcels(&self, caller: Caller, query: ParcelQuery) -> AppResult<Page<Parcel>>;

    /// Parcels addressed to the calling receiver that are not yet delivered.
    async fn incoming_parcels(&self, caller: Caller) -> AppResult<Vec<Parcel>>;

    /// Delivered or confirmed parcels in the caller's scope.
    async fn delivery_history(&self, caller: Caller) -> AppResult<Vec<Parcel>>;

    /// Public lookup by tracking id.
    async fn track(&self, tracking_id: &str) -> AppResult<TrackingView>;

    /// Check the database behind the service.
    async fn ping(&self) -> AppResult<()>;
}

/// Concrete implementation of ParcelService over a unit of work.
pub struct ParcelManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> ParcelManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// The caller's live user record.
    async fn caller_record(&self, caller: Caller) -> AppResult<User> {
        self.uow
            .users()
            .find_by_id(caller.id)
            .await?
            .ok_or_not_found("User")
    }
}

/// Soft-deleted parcels exist only for admins.
fn visible_to(parcel: Option<Parcel>, role: UserRole) -> AppResult<Parcel> {
    parcel
        .filter(|p| role.is_admin() || !p.is_deleted)
        .ok_or_not_found("Parcel")
}

fn reject_restricted(user: &User) -> AppResult<()> {
    if user.is_restricted() {
        return Err(AppError::bad_request(
            "User is blocked or deleted",
        ));
    }
    Ok(())
}

/// Resolve a receiver email to a live RECEIVER account.
fn require_receiver(user: Option<User>) -> AppResult<User> {
    let user = user
        .filter(|u| !u.is_deleted())
        .ok_or_not_found("Receiver")?;
    if user.role != UserRole::Receiver {
        return Err(AppError::bad_request(format!(
            "{} is not a receiver account",
            user.email
        )));
    }
    Ok(user)
}

/// Apply `transition` and persist it: status compare-and-set plus one
/// history row.
async fn record_transition(
    parcels: &TxParcelRepository<'_>,
    parcel: &mut Parcel,
    transition: Transition,
    actor: Uuid,
) -> AppResult<()> {
    let previous = parcel.current_status;
    let entry = parcel.transition(transition, actor, Utc::now())?;
    let seq = parcel.status_history.len() - 1;
    parcels
        .record_transition(parcel.id, previous, &entry, seq)
        .await
}

#[async_trait]
impl<U: UnitOfWork + 'static> ParcelService for ParcelManager<U> {
    async fn create_parcel(&self, caller: Caller, input: CreateParcel) -> AppResult<Parcel> {
        let parcel = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let sender = ctx
                        .users()
                        .find_by_id_with_deleted(caller.id)
                        .await?
                        .ok_or_not_found("Sender")?;
                    authorize(sender.role, Operation::CreateParcel)?;
                    reject_restricted(&sender)?;

                    let receiver_email = input
                        .receiver_email
                        .as_deref()
                        .map(str::trim)
                        .filter(|email| !email.is_empty())
                        .ok_or_else(|| AppError::bad_request("Receiver email is required"))?
                        .to_lowercase();
                    require_receiver(
                        ctx.users()
                            .find_by_email_with_deleted(&receiver_email)
                            .await?,
                    )?;

                    let weight = input
                        .weight
                        .ok_or_else(|| AppError::bad_request("Parcel weight is required"))?;
                    check_weight(weight)?;

                    let details = ParcelDetails {
                        address: input.address,
                        phone: input.phone,
                        weight,
                        note: input.note,
                    };
                    details.check()?;
                    let fee = calculate_fee(input.rate, weight)?;

                    let now = Utc::now();
                    let parcel = Parcel::new(
                        generate_tracking_id(now),
                        sender.id,
                        receiver_email,
                        details,
                        fee,
                        now,
                    );

                    let parcels = ctx.parcels();
                    parcels.insert(&parcel).await?;
                    parcels.link_to_sender(sender.id, parcel.id).await?;
                    Ok(parcel)
                })
            })
            .await?;

        info!(
            parcel_id = %parcel.id,
            tracking_id = %parcel.tracking_id,
            sender_id = %parcel.sender_id,
            fee = parcel.fee,
            "Parcel created"
        );
        Ok(parcel)
    }

    async fn update_parcel(
        &self,
        caller: Caller,
        parcel_id: Uuid,
        update: UpdateParcel,
    ) -> AppResult<Parcel> {
        authorize(caller.role, Operation::UpdateParcel)?;

        let parcel = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let parcels = ctx.parcels();
                    let mut parcel = visible_to(parcels.find_by_id(parcel_id).await?, caller.role)?;

                    let user = ctx
                        .users()
                        .find_by_id_with_deleted(caller.id)
                        .await?
                        .ok_or_not_found("User")?;
                    reject_restricted(&user)?;

                    if !parcel.is_sent_by(user.id) {
                        return Err(AppError::forbidden("You can only update your own parcels"));
                    }
                    if update.touches_status() {
                        return Err(AppError::invalid_state(
                            "Parcel status can only be changed through the status operations",
                        ));
                    }
                    if parcel.current_status != ParcelStatus::Pending {
                        return Err(AppError::invalid_state(format!(
                            "Only pending parcels can be edited (current status: {})",
                            parcel.current_status
                        )));
                    }

                    update.check()?;
                    if update.is_empty() {
                        return Err(AppError::bad_request("No fields to update"));
                    }
                    if let Some(email) = &update.receiver_email {
                        require_receiver(
                            ctx.users()
                                .find_by_email_with_deleted(email.trim())
                                .await?,
                        )?;
                    }

                    update.apply_to(&mut parcel, Utc::now());
                    parcels.save_details(&parcel).await?;
                    Ok(parcel)
                })
            })
            .await?;

        info!(parcel_id = %parcel.id, actor = %caller.id, "Parcel updated");
        Ok(parcel)
    }

    async fn cancel_parcel(&self, caller: Caller, parcel_id: Uuid) -> AppResult<Parcel> {
        let parcel = self
            .uow
            .transaction_serializable(move |ctx| {
                Box::pin(async move {
                    let parcels = ctx.parcels();
                    let mut parcel = visible_to(parcels.find_by_id(parcel_id).await?, caller.role)?;

                    let user = ctx
                        .users()
                        .find_by_id_with_deleted(caller.id)
                        .await?
                        .ok_or_not_found("User")?;
                    reject_restricted(&user)?;
                    authorize(user.role, Operation::CancelParcel)?;
                    if !parcel.is_sent_by(user.id) {
                        return Err(AppError::forbidden("You can only cancel your own parcels"));
                    }

                    record_transition(&parcels, &mut parcel, Transition::SenderCancel, user.id)
                        .await?;
                    Ok(parcel)
                })
            })
            .await?;

        info!(parcel_id = %parcel.id, actor = %caller.id, "Parcel cancelled");
        Ok(parcel)
    }

    async fn confirm_delivery(&self, caller: Caller, parcel_id: Uuid) -> AppResult<Parcel> {
        let parcel = self
            .uow
            .transaction_serializable(move |ctx| {
                Box::pin(async move {
                    let receiver = ctx
                        .users()
                        .find_by_id_with_deleted(caller.id)
                        .await?
                        .ok_or_not_found("Receiver")?;
                    authorize(receiver.role, Operation::ConfirmDelivery)?;
                    reject_restricted(&receiver)?;

                    let parcels = ctx.parcels();
                    let mut parcel =
                        visible_to(parcels.find_by_id(parcel_id).await?, receiver.role)?;
                    if !parcel.is_addressed_to(&receiver.email) {
                        return Err(AppError::forbidden("This parcel is not addressed to you"));
                    }

                    record_transition(
                        &parcels,
                        &mut parcel,
                        Transition::ReceiverConfirm,
                        receiver.id,
                    )
                    .await?;
                    Ok(parcel)
                })
            })
            .await?;

        info!(parcel_id = %parcel.id, actor = %caller.id, "Delivery confirmed");
        Ok(parcel)
    }

    async fn update_status(
        &self,
        caller: Caller,
        parcel_id: Uuid,
        status: Option<ParcelStatus>,
    ) -> AppResult<Parcel> {
        authorize(caller.role, Operation::UpdateParcelStatus)?;

        let parcel = self
            .uow
            .transaction_serializable(move |ctx| {
                Box::pin(async move {
                    let parcels = ctx.parcels();
                    let mut parcel = parcels
                        .find_by_id(parcel_id)
                        .await?
                        .ok_or_not_found("Parcel")?;

                    record_transition(
                        &parcels,
                        &mut parcel,
                        Transition::AdminSet(status),
                        caller.id,
                    )
                    .await?;
                    Ok(parcel)
                })
            })
            .await?;

        info!(
            parcel_id = %parcel.id,
            status = %parcel.current_status,
            actor = %caller.id,
            "Parcel status changed"
        );
        Ok(parcel)
    }

    async fn delete_parcel(&self, caller: Caller, parcel_id: Uuid) -> AppResult<Parcel> {
        let parcels = self.uow.parcels();
        let parcel = visible_to(parcels.find_by_id(parcel_id).await?, caller.role)?;

        authorize(caller.role, Operation::DeleteParcel)?;
        if caller.role == UserRole::Sender {
            if !parcel.is_sent_by(caller.id) {
                return Err(AppError::forbidden("You can only delete your own parcels"));
            }
            if !parcel.current_status.is_sender_deletable() {
                return Err(AppError::invalid_state(format!(
                    "A parcel that is {} cannot be deleted",
                    parcel.current_status
                )));
            }
        }

        if parcel.is_deleted {
            return Ok(parcel);
        }

        let parcel = parcels.mark_deleted(parcel.id).await?;
        info!(parcel_id = %parcel.id, actor = %caller.id, "Parcel deleted");
        Ok(parcel)
    }

    async fn get_parcel(&self, caller: Caller, parcel_id: Uuid) -> AppResult<Parcel> {
        let user = self.caller_record(caller).await?;
        reject_restricted(&user)?;
        authorize(user.role, Operation::ViewParcel)?;

        let parcel = visible_to(
            self.uow.parcels().find_by_id(parcel_id).await?,
            user.role,
        )?;
        if !ParcelScope::for_user(&user).permits(&parcel) {
            return Err(AppError::forbidden("You are not allowed to view this parcel"));
        }
        Ok(parcel)
    }

    async fn list_parcels(&self, caller: Caller, query: ParcelQuery) -> AppResult<Page<Parcel>> {
        let user = self.caller_record(caller).await?;
        reject_restricted(&user)?;
        authorize(user.role, Operation::ListParcels)?;

        let (data, total) = self
            .uow
            .parcels()
            .page(ParcelScope::for_user(&user), query)
            .await?;

        Ok(Page {
            data,
            meta: PageMeta::new(&query, total),
        })
    }

    async fn incoming_parcels(&self, caller: Caller) -> AppResult<Vec<Parcel>> {
        let user = self.caller_record(caller).await?;
        authorize(user.role, Operation::ListIncomingParcels)?;

        self.uow
            .parcels()
            .find_all(
                ParcelScope::for_user(&user),
                StatusFilter::Not(ParcelStatus::Delivered),
            )
            .await
    }

    async fn delivery_history(&self, caller: Caller) -> AppResult<Vec<Parcel>> {
        let user = self.caller_record(caller).await?;
        authorize(user.role, Operation::ViewDeliveryHistory)?;

        self.uow
            .parcels()
            .find_all(
                ParcelScope::for_user(&user),
                StatusFilter::In(ParcelStatus::DELIVERED_STATES.to_vec()),
            )
            .await
    }

    async fn track(&self, tracking_id: &str) -> AppResult<TrackingView> {
        let tracking_id = tracking_id.trim();
        if !is_valid_tracking_id(tracking_id) {
            return Err(AppError::bad_request(format!(
                "'{}' is not a valid tracking id",
                tracking_id
            )));
        }

        let parcel = self
            .uow
            .parcels()
            .find_by_tracking_id(tracking_id)
            .await?
            .ok_or_not_found("Parcel")?;

        let mut ids: HashSet<Uuid> = parcel
            .status_history
            .iter()
            .map(|entry| entry.updated_by)
            .collect();
        ids.insert(parcel.sender_id);

        let users = self.uow.users().find_by_ids(ids.into_iter().collect()).await?;
        let roles: HashMap<Uuid, UserRole> = users.iter().map(|u| (u.id, u.role)).collect();
        let sender = users
            .into_iter()
            .find(|u| u.id == parcel.sender_id)
            .ok_or_not_found("Sender")?;

        Ok(TrackingView::project(
            &parcel,
            SenderContact {
                name: sender.name,
                email: sender.email,
                phone: sender.phone,
            },
            |id| roles.get(&id).copied(),
        ))
    }

    async fn ping(&self) -> AppResult<()> {
        self.uow.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    use crate::infra::{TransactionContext, TxFuture};
    use crate::repository::{
        MockParcelRepository, MockUserRepository, ParcelRepository, UserRepository,
    };
    use domain::ActiveState;

    /// Unit of work over mocked repositories. Transactions are not available;
    /// transactional paths are covered by the database tests.
    struct TestUnitOfWork {
        users: Arc<MockUserRepository>,
        parcels: Arc<MockParcelRepository>,
    }

    impl TestUnitOfWork {
        fn new(users: MockUserRepository, parcels: MockParcelRepository) -> Self {
            Self {
                users: Arc::new(users),
                parcels: Arc::new(parcels),
            }
        }
    }

    #[async_trait]
    impl UnitOfWork for TestUnitOfWork {
        fn users(&self) -> Arc<dyn UserRepository> {
            self.users.clone()
        }

        fn parcels(&self) -> Arc<dyn ParcelRepository> {
            self.parcels.clone()
        }

        async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
        where
            F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
            T: Send,
        {
            Err(AppError::internal("Transactions not supported in test mock"))
        }

        async fn transaction_serializable<F, T>(&self, _f: F) -> AppResult<T>
        where
            F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
            T: Send,
        {
            Err(AppError::internal("Transactions not supported in test mock"))
        }

        async fn ping(&self) -> AppResult<()> {
            Ok(())
        }
    }

    fn manager(users: MockUserRepository, parcels: MockParcelRepository) -> impl ParcelService {
        ParcelManager::new(Arc::new(TestUnitOfWork::new(users, parcels)))
    }

    fn user(role: UserRole, email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: String::new(),
            name: format!("{} user", role),
            role,
            active_state: ActiveState::Active,
            phone: Some("+15550100".to_string()),
            address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn parcel_from(sender: &User, receiver_email: &str, status: ParcelStatus) -> Parcel {
        let mut parcel = Parcel::new(
            "TRK-20240115-424242".to_string(),
            sender.id,
            receiver_email.to_string(),
            ParcelDetails {
                address: "1 Dock Street".to_string(),
                phone: "+15550101".to_string(),
                weight: 2.0,
                note: None,
            },
            20.0,
            Utc::now(),
        );
        if status != ParcelStatus::Pending {
            parcel
                .transition(Transition::AdminSet(Some(status)), Uuid::new_v4(), Utc::now())
                .unwrap();
        }
        parcel
    }

    fn expect_caller(users: &mut MockUserRepository, caller: &User) {
        let record = caller.clone();
        users
            .expect_find_by_id()
            .with(eq(caller.id))
            .returning(move |_| Ok(Some(record.clone())));
    }

    fn expect_parcel(parcels: &mut MockParcelRepository, parcel: &Parcel) {
        let stored = parcel.clone();
        parcels
            .expect_find_by_id()
            .with(eq(parcel.id))
            .returning(move |_| Ok(Some(stored.clone())));
    }

    #[tokio::test]
    async fn sender_reads_own_parcel() {
        let sender = user(UserRole::Sender, "s@example.com");
        let parcel = parcel_from(&sender, "r@example.com", ParcelStatus::Pending);

        let mut users = MockUserRepository::new();
        expect_caller(&mut users, &sender);
        let mut parcels = MockParcelRepository::new();
        expect_parcel(&mut parcels, &parcel);

        let result = manager(users, parcels)
            .get_parcel(Caller::new(sender.id, UserRole::Sender), parcel.id)
            .await;

        assert_eq!(assert_ok!(result).id, parcel.id);
    }

    #[tokio::test]
    async fn cross_role_read_is_forbidden() {
        let sender = user(UserRole::Sender, "s@example.com");
        let stranger = user(UserRole::Receiver, "someone-else@example.com");
        let parcel = parcel_from(&sender, "r@example.com", ParcelStatus::Pending);

        let mut users = MockUserRepository::new();
        expect_caller(&mut users, &stranger);
        let mut parcels = MockParcelRepository::new();
        expect_parcel(&mut parcels, &parcel);

        let result = manager(users, parcels)
            .get_parcel(Caller::new(stranger.id, UserRole::Receiver), parcel.id)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn deleted_parcel_is_not_found_for_its_sender() {
        let sender = user(UserRole::Sender, "s@example.com");
        let mut parcel = parcel_from(&sender, "r@example.com", ParcelStatus::Pending);
        parcel.is_deleted = true;

        let mut users = MockUserRepository::new();
        expect_caller(&mut users, &sender);
        let mut parcels = MockParcelRepository::new();
        expect_parcel(&mut parcels, &parcel);

        let result = manager(users, parcels)
            .get_parcel(Caller::new(sender.id, UserRole::Sender), parcel.id)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn admin_reads_deleted_parcel() {
        let sender = user(UserRole::Sender, "s@example.com");
        let admin = user(UserRole::Admin, "admin@example.com");
        let mut parcel = parcel_from(&sender, "r@example.com", ParcelStatus::Pending);
        parcel.is_deleted = true;

        let mut users = MockUserRepository::new();
        expect_caller(&mut users, &admin);
        let mut parcels = MockParcelRepository::new();
        expect_parcel(&mut parcels, &parcel);

        let result = manager(users, parcels)
            .get_parcel(Caller::new(admin.id, UserRole::Admin), parcel.id)
            .await;

        assert!(assert_ok!(result).is_deleted);
    }

    #[tokio::test]
    async fn sender_cannot_delete_parcel_in_transit() {
        let sender = user(UserRole::Sender, "s@example.com");
        let parcel = parcel_from(&sender, "r@example.com", ParcelStatus::InTransit);

        let mut parcels = MockParcelRepository::new();
        expect_parcel(&mut parcels, &parcel);
        parcels.expect_mark_deleted().never();

        let result = manager(MockUserRepository::new(), parcels)
            .delete_parcel(Caller::new(sender.id, UserRole::Sender), parcel.id)
            .await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn admin_deletes_parcel_in_transit_without_new_history() {
        let sender = user(UserRole::Sender, "s@example.com");
        let admin = user(UserRole::Admin, "admin@example.com");
        let parcel = parcel_from(&sender, "r@example.com", ParcelStatus::InTransit);
        let history_len = parcel.status_history.len();

        let mut parcels = MockParcelRepository::new();
        expect_parcel(&mut parcels, &parcel);
        let mut deleted = parcel.clone();
        deleted.is_deleted = true;
        parcels
            .expect_mark_deleted()
            .with(eq(parcel.id))
            .times(1)
            .returning(move |_| Ok(deleted.clone()));

        let result = manager(MockUserRepository::new(), parcels)
            .delete_parcel(Caller::new(admin.id, UserRole::Admin), parcel.id)
            .await;

        let deleted = assert_ok!(result);
        assert!(deleted.is_deleted);
        assert_eq!(deleted.status_history.len(), history_len);
        assert_eq!(deleted.current_status, ParcelStatus::InTransit);
    }

    #[tokio::test]
    async fn receiver_can_never_delete() {
        let sender = user(UserRole::Sender, "s@example.com");
        let receiver = user(UserRole::Receiver, "r@example.com");
        let parcel = parcel_from(&sender, "r@example.com", ParcelStatus::Pending);

        let mut parcels = MockParcelRepository::new();
        expect_parcel(&mut parcels, &parcel);
        parcels.expect_mark_deleted().never();

        let result = manager(MockUserRepository::new(), parcels)
            .delete_parcel(Caller::new(receiver.id, UserRole::Receiver), parcel.id)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn delete_missing_parcel_is_not_found() {
        let mut parcels = MockParcelRepository::new();
        parcels.expect_find_by_id().returning(|_| Ok(None));

        let result = manager(MockUserRepository::new(), parcels)
            .delete_parcel(Caller::new(Uuid::new_v4(), UserRole::Admin), Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn status_update_requires_admin_claim() {
        let parcels = MockParcelRepository::new();

        let result = manager(MockUserRepository::new(), parcels)
            .update_status(
                Caller::new(Uuid::new_v4(), UserRole::Sender),
                Uuid::new_v4(),
                Some(ParcelStatus::Delivered),
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn receivers_are_rejected_from_updates_outright() {
        let result = manager(MockUserRepository::new(), MockParcelRepository::new())
            .update_parcel(
                Caller::new(Uuid::new_v4(), UserRole::Receiver),
                Uuid::new_v4(),
                UpdateParcel {
                    address: Some("elsewhere".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn listing_uses_sender_scope_and_page_meta() {
        let sender = user(UserRole::Sender, "s@example.com");
        let parcel = parcel_from(&sender, "r@example.com", ParcelStatus::Pending);
        let query = ParcelQuery::new(None, Some(2), Some(1));

        let mut users = MockUserRepository::new();
        expect_caller(&mut users, &sender);
        let mut parcels = MockParcelRepository::new();
        parcels
            .expect_page()
            .with(eq(ParcelScope::SentBy(sender.id)), eq(query))
            .returning(move |_, _| Ok((vec![parcel.clone()], 3)));

        let page = assert_ok!(
            manager(users, parcels)
                .list_parcels(Caller::new(sender.id, UserRole::Sender), query)
                .await
        );

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.meta.page, 2);
        assert_eq!(page.meta.total_page, 3);
        assert_eq!(page.meta.total_documents, 3);
    }

    #[tokio::test]
    async fn incoming_excludes_delivered_for_receiver() {
        let receiver = user(UserRole::Receiver, "r@example.com");

        let mut users = MockUserRepository::new();
        expect_caller(&mut users, &receiver);
        let mut parcels = MockParcelRepository::new();
        parcels
            .expect_find_all()
            .with(
                eq(ParcelScope::AddressedTo("r@example.com".to_string())),
                eq(StatusFilter::Not(ParcelStatus::Delivered)),
            )
            .returning(|_, _| Ok(Vec::new()));

        let result = manager(users, parcels)
            .incoming_parcels(Caller::new(receiver.id, UserRole::Receiver))
            .await;

        assert_ok!(result);
    }

    #[tokio::test]
    async fn incoming_is_receiver_only() {
        let sender = user(UserRole::Sender, "s@example.com");

        let mut users = MockUserRepository::new();
        expect_caller(&mut users, &sender);

        let result = manager(users, MockParcelRepository::new())
            .incoming_parcels(Caller::new(sender.id, UserRole::Sender))
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn admin_has_no_delivery_history() {
        let admin = user(UserRole::Admin, "admin@example.com");

        let mut users = MockUserRepository::new();
        expect_caller(&mut users, &admin);

        let result = manager(users, MockParcelRepository::new())
            .delivery_history(Caller::new(admin.id, UserRole::Admin))
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn malformed_tracking_id_is_rejected_before_lookup() {
        let mut parcels = MockParcelRepository::new();
        parcels.expect_find_by_tracking_id().never();

        let result = manager(MockUserRepository::new(), parcels)
            .track("not-a-tracking-id")
            .await;

        assert_err!(&result);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn tracking_projection_reduces_updaters_to_roles() {
        let sender = user(UserRole::Sender, "s@example.com");
        let admin = user(UserRole::Admin, "admin@example.com");
        let mut parcel = parcel_from(&sender, "r@example.com", ParcelStatus::Pending);
        parcel
            .transition(
                Transition::AdminSet(Some(ParcelStatus::Approved)),
                admin.id,
                Utc::now(),
            )
            .unwrap();
        let tracking_id = parcel.tracking_id.clone();

        let mut parcels = MockParcelRepository::new();
        let stored = parcel.clone();
        parcels
            .expect_find_by_tracking_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut users = MockUserRepository::new();
        let known = vec![sender.clone(), admin.clone()];
        users
            .expect_find_by_ids()
            .returning(move |_| Ok(known.clone()));

        let service = manager(users, parcels);
        let first = assert_ok!(service.track(&tracking_id).await);
        let second = assert_ok!(service.track(&tracking_id).await);

        assert_eq!(first, second);
        assert_eq!(first.sender.email, "s@example.com");
        let roles: Vec<_> = first
            .status_history
            .iter()
            .map(|entry| entry.updated_by_role)
            .collect();
        assert_eq!(roles, vec![Some(UserRole::Sender), Some(UserRole::Admin)]);
    }

    #[test]
    fn record_helpers_reject_restricted_accounts() {
        let mut blocked = user(UserRole::Sender, "s@example.com");
        blocked.active_state = ActiveState::Blocked;
        assert!(matches!(
            reject_restricted(&blocked),
            Err(AppError::BadRequest(_))
        ));

        let sender = user(UserRole::Sender, "s@example.com");
        assert!(matches!(
            require_receiver(Some(sender)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(require_receiver(None), Err(AppError::NotFound(_))));
    }
}
