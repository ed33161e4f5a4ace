//! Access policy: which role may run which operation, and which parcels a
//! caller can see.
//!
//! Every permission decision in the services goes through [`authorize`]; the
//! table in [`is_permitted`] is exhaustive over roles and operations so adding
//! either forces a decision here.

use std::fmt;

use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::parcel::Parcel;
use crate::user::{User, UserRole};

/// Operations that are gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateParcel,
    UpdateParcel,
    CancelParcel,
    ConfirmDelivery,
    UpdateParcelStatus,
    DeleteParcel,
    ListParcels,
    ViewParcel,
    ListIncomingParcels,
    ViewDeliveryHistory,
    ListUsers,
    SetAccountState,
}

impl Operation {
    fn describe(&self) -> &'static str {
        match self {
            Operation::CreateParcel => "create parcels",
            Operation::UpdateParcel => "update parcels",
            Operation::CancelParcel => "cancel parcels",
            Operation::ConfirmDelivery => "confirm deliveries",
            Operation::UpdateParcelStatus => "change parcel status",
            Operation::DeleteParcel => "delete parcels",
            Operation::ListParcels => "list parcels",
            Operation::ViewParcel => "view parcels",
            Operation::ListIncomingParcels => "list incoming parcels",
            Operation::ViewDeliveryHistory => "view delivery history",
            Operation::ListUsers => "list users",
            Operation::SetAccountState => "change account state",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// The role/operation permission table.
pub fn is_permitted(role: UserRole, operation: Operation) -> bool {
    use Operation::*;
    use UserRole::*;

    match (role, operation) {
        (_, ListParcels | ViewParcel) => true,

        (Sender, CreateParcel | CancelParcel) => true,
        (Admin | Receiver, CreateParcel | CancelParcel) => false,

        // admins pass the role gate but still hit the ownership check
        (Sender | Admin, UpdateParcel | DeleteParcel) => true,
        (Receiver, UpdateParcel | DeleteParcel) => false,

        (Receiver, ConfirmDelivery | ListIncomingParcels) => true,
        (Admin | Sender, ConfirmDelivery | ListIncomingParcels) => false,

        (Sender | Receiver, ViewDeliveryHistory) => true,
        (Admin, ViewDeliveryHistory) => false,

        (Admin, UpdateParcelStatus | ListUsers | SetAccountState) => true,
        (Sender | Receiver, UpdateParcelStatus | ListUsers | SetAccountState) => false,
    }
}

/// Reject with `Forbidden` unless `role` may run `operation`.
pub fn authorize(role: UserRole, operation: Operation) -> DomainResult<()> {
    if is_permitted(role, operation) {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!(
            "{} accounts are not allowed to {}",
            role, operation
        )))
    }
}

/// Authenticated caller identity as resolved by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: UserRole,
}

impl Caller {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }
}

/// The set of parcels a caller may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelScope {
    /// Every parcel, soft-deleted ones included.
    All,
    /// Parcels this sender created.
    SentBy(Uuid),
    /// Parcels addressed to this receiver email.
    AddressedTo(String),
}

impl ParcelScope {
    /// Derive the scope from the caller's stored record.
    pub fn for_user(user: &User) -> Self {
        match user.role {
            UserRole::Admin => ParcelScope::All,
            UserRole::Sender => ParcelScope::SentBy(user.id),
            UserRole::Receiver => ParcelScope::AddressedTo(user.email.to_lowercase()),
        }
    }

    pub fn includes_deleted(&self) -> bool {
        matches!(self, ParcelScope::All)
    }

    /// Whether a single parcel falls inside this scope.
    pub fn permits(&self, parcel: &Parcel) -> bool {
        match self {
            ParcelScope::All => true,
            ParcelScope::SentBy(sender) => parcel.is_sent_by(*sender) && !parcel.is_deleted,
            ParcelScope::AddressedTo(email) => {
                parcel.is_addressed_to(email) && !parcel.is_deleted
            }
        }
    }
}
