//! Parcel entity and the shapes it is created, edited and exposed with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::status::{ParcelStatus, StatusEntry, StatusHistory, Transition};
use crate::user::UserRole;

/// Physical details of a parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ParcelDetails {
    pub address: String,
    pub phone: String,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ParcelDetails {
    /// Re-check the fields the lifecycle depends on.
    pub fn check(&self) -> DomainResult<()> {
        if self.address.trim().is_empty() {
            return Err(DomainError::bad_request("Delivery address is required"));
        }
        if self.phone.trim().is_empty() {
            return Err(DomainError::bad_request("Contact phone is required"));
        }
        check_weight(self.weight)
    }
}

pub fn check_weight(weight: f64) -> DomainResult<()> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(DomainError::bad_request("Parcel weight must be a positive number"))
    }
}

/// Parcel domain entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parcel {
    pub id: Uuid,
    pub tracking_id: String,
    pub sender_id: Uuid,
    pub receiver_email: String,
    pub details: ParcelDetails,
    pub fee: f64,
    pub current_status: ParcelStatus,
    pub status_history: StatusHistory,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Parcel {
    /// A freshly created parcel: `PENDING`, with one history entry by the sender.
    pub fn new(
        tracking_id: String,
        sender_id: Uuid,
        receiver_email: String,
        details: ParcelDetails,
        fee: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracking_id,
            sender_id,
            receiver_email,
            details,
            fee,
            current_status: ParcelStatus::Pending,
            status_history: StatusHistory::open(sender_id, at),
            is_deleted: false,
            created_at: at,
            updated_at: at,
        }
    }

    /// Apply a status transition in memory and return the entry to persist.
    ///
    /// `current_status` and the last history entry move together.
    pub fn transition(
        &mut self,
        transition: Transition,
        actor: Uuid,
        at: DateTime<Utc>,
    ) -> DomainResult<StatusEntry> {
        let next = transition.apply(self.current_status)?;
        let entry = StatusEntry {
            status: next,
            updated_at: at,
            updated_by: actor,
        };
        self.status_history.push(entry.clone());
        self.current_status = next;
        self.updated_at = at;
        Ok(entry)
    }

    pub fn is_sent_by(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id
    }

    pub fn is_addressed_to(&self, email: &str) -> bool {
        self.receiver_email.eq_ignore_ascii_case(email)
    }
}

/// Input for parcel creation. `rate` is the fee per unit of weight.
///
/// Receiver email and weight stay optional here so that their absence is
/// reported by the lifecycle checks, in order.
#[derive(Debug, Clone, Default)]
pub struct CreateParcel {
    pub receiver_email: Option<String>,
    pub address: String,
    pub phone: String,
    pub weight: Option<f64>,
    pub note: Option<String>,
    pub rate: f64,
}

/// Partial edit of a parcel's non-status fields.
///
/// The status fields are carried so that an attempt to set them can be
/// rejected instead of silently dropped.
#[derive(Debug, Clone, Default)]
pub struct UpdateParcel {
    pub receiver_email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub weight: Option<f64>,
    pub note: Option<String>,
    pub current_status: Option<String>,
    pub touches_status_history: bool,
}

impl UpdateParcel {
    pub fn touches_status(&self) -> bool {
        self.current_status.is_some() || self.touches_status_history
    }

    pub fn is_empty(&self) -> bool {
        self.receiver_email.is_none()
            && self.address.is_none()
            && self.phone.is_none()
            && self.weight.is_none()
            && self.note.is_none()
    }

    /// Field-level validation of whatever is present.
    pub fn check(&self) -> DomainResult<()> {
        if let Some(email) = &self.receiver_email {
            if email.trim().is_empty() {
                return Err(DomainError::bad_request("Receiver email cannot be empty"));
            }
        }
        if let Some(address) = &self.address {
            if address.trim().is_empty() {
                return Err(DomainError::bad_request("Delivery address cannot be empty"));
            }
        }
        if let Some(phone) = &self.phone {
            if phone.trim().is_empty() {
                return Err(DomainError::bad_request("Contact phone cannot be empty"));
            }
        }
        if let Some(weight) = self.weight {
            check_weight(weight)?;
        }
        Ok(())
    }

    /// Copy the present fields onto a parcel.
    pub fn apply_to(&self, parcel: &mut Parcel, at: DateTime<Utc>) {
        if let Some(email) = &self.receiver_email {
            parcel.receiver_email = email.trim().to_lowercase();
        }
        if let Some(address) = &self.address {
            parcel.details.address = address.clone();
        }
        if let Some(phone) = &self.phone {
            parcel.details.phone = phone.clone();
        }
        if let Some(weight) = self.weight {
            parcel.details.weight = weight;
        }
        if let Some(note) = &self.note {
            parcel.details.note = Some(note.clone());
        }
        parcel.updated_at = at;
    }
}

/// Parcel as returned to authenticated callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ParcelResponse {
    pub id: Uuid,
    pub tracking_id: String,
    pub sender_id: Uuid,
    pub receiver_email: String,
    pub details: ParcelDetails,
    pub fee: f64,
    pub current_status: ParcelStatus,
    pub status_history: Vec<StatusEntry>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Parcel> for ParcelResponse {
    fn from(parcel: &Parcel) -> Self {
        Self {
            id: parcel.id,
            tracking_id: parcel.tracking_id.clone(),
            sender_id: parcel.sender_id,
            receiver_email: parcel.receiver_email.clone(),
            details: parcel.details.clone(),
            fee: parcel.fee,
            current_status: parcel.current_status,
            status_history: parcel.status_history.as_slice().to_vec(),
            is_deleted: parcel.is_deleted,
            created_at: parcel.created_at,
            updated_at: parcel.updated_at,
        }
    }
}

/// History entry on the public tracking page: the updater is reduced to a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TrackedStatus {
    pub status: ParcelStatus,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by_role: Option<UserRole>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SenderContact {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Public projection returned by tracking-id lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TrackingView {
    pub receiver_email: String,
    pub details: ParcelDetails,
    pub fee: f64,
    pub current_status: ParcelStatus,
    pub status_history: Vec<TrackedStatus>,
    pub sender: SenderContact,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackingView {
    /// Build the projection; `role_of` resolves an updater id to a role.
    pub fn project<F>(parcel: &Parcel, sender: SenderContact, role_of: F) -> Self
    where
        F: Fn(Uuid) -> Option<UserRole>,
    {
        Self {
            receiver_email: parcel.receiver_email.clone(),
            details: parcel.details.clone(),
            fee: parcel.fee,
            current_status: parcel.current_status,
            status_history: parcel
                .status_history
                .iter()
                .map(|entry| TrackedStatus {
                    status: entry.status,
                    updated_at: entry.updated_at,
                    updated_by_role: role_of(entry.updated_by),
                })
                .collect(),
            sender,
            created_at: parcel.created_at,
            updated_at: parcel.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> ParcelDetails {
        ParcelDetails {
            address: "12 Harbour Road".to_string(),
            phone: "+8801700000000".to_string(),
            weight: 5.0,
            note: None,
        }
    }

    fn parcel() -> Parcel {
        Parcel::new(
            "TRK-20240101-123456".to_string(),
            Uuid::new_v4(),
            "receiver@example.com".to_string(),
            details(),
            50.0,
            Utc::now(),
        )
    }

    #[test]
    fn new_parcel_starts_pending_with_one_entry() {
        let parcel = parcel();

        assert_eq!(parcel.current_status, ParcelStatus::Pending);
        assert_eq!(parcel.status_history.len(), 1);
        assert_eq!(parcel.status_history.latest().updated_by, parcel.sender_id);
        assert!(!parcel.is_deleted);
    }

    #[test]
    fn transition_keeps_status_and_history_in_step() {
        let mut parcel = parcel();
        let admin = Uuid::new_v4();

        let entry = parcel
            .transition(
                Transition::AdminSet(Some(ParcelStatus::Approved)),
                admin,
                Utc::now(),
            )
            .unwrap();

        assert_eq!(entry.status, ParcelStatus::Approved);
        assert_eq!(parcel.current_status, parcel.status_history.latest().status);
        assert_eq!(parcel.status_history.len(), 2);
    }

    #[test]
    fn rejected_transition_leaves_parcel_untouched() {
        let mut parcel = parcel();
        parcel
            .transition(Transition::SenderCancel, parcel.sender_id, Utc::now())
            .unwrap();
        let before = parcel.clone();

        let result = parcel.transition(Transition::SenderCancel, parcel.sender_id, Utc::now());

        assert!(matches!(result, Err(DomainError::InvalidState(_))));
        assert_eq!(parcel, before);
    }

    #[test]
    fn update_flags_status_fields() {
        let update = UpdateParcel {
            current_status: Some("DELIVERED".to_string()),
            ..Default::default()
        };
        assert!(update.touches_status());

        let history_only = UpdateParcel {
            touches_status_history: true,
            ..Default::default()
        };
        assert!(history_only.touches_status());
    }

    #[test]
    fn update_rejects_bad_weight() {
        let update = UpdateParcel {
            weight: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(update.check(), Err(DomainError::BadRequest(_))));
    }

    #[test]
    fn receiver_match_ignores_case() {
        assert!(parcel().is_addressed_to("Receiver@Example.com"));
        assert!(!parcel().is_addressed_to("other@example.com"));
    }

    #[test]
    fn tracking_view_reduces_updaters_to_roles() {
        let parcel = parcel();
        let sender_id = parcel.sender_id;
        let view = TrackingView::project(
            &parcel,
            SenderContact {
                name: "Sender".to_string(),
                email: "sender@example.com".to_string(),
                phone: None,
            },
            |id| (id == sender_id).then_some(UserRole::Sender),
        );

        assert_eq!(view.status_history.len(), 1);
        assert_eq!(view.status_history[0].updated_by_role, Some(UserRole::Sender));

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("tracking_id").is_none());
        assert!(json.get("is_deleted").is_none());
        assert!(json.get("id").is_none());
    }
}
