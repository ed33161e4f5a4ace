//! Parcel status state machine and the append-only status history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Every status a parcel can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParcelStatus {
    Pending,
    Approved,
    Blocked,
    InTransit,
    Delivered,
    Confirmed,
    Cancelled,
}

impl ParcelStatus {
    pub const ALL: [ParcelStatus; 7] = [
        ParcelStatus::Pending,
        ParcelStatus::Approved,
        ParcelStatus::Blocked,
        ParcelStatus::InTransit,
        ParcelStatus::Delivered,
        ParcelStatus::Confirmed,
        ParcelStatus::Cancelled,
    ];

    /// Statuses that count as handed over, for delivery history.
    pub const DELIVERED_STATES: [ParcelStatus; 2] =
        [ParcelStatus::Delivered, ParcelStatus::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParcelStatus::Pending => "PENDING",
            ParcelStatus::Approved => "APPROVED",
            ParcelStatus::Blocked => "BLOCKED",
            ParcelStatus::InTransit => "IN_TRANSIT",
            ParcelStatus::Delivered => "DELIVERED",
            ParcelStatus::Confirmed => "CONFIRMED",
            ParcelStatus::Cancelled => "CANCELLED",
        }
    }

    /// No role-driven transition leaves these states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParcelStatus::Confirmed | ParcelStatus::Cancelled)
    }

    /// A sender may not delete a parcel that is moving or already handed over.
    pub fn is_sender_deletable(&self) -> bool {
        !matches!(
            self,
            ParcelStatus::InTransit | ParcelStatus::Delivered | ParcelStatus::Confirmed
        )
    }
}

impl FromStr for ParcelStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        ParcelStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("Unknown parcel status '{}'", s)))
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status change request, tagged with the kind of actor driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Owning sender withdraws the parcel.
    SenderCancel,
    /// Addressed receiver acknowledges receipt.
    ReceiverConfirm,
    /// Admin forces a status. `None` means the request carried no status.
    AdminSet(Option<ParcelStatus>),
}

impl Transition {
    /// Resolve the next status from `current`, or reject the request.
    pub fn apply(self, current: ParcelStatus) -> DomainResult<ParcelStatus> {
        match self {
            Transition::SenderCancel => match current {
                ParcelStatus::Pending => Ok(ParcelStatus::Cancelled),
                other => Err(DomainError::invalid_state(format!(
                    "Only pending parcels can be cancelled (current status: {})",
                    other
                ))),
            },
            Transition::ReceiverConfirm => match current {
                ParcelStatus::Confirmed => Err(DomainError::invalid_state(
                    "Parcel has already been confirmed by the receiver",
                )),
                ParcelStatus::Cancelled | ParcelStatus::Blocked => {
                    Err(DomainError::invalid_state(format!(
                        "A {} parcel cannot be confirmed",
                        current
                    )))
                }
                _ => Ok(ParcelStatus::Confirmed),
            },
            Transition::AdminSet(None) => {
                Err(DomainError::invalid_state("A target status is required"))
            }
            Transition::AdminSet(Some(requested)) if requested == current => Err(
                DomainError::invalid_state(format!("Parcel is already {}", current)),
            ),
            Transition::AdminSet(Some(requested)) => Ok(requested),
        }
    }
}

/// One audit record: which status, when, and who set it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusEntry {
    pub status: ParcelStatus,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Uuid,
}

/// Ordered, push-only log of status entries.
///
/// Never empty and always starts with `PENDING`. There is no way to edit or
/// drop an entry once it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatusHistory(Vec<StatusEntry>);

impl StatusHistory {
    /// Start a history with the creation entry.
    pub fn open(created_by: Uuid, at: DateTime<Utc>) -> Self {
        Self(vec![StatusEntry {
            status: ParcelStatus::Pending,
            updated_at: at,
            updated_by: created_by,
        }])
    }

    /// Rebuild a history read back from storage, checking its shape.
    pub fn from_entries(entries: Vec<StatusEntry>) -> DomainResult<Self> {
        match entries.first() {
            None => Err(DomainError::internal("Parcel has an empty status history")),
            Some(first) if first.status != ParcelStatus::Pending => Err(DomainError::internal(
                format!("Status history starts with {} instead of PENDING", first.status),
            )),
            Some(_) => Ok(Self(entries)),
        }
    }

    pub fn push(&mut self, entry: StatusEntry) {
        self.0.push(entry);
    }

    pub fn latest(&self) -> &StatusEntry {
        // from_entries and open both guarantee at least one entry
        &self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StatusEntry> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[StatusEntry] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a StatusHistory {
    type Item = &'a StatusEntry;
    type IntoIter = std::slice::Iter<'a, StatusEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
