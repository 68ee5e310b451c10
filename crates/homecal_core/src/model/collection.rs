//! Event collections and permission-scoped shares.
//!
//! # Responsibility
//! - Define `EventCollection` and its share records.
//! - Own the share lifecycle (`pending -> accepted|declined`, `-> revoked`)
//!   and the totally ordered permission capability set.
//!
//! # Invariants
//! - `accepted_at` is `Some` iff `status == Accepted`.
//! - Collection names are non-empty.
//! - Deleting a collection removes its shares and membership links but never
//!   its member events.

use crate::model::event::{CollectionId, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable row identifier for collection shares.
pub type ShareId = i64;

/// Capability level granted by a share.
///
/// Variants are declared weakest to strongest so the derived `Ord` is the
/// capability ordering: `View < Contributor < Organizer < Creator`. All
/// permission checks compare through this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read events and propose changes to organizers/creator.
    View,
    /// Edit title, description, location and attendees.
    Contributor,
    /// Contributor rights plus event timing.
    Organizer,
    /// Unrestricted. Also held implicitly by `created_by` identities.
    Creator,
}

/// Lifecycle state of a share grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    Pending,
    Accepted,
    Declined,
    Revoked,
}

/// Validation error for collection state and share transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionValidationError {
    /// Collection name is empty or whitespace-only.
    EmptyName,
    /// Persistent state violates `accepted_at == Some iff status == Accepted`.
    AcceptanceStateMismatch(ShareId),
}

impl Display for CollectionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "collection name must not be empty"),
            Self::AcceptanceStateMismatch(id) => {
                write!(f, "share {id} violates status/accepted_at consistency")
            }
        }
    }
}

impl Error for CollectionValidationError {}

/// A grant of a permission level on one collection to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCollectionShare {
    /// Assigned by storage on creation; `0` for unsaved drafts.
    pub id: ShareId,
    pub collection_id: CollectionId,
    /// Email of the grantee.
    pub shared_with: String,
    pub permission: Permission,
    /// Email of the granter.
    pub shared_by: String,
    pub shared_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    pub status: ShareStatus,
    /// Optional message shown to the grantee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EventCollectionShare {
    /// Creates a fresh pending grant.
    pub fn pending(
        collection_id: CollectionId,
        shared_with: impl Into<String>,
        permission: Permission,
        shared_by: impl Into<String>,
        shared_at: DateTime<Utc>,
        message: Option<String>,
    ) -> Self {
        Self {
            id: 0,
            collection_id,
            shared_with: shared_with.into(),
            permission,
            shared_by: shared_by.into(),
            shared_at,
            accepted_at: None,
            status: ShareStatus::Pending,
            message: None,
        }
        .with_message(message)
    }

    fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    /// A share still granting or about to grant access.
    ///
    /// Used for duplicate-share conflict checks: declined and revoked shares
    /// do not block a new grant.
    pub fn is_active(&self) -> bool {
        matches!(self.status, ShareStatus::Pending | ShareStatus::Accepted)
    }

    /// Checks the `accepted_at == Some iff status == Accepted` invariant.
    pub fn is_acceptance_state_consistent(&self) -> bool {
        (self.status == ShareStatus::Accepted) == self.accepted_at.is_some()
    }
}

/// A named group of events with its own sharing grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCollection {
    /// Assigned by storage on creation; `0` for unsaved drafts.
    pub id: CollectionId,
    pub name: String,
    pub description: Option<String>,
    /// Hex color for UI rendering.
    pub color: String,
    /// Optional emoji or icon name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Email of the collection creator.
    pub created_by: String,
    /// Member events, ordered by insertion.
    pub event_ids: Vec<EventId>,
    /// All share records, including declined and revoked ones.
    pub shares: Vec<EventCollectionShare>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventCollection {
    /// Creates an unsaved collection draft.
    pub fn draft(
        name: impl Into<String>,
        color: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            description: None,
            color: color.into(),
            icon: None,
            created_by: created_by.into(),
            event_ids: Vec::new(),
            shares: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Validates the collection and all its share records.
    pub fn validate(&self) -> Result<(), CollectionValidationError> {
        if self.name.trim().is_empty() {
            return Err(CollectionValidationError::EmptyName);
        }
        for share in &self.shares {
            if !share.is_acceptance_state_consistent() {
                return Err(CollectionValidationError::AcceptanceStateMismatch(share.id));
            }
        }
        Ok(())
    }

    /// Best permission the user holds on this collection.
    ///
    /// The creator identity bypasses share records entirely; otherwise only
    /// `Accepted` shares count and the maximum grant wins.
    pub fn permission_for(&self, user_email: &str) -> Option<Permission> {
        if self.created_by == user_email {
            return Some(Permission::Creator);
        }
        self.accepted_share_permission(user_email)
    }

    /// Maximum permission granted to the user through `Accepted` shares,
    /// ignoring the creator bypass.
    ///
    /// Event-level effective permission is built from this: a collection
    /// creator's implicit rights cover the collection itself, not its member
    /// events.
    pub fn accepted_share_permission(&self, user_email: &str) -> Option<Permission> {
        self.shares
            .iter()
            .filter(|share| share.status == ShareStatus::Accepted)
            .filter(|share| share.shared_with == user_email)
            .map(|share| share.permission)
            .max()
    }
}
