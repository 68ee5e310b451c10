//! Event aggregate and attendee response state machine.
//!
//! # Responsibility
//! - Define the `Event` aggregate with its ordered attendee list.
//! - Enforce attendee lifecycle transitions (`respond`, `auto_expire`).
//!
//! # Invariants
//! - `end_time > start_time` for every valid event.
//! - Attendee emails are pairwise distinct within one event.
//! - `status == NoResponse` iff `response_at` is `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable row identifier for events, assigned by storage on creation.
pub type EventId = i64;

/// Stable row identifier for collections.
pub type CollectionId = i64;

/// Note written onto an attendee when the expiry sweep auto-declines it.
pub const AUTO_DECLINE_NOTE: &str = "Auto-declined: Response deadline exceeded";

/// Invitation role of an attendee within one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeRole {
    Organizer,
    Required,
    Optional,
}

/// Response state of an attendee's invitation.
///
/// `NoResponse` is the initial state; the remaining states are reachable
/// through [`Attendee::respond`] (manual, repeatable) or
/// [`Attendee::auto_expire`] (automatic, `NoResponse` to `Declined` only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttendeeStatus {
    Accepted,
    Declined,
    Tentative,
    NoResponse,
}

/// Validation error for event aggregate state and attendee transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    /// Event title is empty or whitespace-only.
    EmptyTitle,
    /// `end_time` is not strictly after `start_time`.
    EndNotAfterStart,
    /// The same email appears more than once in one event's attendee list.
    DuplicateAttendeeEmail(String),
    /// `NoResponse` is not a valid target for a manual response.
    InvalidResponseTarget,
    /// Response was attempted for an email not on the event's attendee list.
    UnknownAttendee(String),
    /// Persistent state violates `status == NoResponse iff response_at == None`.
    ResponseStateMismatch(String),
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "event title must not be empty"),
            Self::EndNotAfterStart => write!(f, "event end_time must be after start_time"),
            Self::DuplicateAttendeeEmail(email) => {
                write!(f, "duplicate attendee email `{email}` within one event")
            }
            Self::InvalidResponseTarget => {
                write!(f, "`no-response` is not a valid response target")
            }
            Self::UnknownAttendee(email) => {
                write!(f, "attendee `{email}` does not belong to this event")
            }
            Self::ResponseStateMismatch(email) => write!(
                f,
                "attendee `{email}` violates status/response_at consistency"
            ),
        }
    }
}

impl Error for EventValidationError {}

/// One invited participant, owned by its event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: String,
    pub email: String,
    pub role: AttendeeRole,
    pub status: AttendeeStatus,
    /// Email of the person who sent the invitation.
    pub invited_by: String,
    pub invited_at: DateTime<Utc>,
    /// Deadline after which the invitation auto-declines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_required_by: Option<DateTime<Utc>>,
    /// Time of the most recent response. `None` while status is `NoResponse`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_at: Option<DateTime<Utc>>,
    /// Free-text response message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Attendee {
    /// Creates a fresh invitation in the `NoResponse` state.
    pub fn invite(
        name: impl Into<String>,
        email: impl Into<String>,
        role: AttendeeRole,
        invited_by: impl Into<String>,
        invited_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role,
            status: AttendeeStatus::NoResponse,
            invited_by: invited_by.into(),
            invited_at,
            response_required_by: None,
            response_at: None,
            note: None,
        }
    }

    /// Records a manual response.
    ///
    /// # Contract
    /// - Target must be one of `Accepted`, `Declined`, `Tentative`.
    /// - A human may re-respond at any time; `response_at` tracks the most
    ///   recent response and `note` is replaced.
    pub fn respond(
        &mut self,
        status: AttendeeStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), EventValidationError> {
        if status == AttendeeStatus::NoResponse {
            return Err(EventValidationError::InvalidResponseTarget);
        }

        self.status = status;
        self.response_at = Some(now);
        self.note = note;
        Ok(())
    }

    /// Auto-declines an invitation whose response deadline has elapsed.
    ///
    /// Returns `true` when a transition was applied. Only `NoResponse`
    /// attendees with an elapsed `response_required_by` are affected, which
    /// makes repeated application (and races with manual responses) a no-op.
    pub fn auto_expire(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != AttendeeStatus::NoResponse {
            return false;
        }
        let Some(deadline) = self.response_required_by else {
            return false;
        };
        if now <= deadline {
            return false;
        }

        self.status = AttendeeStatus::Declined;
        self.response_at = Some(now);
        self.note = Some(AUTO_DECLINE_NOTE.to_string());
        true
    }

    /// Checks the `status == NoResponse iff response_at == None` invariant.
    pub fn is_response_state_consistent(&self) -> bool {
        (self.status == AttendeeStatus::NoResponse) == self.response_at.is_none()
    }
}

/// Calendar event aggregate: scalar fields plus the owned attendee list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned by storage on creation; `0` for unsaved drafts.
    pub id: EventId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Email of the event creator. Immutable after creation and always
    /// granted creator-level permission.
    pub created_by: String,
    /// Collections this event belongs to. Maintained by the collection
    /// repository, read-only on the event side.
    pub collection_ids: Vec<CollectionId>,
    /// Ordered invitation list.
    pub attendees: Vec<Attendee>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Creates an unsaved event draft with an empty attendee list.
    ///
    /// Timestamps are provisional; storage stamps them on create.
    pub fn draft(
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: title.into(),
            description: None,
            start_time,
            end_time,
            created_by: created_by.into(),
            collection_ids: Vec::new(),
            attendees: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends an attendee, rejecting duplicate emails.
    pub fn add_attendee(&mut self, attendee: Attendee) -> Result<(), EventValidationError> {
        if self
            .attendees
            .iter()
            .any(|existing| existing.email == attendee.email)
        {
            return Err(EventValidationError::DuplicateAttendeeEmail(
                attendee.email.clone(),
            ));
        }
        self.attendees.push(attendee);
        Ok(())
    }

    /// Returns a mutable handle to the attendee with the given email.
    pub fn attendee_mut(&mut self, email: &str) -> Option<&mut Attendee> {
        self.attendees
            .iter_mut()
            .find(|attendee| attendee.email == email)
    }

    /// Validates the whole aggregate.
    ///
    /// Checked before every persistence write and after every row decode.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.title.trim().is_empty() {
            return Err(EventValidationError::EmptyTitle);
        }
        if self.end_time <= self.start_time {
            return Err(EventValidationError::EndNotAfterStart);
        }

        let mut seen = BTreeSet::new();
        for attendee in &self.attendees {
            if !seen.insert(attendee.email.as_str()) {
                return Err(EventValidationError::DuplicateAttendeeEmail(
                    attendee.email.clone(),
                ));
            }
            if !attendee.is_response_state_consistent() {
                return Err(EventValidationError::ResponseStateMismatch(
                    attendee.email.clone(),
                ));
            }
        }

        Ok(())
    }
}
