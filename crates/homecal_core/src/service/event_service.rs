//! Event use-case service.
//!
//! # Responsibility
//! - Provide stable create/update/delete/get/range entry points.
//! - Apply the attendee response state machine against stored aggregates.
//!
//! # Invariants
//! - A response targets an attendee already on the event; unknown emails are
//!   rejected before any write.
//! - Every mutation goes through the repository's single-transaction
//!   aggregate write.

use crate::model::event::{AttendeeStatus, Event, EventId, EventValidationError};
use crate::repo::event_repo::{EventRepository, RepoResult};
use chrono::{DateTime, Utc};

/// Use-case service wrapper for event aggregate operations.
pub struct EventService<R: EventRepository> {
    repo: R,
}

impl<R: EventRepository> EventService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a new event aggregate and returns the stored value.
    pub fn create_event(&mut self, draft: &Event) -> RepoResult<Event> {
        self.repo.create_event(draft)
    }

    /// Replaces an existing aggregate; the supplied attendee list is
    /// authoritative.
    pub fn update_event(&mut self, event: &Event) -> RepoResult<Event> {
        self.repo.update_event(event)
    }

    /// Deletes an event together with its attendees and collection links.
    pub fn delete_event(&mut self, id: EventId) -> RepoResult<()> {
        self.repo.delete_event(id)
    }

    /// Loads one full aggregate by id.
    pub fn get_event(&self, id: EventId) -> RepoResult<Event> {
        self.repo.get_event(id)
    }

    /// Events overlapping the half-open window `[start, end)`.
    pub fn list_events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Vec<Event>> {
        self.repo.list_events_in_range(start, end)
    }

    /// Records a manual invitation response for one attendee.
    ///
    /// # Contract
    /// - `status` must be `Accepted`, `Declined` or `Tentative`.
    /// - `attendee_email` must already be invited to the event.
    /// - Persists the whole aggregate and returns the stored value.
    pub fn respond_to_invitation(
        &mut self,
        event_id: EventId,
        attendee_email: &str,
        status: AttendeeStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> RepoResult<Event> {
        let mut event = self.repo.get_event(event_id)?;

        let attendee = event.attendee_mut(attendee_email).ok_or_else(|| {
            EventValidationError::UnknownAttendee(attendee_email.to_string())
        })?;
        attendee.respond(status, note, now)?;

        self.repo.update_event(&event)
    }
}
