//! Response-deadline expiry sweep.
//!
//! # Responsibility
//! - Auto-decline `no-response` invitations whose deadline has elapsed.
//! - Persist only events whose attendee set actually changed.
//!
//! # Invariants
//! - Re-running the sweep over already-expired attendees changes nothing.
//! - A single event's failure never aborts the batch.
//! - Each changed event is written in its own aggregate transaction, so a
//!   racing manual response resolves to whichever write commits last.

use crate::repo::event_repo::{EventRepository, RepoResult};
use chrono::{DateTime, Utc};
use log::{error, info};
use std::time::Instant;

/// Outcome counters for one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirySweepSummary {
    /// Candidate events inspected.
    pub scanned_events: usize,
    /// Attendees transitioned to `Declined`.
    pub expired_attendees: usize,
    /// Events written back.
    pub updated_events: usize,
    /// Events whose write-back failed (logged, batch continued).
    pub failed_events: usize,
}

/// Batch job applying deadline expiry across all stored events.
pub struct ExpiryService<R: EventRepository> {
    repo: R,
}

impl<R: EventRepository> ExpiryService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Runs one sweep pass at the given time.
    ///
    /// Candidate selection is pushed into the repository (events holding at
    /// least one overdue `no-response` attendee), so already-expired rows are
    /// not re-read or re-written. Safe to invoke repeatedly and concurrently
    /// with user-driven updates.
    pub fn run_sweep(&mut self, now: DateTime<Utc>) -> RepoResult<ExpirySweepSummary> {
        let started_at = Instant::now();
        let candidates = self.repo.list_events_with_overdue_responses(now)?;

        let mut summary = ExpirySweepSummary::default();
        for mut event in candidates {
            summary.scanned_events += 1;

            let expired = event
                .attendees
                .iter_mut()
                .map(|attendee| attendee.auto_expire(now))
                .filter(|&expired| expired)
                .count();
            if expired == 0 {
                continue;
            }

            match self.repo.update_event(&event) {
                Ok(_) => {
                    summary.expired_attendees += expired;
                    summary.updated_events += 1;
                }
                Err(err) => {
                    // Non-fatal: one corrupt record must not halt the sweep.
                    summary.failed_events += 1;
                    error!(
                        "event=expiry_sweep module=service status=error event_id={} error={err}",
                        event.id
                    );
                }
            }
        }

        info!(
            "event=expiry_sweep module=service status=ok scanned={} expired={} updated={} failed={} duration_ms={}",
            summary.scanned_events,
            summary.expired_attendees,
            summary.updated_events,
            summary.failed_events,
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }
}
