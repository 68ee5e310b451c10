//! Core domain logic for homecal, a shared family calendar.
//! This crate is the single source of truth for business invariants:
//! attendee invitation lifecycle, collection sharing permissions, and the
//! date-range query contract.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::collection::{
    CollectionValidationError, EventCollection, EventCollectionShare, Permission, ShareId,
    ShareStatus,
};
pub use model::event::{
    Attendee, AttendeeRole, AttendeeStatus, CollectionId, Event, EventId, EventValidationError,
    AUTO_DECLINE_NOTE,
};
pub use repo::collection_repo::{CollectionRepository, SqliteCollectionRepository};
pub use repo::event_repo::{EventRepository, RepoError, RepoResult, SqliteEventRepository};
pub use service::event_service::EventService;
pub use service::expiry_service::{ExpiryService, ExpirySweepSummary};
pub use service::sharing_service::{SharingError, SharingResult, SharingService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
