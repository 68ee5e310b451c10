//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes enforce model validation before SQL mutations.
//! - An event and its attendee list are written in one transaction; two
//!   concurrent aggregate writes cannot interleave attendee changes.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod collection_repo;
pub mod event_repo;
