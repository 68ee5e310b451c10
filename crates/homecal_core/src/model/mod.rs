//! Domain model for events, attendees, collections and shares.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the attendee response state machine and the share lifecycle.
//!
//! # Invariants
//! - An `Event` and its attendee list form one consistency unit.
//! - Attendee emails are unique within one event.
//! - `Permission` comparisons always use the capability ordering, never
//!   string equality.

pub mod collection;
pub mod event;
