//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep outer layers (API, tooling) decoupled from storage details.
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - Permission checks always compare through the `Permission` ordering.

pub mod event_service;
pub mod expiry_service;
pub mod sharing_service;
