//! Collection sharing use-case service.
//!
//! # Responsibility
//! - Grant, answer and revoke collection shares.
//! - Compute the effective permission a user holds on an event.
//!
//! # Invariants
//! - Granting requires the granter to be the collection creator or hold an
//!   accepted share of at least `Organizer`.
//! - At most one active (pending or accepted) share per grantee and
//!   collection.
//! - Revocation requires the collection creator or the original granter and
//!   is idempotent.

use crate::model::collection::{EventCollectionShare, Permission, ShareId, ShareStatus};
use crate::model::event::{CollectionId, Event};
use crate::repo::collection_repo::CollectionRepository;
use crate::repo::event_repo::{current_timestamp, RepoError};
use chrono::{DateTime, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SharingResult<T> = Result<T, SharingError>;

/// Service error for sharing use-cases.
#[derive(Debug)]
pub enum SharingError {
    /// Granter lacks the capability required for the mutation.
    InsufficientPermission {
        actor: String,
        collection_id: CollectionId,
        required: Permission,
    },
    /// Revoker is neither the collection creator nor the original granter.
    NotGranterOrCreator { actor: String, share_id: ShareId },
    /// The grantee already has a pending or accepted share.
    DuplicateActiveShare {
        grantee: String,
        collection_id: CollectionId,
    },
    /// Transition attempted from a share state that does not permit it.
    InvalidShareState {
        share_id: ShareId,
        status: ShareStatus,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for SharingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientPermission {
                actor,
                collection_id,
                required,
            } => write!(
                f,
                "`{actor}` needs at least {required:?} on collection {collection_id}"
            ),
            Self::NotGranterOrCreator { actor, share_id } => write!(
                f,
                "`{actor}` may not revoke share {share_id}: not creator or granter"
            ),
            Self::DuplicateActiveShare {
                grantee,
                collection_id,
            } => write!(
                f,
                "`{grantee}` already has an active share on collection {collection_id}"
            ),
            Self::InvalidShareState { share_id, status } => {
                write!(f, "share {share_id} is {status:?}, expected pending")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SharingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SharingError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Use-case service for the share lifecycle and permission queries.
pub struct SharingService<C: CollectionRepository> {
    repo: C,
}

impl<C: CollectionRepository> SharingService<C> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: C) -> Self {
        Self { repo }
    }

    /// Grants a pending share on a collection.
    ///
    /// # Contract
    /// - Granter must be the collection creator or hold an accepted share of
    ///   at least `Organizer`.
    /// - Declined and revoked shares do not block a new grant; pending and
    ///   accepted ones do.
    pub fn share_collection(
        &mut self,
        collection_id: CollectionId,
        grantee_email: &str,
        permission: Permission,
        granter_email: &str,
        message: Option<String>,
    ) -> SharingResult<EventCollectionShare> {
        let collection = self.repo.get_collection(collection_id)?;

        let granter_permission = collection.permission_for(granter_email);
        if granter_permission < Some(Permission::Organizer) {
            return Err(SharingError::InsufficientPermission {
                actor: granter_email.to_string(),
                collection_id,
                required: Permission::Organizer,
            });
        }

        let has_active = collection
            .shares
            .iter()
            .any(|share| share.shared_with == grantee_email && share.is_active());
        if has_active {
            return Err(SharingError::DuplicateActiveShare {
                grantee: grantee_email.to_string(),
                collection_id,
            });
        }

        let draft = EventCollectionShare::pending(
            collection_id,
            grantee_email,
            permission,
            granter_email,
            current_timestamp(),
            message,
        );
        let stored = self.repo.insert_share(&draft)?;
        info!(
            "event=share_granted module=sharing status=ok collection_id={collection_id} share_id={}",
            stored.id
        );
        Ok(stored)
    }

    /// Answers a pending share: accept (stamping `accepted_at`) or decline.
    pub fn respond_to_share(
        &mut self,
        share_id: ShareId,
        accept: bool,
        now: DateTime<Utc>,
    ) -> SharingResult<EventCollectionShare> {
        let mut share = self.repo.get_share(share_id)?;
        if share.status != ShareStatus::Pending {
            return Err(SharingError::InvalidShareState {
                share_id,
                status: share.status,
            });
        }

        if accept {
            share.status = ShareStatus::Accepted;
            share.accepted_at = Some(now);
        } else {
            share.status = ShareStatus::Declined;
        }
        self.repo.update_share(&share)?;
        Ok(share)
    }

    /// Revokes a share in any non-revoked state.
    ///
    /// Revoking an already revoked share is a no-op returning the stored
    /// record unchanged.
    pub fn revoke_share(
        &mut self,
        share_id: ShareId,
        revoker_email: &str,
    ) -> SharingResult<EventCollectionShare> {
        let mut share = self.repo.get_share(share_id)?;
        let collection = self.repo.get_collection(share.collection_id)?;

        if revoker_email != collection.created_by && revoker_email != share.shared_by {
            return Err(SharingError::NotGranterOrCreator {
                actor: revoker_email.to_string(),
                share_id,
            });
        }

        if share.status == ShareStatus::Revoked {
            return Ok(share);
        }

        share.status = ShareStatus::Revoked;
        share.accepted_at = None;
        self.repo.update_share(&share)?;
        info!(
            "event=share_revoked module=sharing status=ok collection_id={} share_id={share_id}",
            share.collection_id
        );
        Ok(share)
    }

    /// Effective permission a user holds on an event.
    ///
    /// The event creator always holds `Creator`. Otherwise the maximum across
    /// accepted shares on collections containing the event wins; `None` means
    /// no access. Collections that disappeared since the event was loaded are
    /// skipped (membership and shares converge independently).
    pub fn effective_permission(
        &self,
        event: &Event,
        user_email: &str,
    ) -> SharingResult<Option<Permission>> {
        if event.created_by == user_email {
            return Ok(Some(Permission::Creator));
        }

        let mut best: Option<Permission> = None;
        for collection_id in &event.collection_ids {
            let collection = match self.repo.get_collection(*collection_id) {
                Ok(collection) => collection,
                Err(RepoError::NotFound { .. }) => continue,
                Err(err) => return Err(err.into()),
            };
            best = best.max(collection.accepted_share_permission(user_email));
        }
        Ok(best)
    }
}
