//! Collection/share repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `event_collections`, membership links and
//!   `collection_shares`.
//! - Own cascade semantics: a deleted collection takes its shares and
//!   membership rows with it, never its member events.
//!
//! # Invariants
//! - Write paths call `EventCollection::validate()` before SQL mutations.
//! - Membership is a set: re-adding an existing link is a no-op.
//! - Share rows are validated for `status`/`accepted_at` consistency on
//!   every decode.

use crate::model::collection::{
    CollectionValidationError, EventCollection, EventCollectionShare, Permission, ShareId,
    ShareStatus,
};
use crate::model::event::{CollectionId, EventId};
use crate::repo::event_repo::{
    current_timestamp, datetime_from_column, optional_datetime_from_column, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const COLLECTION_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    color,
    icon,
    created_by,
    created_at,
    updated_at
FROM event_collections";

const SHARE_SELECT_SQL: &str = "SELECT
    id,
    collection_id,
    shared_with,
    permission,
    shared_by,
    shared_at,
    accepted_at,
    status,
    message
FROM collection_shares";

/// Repository interface for collection and share persistence.
pub trait CollectionRepository {
    /// Persists a draft, assigning its id and stamping both timestamps.
    fn create_collection(&mut self, draft: &EventCollection) -> RepoResult<EventCollection>;
    /// Updates scalar fields (name, description, color, icon) and advances
    /// `updated_at`. Membership and shares are managed through their own
    /// operations.
    fn update_collection(&mut self, collection: &EventCollection) -> RepoResult<EventCollection>;
    /// Deletes the collection, its shares and its membership links.
    fn delete_collection(&mut self, id: CollectionId) -> RepoResult<()>;
    /// Loads the collection with its member event ids and all share records.
    fn get_collection(&self, id: CollectionId) -> RepoResult<EventCollection>;
    /// Adds an event to the collection's member set (no-op when present).
    fn add_event_to_collection(
        &mut self,
        collection_id: CollectionId,
        event_id: EventId,
    ) -> RepoResult<()>;
    /// Removes an event from the member set (no-op when absent).
    fn remove_event_from_collection(
        &mut self,
        collection_id: CollectionId,
        event_id: EventId,
    ) -> RepoResult<()>;
    /// Persists a new share row, returning it with its assigned id.
    fn insert_share(&mut self, share: &EventCollectionShare) -> RepoResult<EventCollectionShare>;
    /// Loads one share by id.
    fn get_share(&self, id: ShareId) -> RepoResult<EventCollectionShare>;
    /// Rewrites a share row (status, accepted_at, message).
    fn update_share(&mut self, share: &EventCollectionShare) -> RepoResult<()>;
}

/// SQLite-backed collection repository.
pub struct SqliteCollectionRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCollectionRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type = 'table' AND name = 'event_collections'
            );",
            [],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::InvalidData(
                "table `event_collections` is missing; migrations did not run".to_string(),
            ));
        }
        Ok(Self { conn })
    }
}

impl CollectionRepository for SqliteCollectionRepository<'_> {
    fn create_collection(&mut self, draft: &EventCollection) -> RepoResult<EventCollection> {
        draft.validate()?;
        let now = current_timestamp();

        self.conn.execute(
            "INSERT INTO event_collections (
                name,
                description,
                color,
                icon,
                created_by,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                draft.name.as_str(),
                draft.description.as_deref(),
                draft.color.as_str(),
                draft.icon.as_deref(),
                draft.created_by.as_str(),
                now.timestamp_millis(),
                now.timestamp_millis(),
            ],
        )?;

        let mut stored = draft.clone();
        stored.id = self.conn.last_insert_rowid();
        stored.event_ids = Vec::new();
        stored.shares = Vec::new();
        stored.created_at = now;
        stored.updated_at = now;
        Ok(stored)
    }

    fn update_collection(&mut self, collection: &EventCollection) -> RepoResult<EventCollection> {
        collection.validate()?;
        let now = current_timestamp();

        let changed = self.conn.execute(
            "UPDATE event_collections
             SET
                name = ?2,
                description = ?3,
                color = ?4,
                icon = ?5,
                updated_at = ?6
             WHERE id = ?1;",
            params![
                collection.id,
                collection.name.as_str(),
                collection.description.as_deref(),
                collection.color.as_str(),
                collection.icon.as_deref(),
                now.timestamp_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "collection",
                id: collection.id,
            });
        }

        // `created_by`/`created_at` are never written by update; return the
        // stored values even if the caller tampered with them in memory.
        let (created_by, created_at_ms): (String, i64) = self.conn.query_row(
            "SELECT created_by, created_at FROM event_collections WHERE id = ?1;",
            [collection.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stored = collection.clone();
        stored.created_by = created_by;
        stored.created_at = datetime_from_column(created_at_ms, "event_collections.created_at")?;
        stored.updated_at = now;
        Ok(stored)
    }

    fn delete_collection(&mut self, id: CollectionId) -> RepoResult<()> {
        // Shares and membership links cascade; member events are untouched.
        let changed = self
            .conn
            .execute("DELETE FROM event_collections WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "collection",
                id,
            });
        }
        Ok(())
    }

    fn get_collection(&self, id: CollectionId) -> RepoResult<EventCollection> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COLLECTION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Err(RepoError::NotFound {
                entity: "collection",
                id,
            });
        };

        let collection = EventCollection {
            id,
            name: row.get("name")?,
            description: row.get("description")?,
            color: row.get("color")?,
            icon: row.get("icon")?,
            created_by: row.get("created_by")?,
            event_ids: load_member_event_ids(self.conn, id)?,
            shares: load_shares(self.conn, id)?,
            created_at: datetime_from_column(
                row.get("created_at")?,
                "event_collections.created_at",
            )?,
            updated_at: datetime_from_column(
                row.get("updated_at")?,
                "event_collections.updated_at",
            )?,
        };
        collection.validate()?;
        Ok(collection)
    }

    fn add_event_to_collection(
        &mut self,
        collection_id: CollectionId,
        event_id: EventId,
    ) -> RepoResult<()> {
        ensure_collection_exists(self.conn, collection_id)?;
        ensure_event_exists(self.conn, event_id)?;

        self.conn.execute(
            "INSERT OR IGNORE INTO collection_events (collection_id, event_id)
             VALUES (?1, ?2);",
            params![collection_id, event_id],
        )?;
        touch_collection(self.conn, collection_id)?;
        Ok(())
    }

    fn remove_event_from_collection(
        &mut self,
        collection_id: CollectionId,
        event_id: EventId,
    ) -> RepoResult<()> {
        ensure_collection_exists(self.conn, collection_id)?;

        self.conn.execute(
            "DELETE FROM collection_events
             WHERE collection_id = ?1 AND event_id = ?2;",
            params![collection_id, event_id],
        )?;
        touch_collection(self.conn, collection_id)?;
        Ok(())
    }

    fn insert_share(&mut self, share: &EventCollectionShare) -> RepoResult<EventCollectionShare> {
        if !share.is_acceptance_state_consistent() {
            return Err(CollectionValidationError::AcceptanceStateMismatch(share.id).into());
        }
        ensure_collection_exists(self.conn, share.collection_id)?;

        self.conn.execute(
            "INSERT INTO collection_shares (
                collection_id,
                shared_with,
                permission,
                shared_by,
                shared_at,
                accepted_at,
                status,
                message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                share.collection_id,
                share.shared_with.as_str(),
                permission_to_db(share.permission),
                share.shared_by.as_str(),
                share.shared_at.timestamp_millis(),
                share.accepted_at.map(|at| at.timestamp_millis()),
                share_status_to_db(share.status),
                share.message.as_deref(),
            ],
        )?;

        let mut stored = share.clone();
        stored.id = self.conn.last_insert_rowid();
        Ok(stored)
    }

    fn get_share(&self, id: ShareId) -> RepoResult<EventCollectionShare> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SHARE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => parse_share_row(row),
            None => Err(RepoError::NotFound { entity: "share", id }),
        }
    }

    fn update_share(&mut self, share: &EventCollectionShare) -> RepoResult<()> {
        if !share.is_acceptance_state_consistent() {
            return Err(CollectionValidationError::AcceptanceStateMismatch(share.id).into());
        }

        let changed = self.conn.execute(
            "UPDATE collection_shares
             SET
                permission = ?2,
                accepted_at = ?3,
                status = ?4,
                message = ?5
             WHERE id = ?1;",
            params![
                share.id,
                permission_to_db(share.permission),
                share.accepted_at.map(|at| at.timestamp_millis()),
                share_status_to_db(share.status),
                share.message.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "share",
                id: share.id,
            });
        }
        Ok(())
    }
}

fn ensure_collection_exists(conn: &Connection, id: CollectionId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM event_collections WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::NotFound {
            entity: "collection",
            id,
        });
    }
    Ok(())
}

fn ensure_event_exists(conn: &Connection, id: EventId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::NotFound { entity: "event", id });
    }
    Ok(())
}

fn touch_collection(conn: &Connection, id: CollectionId) -> RepoResult<()> {
    conn.execute(
        "UPDATE event_collections SET updated_at = ?2 WHERE id = ?1;",
        params![id, current_timestamp().timestamp_millis()],
    )?;
    Ok(())
}

fn load_member_event_ids(conn: &Connection, collection_id: CollectionId) -> RepoResult<Vec<EventId>> {
    let mut stmt = conn.prepare(
        "SELECT event_id
         FROM collection_events
         WHERE collection_id = ?1
         ORDER BY event_id ASC;",
    )?;
    let mut rows = stmt.query([collection_id])?;

    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get::<_, EventId>(0)?);
    }
    Ok(ids)
}

fn load_shares(
    conn: &Connection,
    collection_id: CollectionId,
) -> RepoResult<Vec<EventCollectionShare>> {
    let mut stmt = conn.prepare(&format!(
        "{SHARE_SELECT_SQL}
         WHERE collection_id = ?1
         ORDER BY id ASC;"
    ))?;
    let mut rows = stmt.query([collection_id])?;

    let mut shares = Vec::new();
    while let Some(row) = rows.next()? {
        shares.push(parse_share_row(row)?);
    }
    Ok(shares)
}

fn parse_share_row(row: &Row<'_>) -> RepoResult<EventCollectionShare> {
    let permission_text: String = row.get("permission")?;
    let permission = parse_permission(&permission_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid permission `{permission_text}` in collection_shares.permission"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let status = parse_share_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in collection_shares.status"
        ))
    })?;

    let share = EventCollectionShare {
        id: row.get("id")?,
        collection_id: row.get("collection_id")?,
        shared_with: row.get("shared_with")?,
        permission,
        shared_by: row.get("shared_by")?,
        shared_at: datetime_from_column(row.get("shared_at")?, "collection_shares.shared_at")?,
        accepted_at: optional_datetime_from_column(
            row.get("accepted_at")?,
            "collection_shares.accepted_at",
        )?,
        status,
        message: row.get("message")?,
    };
    if !share.is_acceptance_state_consistent() {
        return Err(RepoError::InvalidData(format!(
            "share {} violates status/accepted_at consistency",
            share.id
        )));
    }
    Ok(share)
}

fn permission_to_db(permission: Permission) -> &'static str {
    match permission {
        Permission::View => "view",
        Permission::Contributor => "contributor",
        Permission::Organizer => "organizer",
        Permission::Creator => "creator",
    }
}

fn parse_permission(value: &str) -> Option<Permission> {
    match value {
        "view" => Some(Permission::View),
        "contributor" => Some(Permission::Contributor),
        "organizer" => Some(Permission::Organizer),
        "creator" => Some(Permission::Creator),
        _ => None,
    }
}

fn share_status_to_db(status: ShareStatus) -> &'static str {
    match status {
        ShareStatus::Pending => "pending",
        ShareStatus::Accepted => "accepted",
        ShareStatus::Declined => "declined",
        ShareStatus::Revoked => "revoked",
    }
}

fn parse_share_status(value: &str) -> Option<ShareStatus> {
    match value {
        "pending" => Some(ShareStatus::Pending),
        "accepted" => Some(ShareStatus::Accepted),
        "declined" => Some(ShareStatus::Declined),
        "revoked" => Some(ShareStatus::Revoked),
        _ => None,
    }
}
