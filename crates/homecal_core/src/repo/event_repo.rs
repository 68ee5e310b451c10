//! Event repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide aggregate-level CRUD over `events` + `attendees`.
//! - Answer half-open date-range and overdue-invitation queries.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Event::validate()` before SQL mutations.
//! - Every aggregate write (event row + attendee rows) is one transaction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::collection::CollectionValidationError;
use crate::model::event::{
    Attendee, AttendeeRole, AttendeeStatus, CollectionId, Event, EventId, EventValidationError,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const EVENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    start_time,
    end_time,
    created_by,
    created_at,
    updated_at
FROM events";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for event/collection persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    /// Malformed aggregate state (empty title, inverted interval, ...).
    Validation(EventValidationError),
    /// Malformed collection/share state.
    CollectionValidation(CollectionValidationError),
    /// Uniqueness violation (duplicate attendee email, duplicate active share).
    Conflict(String),
    /// Unknown identifier for the named entity.
    NotFound { entity: &'static str, id: i64 },
    /// Storage transport failure.
    Db(DbError),
    /// Persisted row cannot be decoded into a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CollectionValidation(err) => write!(f, "{err}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::CollectionValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Conflict(_) | Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<EventValidationError> for RepoError {
    fn from(value: EventValidationError) -> Self {
        match value {
            // Duplicate emails are a uniqueness conflict, not a shape problem.
            EventValidationError::DuplicateAttendeeEmail(email) => {
                Self::Conflict(format!("attendee email `{email}` already invited"))
            }
            other => Self::Validation(other),
        }
    }
}

impl From<CollectionValidationError> for RepoError {
    fn from(value: CollectionValidationError) -> Self {
        Self::CollectionValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for event aggregate operations.
pub trait EventRepository {
    /// Persists a draft, assigning its id and stamping both timestamps.
    /// Returns the stored aggregate.
    fn create_event(&mut self, draft: &Event) -> RepoResult<Event>;
    /// Replaces the aggregate. The supplied attendee list is authoritative;
    /// `created_by`/`created_at` are never changed. Returns the stored
    /// aggregate with its advanced `updated_at`.
    fn update_event(&mut self, event: &Event) -> RepoResult<Event>;
    /// Deletes the event, its attendees and its collection membership links.
    fn delete_event(&mut self, id: EventId) -> RepoResult<()>;
    /// Loads the full aggregate including ordered attendees and the ids of
    /// collections containing it.
    fn get_event(&self, id: EventId) -> RepoResult<Event>;
    /// Events overlapping the half-open window: `start_time < end` and
    /// `end_time > start`. Ordered by `(start_time, id)`.
    fn list_events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Vec<Event>>;
    /// Events holding at least one `no-response` attendee whose response
    /// deadline has elapsed. Expiry sweep candidate set.
    fn list_events_with_overdue_responses(&self, now: DateTime<Utc>) -> RepoResult<Vec<Event>>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_table_exists(conn, "events")?;
        ensure_table_exists(conn, "attendees")?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create_event(&mut self, draft: &Event) -> RepoResult<Event> {
        draft.validate()?;
        let now = current_timestamp();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO events (
                title,
                description,
                start_time,
                end_time,
                created_by,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                draft.title.as_str(),
                draft.description.as_deref(),
                draft.start_time.timestamp_millis(),
                draft.end_time.timestamp_millis(),
                draft.created_by.as_str(),
                now.timestamp_millis(),
                now.timestamp_millis(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        insert_attendees(&tx, id, &draft.attendees)?;
        tx.commit()?;

        let mut stored = draft.clone();
        stored.id = id;
        stored.collection_ids = Vec::new();
        stored.created_at = now;
        stored.updated_at = now;
        Ok(stored)
    }

    fn update_event(&mut self, event: &Event) -> RepoResult<Event> {
        event.validate()?;
        let now = current_timestamp();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE events
             SET
                title = ?2,
                description = ?3,
                start_time = ?4,
                end_time = ?5,
                updated_at = ?6
             WHERE id = ?1;",
            params![
                event.id,
                event.title.as_str(),
                event.description.as_deref(),
                event.start_time.timestamp_millis(),
                event.end_time.timestamp_millis(),
                now.timestamp_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "event",
                id: event.id,
            });
        }

        // The supplied attendee list is authoritative (replace-by-email
        // semantics): rewrite the whole set inside the same transaction.
        tx.execute("DELETE FROM attendees WHERE event_id = ?1;", [event.id])?;
        insert_attendees(&tx, event.id, &event.attendees)?;

        // `created_by`/`created_at` are never written by update; return the
        // stored values even if the caller tampered with them in memory.
        let (created_by, created_at_ms): (String, i64) = tx.query_row(
            "SELECT created_by, created_at FROM events WHERE id = ?1;",
            [event.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        tx.commit()?;

        let mut stored = event.clone();
        stored.created_by = created_by;
        stored.created_at = datetime_from_column(created_at_ms, "events.created_at")?;
        stored.updated_at = now;
        Ok(stored)
    }

    fn delete_event(&mut self, id: EventId) -> RepoResult<()> {
        // Attendees and collection membership rows cascade via foreign keys.
        let changed = self.conn.execute("DELETE FROM events WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "event", id });
        }
        Ok(())
    }

    fn get_event(&self, id: EventId) -> RepoResult<Event> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => hydrate_event(self.conn, row),
            None => Err(RepoError::NotFound { entity: "event", id }),
        }
    }

    fn list_events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE start_time < ?1
               AND end_time > ?2
             ORDER BY start_time ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![end.timestamp_millis(), start.timestamp_millis()])?;

        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(hydrate_event(self.conn, row)?);
        }
        Ok(events)
    }

    fn list_events_with_overdue_responses(&self, now: DateTime<Utc>) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE id IN (
                SELECT event_id
                FROM attendees
                WHERE status = 'no-response'
                  AND response_required_by IS NOT NULL
                  AND response_required_by < ?1
             )
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([now.timestamp_millis()])?;

        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(hydrate_event(self.conn, row)?);
        }
        Ok(events)
    }
}

fn ensure_table_exists(conn: &Connection, table_name: &str) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [table_name],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::InvalidData(format!(
            "table `{table_name}` is missing; migrations did not run"
        )));
    }
    Ok(())
}

fn insert_attendees(tx: &Transaction<'_>, event_id: EventId, attendees: &[Attendee]) -> RepoResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO attendees (
            event_id,
            position,
            name,
            email,
            role,
            status,
            invited_by,
            invited_at,
            response_required_by,
            response_at,
            note
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
    )?;
    for (position, attendee) in attendees.iter().enumerate() {
        stmt.execute(params![
            event_id,
            position as i64,
            attendee.name.as_str(),
            attendee.email.as_str(),
            role_to_db(attendee.role),
            status_to_db(attendee.status),
            attendee.invited_by.as_str(),
            attendee.invited_at.timestamp_millis(),
            attendee.response_required_by.map(|at| at.timestamp_millis()),
            attendee.response_at.map(|at| at.timestamp_millis()),
            attendee.note.as_deref(),
        ])?;
    }
    Ok(())
}

/// Builds a full aggregate from an event row plus its child tables.
fn hydrate_event(conn: &Connection, row: &Row<'_>) -> RepoResult<Event> {
    let id: EventId = row.get("id")?;
    let event = Event {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        start_time: datetime_from_column(row.get("start_time")?, "events.start_time")?,
        end_time: datetime_from_column(row.get("end_time")?, "events.end_time")?,
        created_by: row.get("created_by")?,
        collection_ids: load_collection_ids(conn, id)?,
        attendees: load_attendees(conn, id)?,
        created_at: datetime_from_column(row.get("created_at")?, "events.created_at")?,
        updated_at: datetime_from_column(row.get("updated_at")?, "events.updated_at")?,
    };
    event.validate()?;
    Ok(event)
}

fn load_attendees(conn: &Connection, event_id: EventId) -> RepoResult<Vec<Attendee>> {
    let mut stmt = conn.prepare(
        "SELECT
            name,
            email,
            role,
            status,
            invited_by,
            invited_at,
            response_required_by,
            response_at,
            note
         FROM attendees
         WHERE event_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([event_id])?;

    let mut attendees = Vec::new();
    while let Some(row) = rows.next()? {
        attendees.push(parse_attendee_row(row)?);
    }
    Ok(attendees)
}

fn load_collection_ids(conn: &Connection, event_id: EventId) -> RepoResult<Vec<CollectionId>> {
    let mut stmt = conn.prepare(
        "SELECT collection_id
         FROM collection_events
         WHERE event_id = ?1
         ORDER BY collection_id ASC;",
    )?;
    let mut rows = stmt.query([event_id])?;

    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get::<_, CollectionId>(0)?);
    }
    Ok(ids)
}

fn parse_attendee_row(row: &Row<'_>) -> RepoResult<Attendee> {
    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in attendees.role"))
    })?;

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in attendees.status"))
    })?;

    Ok(Attendee {
        name: row.get("name")?,
        email: row.get("email")?,
        role,
        status,
        invited_by: row.get("invited_by")?,
        invited_at: datetime_from_column(row.get("invited_at")?, "attendees.invited_at")?,
        response_required_by: optional_datetime_from_column(
            row.get("response_required_by")?,
            "attendees.response_required_by",
        )?,
        response_at: optional_datetime_from_column(
            row.get("response_at")?,
            "attendees.response_at",
        )?,
        note: row.get("note")?,
    })
}

/// Current time truncated to millisecond precision, the storage resolution.
/// Stamping with anything finer would make a written aggregate compare
/// unequal to its own read-back.
pub(crate) fn current_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub(crate) fn datetime_from_column(
    epoch_ms: i64,
    column: &'static str,
) -> RepoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(epoch_ms).ok_or_else(|| {
        RepoError::InvalidData(format!("timestamp `{epoch_ms}` out of range in {column}"))
    })
}

pub(crate) fn optional_datetime_from_column(
    epoch_ms: Option<i64>,
    column: &'static str,
) -> RepoResult<Option<DateTime<Utc>>> {
    epoch_ms
        .map(|value| datetime_from_column(value, column))
        .transpose()
}

fn role_to_db(role: AttendeeRole) -> &'static str {
    match role {
        AttendeeRole::Organizer => "organizer",
        AttendeeRole::Required => "required",
        AttendeeRole::Optional => "optional",
    }
}

fn parse_role(value: &str) -> Option<AttendeeRole> {
    match value {
        "organizer" => Some(AttendeeRole::Organizer),
        "required" => Some(AttendeeRole::Required),
        "optional" => Some(AttendeeRole::Optional),
        _ => None,
    }
}

fn status_to_db(status: AttendeeStatus) -> &'static str {
    match status {
        AttendeeStatus::Accepted => "accepted",
        AttendeeStatus::Declined => "declined",
        AttendeeStatus::Tentative => "tentative",
        AttendeeStatus::NoResponse => "no-response",
    }
}

fn parse_status(value: &str) -> Option<AttendeeStatus> {
    match value {
        "accepted" => Some(AttendeeStatus::Accepted),
        "declined" => Some(AttendeeStatus::Declined),
        "tentative" => Some(AttendeeStatus::Tentative),
        "no-response" => Some(AttendeeStatus::NoResponse),
        _ => None,
    }
}
