//! Event store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist events, participants and per-event response ledgers.
//! - Provide the compare-and-set ledger reset used on occurrence rollover.
//!
//! # Invariants
//! - One response row per (event, participant); writes overwrite in place.
//! - Ledger writes and resets move `events.last_update` in the same
//!   transaction as the ledger change.
//! - Instants are persisted as epoch milliseconds.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::event::{Event, EventId};
use crate::model::recurrence::{RecurrenceDescriptor, TimeOfDay};
use crate::model::response::{ParticipantId, Response};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const EVENT_SELECT_SQL: &str = "SELECT
    event_id,
    title,
    info,
    day_of_week,
    event_hour,
    event_minute,
    utc_offset_minutes,
    last_update
FROM events";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from event store operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target event does not exist.
    EventNotFound(EventId),
    /// Target participant has no response for the event.
    ResponseNotFound {
        event_id: EventId,
        participant_id: ParticipantId,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::EventNotFound(id) => write!(f, "event not found: {id}"),
            Self::ResponseNotFound {
                event_id,
                participant_id,
            } => write!(
                f,
                "response not found: event {event_id} participant {participant_id}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "event store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted event data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
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

/// Id namespaces known by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Events,
    Participants,
}

impl Collection {
    fn table(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Participants => "participants",
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            Self::Events => "event_id",
            Self::Participants => "participant_id",
        }
    }
}

/// Persistence contract consumed by the lifecycle and ledger services.
pub trait EventStore {
    fn get_event(&self, event_id: EventId) -> RepoResult<Option<Event>>;
    fn new_event(&self, event: &Event) -> RepoResult<()>;
    /// Replaces title, info and recurrence. Leaves `last_update` untouched.
    fn update_event(
        &self,
        event_id: EventId,
        title: &str,
        info: &str,
        recurrence: &RecurrenceDescriptor,
    ) -> RepoResult<()>;
    /// Clears the ledger unconditionally and sets `last_update = now`.
    fn reset_responses(&self, event_id: EventId, now: DateTime<Utc>) -> RepoResult<()>;
    /// Clears the ledger and sets `last_update = now` only when `last_update`
    /// still equals `expected_last_update`.
    ///
    /// Returns `false` when another writer moved `last_update` first.
    fn reset_responses_if_unchanged(
        &self,
        event_id: EventId,
        expected_last_update: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;
    /// Lists responses in first-contact order.
    fn get_responses(&self, event_id: EventId) -> RepoResult<Vec<Response>>;
    /// Upserts one response and touches `last_update`. Unknown participant
    /// ids are registered with `display_name`.
    fn update_responses(
        &self,
        event_id: EventId,
        display_name: &str,
        attending: bool,
        participant_id: ParticipantId,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> RepoResult<()>;
    /// Deletes one response and touches `last_update`.
    fn remove_response(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> RepoResult<()>;
    /// Allocates a fresh participant identity.
    fn new_participant(&self, display_name: &str) -> RepoResult<ParticipantId>;
    fn if_exists(&self, id: Uuid, collection: Collection) -> RepoResult<bool>;
    /// Returns an id that is unused within `collection`.
    fn generate_id(&self, collection: Collection) -> RepoResult<Uuid>;
}

/// SQLite-backed event store.
pub struct SqliteEventStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn immediate_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl EventStore for SqliteEventStore<'_> {
    fn get_event(&self, event_id: EventId) -> RepoResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE event_id = ?1;"))?;
        let mut rows = stmt.query([event_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }
        Ok(None)
    }

    fn new_event(&self, event: &Event) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO events (
                event_id,
                title,
                info,
                day_of_week,
                event_hour,
                event_minute,
                utc_offset_minutes,
                last_update
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                event.event_id.to_string(),
                event.title.as_str(),
                event.info.as_str(),
                event.recurrence.day_of_week,
                event.recurrence.time_of_day.hour,
                event.recurrence.time_of_day.minute,
                event.recurrence.utc_offset_minutes,
                event.last_update.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn update_event(
        &self,
        event_id: EventId,
        title: &str,
        info: &str,
        recurrence: &RecurrenceDescriptor,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE events
             SET
                title = ?2,
                info = ?3,
                day_of_week = ?4,
                event_hour = ?5,
                event_minute = ?6,
                utc_offset_minutes = ?7
             WHERE event_id = ?1;",
            params![
                event_id.to_string(),
                title,
                info,
                recurrence.day_of_week,
                recurrence.time_of_day.hour,
                recurrence.time_of_day.minute,
                recurrence.utc_offset_minutes,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::EventNotFound(event_id));
        }
        Ok(())
    }

    fn reset_responses(&self, event_id: EventId, now: DateTime<Utc>) -> RepoResult<()> {
        let tx = self.immediate_tx()?;
        if !touch_last_update(&tx, event_id, now)? {
            return Err(RepoError::EventNotFound(event_id));
        }
        tx.execute(
            "DELETE FROM responses WHERE event_id = ?1;",
            [event_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn reset_responses_if_unchanged(
        &self,
        event_id: EventId,
        expected_last_update: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let tx = self.immediate_tx()?;
        let changed = tx.execute(
            "UPDATE events
             SET last_update = ?3
             WHERE event_id = ?1
               AND last_update = ?2;",
            params![
                event_id.to_string(),
                expected_last_update.timestamp_millis(),
                now.timestamp_millis(),
            ],
        )?;

        if changed == 0 {
            if !event_exists(&tx, event_id)? {
                return Err(RepoError::EventNotFound(event_id));
            }
            return Ok(false);
        }

        tx.execute(
            "DELETE FROM responses WHERE event_id = ?1;",
            [event_id.to_string()],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn get_responses(&self, event_id: EventId) -> RepoResult<Vec<Response>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                participant_id,
                display_name,
                attending,
                comment,
                updated_at
             FROM responses
             WHERE event_id = ?1
             ORDER BY created_at ASC, participant_id ASC;",
        )?;
        let mut rows = stmt.query([event_id.to_string()])?;
        let mut responses = Vec::new();
        while let Some(row) = rows.next()? {
            responses.push(parse_response_row(row)?);
        }
        Ok(responses)
    }

    fn update_responses(
        &self,
        event_id: EventId,
        display_name: &str,
        attending: bool,
        participant_id: ParticipantId,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        let tx = self.immediate_tx()?;
        if !touch_last_update(&tx, event_id, now)? {
            return Err(RepoError::EventNotFound(event_id));
        }

        let now_ms = now.timestamp_millis();
        // Caller-supplied identities are registered on first write.
        tx.execute(
            "INSERT INTO participants (participant_id, display_name, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(participant_id) DO NOTHING;",
            params![participant_id.to_string(), display_name, now_ms],
        )?;
        tx.execute(
            "INSERT INTO responses (
                event_id,
                participant_id,
                display_name,
                attending,
                comment,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(event_id, participant_id) DO UPDATE SET
                display_name = excluded.display_name,
                attending = excluded.attending,
                comment = excluded.comment,
                updated_at = excluded.updated_at;",
            params![
                event_id.to_string(),
                participant_id.to_string(),
                display_name,
                bool_to_int(attending),
                comment,
                now_ms,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn remove_response(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        let tx = self.immediate_tx()?;
        let removed = tx.execute(
            "DELETE FROM responses WHERE event_id = ?1 AND participant_id = ?2;",
            params![event_id.to_string(), participant_id.to_string()],
        )?;
        if removed == 0 {
            return Err(RepoError::ResponseNotFound {
                event_id,
                participant_id,
            });
        }

        touch_last_update(&tx, event_id, now)?;
        tx.commit()?;
        Ok(())
    }

    fn new_participant(&self, display_name: &str) -> RepoResult<ParticipantId> {
        let participant_id = self.generate_id(Collection::Participants)?;
        self.conn.execute(
            "INSERT INTO participants (participant_id, display_name) VALUES (?1, ?2);",
            params![participant_id.to_string(), display_name],
        )?;
        Ok(participant_id)
    }

    fn if_exists(&self, id: Uuid, collection: Collection) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                collection.table(),
                collection.id_column()
            ),
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn generate_id(&self, collection: Collection) -> RepoResult<Uuid> {
        loop {
            let candidate = Uuid::new_v4();
            if !self.if_exists(candidate, collection)? {
                return Ok(candidate);
            }
        }
    }
}

fn touch_last_update(
    tx: &Transaction<'_>,
    event_id: EventId,
    now: DateTime<Utc>,
) -> RepoResult<bool> {
    let changed = tx.execute(
        "UPDATE events SET last_update = ?2 WHERE event_id = ?1;",
        params![event_id.to_string(), now.timestamp_millis()],
    )?;
    Ok(changed > 0)
}

fn event_exists(conn: &Connection, event_id: EventId) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM events WHERE event_id = ?1;",
            [event_id.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let id_text: String = row.get("event_id")?;
    let recurrence = RecurrenceDescriptor::new(
        row.get("day_of_week")?,
        TimeOfDay::new(row.get("event_hour")?, row.get("event_minute")?),
        row.get("utc_offset_minutes")?,
    );
    recurrence.validate().map_err(|err| {
        RepoError::InvalidData(format!("invalid recurrence for event `{id_text}`: {err}"))
    })?;

    Ok(Event {
        event_id: parse_uuid(&id_text, "events.event_id")?,
        title: row.get("title")?,
        info: row.get("info")?,
        recurrence,
        last_update: parse_epoch_ms(row.get("last_update")?, "events.last_update")?,
    })
}

fn parse_response_row(row: &Row<'_>) -> RepoResult<Response> {
    let id_text: String = row.get("participant_id")?;
    let attending = match row.get::<_, i64>("attending")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid attending value `{other}` in responses.attending"
            )));
        }
    };

    Ok(Response {
        participant_id: parse_uuid(&id_text, "responses.participant_id")?,
        display_name: row.get("display_name")?,
        attending,
        comment: row.get("comment")?,
        updated_at: parse_epoch_ms(row.get("updated_at")?, "responses.updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_epoch_ms(value: i64, column: &'static str) -> RepoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid epoch ms `{value}` in {column}"))
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
