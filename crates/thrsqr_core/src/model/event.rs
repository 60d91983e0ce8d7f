//! Event domain model.
//!
//! # Responsibility
//! - Define the organizer-owned recurring event record.
//! - Carry the `last_update` watermark used by ledger lifecycle decisions.
//!
//! # Invariants
//! - `event_id` is stable and never reused for another event.
//! - `last_update` moves only on ledger writes and ledger resets, never on edit.

use crate::model::recurrence::RecurrenceDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an event. The slug is never used as a lookup key.
pub type EventId = Uuid;

/// Recurring event as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub title: String,
    /// Free-text details shown under the title.
    pub info: String,
    pub recurrence: RecurrenceDescriptor,
    /// Instant of the last response-affecting mutation or reset.
    pub last_update: DateTime<Utc>,
}

impl Event {
    /// Creates an event whose ledger is considered fresh as of `now`.
    pub fn new(
        event_id: EventId,
        title: impl Into<String>,
        info: impl Into<String>,
        recurrence: RecurrenceDescriptor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id,
            title: title.into(),
            info: info.into(),
            recurrence,
            last_update: now,
        }
    }
}
