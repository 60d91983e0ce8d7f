//! Ledger lifecycle: reset responses once a new occurrence has begun.
//!
//! # Responsibility
//! - Decide whether an event's ledger belongs to a past occurrence.
//! - Apply the reset at most once per occurrence boundary.
//!
//! # Invariants
//! - Reset is due iff `previous_occurrence(now) > last_update + grace_window`.
//! - The clear and the `last_update` move happen in one compare-and-set write;
//!   a writer that lost the race performs no clear.
//! - A failed clear leaves `last_update` untouched so the next call retries.

use crate::model::event::{Event, EventId};
use crate::model::recurrence::{RecurrenceDescriptor, RecurrenceError};
use crate::repo::event_repo::EventStore;
use crate::schedule::occurrence::previous_occurrence;
use crate::service::error::{ServiceError, ServiceResult};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use log::{debug, error, info};

/// Result of one lifecycle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Ledger belongs to the current occurrence.
    NotDue,
    /// This call cleared the ledger.
    Reset,
    /// Reset was due but a concurrent writer moved `last_update` first.
    LostRace,
}

/// Returns whether the ledger must be cleared before it is read or written.
///
/// `grace_window` is the period after an occurrence starts during which
/// responses written before it still count as current.
///
/// # Errors
/// - `RecurrenceError` when `recurrence` is out of range.
pub fn should_reset(
    now: DateTime<Utc>,
    recurrence: &RecurrenceDescriptor,
    last_update: DateTime<Utc>,
    grace_window: TimeDelta,
) -> Result<bool, RecurrenceError> {
    let previous = previous_occurrence(now, recurrence)?;
    // Past the last representable instant nothing can be later.
    Ok(last_update
        .checked_add_signed(grace_window)
        .is_some_and(|cutoff| previous > cutoff))
}

/// Loads `event_id`, resets its ledger when stale and returns the event as
/// seen after the check.
pub(crate) fn refresh_ledger<S: EventStore + ?Sized>(
    store: &S,
    grace_window: TimeDelta,
    event_id: EventId,
    now: DateTime<Utc>,
) -> ServiceResult<(Event, ResetOutcome)> {
    // Stored instants carry millisecond precision.
    let now = now.trunc_subsecs(3);
    let event = store
        .get_event(event_id)
        .map_err(|err| log_store_failure("load", event_id, err.into()))?
        .ok_or(ServiceError::EventNotFound(event_id))?;

    if !should_reset(now, &event.recurrence, event.last_update, grace_window)? {
        return Ok((event, ResetOutcome::NotDue));
    }

    let won = store
        .reset_responses_if_unchanged(event_id, event.last_update, now)
        .map_err(|err| log_store_failure("reset", event_id, err.into()))?;

    if !won {
        debug!(
            "event=ledger_reset module=lifecycle status=skipped reason=lost_race event_id={}",
            event_id
        );
        let current = store
            .get_event(event_id)
            .map_err(|err| log_store_failure("load", event_id, err.into()))?
            .ok_or(ServiceError::EventNotFound(event_id))?;
        return Ok((current, ResetOutcome::LostRace));
    }

    info!(
        "event=ledger_reset module=lifecycle status=ok event_id={} previous_update={}",
        event_id,
        event.last_update.to_rfc3339()
    );
    Ok((
        Event {
            last_update: now,
            ..event
        },
        ResetOutcome::Reset,
    ))
}

fn log_store_failure(stage: &str, event_id: EventId, err: ServiceError) -> ServiceError {
    if matches!(err, ServiceError::PersistenceUnavailable(_)) {
        error!(
            "event=ledger_reset module=lifecycle status=error stage={} event_id={} error_code={} error={}",
            stage,
            event_id,
            err.code(),
            err
        );
    }
    err
}

/// Lifecycle use-case service.
pub struct LifecycleService<S: EventStore> {
    store: S,
    grace_window: TimeDelta,
}

impl<S: EventStore> LifecycleService<S> {
    pub fn new(store: S, grace_window: TimeDelta) -> Self {
        Self {
            store,
            grace_window,
        }
    }

    /// Runs the reset decision for one event and applies it when due.
    ///
    /// # Errors
    /// - `EventNotFound` when the event does not exist.
    /// - `InvalidRecurrence` when the stored descriptor is malformed.
    /// - `PersistenceUnavailable` when the store fails; nothing is changed.
    pub fn refresh(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> ServiceResult<(Event, ResetOutcome)> {
        refresh_ledger(&self.store, self.grace_window, event_id, now)
    }
}
