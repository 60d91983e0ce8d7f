//! Event use-case service.
//!
//! # Responsibility
//! - Create and edit recurring events.
//! - Assemble the page-load view: lifecycle check, ledger read, tally,
//!   next occurrence.
//! - Build and resolve `<slug>/<id>` share paths.
//!
//! # Invariants
//! - Recurrence descriptors are validated before any write.
//! - Editing an event never resets its ledger nor moves `last_update`.
//! - The slug segment of a path is ignored on resolution.

use crate::model::event::{Event, EventId};
use crate::model::recurrence::RecurrenceDescriptor;
use crate::model::response::{Response, Tally};
use crate::repo::event_repo::{Collection, EventStore};
use crate::schedule::occurrence::next_occurrence;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::lifecycle_service::{refresh_ledger, ResetOutcome};
use crate::service::slug::slug_from;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use log::info;
use uuid::Uuid;

const FALLBACK_SLUG: &str = "event";

/// Input for event creation and edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub title: String,
    pub info: String,
    pub recurrence: RecurrenceDescriptor,
}

/// Creation result carrying the cosmetic slug for the share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub event: Event,
    pub slug: String,
}

impl CreatedEvent {
    pub fn share_path(&self) -> String {
        share_path(&self.slug, self.event.event_id)
    }
}

/// Everything the rendering collaborator needs for one event page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventView {
    pub event: Event,
    pub responses: Vec<Response>,
    pub tally: Tally,
    pub next_occurrence: DateTime<Utc>,
    pub reset: ResetOutcome,
}

/// Builds `<slug>/<id>`, substituting a placeholder for empty slugs.
pub fn share_path(slug: &str, event_id: EventId) -> String {
    let slug = if slug.is_empty() { FALLBACK_SLUG } else { slug };
    format!("{slug}/{event_id}")
}

/// Extracts the event id from `<id>` or `<slug>/<id>`, ignoring the slug.
pub fn resolve_event_path(path: &str) -> Option<EventId> {
    let last = path.trim_matches('/').rsplit('/').next()?;
    Uuid::parse_str(last).ok()
}

/// Event service facade over an event store.
pub struct EventService<S: EventStore> {
    store: S,
    grace_window: TimeDelta,
}

impl<S: EventStore> EventService<S> {
    pub fn new(store: S, grace_window: TimeDelta) -> Self {
        Self {
            store,
            grace_window,
        }
    }

    /// Creates an event whose ledger starts fresh at `now`.
    ///
    /// # Errors
    /// - `InvalidRecurrence` when the descriptor is malformed.
    pub fn create_event(
        &self,
        details: &EventDetails,
        now: DateTime<Utc>,
    ) -> ServiceResult<CreatedEvent> {
        details.recurrence.validate()?;

        let event_id = self.store.generate_id(Collection::Events)?;
        let event = Event::new(
            event_id,
            details.title.trim(),
            details.info.trim(),
            details.recurrence,
            now.trunc_subsecs(3),
        );
        self.store.new_event(&event)?;

        let event = self
            .store
            .get_event(event_id)?
            .ok_or(ServiceError::InconsistentState(
                "created event not found in read-back",
            ))?;
        info!(
            "event=event_create module=event status=ok event_id={} day_of_week={} time={} utc_offset_minutes={}",
            event.event_id,
            event.recurrence.day_of_week,
            event.recurrence.time_of_day,
            event.recurrence.utc_offset_minutes
        );

        let slug = slug_from(&event.title);
        Ok(CreatedEvent { event, slug })
    }

    /// Replaces title, info and recurrence of an existing event.
    ///
    /// # Errors
    /// - `InvalidRecurrence` when the descriptor is malformed.
    /// - `EventNotFound` when the event does not exist.
    pub fn edit_event(&self, event_id: EventId, details: &EventDetails) -> ServiceResult<Event> {
        details.recurrence.validate()?;
        self.store.update_event(
            event_id,
            details.title.trim(),
            details.info.trim(),
            &details.recurrence,
        )?;
        info!(
            "event=event_edit module=event status=ok event_id={}",
            event_id
        );
        self.store
            .get_event(event_id)?
            .ok_or(ServiceError::InconsistentState(
                "edited event not found in read-back",
            ))
    }

    /// Loads an event without running the lifecycle check.
    pub fn get_event(&self, event_id: EventId) -> ServiceResult<Event> {
        self.store
            .get_event(event_id)?
            .ok_or(ServiceError::EventNotFound(event_id))
    }

    /// Page-load flow for one event.
    ///
    /// # Errors
    /// - `EventNotFound` when the event does not exist.
    /// - `PersistenceUnavailable` on store failure.
    pub fn view_event(&self, event_id: EventId, now: DateTime<Utc>) -> ServiceResult<EventView> {
        let (event, reset) = refresh_ledger(&self.store, self.grace_window, event_id, now)?;
        let responses = self.store.get_responses(event_id)?;
        let tally = Tally::from_responses(&responses);
        let next_occurrence = next_occurrence(now, &event.recurrence)?;

        Ok(EventView {
            event,
            responses,
            tally,
            next_occurrence,
            reset,
        })
    }
}
