//! Response ledger use-cases.
//!
//! # Responsibility
//! - Insert, overwrite and remove participant responses.
//! - Resolve participant identity on first contact.
//! - Tally responses and expose notification values after each write.
//!
//! # Invariants
//! - Every write runs the lifecycle check first, so a stale ledger is
//!   cleared before the new response lands in it.
//! - Identity is an explicit parameter; an absent or unknown id always
//!   allocates a new participant and never merges into an existing one.
//! - Comments are stored trimmed; blank comments are stored as `None`.

use crate::model::event::{Event, EventId};
use crate::model::response::{ParticipantId, Response, Tally};
use crate::repo::event_repo::{Collection, EventStore};
use crate::service::error::ServiceResult;
use crate::service::lifecycle_service::refresh_ledger;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use log::{info, warn};
use serde::Serialize;

/// Counts going/not-going responses.
pub fn tally(responses: &[Response]) -> Tally {
    Tally::from_responses(responses)
}

/// One participant submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespondRequest {
    pub event_id: EventId,
    /// Identity remembered by the caller, if any.
    pub participant_id: Option<ParticipantId>,
    pub display_name: String,
    pub attending: bool,
    pub comment: Option<String>,
}

/// Values handed to the notification collaborator after a ledger write.
///
/// Serialized with camelCase keys: `eventId`, `title`, `going`, `notGoing`,
/// `username`, `there`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerNotice {
    pub event_id: EventId,
    pub title: String,
    pub going: usize,
    pub not_going: usize,
    /// Acting participant; `None` for removals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub there: Option<bool>,
}

impl LedgerNotice {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Ledger state after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChange {
    /// Identity the caller should remember for later submissions.
    pub participant_id: ParticipantId,
    pub responses: Vec<Response>,
    pub tally: Tally,
    pub notice: LedgerNotice,
}

/// Response ledger service facade over an event store.
pub struct LedgerService<S: EventStore> {
    store: S,
    grace_window: TimeDelta,
}

impl<S: EventStore> LedgerService<S> {
    pub fn new(store: S, grace_window: TimeDelta) -> Self {
        Self {
            store,
            grace_window,
        }
    }

    /// Inserts or overwrites the response of `participant_id`, clearing a
    /// stale ledger first.
    ///
    /// A participant id the store has not seen yet is registered.
    ///
    /// # Errors
    /// - `EventNotFound` when the event does not exist.
    /// - `PersistenceUnavailable` on store failure.
    pub fn upsert(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        display_name: &str,
        attending: bool,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        refresh_ledger(&self.store, self.grace_window, event_id, now)?;
        self.write_response(event_id, participant_id, display_name, attending, comment, now)
    }

    /// Deletes the response of `participant_id`, clearing a stale ledger
    /// first.
    ///
    /// # Errors
    /// - `EventNotFound` when the event does not exist.
    /// - `ResponseNotFound` when the participant has no response, which
    ///   includes responses that belonged to a past occurrence.
    pub fn remove(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        refresh_ledger(&self.store, self.grace_window, event_id, now)?;
        self.delete_response(event_id, participant_id, now)
    }

    /// Reads the current ledger, clearing it first when stale.
    pub fn responses(&self, event_id: EventId, now: DateTime<Utc>) -> ServiceResult<Vec<Response>> {
        refresh_ledger(&self.store, self.grace_window, event_id, now)?;
        Ok(self.store.get_responses(event_id)?)
    }

    /// Full submission flow: lifecycle check, identity resolution, upsert.
    ///
    /// Identity creation and the upsert are two sequenced store calls; when
    /// the upsert fails the freshly created participant simply stays unused.
    pub fn respond(&self, request: &RespondRequest, now: DateTime<Utc>) -> ServiceResult<LedgerChange> {
        let (event, _) = refresh_ledger(&self.store, self.grace_window, request.event_id, now)?;
        let display_name = request.display_name.trim();
        let participant_id = self.resolve_participant(request.participant_id, display_name)?;

        self.write_response(
            event.event_id,
            participant_id,
            display_name,
            request.attending,
            request.comment.as_deref(),
            now,
        )?;
        info!(
            "event=response_upsert module=ledger status=ok event_id={} participant_id={} attending={}",
            event.event_id, participant_id, request.attending
        );

        self.change_for(
            &event,
            participant_id,
            Some((display_name.to_string(), request.attending)),
        )
    }

    /// Removal flow: lifecycle check, delete, re-tally.
    pub fn withdraw(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> ServiceResult<LedgerChange> {
        let (event, _) = refresh_ledger(&self.store, self.grace_window, event_id, now)?;
        self.delete_response(event_id, participant_id, now)?;
        info!(
            "event=response_remove module=ledger status=ok event_id={} participant_id={}",
            event_id, participant_id
        );
        self.change_for(&event, participant_id, None)
    }

    fn write_response(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        display_name: &str,
        attending: bool,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        self.store.update_responses(
            event_id,
            display_name,
            attending,
            participant_id,
            normalize_comment(comment),
            now.trunc_subsecs(3),
        )?;
        Ok(())
    }

    fn delete_response(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        self.store
            .remove_response(event_id, participant_id, now.trunc_subsecs(3))?;
        Ok(())
    }

    fn resolve_participant(
        &self,
        remembered: Option<ParticipantId>,
        display_name: &str,
    ) -> ServiceResult<ParticipantId> {
        if let Some(participant_id) = remembered {
            if self
                .store
                .if_exists(participant_id, Collection::Participants)?
            {
                return Ok(participant_id);
            }
            warn!(
                "event=participant_resolve module=ledger status=unknown participant_id={}",
                participant_id
            );
        }
        Ok(self.store.new_participant(display_name)?)
    }

    fn change_for(
        &self,
        event: &Event,
        participant_id: ParticipantId,
        actor: Option<(String, bool)>,
    ) -> ServiceResult<LedgerChange> {
        let responses = self.store.get_responses(event.event_id)?;
        let tally = tally(&responses);
        let (username, there) = match actor {
            Some((name, attending)) => (Some(name), Some(attending)),
            None => (None, None),
        };
        Ok(LedgerChange {
            participant_id,
            notice: LedgerNotice {
                event_id: event.event_id,
                title: event.title.clone(),
                going: tally.going,
                not_going: tally.not_going,
                username,
                there,
            },
            responses,
            tally,
        })
    }
}

fn normalize_comment(comment: Option<&str>) -> Option<&str> {
    comment.map(str::trim).filter(|value| !value.is_empty())
}
