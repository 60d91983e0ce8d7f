//! Service-level error kinds shared by lifecycle, ledger and event use-cases.

use crate::model::event::EventId;
use crate::model::recurrence::RecurrenceError;
use crate::model::response::ParticipantId;
use crate::repo::event_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced to callers of core use-cases.
///
/// A lost ledger-reset race is not an error and never shows up here.
#[derive(Debug)]
pub enum ServiceError {
    /// Recurrence descriptor is malformed.
    InvalidRecurrence(RecurrenceError),
    /// Requested event does not exist.
    EventNotFound(EventId),
    /// Participant has no response to remove.
    ResponseNotFound {
        event_id: EventId,
        participant_id: ParticipantId,
    },
    /// Store call failed; state was left unchanged.
    PersistenceUnavailable(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRecurrence(err) => write!(f, "invalid recurrence: {err}"),
            Self::EventNotFound(id) => write!(f, "event not found: {id}"),
            Self::ResponseNotFound {
                event_id,
                participant_id,
            } => write!(
                f,
                "response not found: event {event_id} participant {participant_id}"
            ),
            Self::PersistenceUnavailable(err) => write!(f, "persistence unavailable: {err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent event state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRecurrence(err) => Some(err),
            Self::PersistenceUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Whether the caller should present this as a "not found" page.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EventNotFound(_) | Self::ResponseNotFound { .. }
        )
    }

    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRecurrence(_) => "invalid_recurrence",
            Self::EventNotFound(_) => "event_not_found",
            Self::ResponseNotFound { .. } => "response_not_found",
            Self::PersistenceUnavailable(_) => "persistence_unavailable",
            Self::InconsistentState(_) => "inconsistent_state",
        }
    }
}

impl From<RecurrenceError> for ServiceError {
    fn from(value: RecurrenceError) -> Self {
        Self::InvalidRecurrence(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::EventNotFound(event_id) => Self::EventNotFound(event_id),
            RepoError::ResponseNotFound {
                event_id,
                participant_id,
            } => Self::ResponseNotFound {
                event_id,
                participant_id,
            },
            other => Self::PersistenceUnavailable(other),
        }
    }
}
