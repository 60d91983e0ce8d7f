//! Core domain logic for ThrSqr, a weekly-recurring event RSVP service.
//! This crate owns the occurrence time engine and the response-ledger lifecycle.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::event::{Event, EventId};
pub use model::recurrence::{RecurrenceDescriptor, RecurrenceError, TimeOfDay};
pub use model::response::{ParticipantId, Response, Tally};
pub use repo::event_repo::{Collection, EventStore, RepoError, RepoResult, SqliteEventStore};
pub use schedule::occurrence::{next_occurrence, previous_occurrence, OCCURRENCE_PERIOD};
pub use service::error::{ServiceError, ServiceResult};
pub use service::event_service::{
    resolve_event_path, share_path, CreatedEvent, EventDetails, EventService, EventView,
};
pub use service::ledger_service::{
    tally, LedgerChange, LedgerNotice, LedgerService, RespondRequest,
};
pub use service::lifecycle_service::{should_reset, LifecycleService, ResetOutcome};
pub use service::slug::slug_from;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
