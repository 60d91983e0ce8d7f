//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the store contract consumed by lifecycle and ledger services.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`EventNotFound`,
//!   `ResponseNotFound`) in addition to DB transport errors.
//! - Every multi-statement write runs inside one transaction.

pub mod event_repo;
