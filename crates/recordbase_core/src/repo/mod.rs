//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the per-entity-type data access contract.
//! - Isolate SQLite query details from the entity model orchestration.
//!
//! # Invariants
//! - Filter and order field names are validated before reaching SQL.
//! - Repository APIs return semantic results (`Option`, `bool`) in
//!   addition to DB transport errors.

pub mod record_repo;
