//! Generic Active-Record-style data access core.
//!
//! One `EntityModel` provides uniform create/update/remove/find
//! operations over any entity type that implements the `Entity`
//! hydration seam, with association fields resolved through static
//! per-entity metadata instead of runtime reflection.

pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use context::PersistenceContext;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{
    extract_fields, hydrate_fields, Entity, EntityId, Fields, HydrationError,
};
pub use model::metadata::{AssociationDescriptor, AssociationKind, EntityMetadata};
pub use model::value::{filtered_merge, is_falsy, BOOKKEEPING_FIELDS};
pub use repo::record_repo::{
    ListQuery, RawRepository, RepoError, RepoResult, Repository, SortDirection, SqliteRepository,
};
pub use service::entity_model::{EntityModel, ModelError, Operation};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
