//! Persistence context: connection ownership and entity registry.
//!
//! # Responsibility
//! - Own the SQLite connection shared by every repository.
//! - Track registered entity metadata and hand out repositories, typed
//!   or type-erased, for any registered entity name.
//!
//! # Invariants
//! - Association resolution only reaches entity types that were
//!   registered up front; unknown names are an `UnknownEntity` error,
//!   not a silent miss.

use rusqlite::Connection;
use std::collections::HashMap;
use std::rc::Rc;

use crate::model::entity::Entity;
use crate::model::metadata::EntityMetadata;
use crate::repo::record_repo::{RawRepository, RepoError, RepoResult, SqliteRepository};

/// Shared persistence state: one connection, one metadata registry.
///
/// Single-threaded by design; clones of the inner `Rc` are handed to
/// repositories created from this context.
pub struct PersistenceContext {
    conn: Rc<Connection>,
    metadata: HashMap<&'static str, &'static EntityMetadata>,
}

impl PersistenceContext {
    /// Wraps an opened connection. The connection is expected to come
    /// from `db::open_db`/`db::open_db_in_memory` with migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Rc::new(conn),
            metadata: HashMap::new(),
        }
    }

    /// Registers an entity type, making it reachable for association
    /// resolution. Fluent, so contexts can be built in one expression.
    pub fn register<E: Entity>(mut self) -> Self {
        let metadata = E::metadata();
        self.metadata.insert(metadata.entity, metadata);
        self
    }

    /// Returns the association metadata registered for `entity`.
    pub fn class_metadata(&self, entity: &str) -> Option<&'static EntityMetadata> {
        self.metadata.get(entity).copied()
    }

    /// Builds a typed repository for a registered entity type.
    pub fn repository<E: Entity>(&self) -> SqliteRepository<E> {
        SqliteRepository::new(Rc::clone(&self.conn))
    }

    /// Builds a type-erased repository for a registered entity name.
    pub fn raw_repository(&self, entity: &str) -> RepoResult<RawRepository> {
        match self.metadata.get(entity) {
            Some(metadata) => Ok(RawRepository::new(Rc::clone(&self.conn), metadata.entity)),
            None => Err(RepoError::UnknownEntity(entity.to_string())),
        }
    }
}
