#![allow(dead_code)]

use recordbase_core::db::open_db_in_memory;
use recordbase_core::{
    extract_fields, hydrate_fields, AssociationDescriptor, AssociationKind, Entity, EntityId,
    EntityMetadata, Fields, HydrationError, PersistenceContext,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<EntityId>,
    pub name: String,
    pub bio: String,
}

static AUTHOR_METADATA: EntityMetadata = EntityMetadata {
    entity: "author",
    associations: &[],
};

impl Entity for Author {
    fn entity_name() -> &'static str {
        "author"
    }

    fn metadata() -> &'static EntityMetadata {
        &AUTHOR_METADATA
    }

    fn new_empty() -> Self {
        Self::default()
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn hydrate(&mut self, fields: &Fields) -> Result<(), HydrationError> {
        hydrate_fields(self, fields, Self::entity_name())
    }

    fn extract(&self) -> Fields {
        extract_fields(self, Self::entity_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: Option<EntityId>,
    pub book_ref: String,
    pub title: String,
}

static CHAPTER_METADATA: EntityMetadata = EntityMetadata {
    entity: "chapter",
    associations: &[],
};

impl Entity for Chapter {
    fn entity_name() -> &'static str {
        "chapter"
    }

    fn metadata() -> &'static EntityMetadata {
        &CHAPTER_METADATA
    }

    fn new_empty() -> Self {
        Self::default()
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn hydrate(&mut self, fields: &Fields) -> Result<(), HydrationError> {
        hydrate_fields(self, fields, Self::entity_name())
    }

    fn extract(&self) -> Fields {
        extract_fields(self, Self::entity_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<EntityId>,
    pub title: String,
    pub genre: String,
    /// Resolved single-join association; raw payloads carry the author id.
    pub author: Option<Fields>,
    /// Resolved collection association; raw payloads carry the shared
    /// `book_ref` key.
    pub chapters: Vec<Fields>,
}

static BOOK_METADATA: EntityMetadata = EntityMetadata {
    entity: "book",
    associations: &[
        AssociationDescriptor {
            field: "author",
            target_entity: "author",
            join_key: "id",
            kind: AssociationKind::One,
        },
        AssociationDescriptor {
            field: "chapters",
            target_entity: "chapter",
            join_key: "book_ref",
            kind: AssociationKind::Many,
        },
    ],
};

impl Entity for Book {
    fn entity_name() -> &'static str {
        "book"
    }

    fn metadata() -> &'static EntityMetadata {
        &BOOK_METADATA
    }

    fn new_empty() -> Self {
        Self::default()
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn hydrate(&mut self, fields: &Fields) -> Result<(), HydrationError> {
        hydrate_fields(self, fields, Self::entity_name())
    }

    fn extract(&self) -> Fields {
        extract_fields(self, Self::entity_name())
    }
}

/// Opens an in-memory store with all test entities registered.
pub fn test_context() -> Rc<PersistenceContext> {
    let conn = open_db_in_memory().unwrap();
    Rc::new(
        PersistenceContext::new(conn)
            .register::<Author>()
            .register::<Chapter>()
            .register::<Book>(),
    )
}

/// Shorthand for building `Fields` payloads from `json!` literals.
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object payload, got {other}"),
    }
}
