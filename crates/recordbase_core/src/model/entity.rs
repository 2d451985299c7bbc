//! Entity seam: typed records behind a uniform hydration contract.
//!
//! # Responsibility
//! - Define the `Entity` trait every persisted record type implements.
//! - Provide serde-backed default hydration/extraction helpers so entity
//!   impls need no per-field mapping code.
//!
//! # Invariants
//! - `id` is the only identity field; it is assigned by the storage
//!   layer, never by callers.
//! - `hydrate` merges payload keys over the entity's current field
//!   values; keys absent from the payload are left untouched.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use crate::model::metadata::EntityMetadata;

/// Stable identifier for every persisted record.
pub type EntityId = Uuid;

/// Untyped field mapping exchanged with callers and storage.
pub type Fields = serde_json::Map<String, Value>;

/// Error raised when a field mapping cannot be applied to an entity.
#[derive(Debug)]
pub struct HydrationError {
    pub entity: &'static str,
    pub message: String,
}

impl Display for HydrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to hydrate `{}`: {}", self.entity, self.message)
    }
}

impl Error for HydrationError {}

/// Contract every persisted record type implements.
///
/// This replaces runtime reflection with an explicit factory plus
/// hydrate/extract pair; the serde helpers below cover the common case.
pub trait Entity: Sized {
    /// Registered entity name; doubles as the storage partition key.
    fn entity_name() -> &'static str;

    /// Static association table for this entity type.
    fn metadata() -> &'static EntityMetadata;

    /// Builds a fresh, unpersisted instance with no identity.
    fn new_empty() -> Self;

    /// Returns the assigned identity, if this instance was persisted.
    fn id(&self) -> Option<EntityId>;

    /// Assigns identity. Called by the repository on first save only.
    fn assign_id(&mut self, id: EntityId);

    /// Merges `fields` onto this instance's current values.
    fn hydrate(&mut self, fields: &Fields) -> Result<(), HydrationError>;

    /// Produces the plain field mapping for this instance. No filtering.
    fn extract(&self) -> Fields;
}

/// Serde-backed extraction: serializes the entity to a JSON object.
pub fn extract_fields<T: Serialize>(entity: &T, entity_name: &'static str) -> Fields {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => map,
        // Entity types are structs with named fields; anything else is a
        // definition error, surfaced as an empty mapping rather than a
        // panic in library code.
        _ => {
            log::error!(
                "event=extract_fields module=model status=error entity={entity_name} error_code=non_object_entity"
            );
            Fields::new()
        }
    }
}

/// Serde-backed hydration: overlays `fields` on the entity's current
/// values and deserializes the merged mapping back into the type.
pub fn hydrate_fields<T: Serialize + DeserializeOwned>(
    entity: &mut T,
    fields: &Fields,
    entity_name: &'static str,
) -> Result<(), HydrationError> {
    let mut merged = extract_fields(entity, entity_name);
    for (key, value) in fields {
        merged.insert(key.clone(), value.clone());
    }

    let hydrated = serde_json::from_value(Value::Object(merged)).map_err(|err| HydrationError {
        entity: entity_name,
        message: err.to_string(),
    })?;
    *entity = hydrated;
    Ok(())
}
