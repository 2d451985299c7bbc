//! Static entity metadata: association descriptors.
//!
//! # Responsibility
//! - Describe, per entity type, which fields are associations, what they
//!   point at, and how they join.
//!
//! # Invariants
//! - Metadata is supplied as `&'static` tables at entity definition time;
//!   no runtime schema introspection happens anywhere in the crate.
//! - `field` names are unique within one `EntityMetadata`.

/// Cardinality of an association field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// Single join column; resolves to one target document or null.
    One,
    /// Collection; resolves to all target documents matching the join key.
    Many,
}

/// One declared association from an entity field to a target entity type.
#[derive(Debug, Clone, Copy)]
pub struct AssociationDescriptor {
    /// Payload field holding the raw join value before resolution.
    pub field: &'static str,
    /// Registered name of the target entity type.
    pub target_entity: &'static str,
    /// Field on the target entity matched against the raw join value.
    pub join_key: &'static str,
    pub kind: AssociationKind,
}

/// Association table for one entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityMetadata {
    /// Registered entity name; doubles as the storage partition key.
    pub entity: &'static str,
    pub associations: &'static [AssociationDescriptor],
}

impl EntityMetadata {
    /// Returns whether `field` is declared as an association.
    pub fn has_association(&self, field: &str) -> bool {
        self.association(field).is_some()
    }

    /// Returns the descriptor for `field`, if any.
    pub fn association(&self, field: &str) -> Option<&AssociationDescriptor> {
        self.associations
            .iter()
            .find(|descriptor| descriptor.field == field)
    }

    /// Returns whether `field` is a single-join-column association.
    pub fn is_single_join_column(&self, field: &str) -> bool {
        matches!(
            self.association(field),
            Some(descriptor) if descriptor.kind == AssociationKind::One
        )
    }
}
