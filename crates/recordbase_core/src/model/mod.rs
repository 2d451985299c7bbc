//! Domain model seam for the generic record layer.
//!
//! # Responsibility
//! - Define the entity contract, payload shapes and association metadata
//!   used by repositories and the entity model.
//! - Keep one untyped `Fields` mapping shape for caller payloads, stored
//!   documents and association resolution results.
//!
//! # Invariants
//! - Identity is a UUID assigned by the storage layer.
//! - Association metadata is static per entity type; no runtime schema
//!   introspection.

pub mod entity;
pub mod metadata;
pub mod value;
