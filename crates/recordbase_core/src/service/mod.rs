//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into uniform entity CRUD APIs.
//! - Keep callers decoupled from storage details.

pub mod entity_model;
