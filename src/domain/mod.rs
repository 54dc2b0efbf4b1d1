//! # Domain Layer
//!
//! Entities, their create/patch inputs, and the repository traits that
//! describe how they are persisted.
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure
//! - Repository traits define data access contracts
//! - Identifiers are assigned by the store, never by callers

pub mod entities;

// Re-export commonly used types
pub use entities::*;
