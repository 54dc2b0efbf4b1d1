//! # Chat Store Library
//!
//! Persistence layer for the users and messages of a chat service:
//! - documents in a pluggable document store (PostgreSQL JSONB or in-memory)
//! - sequential integer IDs from store-backed counters
//! - unique email and username, Argon2id password hashes
//!
//! ## Architecture
//!
//! - **Domain Layer**: entities, create inputs, patches and repository traits
//! - **Infrastructure Layer**: the document store port and its adapters,
//!   the sequence allocator and the repository implementations
//!
//! ## Module Structure
//!
//! ```text
//! chat_store/
//! +-- config/         Configuration management
//! +-- domain/         Entities and repository traits
//! +-- infrastructure/ Document stores, database, repositories
//! +-- shared/         Errors, password hashing, validation
//! +-- startup         Wiring of store, allocator and repositories
//! +-- telemetry       Logging setup
//! ```

// Configuration module
pub mod config;

// Domain layer
pub mod domain;

// Infrastructure layer - stores and repositories
pub mod infrastructure;

// Shared utilities
pub mod shared;

// Store and repository wiring
pub mod startup;

// Telemetry and observability
pub mod telemetry;
