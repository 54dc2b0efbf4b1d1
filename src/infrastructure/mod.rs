//! Infrastructure Layer
//!
//! Contains implementations for external services:
//! - Document store port and adapters (in-memory, PostgreSQL)
//! - Database connection pool and migrations
//! - Repository implementations on top of the document store

pub mod database;
pub mod repositories;
pub mod store;
