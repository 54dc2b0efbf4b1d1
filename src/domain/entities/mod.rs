//! # Domain Entities
//!
//! Core domain entities persisted by this crate.
//!
//! - **User**: account with unique email and username
//! - **Message**: a chat message owned by a user
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod message;
mod user;

// Re-export User entity and related types
pub use user::{NewUser, User, UserPatch, UserRepository};

// Re-export Message entity and related types
pub use message::{Message, MessagePatch, MessageRepository, NewMessage};

/// Most records any list operation returns.
pub const LIST_LIMIT: usize = 1000;
