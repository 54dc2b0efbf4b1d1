//! Repository Implementations
//!
//! Document-store implementations of the domain repository traits, plus the
//! sequence allocator they draw IDs from.
//!
//! ## Available Repositories
//!
//! - **DocumentUserRepository** - user accounts with unique email and username
//! - **DocumentMessageRepository** - messages ordered by timestamp
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chat_store::infrastructure::store::MemoryDocumentStore;
//! use chat_store::infrastructure::repositories::{
//!     DocumentMessageRepository, SequenceAllocator,
//! };
//!
//! let store = Arc::new(MemoryDocumentStore::new());
//! let sequences = SequenceAllocator::new(store.clone());
//! let messages = DocumentMessageRepository::new(store, sequences);
//! ```

pub mod message_repository;
pub mod sequence;
pub mod user_repository;

pub use message_repository::DocumentMessageRepository;
pub use sequence::{SequenceAllocator, MESSAGE_SEQUENCE, USER_SEQUENCE};
pub use user_repository::DocumentUserRepository;
