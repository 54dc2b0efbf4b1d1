//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__, plus plain DATABASE_URL)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_store::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Using the {:?} store backend", settings.store.backend);
//! ```

mod settings;

pub use settings::*;
