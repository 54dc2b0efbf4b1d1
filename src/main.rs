//! # Chat Store
//!
//! Bootstrap binary for the chat persistence layer.
//!
//! Connects the configured document store, applies migrations and unique
//! indexes, reports the current sequence heads and exits.

use anyhow::Result;
use tracing::info;

use chat_store::config::Settings;
use chat_store::infrastructure::repositories::{MESSAGE_SEQUENCE, USER_SEQUENCE};
use chat_store::startup::Repositories;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment and config files
    let settings = Settings::load()?;

    // Initialize tracing subscriber for structured logging
    chat_store::telemetry::init_tracing(&settings.telemetry);

    info!(
        backend = ?settings.store.backend,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let repositories = Repositories::build(&settings).await?;

    let last_user_id = repositories.sequences.current(USER_SEQUENCE).await?;
    let last_message_id = repositories.sequences.current(MESSAGE_SEQUENCE).await?;
    info!(last_user_id, last_message_id, "Store ready");

    Ok(())
}
