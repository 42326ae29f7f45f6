pub mod profiles;
pub mod run;
pub mod tools;
pub mod translate;
pub mod version;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sculpt::config::Settings;
use sculpt::engine::ConversationEngine;
use sculpt::tools::builtin_catalog;
use sculpt::tools::search::AstGrep;
use tokio_util::sync::CancellationToken;

pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    Settings::load(config).context("failed to load configuration")
}

/// Token cancelled on the first Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            token.cancel();
        }
    });
    cancel
}

/// Engine over the built-in tools and the configured providers
pub fn build_engine(settings: &Settings) -> Result<ConversationEngine> {
    let catalog = builtin_catalog(Arc::new(AstGrep::default()))?;
    let providers = settings.provider_registry()?;
    Ok(ConversationEngine::new(Arc::new(catalog), Arc::new(providers)))
}
