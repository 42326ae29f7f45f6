use std::sync::Arc;

use sculpt::catalog::ToolCatalog;
use sculpt::config::Settings;
use sculpt::engine::ConversationEngine;
use sculpt::profile::Profiles;
use sculpt::providers::factory::ProviderRegistry;
use sculpt::tools::builtin_catalog;
use sculpt::tools::search::AstGrep;
use tokio_util::sync::CancellationToken;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: ConversationEngine,
    pub profiles: Arc<Profiles>,
    /// Cancelled on shutdown; every request works on a child token
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(catalog: ToolCatalog, providers: ProviderRegistry, profiles: Profiles) -> Self {
        Self {
            engine: ConversationEngine::new(Arc::new(catalog), Arc::new(providers)),
            profiles: Arc::new(profiles),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let catalog = builtin_catalog(Arc::new(AstGrep::default()))?;
        let providers = settings.provider_registry()?;
        Ok(Self::new(catalog, providers, settings.profiles()))
    }
}
