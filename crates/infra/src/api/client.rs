//! Fully wired marketplace client
//!
//! Assembles storage, session store, resolver, transport, dispatcher, auth
//! orchestrator and domain commands from a [`ClientConfig`].

use std::sync::Arc;
use std::time::Duration;

use bookmart_core::{
    AssetUrlNormalizer, AuthOrchestrator, EndpointResolver, EnvironmentProbe, KeyValueStore,
    LoginCodeProvider, RequestDispatcher, SessionStore,
};
use bookmart_domain::constants::API_BASE_OVERRIDE_KEY;
use bookmart_domain::{ApiError, ClientConfig, Result};
use serde_json::Value;
use tracing::{info, instrument};

use super::commands::MarketplaceCommands;
use crate::http::HttpTransport;
use crate::platform::HostEnvironment;
use crate::storage::{FileKeyValueStore, MemoryKeyValueStore};

/// Marketplace API client
pub struct BookMartClient {
    config: ClientConfig,
    store: Arc<dyn KeyValueStore>,
    resolver: Arc<EndpointResolver>,
    commands: MarketplaceCommands,
}

impl BookMartClient {
    /// Create a builder for fluent configuration
    pub fn builder(config: ClientConfig) -> BookMartClientBuilder {
        BookMartClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Domain operations.
    pub fn commands(&self) -> &MarketplaceCommands {
        &self.commands
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.commands.auth().session()
    }

    pub fn resolver(&self) -> &Arc<EndpointResolver> {
        &self.resolver
    }

    /// Store or clear the operator API base override.
    ///
    /// The override is only honoured in a debug environment and applies from
    /// the next call on.
    ///
    /// # Errors
    /// Returns `Storage` if the override cannot be persisted.
    #[instrument(skip(self))]
    pub async fn set_api_base_override(&self, base: Option<&str>) -> Result<()> {
        match base.map(str::trim).filter(|base| !base.is_empty()) {
            Some(base) => {
                self.store.write(API_BASE_OVERRIDE_KEY, Value::String(base.to_string())).await?;
                info!(base = %base, "API base override set");
            }
            None => {
                self.store.remove(API_BASE_OVERRIDE_KEY).await?;
                info!("API base override cleared");
            }
        }
        Ok(())
    }
}

/// Builder for [`BookMartClient`]
pub struct BookMartClientBuilder {
    config: ClientConfig,
    login_codes: Option<Arc<dyn LoginCodeProvider>>,
    store: Option<Arc<dyn KeyValueStore>>,
    probe: Option<Arc<dyn EnvironmentProbe>>,
}

impl BookMartClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self { config, login_codes: None, store: None, probe: None }
    }

    /// Host login primitive. Required.
    #[must_use]
    pub fn login_codes(mut self, provider: Arc<dyn LoginCodeProvider>) -> Self {
        self.login_codes = Some(provider);
        self
    }

    /// Replace the storage backend chosen from `config.storage`.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the configuration-backed environment probe.
    #[must_use]
    pub fn probe(mut self, probe: Arc<dyn EnvironmentProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Wire the client.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if no login code provider was supplied or
    /// the HTTP client cannot be built.
    pub fn build(self) -> Result<BookMartClient> {
        let config = self.config;
        let login_codes = self
            .login_codes
            .ok_or_else(|| ApiError::Config("a login code provider is required".to_string()))?;

        let store: Arc<dyn KeyValueStore> = match (self.store, config.storage.path.as_deref()) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileKeyValueStore::new(path)),
            (None, None) => Arc::new(MemoryKeyValueStore::new()),
        };
        let probe: Arc<dyn EnvironmentProbe> = self
            .probe
            .unwrap_or_else(|| Arc::new(HostEnvironment::from_config(&config.environment)));

        let session = Arc::new(SessionStore::new(store.clone()));
        let normalizer = AssetUrlNormalizer::new(
            &config.api.production_base,
            &config.api.legacy_asset_prefixes,
        );
        let transport = HttpTransport::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs.max(1)))
            .normalizer(normalizer)
            .build(session.clone())?;

        let resolver = Arc::new(EndpointResolver::new(
            &config.api.production_base,
            probe.clone(),
            store.clone(),
        ));
        let dispatcher = Arc::new(RequestDispatcher::new(resolver.clone(), Arc::new(transport)));
        let auth = AuthOrchestrator::new(dispatcher, session, login_codes, probe)
            .with_login_path(config.api.login_path.as_str());
        let commands = MarketplaceCommands::new(Arc::new(auth))
            .with_upload_path(config.api.upload_path.as_str());

        info!(
            production_base = %config.api.production_base,
            persistent_session = config.storage.path.is_some(),
            "marketplace client ready"
        );
        Ok(BookMartClient { config, store, resolver, commands })
    }
}
