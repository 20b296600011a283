use crate::batches::BatchService;
use crate::brewfather::BrewfatherClient;
use crate::cli::ServiceName;
use crate::config::{CacheBackend, Config};
use crate::data::kv::CacheStore;
use crate::data::memory::MemoryCacheStore;
use crate::data::redis::RedisCacheStore;
use crate::refresh::RefreshService;
use crate::services::manager::ServiceManager;
use crate::services::web::WebService;
use crate::state::{AppState, ServiceStatus};
use crate::utils::fmt_duration;
use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
    service_manager: ServiceManager,
}

impl App {
    /// Build the cache store, upstream client and shared state.
    ///
    /// Nothing here touches the network: the Redis connection is opened on
    /// first use and credentials are checked on the first upstream fetch.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let cache: Arc<dyn CacheStore> = match config.cache_backend()? {
            CacheBackend::Redis => Arc::new(
                RedisCacheStore::new(&config.redis_url, config.cache_timeout)
                    .context("Failed to create Redis cache store")?,
            ),
            CacheBackend::Memory => {
                warn!("Using in-process cache store; cached batches will not survive restarts");
                Arc::new(MemoryCacheStore::new())
            }
        };

        let client = BrewfatherClient::new(
            config.brewfather_base_url.clone(),
            config.brewfather_credentials(),
            config.upstream_timeout,
        )
        .context("Failed to create Brewfather client")?;
        if config.brewfather_user_id.is_none() || config.brewfather_api_key.is_none() {
            warn!("Brewfather credentials are not fully configured; upstream fetches will fail");
        }

        info!(
            base_url = %config.brewfather_base_url,
            upstream_timeout = fmt_duration(config.upstream_timeout),
            cache_timeout = fmt_duration(config.cache_timeout),
            "batch service configured"
        );

        let batches = BatchService::new(Arc::new(client), cache.clone());
        let app_state = AppState::new(batches, cache);

        Ok(App {
            config,
            app_state,
            service_manager: ServiceManager::new(),
        })
    }

    /// Setup and register services based on enabled service list
    pub fn setup_services(&mut self, services: &[ServiceName]) -> Result<(), anyhow::Error> {
        if services.contains(&ServiceName::Web) {
            let web_service = Box::new(WebService::new(self.config.port, self.app_state.clone()));
            self.app_state
                .service_statuses
                .set(ServiceName::Web.as_str(), ServiceStatus::Starting);
            self.service_manager
                .register_service(ServiceName::Web.as_str(), web_service);
        }

        if services.contains(&ServiceName::Refresh) {
            let refresh_service = Box::new(RefreshService::new(
                self.app_state.batches.clone(),
                self.app_state.cache.clone(),
                self.config.refresh_interval,
                self.app_state.refresh_trigger.clone(),
                self.app_state.service_statuses.clone(),
            ));
            self.app_state
                .service_statuses
                .set(ServiceName::Refresh.as_str(), ServiceStatus::Starting);
            self.service_manager
                .register_service(ServiceName::Refresh.as_str(), refresh_service);
        }

        if !self.service_manager.has_services() {
            error!("No services enabled. Cannot start application.");
            return Err(anyhow::anyhow!("No services enabled"));
        }

        Ok(())
    }

    /// Start all registered services
    pub fn start_services(&mut self) {
        self.service_manager.spawn_all();
    }

    /// Run the application and handle shutdown signals
    pub async fn run(self) -> ExitCode {
        use crate::services::signals::handle_shutdown_signals;
        handle_shutdown_signals(self.service_manager, self.config.shutdown_timeout).await
    }
}
