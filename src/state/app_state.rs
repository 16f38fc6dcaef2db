use super::{Session, SessionStore};
use crate::cache::{spawn_cache_janitor, ResponseCache};
use crate::client::{ApiClient, ClientOptions, HttpTransport, Transport, TransportError};
use crate::notifications::Notifier;
use crate::settings::{ClientConfig, SettingsError, SettingsStore};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to build http client: {0}")]
    Transport(#[from] TransportError),
}

/// Everything a front end holds on to: configuration, the shared stores and
/// the client wired to them.
pub struct AppState<T: Transport = HttpTransport> {
    pub settings: SettingsStore,
    pub config: ClientConfig,
    pub session: SessionStore,
    pub cache: Arc<ResponseCache>,
    pub notifier: Notifier,
    pub client: ApiClient<T>,
}

impl<T: Transport> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
            config: self.config.clone(),
            session: self.session.clone(),
            cache: self.cache.clone(),
            notifier: self.notifier.clone(),
            client: self.client.clone(),
        }
    }
}

impl AppState<HttpTransport> {
    pub fn from_settings(settings: SettingsStore) -> Result<Self, StartupError> {
        let config = ClientConfig::from_settings(&settings)?;
        let transport = HttpTransport::new(&config.base_url, config.request_timeout)?;
        Ok(Self::with_transport(settings, config, transport))
    }
}

impl<T: Transport> AppState<T> {
    pub fn with_transport(settings: SettingsStore, config: ClientConfig, transport: T) -> Self {
        let session = SessionStore::new();
        let cache = Arc::new(ResponseCache::new());
        let notifier = Notifier::new(config.notification_capacity);
        let client = ApiClient::new(
            transport,
            session.clone(),
            cache.clone(),
            notifier.clone(),
            ClientOptions::from(&config),
        );
        Self {
            settings,
            config,
            session,
            cache,
            notifier,
            client,
        }
    }

    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    pub fn current_session(&self) -> Session {
        self.session.snapshot()
    }

    pub fn spawn_janitor(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        spawn_cache_janitor(
            self.cache.clone(),
            self.config.keep_unused_for,
            self.config.janitor_interval,
            shutdown,
        )
    }
}
