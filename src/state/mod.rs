use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig, dao::hub_store::HubStore, error::ServiceError,
    services::token_service::TokenService,
};

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, token signer and the current storage handle.
pub struct AppState {
    config: AppConfig,
    tokens: TokenService,
    store: RwLock<Option<Arc<dyn HubStore>>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl);
        Arc::new(Self {
            config,
            tokens,
            store: RwLock::new(None),
            degraded: degraded_tx,
        })
    }

    /// Construct a state with a store already installed, leaving degraded mode immediately.
    pub async fn with_store(config: AppConfig, store: Arc<dyn HubStore>) -> SharedState {
        let state = Self::new(config);
        state.set_store(store).await;
        state
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bearer token signer/verifier.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn HubStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current store or fail with [`ServiceError::Degraded`].
    pub async fn require_store(&self) -> Result<Arc<dyn HubStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn HubStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
