//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{ApiConfig, CartLinePolicy};
use crate::db::Store;
use crate::services::auth::TokenService;
use crate::services::email::Notifier;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and gives handlers the store,
/// the token service and the receipt notifier.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
    tokens: TokenService,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration (token keys are derived from it)
    /// * `store` - Persistence backend
    /// * `notifier` - Receipt delivery
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        let tokens = TokenService::new(&config.jwt);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                notifier,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the bearer token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the receipt notifier.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.inner.notifier.as_ref()
    }

    /// How repeated adds of one product are stored.
    #[must_use]
    pub fn cart_line_policy(&self) -> CartLinePolicy {
        self.inner.config.cart_line_policy
    }

    /// Currency label printed on receipts.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.inner.config.currency
    }
}
