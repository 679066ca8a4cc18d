//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::service::ContentService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    service: ContentService,
}

impl AppState {
    pub fn new(config: Config, service: ContentService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, service }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the content service
    pub fn service(&self) -> &ContentService {
        &self.inner.service
    }
}
