//! Application state shared across handlers.

use std::sync::Arc;

use knotwork_storefront::services::image_host::{ImageHostClient, ImageHostError};
use knotwork_storefront::store::DocumentStore;

use crate::config::AdminConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    store: DocumentStore,
    images: Option<ImageHostClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the image host client cannot be built.
    pub fn new(config: AdminConfig, store: DocumentStore) -> Result<Self, ImageHostError> {
        let images = config
            .image_host
            .as_ref()
            .map(ImageHostClient::new)
            .transpose()?;

        if images.is_none() {
            tracing::warn!("IMAGE_HOST_API_KEY not set; product image uploads are disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                images,
            }),
        })
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get the document store.
    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.inner.store
    }

    /// Get the image host client, if configured.
    #[must_use]
    pub fn images(&self) -> Option<&ImageHostClient> {
        self.inner.images.as_ref()
    }
}
