use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::errors::AppError;
use crate::events::EventSource;
use crate::metadata::store::MetadataStore;
use crate::responses::store::ResponseStore;
use crate::storage::StorageError;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub responses: ResponseStore,
    pub metadata: MetadataStore,
    /// Read-only mirror of the external calendar feed.
    pub events: Arc<dyn EventSource>,
    pub config: Config,
}

impl AppState {
    /// Applies the read-degradation policy: with `DEGRADE_READS` enabled a
    /// failed read yields an empty result instead of an error. Never use
    /// this on a write path.
    pub fn degrade_read<T: Default>(
        &self,
        operation: &str,
        result: Result<T, StorageError>,
    ) -> Result<T, AppError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if self.config.degrade_reads => {
                warn!("{operation} failed, serving empty result: {e}");
                Ok(T::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
