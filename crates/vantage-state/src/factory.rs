use std::sync::Arc;

use vantage_config::{StateStoreBackend, StateStoreConfig};
use vantage_types::VantageResult;

use crate::{MemoryStateStore, RedisStateStore, StateStore};

/// Constructs the configured state store implementation.
pub async fn build_state_store(config: &StateStoreConfig) -> VantageResult<Arc<dyn StateStore>> {
    match config.backend {
        StateStoreBackend::Memory => Ok(Arc::new(MemoryStateStore::new())),
        StateStoreBackend::External => {
            let store =
                RedisStateStore::connect(&config.connection_url, config.key_prefix.clone())
                    .await?;
            Ok(Arc::new(store))
        }
    }
}
