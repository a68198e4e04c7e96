use std::sync::Arc;

use vantage_config::{ResultsBackend, ResultsConfig};
use vantage_types::VantageResult;

use crate::{FsResultsManager, RemoteResultsManager, ResultsManager, SqlResultsManager};

pub async fn build_results_manager(config: &ResultsConfig) -> VantageResult<Arc<dyn ResultsManager>> {
    match config.backend {
        ResultsBackend::Fs => Ok(Arc::new(FsResultsManager::new(&config.crawl_data_dir))),
        ResultsBackend::Sql => Ok(Arc::new(SqlResultsManager::connect(&config.database_path).await?)),
        ResultsBackend::Remote => Ok(Arc::new(RemoteResultsManager::new(config)?)),
    }
}
