use std::sync::Arc;

use strep_client::{ReportRenderer, StudentSource};
use strep_core::{AppConfig, DisabledCache, FileCache, ReportCache};

use crate::report::ReportService;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub source: Arc<dyn StudentSource>,
    pub reports: Arc<ReportService>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        source: Arc<dyn StudentSource>,
        renderer: Arc<dyn ReportRenderer>,
        cache: Arc<dyn ReportCache>,
    ) -> Self {
        let reports = Arc::new(ReportService::new(Arc::clone(&source), renderer, cache));
        Self { config: Arc::new(config), source, reports }
    }
}

/// Open the file cache when enabled.
///
/// A cache that fails to initialize is logged and replaced by
/// [`DisabledCache`]; the service keeps running without caching. The
/// concrete cache is returned alongside so the caller can attach a sweeper.
pub async fn build_cache(config: &AppConfig) -> (Arc<dyn ReportCache>, Option<Arc<FileCache>>) {
    if !config.enable_cache {
        tracing::info!("report cache disabled");
        return (Arc::new(DisabledCache), None);
    }

    match FileCache::open(&config.cache_path, config.cache_ttl()).await {
        Ok(cache) => {
            tracing::info!(
                path = %cache.base_path().display(),
                ttl_secs = cache.ttl().as_secs(),
                "report cache initialized"
            );
            let cache = Arc::new(cache);
            let shared: Arc<dyn ReportCache> = cache.clone();
            (shared, Some(cache))
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to initialize cache, continuing without cache");
            (Arc::new(DisabledCache), None)
        }
    }
}
