use std::sync::Arc;

use crate::app::error::Result;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::ingest::Pipeline;
use crate::maildir::Maildir;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub pipeline: Pipeline<SqliteStore>,
}

impl AppContext {
    /// Opens the configured database and builds the HTTP pipeline.
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.database_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::with_options(
            config.fetch.timeout(),
            &config.fetch.user_agent,
        )?);

        Self::with_parts(config, store, fetcher)
    }

    pub fn in_memory(config: Config, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_parts(config, store, fetcher)
    }

    fn with_parts(
        config: Config,
        store: Arc<SqliteStore>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
    ) -> Result<Self> {
        let maildir = Maildir::new(config.feeds_path()?, config.owner);
        let pipeline = Pipeline::with_workers(
            store.clone(),
            fetcher,
            maildir,
            config.delivery_options()?,
            config.fetch.workers,
        );

        Ok(Self {
            config,
            store,
            pipeline,
        })
    }
}
