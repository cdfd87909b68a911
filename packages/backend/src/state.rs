use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::storage::ObjectStorage;
use crate::store::ContentStore;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    store: Arc<dyn ContentStore>,
    storage: Arc<dyn ObjectStorage>,
    store_kind: &'static str,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ContentStore>,
        storage: Arc<dyn ObjectStorage>,
        store_kind: &'static str,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            store,
            storage,
            store_kind,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    pub fn storage(&self) -> &dyn ObjectStorage {
        self.storage.as_ref()
    }

    /// "postgres" or "memory"
    pub fn store_kind(&self) -> &'static str {
        self.store_kind
    }
}
