use crate::config::settings::ApiConfig;
use crate::infrastructure::storage::s3::StorageService;

#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: StorageService,
}

impl AppState {
    pub fn new(config: ApiConfig, storage: StorageService) -> Self {
        Self { config, storage }
    }
}
