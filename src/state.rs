use std::sync::Arc;

use crate::{config::AppConfig, store::ShopStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ShopStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn ShopStore>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
