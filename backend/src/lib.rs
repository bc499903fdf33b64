pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod models;
pub mod params;
pub mod password;
pub mod patch;
pub mod routes;
pub mod store;
pub mod telemetry;

use crate::config::AppConfig;
use crate::store::SharedStore;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: AppConfig,
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
