use std::sync::Arc;

pub mod calendar;
pub mod filters;
pub mod handlers;
pub mod histogram;
pub mod memory_repository;
pub mod models;
pub mod pg_repository;
pub mod query;
pub mod reference_cache;
pub mod repository;
pub mod services;

use crate::reference_cache::ReferenceCache;
use crate::repository::{CatalogRepository, ManualLogRepository, WatchLogRepository};

pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository>,
    pub watch_logs: Arc<dyn WatchLogRepository>,
    pub manual_logs: Arc<dyn ManualLogRepository>,
    pub reference_cache: ReferenceCache,
}
