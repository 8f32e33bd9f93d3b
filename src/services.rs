use std::env;
use std::sync::Arc;

use sqlx::{PgPool, Pool, Postgres};

use crate::pg_repository::{PgCatalogRepository, PgManualLogRepository, PgWatchLogRepository};
use crate::reference_cache::ReferenceCache;
use crate::AppState;

pub async fn init_db_pool() -> Pool<Postgres> {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

pub fn app_state_from_pool(pool: PgPool) -> AppState {
    AppState {
        catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
        watch_logs: Arc::new(PgWatchLogRepository::new(pool.clone())),
        manual_logs: Arc::new(PgManualLogRepository::new(pool)),
        reference_cache: ReferenceCache::new(),
    }
}
