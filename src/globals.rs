use crate::config::LifecycleConfig;
use crate::domains::lifecycle::LifecycleService;
use crate::ffi::error::{FFIError, FFIResult};
use lazy_static::lazy_static;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// Global state definitions
lazy_static! {
    static ref INIT_MUTEX: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);

    static ref CONFIG: Mutex<Option<LifecycleConfig>> = Mutex::new(None);
    static ref DB_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);
    static ref LIFECYCLE_SERVICE: Mutex<Option<Arc<LifecycleService>>> = Mutex::new(None);
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

pub fn get_config() -> FFIResult<LifecycleConfig> {
    CONFIG.lock().map_err(|_| FFIError::internal("CONFIG lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::not_initialized("Configuration"))
}
pub fn get_db_pool() -> FFIResult<SqlitePool> {
    DB_POOL.lock().map_err(|_| FFIError::internal("DB_POOL lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::not_initialized("Database pool"))
}
pub fn get_lifecycle_service() -> FFIResult<Arc<LifecycleService>> {
    LIFECYCLE_SERVICE.lock().map_err(|_| FFIError::internal("LIFECYCLE_SERVICE lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::not_initialized("LifecycleService"))
}

/// An in-memory database lives and dies with its one connection, so that
/// connection is never reaped or recycled.
pub(crate) fn pool_options(config: &LifecycleConfig) -> SqlitePoolOptions {
    if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
}

/// Set up the pool, schema, and services once per process. Later calls are no-ops.
pub async fn initialize(config: LifecycleConfig) -> FFIResult<()> {
    let _guard = INIT_MUTEX.lock().await;

    if INITIALIZED.load(Ordering::Acquire) {
        log::debug!("Lifecycle core already initialized; ignoring {}", config.db_path);
        return Ok(());
    }

    let result = initialize_internal(config).await;

    if result.is_ok() {
        INITIALIZED.store(true, Ordering::Release);
    }

    result
}

async fn initialize_internal(config: LifecycleConfig) -> FFIResult<()> {
    let _ = env_logger::try_init();

    log::info!("Starting lifecycle core initialization");
    log::debug!("Database: {}", config.db_path);
    log::debug!(
        "Batch options: max_concurrency={}, deadline_ms={:?}",
        config.max_concurrency,
        config.deadline_ms
    );

    let pool = pool_options(&config)
        .connect_with(config.connect_options()?)
        .await
        .map_err(|e| {
            log::error!("Database connection failed: {}", e);
            FFIError::internal(format!("Database connection failed: {}", e))
        })?;
    log::debug!("Database connection established");

    crate::db_migration::run_migrations(&pool).await.map_err(|e| {
        log::error!("Database migration failed: {}", e);
        FFIError::from(e)
    })?;

    let service = Arc::new(LifecycleService::from_pool(pool.clone(), config.batch_options()));

    *DB_POOL.lock().map_err(|_| FFIError::internal("DB_POOL lock poisoned".to_string()))? = Some(pool);
    *LIFECYCLE_SERVICE.lock().map_err(|_| FFIError::internal("LIFECYCLE_SERVICE lock poisoned".to_string()))? = Some(service);
    *CONFIG.lock().map_err(|_| FFIError::internal("CONFIG lock poisoned".to_string()))? = Some(config);

    log::info!("Lifecycle core initialized");
    Ok(())
}
