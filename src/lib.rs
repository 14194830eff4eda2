// Public modules
pub mod config;
pub mod domains;
pub mod errors;
pub mod ffi;
pub mod globals;
pub mod types;

// Private modules
mod db_migration;

pub use config::LifecycleConfig;
pub use db_migration::run_migrations;
pub use domains::core::{BatchOptions, BatchReport, BatchRequest, BatchResult, CancellationFlag, ItemOutcome};
pub use domains::lifecycle::{BatchRequestDto, LifecycleService};
pub use types::{EntityKind, LifecycleAction};

/// Initialize the library against the database at `db_path`; the remaining
/// settings come from the environment. Must be called before `get_lifecycle_service`.
pub async fn initialize(db_path: &str) -> ffi::FFIResult<()> {
    initialize_with_config(LifecycleConfig::from_env().with_db_path(db_path)).await
}

pub async fn initialize_with_config(config: LifecycleConfig) -> ffi::FFIResult<()> {
    globals::initialize(config).await
}

/// The process-wide service created by `initialize`
pub fn get_lifecycle_service() -> ffi::FFIResult<std::sync::Arc<LifecycleService>> {
    globals::get_lifecycle_service()
}

/// Get a reference to the SQLite connection pool
/// This is primarily for internal use
pub fn get_db_pool() -> ffi::FFIResult<sqlx::SqlitePool> {
    globals::get_db_pool()
}
