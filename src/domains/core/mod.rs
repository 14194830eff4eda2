pub mod batch;
pub mod batch_executor;
pub mod cascade_resolver;
pub mod document_store;
pub mod repository;
pub mod result_reporter;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the TRAITS and core types
pub use batch::{BatchOptions, BatchRequest, BatchResult, CancellationFlag, ItemOutcome};
pub use batch_executor::BatchExecutor;
pub use cascade_resolver::{CascadeResolver, DependentRef, ForeignKeyCascadeResolver};
pub use document_store::SqliteEntityStore;
pub use repository::{Document, EntityStore, IdentityStore};
pub use result_reporter::{BatchReport, FailedItem};
