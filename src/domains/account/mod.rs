pub mod repository;
pub mod types;

pub use repository::SqliteIdentityStore;
pub use types::{Account, NewAccount};
