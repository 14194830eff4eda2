pub mod service;
pub mod types;

pub use service::LifecycleService;
pub use types::BatchRequestDto;
