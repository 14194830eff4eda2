pub mod account;
pub mod core;
pub mod interview;
pub mod lifecycle;

pub use lifecycle::{BatchRequestDto, LifecycleService};
