pub mod types;

pub use types::{Feedback, Interview, InterviewStatus};
