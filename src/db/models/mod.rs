pub mod task;
pub mod tracking;
pub mod user;

pub use task::Task;
pub use tracking::{TrackingRecord, TrackingState};
pub use user::{User, UserFilter, UserUpdate};
