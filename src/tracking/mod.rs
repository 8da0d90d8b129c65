pub mod controller;
pub mod error;
pub mod repository;

pub use controller::{TimeReport, TrackingController};
pub use error::{TrackingError, TrackingResult};
pub use repository::{StoreError, TrackingRepository};
