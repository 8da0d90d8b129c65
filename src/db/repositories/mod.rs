pub mod tasks;
pub mod tracks;
pub mod users;
