mod connection;
pub mod helpers;
mod migrations;
pub mod repositories;

pub use connection::Database;
pub use repositories::sessions::RECENT_WINDOW_DAYS;
