// Infrastructure layer - External dependencies and adapters
pub mod announcer;
pub mod clock;
pub mod config;
pub mod csv_feed;
