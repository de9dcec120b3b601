// Presentation layer - HTTP API for the dashboard client
pub mod app_state;
pub mod events;
pub mod handlers;
