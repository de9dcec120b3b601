// Application layer - ports and the monitor use case
pub mod announcer;
pub mod events;
pub mod feed_repository;
pub mod monitor_service;
