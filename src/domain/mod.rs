// Domain layer - feed model, window resolution and alarm lifecycle
pub mod alarm;
pub mod feed;
pub mod monitor;
pub mod table;
pub mod window;
