pub mod config;
pub mod errors;
pub mod kernel;
pub mod metrics;
pub mod retry;
pub mod traits;
pub mod types;
pub mod websocket;
