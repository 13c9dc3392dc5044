pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod trigger;

// Layered boundaries: use cases behind ports, adapters for storage/notification
pub mod app;
pub mod infra;
