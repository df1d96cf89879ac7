pub mod config;
pub mod error;
pub mod runner;
pub mod tracing_init;
