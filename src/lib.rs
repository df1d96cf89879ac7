pub mod cli;
pub mod core;
pub mod device;
pub mod models;
pub mod ops;
pub mod protocol;
pub mod reconcile;
pub mod validation;
