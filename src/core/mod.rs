// Infrastructure shared by chains and groups

pub mod config;
pub mod errors;
pub mod telemetry;

pub use config::KernelConfig;
pub use errors::{Result, TandemError};
pub use telemetry::init_tracing;
