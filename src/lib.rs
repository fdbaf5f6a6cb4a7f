// Shared infrastructure
pub mod core;

// Chain and group coordinators
pub mod kernel;

// Re-exports for convenience
pub use crate::core::errors::{Result, TandemError};
pub use crate::core::{init_tracing, KernelConfig};
pub use kernel::*;
