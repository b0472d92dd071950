//! Commonly used types.
//!
//! ```rust,no_run
//! use lndlink_telemetry::prelude::*;
//!
//! # fn main() -> TelemetryResult<()> {
//! setup_logging(&LogConfig::new("debug").with_format(LogFormat::Json))?;
//! # Ok(())
//! # }
//! ```

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging configuration
pub use crate::{LogConfig, LogFormat, LogTarget};

// Setup functions
pub use crate::{setup_default_logging, setup_logging};
