#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for lndlink.
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. The config file (explicit path, or `<config dir>/lndlink/config.toml`)
//! 2. Environment variables (`LNDLINK_*`), fallback only
//! 3. Embedded defaults (`defaults.toml` compiled into the binary)
//!
//! This crate does not depend on `lndlink`. Conversion into its bootstrap
//! configuration happens in `lndlink` behind the `config` feature.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a config file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }
}
