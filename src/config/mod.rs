//! Configuration loading and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{ensure_valid, load_from_path, load_or_default};
pub use model::{AppConfig, LogFormat};

use crate::mkv::ParseOptions;

impl AppConfig {
    /// Options for parsing a command line under this configuration.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            check_executable: self.check_executable,
            output_prefix: self.output_prefix.clone(),
            ..ParseOptions::default()
        }
    }
}
