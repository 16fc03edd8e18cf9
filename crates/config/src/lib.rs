//! Run configuration for conftest.
//!
//! A project can keep its defaults in `conftest.toml` (or `.conftest.yaml`,
//! `.conftest.yml`, `.conftest.json`). [`find_config`] walks up from a start
//! directory to the nearest one.

mod config;
mod error;
mod loader;

pub use config::{OpaConfig, RunConfig};
pub use error::{ConfigError, Result};
pub use loader::{find_config, load_config, load_config_from_str, CONFIG_FILES};
