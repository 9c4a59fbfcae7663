//! Configuration schema and loading.
//!
//! Config files: `wegate.toml`, `wegate.yaml`, or `wegate.json`,
//! searched in `./` then `~/.config/wegate/`. Missing file means defaults.

pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::GateConfig,
};
