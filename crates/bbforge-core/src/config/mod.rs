//! Configuration loaded from bbforge.toml
//!
//! Lookup order: `--config <path>`, `./bbforge.toml`, then
//! `<config_dir>/bbforge/bbforge.toml`. No file means built-in defaults.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_bbforge_toml, parse_bbforge_toml_str};
pub use paths::expand_home;
pub use schema::{BbforgeConfig, DownloadConfig, NetworkConfig, RecipesConfig, UpstreamConfig};
pub use store::ConfigStore;
