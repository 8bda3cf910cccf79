//! Layered configuration of the `analyze` command: command-line flags over
//! `--set` assignments over the TOML file over built-in defaults.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::build_config;
pub use models::AppConfig;
