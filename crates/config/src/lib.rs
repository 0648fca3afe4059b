//! Configuration schema and loading: file discovery (TOML, YAML, JSON) and
//! `TOKENRELAY_*` environment overrides.

pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, default_token_path, discover_and_load, find_config_in, load_config},
    schema::{ApiConfig, OAuthSection, ServerConfig, StorageConfig, TokenRelayConfig},
};
