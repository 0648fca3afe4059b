use std::path::{Path, PathBuf};

use {
    anyhow::{Context, bail},
    directories::ProjectDirs,
    tracing::{debug, info, warn},
};

use crate::schema::TokenRelayConfig;

const CONFIG_STEM: &str = "tokenrelay";
const CONFIG_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", CONFIG_STEM)
}

/// Default token file: `<data dir>/tokens.json`, or `./.tokenrelay/tokens.json`
/// when no home directory can be determined.
pub fn default_token_path() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().join("tokens.json"))
        .unwrap_or_else(|| PathBuf::from(".tokenrelay").join("tokens.json"))
}

/// Parse a config file, picking the format from its extension.
pub fn load_config(path: &Path) -> anyhow::Result<TokenRelayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = match ext {
        "toml" => toml::from_str(&raw).context("invalid TOML config")?,
        "yaml" | "yml" => serde_yaml::from_str(&raw).context("invalid YAML config")?,
        "json" => serde_json::from_str(&raw).context("invalid JSON config")?,
        other => bail!("unsupported config format {other:?} ({})", path.display()),
    };
    Ok(config)
}

/// First existing `tokenrelay.{toml,yaml,yml,json}` in `dir`.
pub fn find_config_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{CONFIG_STEM}.{ext}")))
        .find(|p| p.is_file())
}

/// Load the effective configuration.
///
/// An explicit path must exist. Otherwise the working directory is searched,
/// then the user config directory, and built-in defaults are used when neither
/// has a file. Environment overrides are applied last.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<TokenRelayConfig> {
    let found = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::current_dir()
            .ok()
            .and_then(|cwd| find_config_in(&cwd))
            .or_else(|| project_dirs().and_then(|d| find_config_in(d.config_dir()))),
    };

    let mut config = match found {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config(&path)?
        },
        None => {
            debug!("no config file found; using defaults");
            TokenRelayConfig::default()
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Overlay `TOKENRELAY_*` variables onto `config`. `lookup` is normally `std::env::var`.
pub fn apply_env_overrides(config: &mut TokenRelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = var("TOKENRELAY_CLIENT_ID") {
        config.oauth.client_id = v;
    }
    if let Some(v) = var("TOKENRELAY_REDIRECT_URI") {
        config.oauth.redirect_uri = v;
    }
    if let Some(v) = var("TOKENRELAY_BIND") {
        config.server.bind = v;
    }
    if let Some(v) = var("TOKENRELAY_PORT") {
        match v.parse() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %v, error = %e, "ignoring invalid TOKENRELAY_PORT"),
        }
    }
    if let Some(v) = var("TOKENRELAY_TOKEN_PATH") {
        config.storage.token_path = Some(PathBuf::from(v));
    }
    if let Some(v) = var("TOKENRELAY_API_BASE_URL") {
        config.api.base_url = v;
    }
}
