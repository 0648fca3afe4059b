use std::path::PathBuf;

use {
    anyhow::{Context, bail},
    serde::{Deserialize, Serialize},
    url::Url,
};

/// Root configuration for a tokenrelay deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRelayConfig {
    pub server: ServerConfig,
    pub oauth: OAuthSection,
    pub api: ApiConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8888,
        }
    }
}

/// Provider registration. The client is public (PKCE), so there is no secret here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSection {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl Default for OAuthSection {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            auth_url: "https://accounts.spotify.com/authorize".into(),
            token_url: "https://accounts.spotify.com/api/token".into(),
            redirect_uri: "http://127.0.0.1:8888/auth/callback".into(),
            scopes: vec![
                "user-top-read".into(),
                "user-read-playback-state".into(),
                "user-modify-playback-state".into(),
            ],
        }
    }
}

/// The resource API that proxied calls are forwarded to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spotify.com/v1".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Token file location; `None` means the per-user data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(crate::loader::default_token_path)
    }
}

impl TokenRelayConfig {
    /// Check the settings a server cannot start without.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.oauth.client_id.trim().is_empty() {
            bail!("oauth.client_id is not set (config file or TOKENRELAY_CLIENT_ID)");
        }
        for (field, value) in [
            ("oauth.auth_url", &self.oauth.auth_url),
            ("oauth.token_url", &self.oauth.token_url),
            ("oauth.redirect_uri", &self.oauth.redirect_uri),
            ("api.base_url", &self.api.base_url),
        ] {
            Url::parse(value).with_context(|| format!("{field} is not a valid URL: {value:?}"))?;
        }
        if self.api.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}
