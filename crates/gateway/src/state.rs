use std::{sync::Arc, time::Duration};

use {
    anyhow::Context,
    tokenrelay_config::{OAuthSection, TokenRelayConfig},
    tokenrelay_oauth::{FileTokenStore, OAuthConfig, OAuthFlow, TokenManager},
    tracing::info,
    url::Url,
};

use crate::error::GatewayError;

/// Shared state behind every route.
#[derive(Clone)]
pub struct GatewayState {
    pub tokens: Arc<TokenManager>,
    /// Client for resource API calls.
    pub http: reqwest::Client,
    pub api_base: Url,
}

impl GatewayState {
    pub fn new(tokens: Arc<TokenManager>, http: reqwest::Client, api_base: Url) -> Self {
        Self {
            tokens,
            http,
            api_base,
        }
    }

    pub fn from_config(config: &TokenRelayConfig) -> anyhow::Result<Self> {
        let http = http_client(config)?;
        let tokens = Arc::new(build_token_manager(config, http.clone())?);
        let api_base = Url::parse(&config.api.base_url)
            .with_context(|| format!("invalid api.base_url {:?}", config.api.base_url))?;
        Ok(Self::new(tokens, http, api_base))
    }

    /// `<api_base>/<path>?<query>`, keeping any path prefix of the base (e.g. `/v1`).
    ///
    /// `path` is the already percent-decoded remainder of the request path. Each
    /// segment is re-encoded on its own, so decoded `/`, `?` or `#` stay inside
    /// their segment. `.` and `..` are refused: the result never leaves the base.
    pub fn api_url(&self, path: &str, query: Option<&str>) -> Result<Url, GatewayError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.iter().any(|s| matches!(*s, "." | "..")) {
            return Err(GatewayError::BadRequest(format!(
                "path escapes the resource API: {path:?}"
            )));
        }

        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::BadRequest("api.base_url cannot carry a path".into())
            })?
            .pop_if_empty()
            .extend(segments);
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }
}

pub fn http_client(config: &TokenRelayConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .user_agent(concat!("tokenrelay/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

pub fn oauth_config(section: &OAuthSection) -> OAuthConfig {
    OAuthConfig {
        client_id: section.client_id.clone(),
        auth_url: section.auth_url.clone(),
        token_url: section.token_url.clone(),
        redirect_uri: section.redirect_uri.clone(),
        scopes: section.scopes.clone(),
    }
}

/// Token manager backed by the configured token file.
pub fn build_token_manager(
    config: &TokenRelayConfig,
    http: reqwest::Client,
) -> anyhow::Result<TokenManager> {
    let flow = OAuthFlow::with_http_client(oauth_config(&config.oauth), http)
        .context("invalid OAuth endpoint configuration")?;
    let token_path = config.storage.resolved_token_path();
    info!(path = %token_path.display(), "using token file");
    Ok(TokenManager::new(
        flow,
        Arc::new(FileTokenStore::new(token_path)),
    ))
}

#[cfg(test)]
mod tests {
    use {super::*, tokenrelay_oauth::MemoryTokenStore};

    fn state(base: &str) -> GatewayState {
        let mut cfg = TokenRelayConfig::default();
        cfg.oauth.client_id = "c".into();
        let flow = OAuthFlow::new(oauth_config(&cfg.oauth)).unwrap();
        let tokens = Arc::new(TokenManager::new(flow, Arc::new(MemoryTokenStore::new())));
        GatewayState::new(tokens, reqwest::Client::new(), Url::parse(base).unwrap())
    }

    fn url(s: &GatewayState, path: &str, query: Option<&str>) -> String {
        s.api_url(path, query).unwrap().to_string()
    }

    #[test]
    fn test_api_url_keeps_base_prefix() {
        let s = state("https://api.spotify.com/v1");
        assert_eq!(
            url(&s, "me/top/tracks", Some("limit=5")),
            "https://api.spotify.com/v1/me/top/tracks?limit=5"
        );
        assert_eq!(
            url(&s, "/me/player/pause", None),
            "https://api.spotify.com/v1/me/player/pause"
        );
        assert_eq!(url(&s, "me", Some("")), "https://api.spotify.com/v1/me");

        let slash = state("https://api.spotify.com/v1/");
        assert_eq!(url(&slash, "me", None), "https://api.spotify.com/v1/me");
    }

    #[test]
    fn test_api_url_refuses_dot_segments() {
        let s = state("https://api.spotify.com/v1");
        for path in ["../admin", "me/../../admin", "./me", ".."] {
            assert!(
                matches!(s.api_url(path, None), Err(GatewayError::BadRequest(_))),
                "{path}"
            );
        }
    }

    #[test]
    fn test_api_url_encodes_decoded_delimiters() {
        let s = state("https://api.spotify.com/v1");
        assert_eq!(
            url(&s, "search?q=x#frag", None),
            "https://api.spotify.com/v1/search%3Fq=x%23frag"
        );
        assert_eq!(
            url(&s, "a b%", None),
            "https://api.spotify.com/v1/a%20b%25"
        );
    }

    #[test]
    fn test_from_config_uses_token_path() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = TokenRelayConfig::default();
        cfg.oauth.client_id = "c".into();
        cfg.storage.token_path = Some(tmp.path().join("tokens.json"));

        let s = GatewayState::from_config(&cfg).unwrap();
        assert!(!s.tokens.is_authenticated());
        assert_eq!(s.api_base.as_str(), "https://api.spotify.com/v1");
    }

    #[test]
    fn test_from_config_rejects_bad_token_url() {
        let mut cfg = TokenRelayConfig::default();
        cfg.oauth.token_url = "nope".into();
        assert!(GatewayState::from_config(&cfg).is_err());
    }
}
