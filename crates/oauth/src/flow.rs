use {
    tracing::{debug, warn},
    url::Url,
};

use crate::{
    error::{Error, Result},
    types::{OAuthConfig, OAuthErrorBody, TokenResponse},
};

/// Talks to the provider: builds authorization URLs and calls the token endpoint.
pub struct OAuthFlow {
    config: OAuthConfig,
    auth_url: Url,
    client: reqwest::Client,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, connection reuse).
    pub fn with_http_client(config: OAuthConfig, client: reqwest::Client) -> Result<Self> {
        let auth_url = Url::parse(&config.auth_url)?;
        Url::parse(&config.token_url)?;
        Ok(Self {
            config,
            auth_url,
            client,
        })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Browser redirect target for a login whose PKCE challenge is `challenge`.
    pub fn authorization_url(&self, challenge: &str) -> String {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", challenge);
        url.into()
    }

    /// `authorization_code` grant.
    pub async fn exchange(&self, code: &str, verifier: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier),
        ];
        self.post_token(&params, "token exchange").await
    }

    /// `refresh_token` grant.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        self.post_token(&params, "token refresh").await
    }

    async fn post_token(
        &self,
        params: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<TokenResponse> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(operation, status = status.as_u16(), "token endpoint responded");

        if !status.is_success() {
            let parsed = serde_json::from_str::<OAuthErrorBody>(&body).ok();
            if parsed.is_none() {
                warn!(operation, status = status.as_u16(), "token endpoint error body is not RFC 6749 JSON");
            }
            let (code, description) = parsed
                .map(|e| (Some(e.error), e.error_description))
                .unwrap_or_default();
            return Err(Error::Provider {
                operation,
                status: status.as_u16(),
                code,
                description,
            });
        }

        serde_json::from_str::<TokenResponse>(&body)
            .map_err(|e| Error::InvalidResponse(format!("{operation}: {e}")))
    }
}
