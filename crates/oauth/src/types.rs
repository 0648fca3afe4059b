use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize, Serializer},
};

/// OAuth 2.0 provider configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

/// The persisted credential for the single authenticated identity.
///
/// `refresh_token` is the sole authority for "authenticated". `access_token` is
/// only served while `expires_at` (epoch milliseconds) lies in the future.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(serialize_with = "serialize_secret")]
    pub refresh_token: Secret<String>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<Secret<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl TokenRecord {
    /// Build a record from a token-endpoint response received at `now_ms`.
    pub fn from_response(
        refresh_token: Secret<String>,
        response: &TokenResponse,
        now_ms: u64,
    ) -> Self {
        Self {
            refresh_token,
            access_token: Some(Secret::new(response.access_token.clone())),
            expires_at: response.expires_at(now_ms),
        }
    }

    /// The cached access token, if `now_ms` is strictly before its expiry.
    pub fn usable_access_token(&self, now_ms: u64) -> Option<&Secret<String>> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if now_ms < expires_at => Some(token),
            _ => None,
        }
    }
}

/// Successful token-endpoint response (RFC 6749 §5.1).
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Absolute expiry in epoch milliseconds, `None` when the provider sent no lifetime.
    pub fn expires_at(&self, now_ms: u64) -> Option<u64> {
        self.expires_in
            .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000)))
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// RFC 6749 §5.2 error body returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// PKCE challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: Secret<String>,
    pub challenge: String,
}

pub fn serialize_secret<S: Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

pub fn serialize_option_secret<S: Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
