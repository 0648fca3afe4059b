use std::sync::Arc;

use {
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info, warn},
};

use crate::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
    flow::OAuthFlow,
    pkce::{self, VerifierSlot},
    refresh::{self, TokenState, Transition},
    storage::TokenStore,
    types::TokenRecord,
};

/// A login ready to be sent to the browser.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    /// Authorization endpoint URL carrying the PKCE challenge.
    pub url: String,
    pub challenge: String,
}

/// Owns the token lifecycle for the one authenticated identity of this deployment.
///
/// Constructed once at startup and shared (`Arc<TokenManager>`) with whatever
/// needs a bearer token. There is no lock around check-then-refresh: two callers
/// that both see an expired token both refresh, and the later save wins.
pub struct TokenManager {
    flow: OAuthFlow,
    store: Arc<dyn TokenStore>,
    verifier: VerifierSlot,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    pub fn new(flow: OAuthFlow, store: Arc<dyn TokenStore>) -> Self {
        Self {
            flow,
            store,
            verifier: VerifierSlot::new(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    /// Fresh verifier for a new login; replaces the verifier of any earlier attempt.
    pub fn generate_verifier(&self) -> String {
        let verifier = pkce::generate_verifier();
        self.verifier.store(Secret::new(verifier.clone()));
        verifier
    }

    pub fn generate_challenge(verifier: &str) -> String {
        pkce::generate_challenge(verifier)
    }

    /// Generate verifier and challenge and build the authorization URL.
    pub fn authorization_url(&self) -> LoginRequest {
        let verifier = self.generate_verifier();
        let challenge = Self::generate_challenge(&verifier);
        debug!("starting PKCE login");
        LoginRequest {
            url: self.flow.authorization_url(&challenge),
            challenge,
        }
    }

    /// Trade an authorization code for tokens and persist them.
    ///
    /// Errors from the token endpoint are returned as-is. The code is single-use,
    /// so a failed exchange is never retried.
    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<Secret<String>> {
        let verifier = self.verifier.current().ok_or(Error::MissingVerifier)?;
        let response = self.flow.exchange(code, verifier.expose_secret()).await?;

        let refresh_token = response
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| Secret::new(t.to_string()))
            .ok_or_else(|| {
                Error::InvalidResponse("token exchange: response has no refresh_token".into())
            })?;

        let record = TokenRecord::from_response(refresh_token, &response, self.clock.now_ms());
        self.store.save(&record);
        info!(expires_at = ?record.expires_at, "authorization code exchanged");

        Ok(Secret::new(response.access_token))
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// A currently valid access token, refreshing it through the provider when expired.
    pub async fn get_access_token(&self) -> Result<Secret<String>> {
        let record = self
            .store
            .load()
            .filter(|r| !r.refresh_token.expose_secret().is_empty());
        let Some(record) = record else {
            debug!("no credential on file");
            return Err(Error::NotAuthenticated);
        };

        if let TokenState::Valid(token) = refresh::token_state(&record, self.clock.now_ms()) {
            debug!(expires_at = ?record.expires_at, "using cached access token");
            return Ok(token);
        }

        debug!(expires_at = ?record.expires_at, "access token expired; refreshing");
        let outcome = self
            .flow
            .refresh(record.refresh_token.expose_secret())
            .await;

        match refresh::transition(&record, outcome, self.clock.now_ms()) {
            Transition::Refreshed(next) => {
                self.store.save(&next);
                info!(expires_at = ?next.expires_at, "access token refreshed");
                next.access_token.ok_or_else(|| {
                    Error::InvalidResponse("token refresh: no access_token".into())
                })
            },
            Transition::Revoked => {
                warn!("refresh token rejected by provider; clearing stored credential");
                self.store.clear();
                Err(Error::AuthenticationExpired)
            },
            Transition::Failed(e) => {
                warn!(error = %e, "access token refresh failed");
                Err(e)
            },
        }
    }

    /// Forget the stored credential.
    pub fn logout(&self) {
        self.store.clear();
        info!("logged out");
    }
}
