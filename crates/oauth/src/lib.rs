//! OAuth 2.0 authorization-code + PKCE client with a persisted, self-refreshing
//! token record.
//!
//! [`TokenManager`] is the entry point for callers: it starts logins, exchanges
//! authorization codes, and hands out access tokens, refreshing them through the
//! provider's token endpoint when they expire.

pub mod clock;
pub mod error;
pub mod flow;
pub mod manager;
pub mod pkce;
pub mod refresh;
pub mod storage;
pub mod types;

pub use {
    clock::{Clock, SystemClock},
    error::{Error, ErrorKind, Result},
    flow::OAuthFlow,
    manager::{LoginRequest, TokenManager},
    pkce::VerifierSlot,
    storage::{FileTokenStore, MemoryTokenStore, TokenStore},
    types::{
        OAuthConfig, PkceChallenge, TokenRecord, TokenResponse, serialize_option_secret,
        serialize_secret,
    },
};
