//! HTTP surface: login/callback/status/logout routes and a bearer-token proxy
//! to the resource API.

pub mod error;
pub mod proxy;
pub mod routes;
pub mod server;
pub mod state;

pub use {
    error::GatewayError,
    server::{serve, start_gateway},
    state::{GatewayState, build_token_manager, http_client},
};
