use {
    axum::{
        Json, Router,
        extract::{Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{any, get, post},
    },
    serde::Deserialize,
    serde_json::{Value, json},
    tower_http::trace::TraceLayer,
    tracing::{info, warn},
};

use crate::{
    error::{GatewayError, found, json_message},
    proxy,
    state::GatewayState,
};

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/status", get(status))
        .route("/auth/logout", post(logout))
        .route("/api/{*path}", any(proxy::forward))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "tokenrelay is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn login(State(state): State<GatewayState>) -> Response {
    let login = state.tokens.authorization_url();
    found(&login.url)
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

async fn callback(
    State(state): State<GatewayState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, GatewayError> {
    if let Some(error) = params.error {
        warn!(%error, "provider denied authorization");
        return Err(GatewayError::BadRequest(format!(
            "authorization failed: {error}"
        )));
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| GatewayError::BadRequest("missing authorization code".into()))?;

    state.tokens.exchange_code_for_tokens(&code).await?;
    info!("login completed");
    Ok(json_message(StatusCode::OK, "authentication successful"))
}

async fn status(State(state): State<GatewayState>) -> Json<Value> {
    let authenticated = state.tokens.is_authenticated();
    let message = if authenticated {
        "authenticated"
    } else {
        "not authenticated"
    };
    Json(json!({ "authenticated": authenticated, "message": message }))
}

async fn logout(State(state): State<GatewayState>) -> Response {
    state.tokens.logout();
    json_message(StatusCode::OK, "logged out")
}

async fn not_found() -> impl IntoResponse {
    json_message(StatusCode::NOT_FOUND, "Route not found")
}
