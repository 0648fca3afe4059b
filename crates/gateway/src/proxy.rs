use {
    axum::{
        body::Bytes,
        extract::{Path, RawQuery, State},
        http::{HeaderMap, Method, header},
        response::{IntoResponse, Response},
    },
    secrecy::ExposeSecret,
    tracing::debug,
};

use crate::{error::GatewayError, state::GatewayState};

/// Forward one call to the resource API with the current bearer token.
///
/// Method, query string, body and `content-type` go upstream; status,
/// `content-type` and body come back. A single attempt, no retry on 401.
pub async fn forward(
    State(state): State<GatewayState>,
    Path(path): Path<String>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let url = state.api_url(&path, query.as_deref())?;
    let token = state.tokens.get_access_token().await?;

    let mut request = state
        .http
        .request(method.clone(), url.clone())
        .bearer_auth(token.expose_secret());
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type.clone());
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = request.send().await?;
    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = upstream.bytes().await?;
    debug!(%method, %url, status = status.as_u16(), len = bytes.len(), "proxied resource call");

    let mut response = (status, bytes).into_response();
    let headers = response.headers_mut();
    headers.remove(header::CONTENT_TYPE);
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}
