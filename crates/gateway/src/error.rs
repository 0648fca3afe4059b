use {
    axum::{
        Json,
        http::{StatusCode, header},
        response::{IntoResponse, Response},
    },
    serde_json::json,
    tokenrelay_oauth::ErrorKind,
    tracing::{debug, error, warn},
};

pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    OAuth(#[from] tokenrelay_oauth::Error),

    #[error("resource API request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("{0}")]
    BadRequest(String),
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub fn json_message(status: StatusCode, message: impl Into<String>) -> Response {
    let body = json!({ "success": status.is_success(), "message": message.into() });
    (status, Json(body)).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            Self::OAuth(e) => match e.kind() {
                ErrorKind::NotAuthenticated => {
                    debug!("no credential; redirecting to login");
                    found(LOGIN_PATH)
                },
                ErrorKind::AuthenticationExpired => {
                    warn!("credential revoked; redirecting to login");
                    found(LOGIN_PATH)
                },
                ErrorKind::Protocol => {
                    warn!(error = %e, "rejected out-of-order OAuth request");
                    json_message(StatusCode::BAD_REQUEST, e.to_string())
                },
                ErrorKind::Provider => {
                    error!(error = %e, "token endpoint call failed");
                    json_message(StatusCode::BAD_GATEWAY, e.to_string())
                },
            },
            Self::Upstream(e) => {
                error!(error = %e, "resource API call failed");
                json_message(StatusCode::BAD_GATEWAY, format!("resource API request failed: {e}"))
            },
            Self::BadRequest(message) => json_message(StatusCode::BAD_REQUEST, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, tokenrelay_oauth::Error};

    fn status_and_location(err: GatewayError) -> (StatusCode, Option<String>) {
        let resp = err.into_response();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        (resp.status(), location)
    }

    #[test]
    fn test_login_required_redirects() {
        for e in [Error::NotAuthenticated, Error::AuthenticationExpired] {
            let (status, location) = status_and_location(e.into());
            assert_eq!(status, StatusCode::FOUND);
            assert_eq!(location.as_deref(), Some(LOGIN_PATH));
        }
    }

    #[test]
    fn test_protocol_is_bad_request() {
        let (status, _) = status_and_location(Error::MissingVerifier.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_provider_is_bad_gateway() {
        let err = Error::Provider {
            operation: "token refresh",
            status: 503,
            code: None,
            description: None,
        };
        let (status, location) = status_and_location(err.into());
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(location.is_none());
    }

    #[test]
    fn test_bad_request_message() {
        let (status, _) = status_and_location(GatewayError::BadRequest("nope".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
