use std::fmt;

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The flow was driven out of order (e.g. exchange before login) or misconfigured.
    Protocol,
    /// No credential on file.
    NotAuthenticated,
    /// The provider rejected the stored refresh token; the store has been purged.
    AuthenticationExpired,
    /// Transport failure or any other token-endpoint / resource-API error.
    Provider,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Protocol => "protocol",
            Self::NotAuthenticated => "not_authenticated",
            Self::AuthenticationExpired => "authentication_expired",
            Self::Provider => "provider",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("missing PKCE verifier: no login in progress")]
    MissingVerifier,

    #[error("not authenticated: login required")]
    NotAuthenticated,

    #[error("authentication expired: login required")]
    AuthenticationExpired,

    #[error("{operation} failed with status {status}{}", code_suffix(.code))]
    Provider {
        operation: &'static str,
        status: u16,
        /// The RFC 6749 `error` field, when the body carried one.
        code: Option<String>,
        description: Option<String>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingVerifier | Self::InvalidUrl(_) => ErrorKind::Protocol,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::AuthenticationExpired => ErrorKind::AuthenticationExpired,
            Self::Provider { .. } | Self::Http(_) | Self::InvalidResponse(_) => {
                ErrorKind::Provider
            },
        }
    }

    /// Whether the end user has to go through the login flow again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotAuthenticated | ErrorKind::AuthenticationExpired
        )
    }

    /// The provider answered with `invalid_grant`: the grant itself is no longer usable.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::Provider { code: Some(code), .. } if code == "invalid_grant")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" ({c})"))
        .unwrap_or_default()
}
