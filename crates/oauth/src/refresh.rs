//! Expiry and refresh decisions, kept free of I/O.
//!
//! A stored record is either [`TokenState::Valid`] (serve the cached access
//! token) or [`TokenState::Expired`] (ask the provider for a new one). The
//! provider's answer then resolves into a [`Transition`]: a refreshed record to
//! persist, a revoked credential to purge, or an error to hand back unchanged.

use secrecy::Secret;

use crate::{
    error::{Error, Result},
    types::{TokenRecord, TokenResponse},
};

#[derive(Debug)]
pub enum TokenState {
    Valid(Secret<String>),
    Expired,
}

#[derive(Debug)]
pub enum Transition {
    /// The provider issued a new access token; persist this record.
    Refreshed(TokenRecord),
    /// The provider rejected the refresh token (`invalid_grant`).
    Revoked,
    /// Transport or provider failure that says nothing about the credential.
    Failed(Error),
}

/// Classify `record` at `now_ms`. Strict `now < expires_at`, no skew allowance.
pub fn token_state(record: &TokenRecord, now_ms: u64) -> TokenState {
    match record.usable_access_token(now_ms) {
        Some(token) => TokenState::Valid(token.clone()),
        None => TokenState::Expired,
    }
}

/// Resolve the outcome of a refresh request against the record it was made for.
pub fn transition(
    previous: &TokenRecord,
    outcome: Result<TokenResponse>,
    now_ms: u64,
) -> Transition {
    match outcome {
        Ok(response) => Transition::Refreshed(refreshed_record(previous, &response, now_ms)),
        Err(e) if e.is_invalid_grant() => Transition::Revoked,
        Err(e) => Transition::Failed(e),
    }
}

/// The record after a successful refresh. Providers may skip refresh-token
/// rotation, in which case the previous refresh token stays on file.
pub fn refreshed_record(
    previous: &TokenRecord,
    response: &TokenResponse,
    now_ms: u64,
) -> TokenRecord {
    let refresh_token = match response.refresh_token.as_deref() {
        Some(rotated) if !rotated.is_empty() => Secret::new(rotated.to_string()),
        _ => previous.refresh_token.clone(),
    };
    TokenRecord::from_response(refresh_token, response, now_ms)
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, secrecy::ExposeSecret};

    fn record(access: Option<&str>, expires_at: Option<u64>) -> TokenRecord {
        TokenRecord {
            refresh_token: Secret::new("RT1".into()),
            access_token: access.map(|a| Secret::new(a.into())),
            expires_at,
        }
    }

    fn response(refresh: Option<&str>, expires_in: Option<u64>) -> TokenResponse {
        TokenResponse {
            access_token: "AT2".into(),
            refresh_token: refresh.map(String::from),
            expires_in,
            token_type: Some("Bearer".into()),
            scope: None,
        }
    }

    #[rstest]
    #[case::fresh(Some("AT1"), Some(61_000), 1_000, true)]
    #[case::one_ms_left(Some("AT1"), Some(1_001), 1_000, true)]
    #[case::exactly_at_expiry(Some("AT1"), Some(1_000), 1_000, false)]
    #[case::past(Some("AT1"), Some(500), 1_000, false)]
    #[case::no_expiry(Some("AT1"), None, 1_000, false)]
    #[case::no_access_token(None, Some(61_000), 1_000, false)]
    fn test_token_state(
        #[case] access: Option<&str>,
        #[case] expires_at: Option<u64>,
        #[case] now: u64,
        #[case] valid: bool,
    ) {
        let state = token_state(&record(access, expires_at), now);
        assert_eq!(matches!(state, TokenState::Valid(_)), valid);
        if let TokenState::Valid(token) = state {
            assert_eq!(token.expose_secret(), "AT1");
        }
    }

    #[test]
    fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let next = refreshed_record(
            &record(Some("AT1"), Some(0)),
            &response(None, Some(3600)),
            10_000,
        );
        assert_eq!(next.refresh_token.expose_secret(), "RT1");
        assert_eq!(next.access_token.unwrap().expose_secret(), "AT2");
        assert_eq!(next.expires_at, Some(3_610_000));
    }

    #[test]
    fn test_refresh_keeps_refresh_token_when_rotation_is_empty() {
        let next = refreshed_record(&record(None, None), &response(Some(""), Some(60)), 0);
        assert_eq!(next.refresh_token.expose_secret(), "RT1");
    }

    #[test]
    fn test_refresh_adopts_rotated_refresh_token() {
        let next = refreshed_record(&record(None, None), &response(Some("RT2"), Some(60)), 0);
        assert_eq!(next.refresh_token.expose_secret(), "RT2");
        assert_eq!(next.expires_at, Some(60_000));
    }

    #[test]
    fn test_refresh_without_lifetime_leaves_expiry_unset() {
        let next = refreshed_record(&record(Some("AT1"), Some(5)), &response(None, None), 0);
        assert!(next.expires_at.is_none());
        assert!(matches!(token_state(&next, 0), TokenState::Expired));
    }

    #[test]
    fn test_transition_outcomes() {
        let previous = record(Some("AT1"), Some(0));

        assert!(matches!(
            transition(&previous, Ok(response(None, Some(1))), 0),
            Transition::Refreshed(_)
        ));

        let revoked = Error::Provider {
            operation: "token refresh",
            status: 400,
            code: Some("invalid_grant".into()),
            description: None,
        };
        assert!(matches!(
            transition(&previous, Err(revoked), 0),
            Transition::Revoked
        ));

        let outage = Error::Provider {
            operation: "token refresh",
            status: 503,
            code: None,
            description: None,
        };
        assert!(matches!(
            transition(&previous, Err(outage), 0),
            Transition::Failed(Error::Provider { status: 503, .. })
        ));

        let bad_client = Error::Provider {
            operation: "token refresh",
            status: 401,
            code: Some("invalid_client".into()),
            description: None,
        };
        assert!(matches!(
            transition(&previous, Err(bad_client), 0),
            Transition::Failed(_)
        ));
    }
}
