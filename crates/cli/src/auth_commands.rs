use {
    anyhow::Result,
    clap::Subcommand,
    secrecy::ExposeSecret,
    tokenrelay_config::TokenRelayConfig,
    tokenrelay_gateway::{build_token_manager, http_client},
    tokenrelay_oauth::{Clock, SystemClock, TokenManager},
};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Show whether a credential is stored and when its access token expires.
    Status,
    /// Print a valid access token, refreshing it if needed.
    Token,
    /// Delete the stored credential.
    Logout,
}

pub async fn handle_auth(action: AuthAction, config: &TokenRelayConfig) -> Result<()> {
    let manager = build_token_manager(config, http_client(config)?)?;
    match action {
        AuthAction::Status => status(&manager, config),
        AuthAction::Token => token(&manager).await,
        AuthAction::Logout => logout(&manager),
    }
}

fn status(manager: &TokenManager, config: &TokenRelayConfig) -> Result<()> {
    println!("{}", status_report(manager, config, SystemClock.now_ms()));
    Ok(())
}

fn status_report(manager: &TokenManager, config: &TokenRelayConfig, now_ms: u64) -> String {
    if !manager.is_authenticated() {
        return format!(
            "Not authenticated.\nRun `tokenrelay gateway` and open http://{}:{}/auth/login",
            config.server.bind, config.server.port
        );
    }
    let expires_at = manager.store().load().and_then(|r| r.expires_at);
    format!(
        "Authenticated [access token {}]",
        describe_expiry(expires_at, now_ms)
    )
}

async fn token(manager: &TokenManager) -> Result<()> {
    let token = manager.get_access_token().await?;
    println!("{}", token.expose_secret());
    Ok(())
}

fn logout(manager: &TokenManager) -> Result<()> {
    manager.logout();
    println!("Logged out.");
    Ok(())
}

fn describe_expiry(expires_at: Option<u64>, now_ms: u64) -> String {
    match expires_at {
        Some(at) if at > now_ms => {
            let remaining = (at - now_ms) / 1000;
            let hours = remaining / 3600;
            let mins = (remaining % 3600) / 60;
            let when = chrono::DateTime::from_timestamp_millis(i64::try_from(at).unwrap_or(i64::MAX))
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| at.to_string());
            format!("valid ({hours}h {mins}m remaining, until {when})")
        },
        Some(_) => "expired (refreshed on next use)".to_string(),
        None => "expiry unknown (refreshed on next use)".to_string(),
    }
}
