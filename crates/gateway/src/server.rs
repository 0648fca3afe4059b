use {
    anyhow::Context,
    tokenrelay_config::TokenRelayConfig,
    tokio::net::TcpListener,
    tracing::{info, warn},
};

use crate::{routes::build_router, state::GatewayState};

/// Validate `config`, bind, and serve until Ctrl-C.
pub async fn start_gateway(config: &TokenRelayConfig) -> anyhow::Result<()> {
    config.validate()?;
    let state = GatewayState::from_config(config)?;

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        addr = %listener.local_addr()?,
        login = %format!("http://{addr}/auth/login"),
        "gateway listening"
    );
    if !state.tokens.is_authenticated() {
        info!("no credential on file; open /auth/login in a browser to authenticate");
    }

    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server error")?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "failed to listen for Ctrl-C; stopping"),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, tokio::sync::oneshot};

    #[tokio::test]
    async fn test_start_gateway_rejects_missing_client_id() {
        let err = start_gateway(&TokenRelayConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("client_id"));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = TokenRelayConfig::default();
        config.oauth.client_id = "c".into();
        config.storage.token_path = Some(tmp.path().join("tokens.json"));
        let state = GatewayState::from_config(&config).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, state, async move {
            let _ = rx.await;
        }));

        let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert_eq!(resp.status(), 200);

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
