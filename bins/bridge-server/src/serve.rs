use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use bridge_engine::Engine;
use bridge_store::ObjectStoreSink;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::ingress;

pub async fn run(config_path: &str) -> Result<(), ServerError> {
    tracing::info!(config = %config_path, "loading configuration");
    let config = ServerConfig::load(config_path)?;

    // Reject bad routing before touching the store.
    let destinations = config.engine.resolve()?;
    let sink = ObjectStoreSink::connect(
        &config.store,
        destinations.iter().map(|d| d.name.as_str()),
    )?;
    let api_listener = bridge_api_server::bind(config.api_port)
        .await
        .map_err(ServerError::Api)?;
    let listener = TcpListener::bind(config.ingress.listen.as_str()).await?;

    let engine = Engine::start(&config.engine, Arc::new(sink))?;
    let token = CancellationToken::new();

    // --- Ingress ---
    tracing::info!(listen = %config.ingress.listen, max_frame = config.ingress.max_frame, "ingress listening");
    let ingress_handle = tokio::spawn(ingress::run(
        listener,
        engine.router().clone(),
        config.ingress.max_frame,
        token.clone(),
    ));

    // --- Metrics API ---
    let mut api_handle = tokio::spawn(bridge_api_server::serve(
        api_listener,
        engine.metrics().clone(),
        token.clone(),
    ));

    tracing::info!(
        run_id = %engine.run_id(),
        destinations = destinations.len(),
        api_port = config.api_port,
        "bridge-server started, press Ctrl+C to stop"
    );

    // A dead metrics server stops the daemon like a signal does, after the
    // same drain.
    let mut api_finished = false;
    let outcome = tokio::select! {
        res = wait_for_signal() => res,
        res = &mut api_handle => {
            api_finished = true;
            Err(api_stopped(res))
        }
    };
    match &outcome {
        Ok(()) => tracing::info!("shutting down..."),
        Err(e) => tracing::error!(error = %e, "shutting down after failure"),
    }

    // Stop reading first so the workers see a closed, finite backlog.
    token.cancel();
    if let Err(e) = ingress_handle.await {
        tracing::error!(error = %e, "ingress task failed");
    }
    engine.shutdown().await;
    if !api_finished {
        match api_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "api server error"),
            Err(e) => tracing::error!(error = %e, "api task failed"),
        }
    }

    tracing::info!("shutdown complete");
    outcome
}

fn api_stopped(res: Result<Result<(), String>, JoinError>) -> ServerError {
    match res {
        Ok(Ok(())) => ServerError::Api("server exited unexpectedly".into()),
        Ok(Err(e)) => ServerError::Api(e),
        Err(e) => ServerError::Api(e.to_string()),
    }
}

async fn wait_for_signal() -> Result<(), ServerError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = sigterm.recv() => tracing::info!("SIGTERM received"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn taken_api_port_stops_startup() {
        let held = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = held.local_addr().unwrap().port();

        let path = std::env::temp_dir().join(format!("bridge-server-{}-api-port.toml", std::process::id()));
        std::fs::write(
            &path,
            format!(
                r##"
                api_port = {port}
                ingress = {{ listen = "127.0.0.1:0" }}
                store = {{ backend = "memory" }}
                policy = {{ kind = "count", threshold = 1 }}
                [[destinations]]
                name = "archive"
                topics = ["#"]
                "##
            ),
        )
        .unwrap();

        let err = run(path.to_str().unwrap()).await.unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, ServerError::Api(_)), "{err}");
    }
}
