//! Smith Backend
//!
//! HTTP server streaming LLM chat and agent responses over Server-Sent
//! Events, with per-session cancellation of in-flight requests.

use smith_backend::{
    agent::{ReactAgent, RelatedQuestions, WebSearch},
    api,
    config::Config,
    providers::{build_http_client, ProviderRouter},
    state::AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    // Load configuration; missing credentials are fatal
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config);

    let client = build_http_client()?;
    let providers = Arc::new(ProviderRouter::from_credentials(
        &config.credentials,
        client.clone(),
    ));

    let mut agent = ReactAgent::new(providers.clone(), config.agent.max_steps);
    match &config.credentials.tavily {
        Some(key) => {
            agent = agent.with_tool(Arc::new(WebSearch::new(
                client,
                key.clone(),
                config.agent.max_search_results,
            )));
        }
        None => warn!("TAVILY_API_KEY not set; agent runs without web search"),
    }

    let related = RelatedQuestions::new(providers.clone(), config.agent.related_questions_count);

    let app_state = AppState::new(providers, Arc::new(agent), Arc::new(related))
        .with_models(config.models.clone())
        .with_poll_interval(config.agent.poll_interval());

    if let Some(ttl) = config.sessions.idle_ttl() {
        info!(ttl_secs = ttl.as_secs(), "Session idle eviction enabled");
        app_state.sessions.spawn_idle_sweeper(ttl);
    }

    let app = api::router(app_state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(api::cors_layer(&config.server.allow_origin)?);

    // Bind to address from config
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
