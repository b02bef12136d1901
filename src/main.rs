use anyhow::Context;
use governance_qna::api::{create_router, AppState};
use governance_qna::infrastructure::{
    AppConfig, ChatLlm, ClientRole, ModelClient, TextEmbedding,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load().context("failed to load configuration")?;

    let llm_client = Arc::new(
        ModelClient::from_env(config.config.llm.provider, ClientRole::Chat)
            .context("failed to create LLM client")?,
    );
    let embedding_client = Arc::new(
        ModelClient::from_env(config.config.embedding.provider, ClientRole::Embedding)
            .context("failed to create embedding client")?,
    );

    let llm = Arc::new(ChatLlm::from_config(llm_client, &config.config.llm));
    let embedding = Arc::new(TextEmbedding::from_config(
        embedding_client,
        &config.config.embedding,
    ));
    info!(
        llm_provider = ?config.config.llm.provider,
        embedding_provider = ?config.config.embedding.provider,
        llm_model = %config.config.llm.model,
        embedding_model = %config.config.embedding.model,
        "model clients initialized"
    );

    let addr = SocketAddr::new(
        config.config.server.host.parse()?,
        config.config.server.port,
    );

    let state = AppState::new(config, llm, embedding)?;
    let app = create_router(state);

    info!("QnA API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "qna_api=debug,governance_qna=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
