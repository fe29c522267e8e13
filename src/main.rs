//! SmartGrowth AI backend server.
//!
//! Reads configuration from the environment (and `.env` when present), then serves
//! the chat and dashboard API until interrupted.

use anyhow::Context;
use smartgrowth::accounts::{AccountStore, InMemoryAccountStore};
use smartgrowth::chat_gateway::ChatGateway;
use smartgrowth::config::GatewayConfig;
use smartgrowth::llm::ProviderKind;
use smartgrowth::server::{self, AppState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GatewayConfig::from_env().context("failed to read configuration")?;

    let mut chat = ChatGateway::from_config(&config)?;
    for kind in ProviderKind::ALL {
        if chat.is_configured(kind) {
            info!(provider = %kind, "Provider enabled");
        } else {
            warn!(provider = %kind, "Provider disabled: no API key");
        }
    }

    let mut state_accounts: Option<Arc<dyn AccountStore>> = None;
    if let Some(path) = &config.data_file {
        let store: Arc<dyn AccountStore> = Arc::new(
            InMemoryAccountStore::from_json_file(path)
                .await
                .with_context(|| format!("failed to load accounts from {}", path.display()))?,
        );
        chat = chat.with_account_store(store.clone());
        state_accounts = Some(store);
    }

    let mut state = AppState::new(chat);
    if let Some(store) = state_accounts {
        state = state.with_accounts(store);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "SmartGrowth server listening");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
