//! HTTP surface: the chat endpoint plus the dashboard, tier catalogue and health routes.

use crate::accounts::{AccountRecord, AccountStore};
use crate::chat_gateway::{ChatGateway, ChatRequest};
use crate::dashboard::{self, DashboardData};
use crate::error::{GatewayError, Result};
use crate::llm::provider::ProviderKind;
use crate::tiers::Tier;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::StreamExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

pub const PROVIDER_HEADER: &str = "x-smartgrowth-provider";
pub const TIER_HEADER: &str = "x-smartgrowth-tier";

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatGateway>,
    pub accounts: Option<Arc<dyn AccountStore>>,
}

impl AppState {
    pub fn new(chat: ChatGateway) -> Self {
        Self {
            chat: Arc::new(chat),
            accounts: None,
        }
    }

    pub fn with_accounts(mut self, accounts: Arc<dyn AccountStore>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    async fn account_records(&self) -> Result<Vec<AccountRecord>> {
        match &self.accounts {
            Some(store) => store.list_accounts().await,
            None => Ok(Vec::new()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/tiers", get(tiers))
        .route("/api/health", get(health))
        .route("/api/dashboard", get(dashboard_view))
        .route("/api/dashboard/export.json", get(export_json))
        .route("/api/dashboard/export.csv", get(export_csv))
        .with_state(state)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", request_id = %request_id);

    async move {
        let request = match ChatRequest::from_json(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejected chat request");
                return e.into_response();
            }
        };
        info!(message_count = request.messages.len(), "Chat request received");

        let reply = match state.chat.dispatch(request).await {
            Ok(reply) => reply,
            Err(e) => return e.into_response(),
        };

        let provider = reply.provider;
        let mut upstream = reply.stream;
        let body = async_stream::stream! {
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => yield Ok::<_, Infallible>(chunk),
                    Err(e) => {
                        // status is already sent; end the body early
                        warn!(provider = %provider, error = %e, "Upstream stream ended with error");
                        break;
                    }
                }
            }
        };

        let mut response = Response::new(Body::from_stream(body));
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PROVIDER_HEADER, HeaderValue::from_static(reply.provider.as_str()));
        headers.insert(TIER_HEADER, HeaderValue::from_static(reply.tier.as_str()));
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert("x-request-id", value);
        }
        response
    }
    .instrument(span)
    .await
}

#[derive(Debug, Serialize)]
struct TierInfo {
    tier: Tier,
    features: &'static [&'static str],
}

async fn tiers() -> Json<Vec<TierInfo>> {
    Json(
        Tier::ALL
            .iter()
            .map(|&tier| TierInfo {
                tier,
                features: tier.features(),
            })
            .collect(),
    )
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    providers: BTreeMap<ProviderKind, bool>,
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let providers = ProviderKind::ALL
        .iter()
        .map(|&kind| (kind, state.chat.is_configured(kind)))
        .collect();

    Json(HealthReport {
        status: "ok",
        providers,
    })
}

async fn load_dashboard(state: &AppState) -> Result<DashboardData> {
    let records = state.account_records().await?;
    Ok(dashboard::build_dashboard(&records, chrono::Utc::now()))
}

async fn dashboard_view(State(state): State<AppState>) -> Result<Json<DashboardData>> {
    Ok(Json(load_dashboard(&state).await?))
}

async fn export_json(State(state): State<AppState>) -> Result<Response> {
    let data = load_dashboard(&state).await?;
    let body = serde_json::to_string_pretty(&data)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"dashboard-data.json\""),
        ],
        body,
    )
        .into_response())
}

async fn export_csv(State(state): State<AppState>) -> Result<Response> {
    let records = state.account_records().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"dashboard-data.csv\""),
        ],
        dashboard::users_csv(&records)?,
    )
        .into_response())
}
