//! Account records and the store the chat gateway consults for tier lookups.

use crate::error::{GatewayError, Result};
use crate::tiers::Tier;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// One account with its plan and usage counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub total_actions: u64,
    #[serde(default)]
    pub successful_actions: u64,
    #[serde(default)]
    pub failed_actions: u64,
    #[serde(default)]
    pub avg_latency_ms: Option<f64>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

impl AccountRecord {
    pub fn new(id: impl Into<String>, email: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            plan: plan.into(),
            total_actions: 0,
            successful_actions: 0,
            failed_actions: 0,
            avg_latency_ms: None,
            last_activity: None,
        }
    }

    pub fn tier(&self) -> Tier {
        Tier::resolve(Some(&self.plan))
    }
}

/// Read access to stored accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, id: &str) -> Result<Option<AccountRecord>>;

    async fn list_accounts(&self) -> Result<Vec<AccountRecord>>;
}

#[derive(Debug, Deserialize)]
struct AccountsFile {
    accounts: Vec<AccountRecord>,
}

/// Read-only store holding every account in memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    records: Vec<AccountRecord>,
    index: HashMap<String, usize>,
}

impl InMemoryAccountStore {
    pub fn new(records: Vec<AccountRecord>) -> Self {
        let index = records.iter().enumerate().map(|(i, r)| (r.id.clone(), i)).collect();
        Self { records, index }
    }

    /// Parse a `{"accounts": [...]}` document.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: AccountsFile = serde_json::from_str(json)?;
        Ok(Self::new(file.accounts))
    }

    /// Load accounts from a JSON file on disk.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            GatewayError::StoreError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let store = Self::from_json(&json)?;
        info!(path = %path.display(), accounts = store.len(), "Loaded account store");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_account(&self, id: &str) -> Result<Option<AccountRecord>> {
        Ok(self.index.get(id).map(|&i| self.records[i].clone()))
    }

    async fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        Ok(self.records.clone())
    }
}
