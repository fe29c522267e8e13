//! Dashboard aggregates and table exports built from account records.

use crate::accounts::AccountRecord;
use crate::error::{GatewayError, Result};
use crate::tiers::Tier;
use chrono::{DateTime, Duration, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of users listed in `activeUsers`.
pub const ACTIVE_USER_LIMIT: usize = 5;

/// Users idle for longer than this are flagged as churn risks.
pub const CHURN_INACTIVITY_DAYS: i64 = 14;

/// Users whose failed share of actions exceeds this are flagged as churn risks.
pub const CHURN_FAILURE_RATIO: f64 = 0.5;

const CSV_COLUMNS: [&str; 7] = [
    "email",
    "plan",
    "total_actions",
    "successful_actions",
    "failed_actions",
    "avg_latency_ms",
    "last_activity",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub users: Vec<AccountRecord>,
    pub plan_distribution: BTreeMap<Tier, usize>,
    pub active_users: Vec<AccountRecord>,
    pub churn_risk: Vec<AccountRecord>,
}

/// Aggregate the dashboard view as of `now`.
pub fn build_dashboard(records: &[AccountRecord], now: DateTime<Utc>) -> DashboardData {
    let mut plan_distribution: BTreeMap<Tier, usize> = Tier::ALL.iter().map(|t| (*t, 0)).collect();
    for record in records {
        *plan_distribution.entry(record.tier()).or_default() += 1;
    }

    let mut active_users: Vec<AccountRecord> =
        records.iter().filter(|r| r.total_actions > 0).cloned().collect();
    // stable sort keeps file order among ties
    active_users.sort_by(|a, b| b.total_actions.cmp(&a.total_actions));
    active_users.truncate(ACTIVE_USER_LIMIT);

    let churn_risk = records.iter().filter(|r| is_churn_risk(r, now)).cloned().collect();

    DashboardData {
        users: records.to_vec(),
        plan_distribution,
        active_users,
        churn_risk,
    }
}

fn is_churn_risk(record: &AccountRecord, now: DateTime<Utc>) -> bool {
    let inactive = match record.last_activity {
        Some(last) => now - last > Duration::days(CHURN_INACTIVITY_DAYS),
        None => true,
    };

    let failing = record.total_actions > 0
        && record.failed_actions as f64 / record.total_actions as f64 > CHURN_FAILURE_RATIO;

    inactive || failing
}

/// Render the users table as CSV with a header row.
pub fn users_csv(records: &[AccountRecord]) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    for r in records {
        writer.write_record([
            r.email.clone(),
            r.plan.clone(),
            r.total_actions.to_string(),
            r.successful_actions.to_string(),
            r.failed_actions.to_string(),
            r.avg_latency_ms.map(|v| v.to_string()).unwrap_or_default(),
            r.last_activity.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| {
        GatewayError::from(csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e,
        )))
    })
}
