//! SDK Request/Response Types
//!
//! Mirrors the JSON-RPC types from the api-rpc crate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerKind {
    Registered,
    WalkIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Customer {
    pub id: String,
    pub display_name: String,
    pub contact_email: String,
    pub kind: CustomerKind,
    pub created_at: i64,
}

/// One slot in a provider's line
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Occupant {
    pub customer_id: String,
    pub display_name: String,
    pub contact_email: String,
    pub kind: CustomerKind,
    /// 1-based
    pub position: usize,
    pub joined_at: i64,
}

/// Resolved queue of one provider at a given revision
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueSnapshot {
    pub provider_id: String,
    pub revision: u64,
    pub is_open: bool,
    pub queue: Vec<Occupant>,
}

impl QueueSnapshot {
    pub fn customer_ids(&self) -> Vec<&str> {
        self.queue.iter().map(|o| o.customer_id.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub opening_hour: Option<String>,
    pub is_open: bool,
    pub revision: u64,
    pub created_at: i64,
}

/// Provider profile with its current queue
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderView {
    #[serde(flatten)]
    pub provider: Provider,
    pub queue: Vec<Occupant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListProvidersResponse {
    pub providers: Vec<ProviderView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateProviderRequest {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hour: Option<String>,
}

/// Partial profile update; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hour: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderResponse {
    pub provider: Provider,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalkInResponse {
    pub customer: Customer,
    #[serde(flatten)]
    pub snapshot: QueueSnapshot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerResponse {
    pub customer: Customer,
}

/// Where a customer currently holds a slot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Membership {
    pub provider_id: String,
    pub provider_name: String,
    pub position: usize,
}

/// `in_queue` plus, when queued, where
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentQueueResponse {
    pub in_queue: bool,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub position: Option<usize>,
}

impl CurrentQueueResponse {
    /// The slot as one value; `None` when not queued or the reply is partial
    pub fn membership(&self) -> Option<Membership> {
        if !self.in_queue {
            return None;
        }
        Some(Membership {
            provider_id: self.provider_id.clone()?,
            provider_name: self.provider_name.clone()?,
            position: self.position?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyResponse {
    pub provider_id: String,
    pub watchers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    pub providers: i64,
    pub open_providers: i64,
    pub customers: i64,
    pub queued: i64,
    pub walk_ins: i64,
    pub rooms: usize,
    pub watchers: usize,
    pub reset_at: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetResponse {
    pub providers_reset: usize,
    pub entries_cleared: u64,
    pub walk_ins_deleted: u64,
}
