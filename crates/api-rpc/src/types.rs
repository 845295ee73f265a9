//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use salonq_core::domain::{Customer, Membership, Provider, ProviderPatch, ProviderView, QueueSnapshot};
use serde::{Deserialize, Serialize};

/// providers.list.v1 (no parameters)
#[derive(Debug, Clone, Serialize)]
pub struct ListProvidersResponse {
    pub providers: Vec<ProviderView>,
}

/// providers.get.v1, queue.get.v1, queue.walkin.v1, queue.subscribe.v1
#[derive(Debug, Deserialize)]
pub struct ProviderRequest {
    pub provider_id: String,
}

/// queue.notify.v1
#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub provider_id: String,
    /// Free-form reason from the caller, logged only
    #[serde(default)]
    pub hint: Option<String>,
}

/// providers.create.v1
#[derive(Debug, Deserialize)]
pub struct CreateProviderRequest {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub opening_hour: Option<String>,
}

/// providers.update.v1
#[derive(Debug, Deserialize)]
pub struct UpdateProviderRequest {
    pub provider_id: String,
    #[serde(flatten)]
    pub patch: ProviderPatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub provider: Provider,
}

/// providers.open_status.v1
#[derive(Debug, Deserialize)]
pub struct OpenStatusRequest {
    pub provider_id: String,
    pub is_open: bool,
}

/// queue.join.v1, queue.leave.v1, queue.advance.v1
#[derive(Debug, Deserialize)]
pub struct QueueMemberRequest {
    pub provider_id: String,
    pub customer_id: String,
}

/// Result of every queue read and mutation
#[derive(Debug, Clone, Serialize)]
pub struct QueueResponse {
    #[serde(flatten)]
    pub snapshot: QueueSnapshot,
}

/// queue.walkin.v1
#[derive(Debug, Clone, Serialize)]
pub struct WalkInResponse {
    pub customer: Customer,
    #[serde(flatten)]
    pub snapshot: QueueSnapshot,
}

/// customers.register.v1
#[derive(Debug, Deserialize)]
pub struct RegisterCustomerRequest {
    pub display_name: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerResponse {
    pub customer: Customer,
}

/// customers.current_queue.v1
#[derive(Debug, Deserialize)]
pub struct CurrentQueueRequest {
    pub customer_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentQueueResponse {
    pub in_queue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl From<Option<Membership>> for CurrentQueueResponse {
    fn from(membership: Option<Membership>) -> Self {
        match membership {
            Some(m) => Self {
                in_queue: true,
                provider_id: Some(m.provider_id),
                provider_name: Some(m.provider_name),
                position: Some(m.position),
            },
            None => Self {
                in_queue: false,
                provider_id: None,
                provider_name: None,
                position: None,
            },
        }
    }
}

/// queue.notify.v1
#[derive(Debug, Clone, Serialize)]
pub struct NotifyResponse {
    pub provider_id: String,
    pub watchers: usize,
}

/// admin.stats.v1 (no parameters)
#[derive(Debug, Clone, Serialize)]
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

/// admin.reset.v1 (no parameters)
#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub providers_reset: usize,
    pub entries_cleared: u64,
    pub walk_ins_deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_current_queue_response_shape() {
        let queued = CurrentQueueResponse::from(Some(Membership {
            provider_id: "p1".to_string(),
            provider_name: "Fade Room".to_string(),
            position: 2,
        }));
        assert_eq!(
            serde_json::to_value(&queued).unwrap(),
            json!({"in_queue": true, "provider_id": "p1", "provider_name": "Fade Room", "position": 2})
        );

        let idle = CurrentQueueResponse::from(None);
        assert_eq!(serde_json::to_value(&idle).unwrap(), json!({"in_queue": false}));
    }

    #[test]
    fn test_notify_hint_is_optional() {
        let bare: NotifyRequest = serde_json::from_value(json!({"provider_id": "p1"})).unwrap();
        assert!(bare.hint.is_none());

        let hinted: NotifyRequest =
            serde_json::from_value(json!({"provider_id": "p1", "hint": "display reconnected"})).unwrap();
        assert_eq!(hinted.hint.as_deref(), Some("display reconnected"));
    }
}
