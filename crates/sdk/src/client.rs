//! SalonQ Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{
    CreateProviderRequest, CurrentQueueResponse, CustomerResponse, ListProvidersResponse,
    NotifyResponse, ProviderPatch, ProviderResponse, ProviderView, QueueSnapshot, ResetResponse,
    StatsResponse, WalkInResponse,
};
use jsonrpsee::core::client::{ClientT, Subscription, SubscriptionClientT};
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

const SUBSCRIBE_METHOD: &str = "queue.subscribe.v1";
const UNSUBSCRIBE_METHOD: &str = "queue.unsubscribe.v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// SalonQ Engine Client
///
/// Request/response methods go over HTTP; [`SalonQClient::watch_queue`]
/// opens a WebSocket to the same endpoint.
///
/// # Example
///
/// ```no_run
/// use salonq_sdk::SalonQClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SalonQClient::connect("http://127.0.0.1:9630").await?;
/// let snapshot = client.join("p1", "c1").await?;
/// println!("{} waiting", snapshot.queue.len());
/// # Ok(())
/// # }
/// ```
pub struct SalonQClient {
    client: HttpClient,
    url: String,
}

impl SalonQClient {
    /// Connect to the SalonQ daemon
    ///
    /// # Arguments
    ///
    /// * `url` - RPC endpoint URL (e.g., `http://127.0.0.1:9630`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(REQUEST_TIMEOUT)
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let response: T = self.client.request(method, named(params)?).await?;
        Ok(response)
    }

    // Providers

    pub async fn list_providers(&self) -> Result<Vec<ProviderView>> {
        let response: ListProvidersResponse = self
            .client
            .request("providers.list.v1", rpc_params![])
            .await?;
        Ok(response.providers)
    }

    pub async fn get_provider(&self, provider_id: &str) -> Result<ProviderView> {
        self.call("providers.get.v1", json!({ "provider_id": provider_id }))
            .await
    }

    pub async fn create_provider(&self, request: CreateProviderRequest) -> Result<ProviderResponse> {
        self.call("providers.create.v1", serde_json::to_value(request)?)
            .await
    }

    pub async fn update_provider(
        &self,
        provider_id: &str,
        patch: ProviderPatch,
    ) -> Result<ProviderResponse> {
        let mut params = serde_json::to_value(patch)?;
        if let Value::Object(fields) = &mut params {
            fields.insert("provider_id".to_string(), json!(provider_id));
        }
        self.call("providers.update.v1", params).await
    }

    /// Open or close a provider; the queue itself is kept either way
    pub async fn set_open(&self, provider_id: &str, is_open: bool) -> Result<QueueSnapshot> {
        self.call(
            "providers.open_status.v1",
            json!({ "provider_id": provider_id, "is_open": is_open }),
        )
        .await
    }

    // Queues

    pub async fn queue(&self, provider_id: &str) -> Result<QueueSnapshot> {
        self.call("queue.get.v1", json!({ "provider_id": provider_id }))
            .await
    }

    /// Join a provider's queue
    ///
    /// A customer already queued anywhere gets an [`SdkError::Rpc`] whose
    /// `conflict_reason()` says where.
    pub async fn join(&self, provider_id: &str, customer_id: &str) -> Result<QueueSnapshot> {
        self.call("queue.join.v1", member(provider_id, customer_id))
            .await
    }

    pub async fn leave(&self, provider_id: &str, customer_id: &str) -> Result<QueueSnapshot> {
        self.call("queue.leave.v1", member(provider_id, customer_id))
            .await
    }

    /// Remove a served customer
    pub async fn advance(&self, provider_id: &str, customer_id: &str) -> Result<QueueSnapshot> {
        self.call("queue.advance.v1", member(provider_id, customer_id))
            .await
    }

    pub async fn walk_in(&self, provider_id: &str) -> Result<WalkInResponse> {
        self.call("queue.walkin.v1", json!({ "provider_id": provider_id }))
            .await
    }

    /// Ask the daemon to rebroadcast a provider's current queue
    ///
    /// `hint` is a free-form reason recorded in the daemon's log.
    pub async fn notify(&self, provider_id: &str, hint: Option<&str>) -> Result<NotifyResponse> {
        self.call(
            "queue.notify.v1",
            json!({ "provider_id": provider_id, "hint": hint }),
        )
        .await
    }

    // Customers

    pub async fn register_customer(
        &self,
        display_name: &str,
        contact_email: &str,
    ) -> Result<CustomerResponse> {
        self.call(
            "customers.register.v1",
            json!({ "display_name": display_name, "contact_email": contact_email }),
        )
        .await
    }

    pub async fn current_queue(&self, customer_id: &str) -> Result<CurrentQueueResponse> {
        self.call(
            "customers.current_queue.v1",
            json!({ "customer_id": customer_id }),
        )
        .await
    }

    // Admin

    pub async fn stats(&self) -> Result<StatsResponse> {
        let response = self.client.request("admin.stats.v1", rpc_params![]).await?;
        Ok(response)
    }

    /// Run the nightly reset now
    pub async fn reset(&self) -> Result<ResetResponse> {
        let response = self.client.request("admin.reset.v1", rpc_params![]).await?;
        Ok(response)
    }

    /// Watch a provider's queue over WebSocket
    ///
    /// The first item is the current snapshot; later items arrive after each
    /// committed change, in revision order.
    pub async fn watch_queue(&self, provider_id: &str) -> Result<QueueWatch> {
        let client = WsClientBuilder::default()
            .request_timeout(REQUEST_TIMEOUT)
            .build(ws_url(&self.url))
            .await
            .map_err(|e| SdkError::Connection(format!("Failed to open WebSocket: {}", e)))?;

        let subscription = client
            .subscribe(
                SUBSCRIBE_METHOD,
                named(json!({ "provider_id": provider_id }))?,
                UNSUBSCRIBE_METHOD,
            )
            .await?;

        Ok(QueueWatch {
            _client: client,
            subscription,
        })
    }
}

/// Live queue subscription; dropping it unsubscribes
pub struct QueueWatch {
    _client: WsClient,
    subscription: Subscription<QueueSnapshot>,
}

impl QueueWatch {
    /// Next snapshot, or `None` once the daemon closes the stream
    pub async fn next(&mut self) -> Option<Result<QueueSnapshot>> {
        self.subscription
            .next()
            .await
            .map(|item| item.map_err(SdkError::from))
    }
}

fn member(provider_id: &str, customer_id: &str) -> Value {
    json!({ "provider_id": provider_id, "customer_id": customer_id })
}

/// Send a JSON object as named params
fn named(value: Value) -> Result<ObjectParams> {
    let mut params = ObjectParams::new();
    match value {
        Value::Object(fields) => {
            for (key, value) in fields {
                params.insert(&key, value)?;
            }
            Ok(params)
        }
        other => Err(SdkError::Other(format!(
            "params must be an object, got {}",
            other
        ))),
    }
}

/// Same endpoint, WebSocket scheme
fn ws_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url() {
        assert_eq!(ws_url("http://127.0.0.1:9630"), "ws://127.0.0.1:9630");
        assert_eq!(ws_url("https://salon.example"), "wss://salon.example");
        assert_eq!(ws_url("ws://127.0.0.1:1"), "ws://127.0.0.1:1");
    }

    #[test]
    fn test_named_rejects_non_objects() {
        assert!(named(json!({"provider_id": "p1"})).is_ok());
        assert!(named(json!(["p1"])).is_err());
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        // HTTP client does not dial until the first call
        let client = SalonQClient::connect("http://127.0.0.1:1").await.unwrap();
        assert!(client.stats().await.is_err());
    }
}
