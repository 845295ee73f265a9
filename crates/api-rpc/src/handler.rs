//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC params to the application services.

use crate::error::{throttled, to_rpc_error};
use crate::throttle::MutationThrottle;
use crate::types::{
    CreateProviderRequest, CurrentQueueRequest, CurrentQueueResponse, CustomerResponse,
    ListProvidersResponse, NotifyRequest, NotifyResponse, OpenStatusRequest, ProviderRequest,
    ProviderResponse, QueueMemberRequest, QueueResponse, RegisterCustomerRequest, ResetResponse, StatsResponse,
    UpdateProviderRequest, WalkInResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use salonq_core::application::{
    DirectoryService, FanOut, QueueService, ResetScheduler, RoomSubscription,
};
use salonq_core::domain::{ProviderProfile, ProviderView, QueueSnapshot};
use salonq_core::port::QueueMaintenance;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    queue: Arc<QueueService>,
    directory: Arc<DirectoryService>,
    fanout: FanOut,
    maintenance: Arc<dyn QueueMaintenance>,
    reset: Arc<ResetScheduler>,
    throttle: MutationThrottle,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(
        queue: Arc<QueueService>,
        directory: Arc<DirectoryService>,
        fanout: FanOut,
        maintenance: Arc<dyn QueueMaintenance>,
        reset: Arc<ResetScheduler>,
        throttle: MutationThrottle,
    ) -> Self {
        Self {
            queue,
            directory,
            fanout,
            maintenance,
            reset,
            throttle,
            start_time: Instant::now(),
        }
    }

    fn admit(&self) -> RpcResult<()> {
        if self.throttle.try_acquire() {
            Ok(())
        } else {
            Err(throttled())
        }
    }

    /// providers.list.v1
    pub async fn list_providers(&self) -> RpcResult<ListProvidersResponse> {
        let providers = self.directory.list_providers().await.map_err(to_rpc_error)?;
        Ok(ListProvidersResponse { providers })
    }

    /// providers.get.v1
    pub async fn get_provider(&self, params: ProviderRequest) -> RpcResult<ProviderView> {
        self.directory
            .get_provider(&params.provider_id)
            .await
            .map_err(to_rpc_error)
    }

    /// providers.create.v1
    pub async fn create_provider(&self, params: CreateProviderRequest) -> RpcResult<ProviderResponse> {
        self.admit()?;

        let profile = ProviderProfile {
            name: params.name,
            address: params.address,
            phone: params.phone,
            opening_hour: params.opening_hour,
        };
        let provider = self
            .directory
            .create_provider(profile)
            .await
            .map_err(to_rpc_error)?;
        Ok(ProviderResponse { provider })
    }

    /// providers.update.v1
    pub async fn update_provider(&self, params: UpdateProviderRequest) -> RpcResult<ProviderResponse> {
        self.admit()?;

        let provider = self
            .directory
            .update_provider(&params.provider_id, params.patch)
            .await
            .map_err(to_rpc_error)?;
        Ok(ProviderResponse { provider })
    }

    /// providers.open_status.v1
    pub async fn set_open(&self, params: OpenStatusRequest) -> RpcResult<QueueResponse> {
        self.admit()?;

        let snapshot = self
            .queue
            .set_open(&params.provider_id, params.is_open)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueResponse { snapshot })
    }

    /// queue.get.v1
    pub async fn get_queue(&self, params: ProviderRequest) -> RpcResult<QueueResponse> {
        let snapshot = self
            .directory
            .queue(&params.provider_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueResponse { snapshot })
    }

    /// queue.join.v1
    pub async fn join(&self, params: QueueMemberRequest) -> RpcResult<QueueResponse> {
        self.admit()?;

        let snapshot = self
            .queue
            .join(&params.provider_id, &params.customer_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueResponse { snapshot })
    }

    /// queue.leave.v1
    pub async fn leave(&self, params: QueueMemberRequest) -> RpcResult<QueueResponse> {
        self.admit()?;

        let snapshot = self
            .queue
            .leave(&params.provider_id, &params.customer_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueResponse { snapshot })
    }

    /// queue.advance.v1
    pub async fn advance(&self, params: QueueMemberRequest) -> RpcResult<QueueResponse> {
        self.admit()?;

        let snapshot = self
            .queue
            .advance(&params.provider_id, &params.customer_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueResponse { snapshot })
    }

    /// queue.walkin.v1
    pub async fn walk_in(&self, params: ProviderRequest) -> RpcResult<WalkInResponse> {
        self.admit()?;

        let admission = self
            .queue
            .admit_walk_in(&params.provider_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(WalkInResponse {
            customer: admission.customer,
            snapshot: admission.snapshot,
        })
    }

    /// queue.notify.v1 - re-broadcast current state to a provider's room
    pub async fn notify(&self, params: NotifyRequest) -> RpcResult<NotifyResponse> {
        // Unknown providers are reported rather than silently ignored
        self.directory
            .queue(&params.provider_id)
            .await
            .map_err(to_rpc_error)?;

        self.fanout
            .notify(&params.provider_id)
            .await
            .map_err(to_rpc_error)?;

        let watchers = self.fanout.subscriber_count(&params.provider_id);
        debug!(
            provider_id = %params.provider_id,
            hint = params.hint.as_deref().unwrap_or("-"),
            watchers,
            "Re-broadcast requested"
        );
        Ok(NotifyResponse {
            watchers,
            provider_id: params.provider_id,
        })
    }

    /// queue.subscribe.v1 - room membership plus the state to send first
    pub async fn watch(&self, params: ProviderRequest) -> RpcResult<(RoomSubscription, QueueSnapshot)> {
        let watched = self
            .fanout
            .subscribe(&params.provider_id)
            .await
            .map_err(to_rpc_error)?;
        debug!(
            provider_id = %params.provider_id,
            watchers = self.fanout.subscriber_count(&params.provider_id),
            "Queue subscription opened"
        );
        Ok(watched)
    }

    /// customers.register.v1
    pub async fn register_customer(&self, params: RegisterCustomerRequest) -> RpcResult<CustomerResponse> {
        self.admit()?;

        let customer = self
            .directory
            .register_customer(&params.display_name, &params.contact_email)
            .await
            .map_err(to_rpc_error)?;
        Ok(CustomerResponse { customer })
    }

    /// customers.current_queue.v1
    pub async fn current_queue(&self, params: CurrentQueueRequest) -> RpcResult<CurrentQueueResponse> {
        let membership = self
            .directory
            .current_queue(&params.customer_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(CurrentQueueResponse::from(membership))
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> RpcResult<StatsResponse> {
        let stats = self.maintenance.get_stats().await.map_err(to_rpc_error)?;

        Ok(StatsResponse {
            providers: stats.provider_count,
            open_providers: stats.open_provider_count,
            customers: stats.customer_count,
            queued: stats.queued_count,
            walk_ins: stats.walk_in_count,
            rooms: self.fanout.room_count(),
            watchers: self.fanout.total_subscribers(),
            reset_at: self.reset.schedule().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }

    /// admin.reset.v1 - run the nightly reset now
    pub async fn reset(&self) -> RpcResult<ResetResponse> {
        let report = self.reset.run_once().await.map_err(to_rpc_error)?;

        Ok(ResetResponse {
            providers_reset: report.providers.len(),
            entries_cleared: report.entries_cleared,
            walk_ins_deleted: report.walk_ins_deleted,
        })
    }
}
