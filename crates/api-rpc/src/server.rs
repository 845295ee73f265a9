//! JSON-RPC Server
//!
//! One TCP listener serves plain HTTP calls and WebSocket connections;
//! queue subscriptions need WebSocket.

use crate::error::ServerError;
use crate::handler::RpcHandler;
use crate::types::{
    CreateProviderRequest, CurrentQueueRequest, NotifyRequest, OpenStatusRequest, ProviderRequest,
    QueueMemberRequest, RegisterCustomerRequest, UpdateProviderRequest,
};
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::Params;
use jsonrpsee::{PendingSubscriptionSink, RpcModule, SubscriptionMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9630;

/// Subscription method names
pub const SUBSCRIBE_METHOD: &str = "queue.subscribe.v1";
pub const UNSUBSCRIBE_METHOD: &str = "queue.unsubscribe.v1";
pub const QUEUE_NOTIFICATION: &str = "queue.updated";

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Register a request/response method that takes named params
macro_rules! method {
    ($module:expr, $handler:expr, $name:literal, $req:ty, $call:ident) => {{
        let handler = Arc::clone(&$handler);
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$call(req).await
                }
            })
            .map_err(|e| ServerError::Register {
                method: $name,
                reason: e.to_string(),
            })?;
    }};
    ($module:expr, $handler:expr, $name:literal, $call:ident) => {{
        let handler = Arc::clone(&$handler);
        $module
            .register_async_method($name, move |_, _, _| {
                let handler = handler.clone();
                async move { handler.$call().await }
            })
            .map_err(|e| ServerError::Register {
                method: $name,
                reason: e.to_string(),
            })?;
    }};
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Build the method table
    pub fn module(&self) -> Result<RpcModule<()>, ServerError> {
        let mut module = RpcModule::new(());

        // Providers
        method!(module, self.handler, "providers.list.v1", list_providers);
        method!(module, self.handler, "providers.get.v1", ProviderRequest, get_provider);
        method!(module, self.handler, "providers.create.v1", CreateProviderRequest, create_provider);
        method!(module, self.handler, "providers.update.v1", UpdateProviderRequest, update_provider);
        method!(module, self.handler, "providers.open_status.v1", OpenStatusRequest, set_open);

        // Queues
        method!(module, self.handler, "queue.get.v1", ProviderRequest, get_queue);
        method!(module, self.handler, "queue.join.v1", QueueMemberRequest, join);
        method!(module, self.handler, "queue.leave.v1", QueueMemberRequest, leave);
        method!(module, self.handler, "queue.advance.v1", QueueMemberRequest, advance);
        method!(module, self.handler, "queue.walkin.v1", ProviderRequest, walk_in);
        method!(module, self.handler, "queue.notify.v1", NotifyRequest, notify);

        // Customers
        method!(module, self.handler, "customers.register.v1", RegisterCustomerRequest, register_customer);
        method!(module, self.handler, "customers.current_queue.v1", CurrentQueueRequest, current_queue);

        // Admin
        method!(module, self.handler, "admin.stats.v1", stats);
        method!(module, self.handler, "admin.reset.v1", reset);

        let handler = Arc::clone(&self.handler);
        module
            .register_subscription(
                SUBSCRIBE_METHOD,
                QUEUE_NOTIFICATION,
                UNSUBSCRIBE_METHOD,
                move |params, pending, _, _| {
                    let handler = handler.clone();
                    async move { stream_queue(handler, params, pending).await }
                },
            )
            .map_err(|e| ServerError::Register {
                method: SUBSCRIBE_METHOD,
                reason: e.to_string(),
            })?;

        Ok(module)
    }

    /// Start the JSON-RPC server
    ///
    /// # Returns
    /// The bound address (useful with port 0) and the handle to stop it
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| ServerError::Build {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        let local_addr = server.local_addr().map_err(|e| ServerError::Build {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

        let module = self.module()?;
        let handle = server.start(module);

        info!(addr = %local_addr, "JSON-RPC server started (HTTP + WebSocket)");
        Ok((local_addr, handle))
    }
}

/// Push the current snapshot, then every newer one, until either side leaves
async fn stream_queue(
    handler: Arc<RpcHandler>,
    params: Params<'static>,
    pending: PendingSubscriptionSink,
) -> SubscriptionResult {
    let req: ProviderRequest = match params.parse() {
        Ok(req) => req,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };

    let (mut room, current) = match handler.watch(req).await {
        Ok(watched) => watched,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };

    let sink = pending.accept().await?;
    sink.send(SubscriptionMessage::from_json(&current)?).await?;

    loop {
        tokio::select! {
            _ = sink.closed() => break,
            next = room.next() => {
                let Some(snapshot) = next else { break };
                let message = SubscriptionMessage::from_json(snapshot.as_ref())?;
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!(provider_id = %room.provider_id(), "Queue subscription closed");
    Ok(())
}
