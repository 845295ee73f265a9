//! JSON-RPC API Layer
//!
//! Serves the queue engine over JSON-RPC 2.0: request/response methods on
//! HTTP and WebSocket, plus a per-provider queue subscription on WebSocket.

pub mod error;
pub mod handler;
pub mod server;
pub mod throttle;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
