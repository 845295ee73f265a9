//! SalonQ SDK - Rust Client Library
//!
//! Typed client for the SalonQ daemon: every JSON-RPC method plus a
//! WebSocket queue subscription.
//!
//! # Example
//!
//! ```no_run
//! use salonq_sdk::SalonQClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SalonQClient::connect("http://127.0.0.1:9630").await?;
//!
//!     let mut watch = client.watch_queue("p1").await?;
//!     while let Some(snapshot) = watch.next().await {
//!         let snapshot = snapshot?;
//!         println!("revision {}: {:?}", snapshot.revision, snapshot.customer_ids());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{QueueWatch, SalonQClient};
pub use error::{Result, SdkError};
pub use types::{
    CreateProviderRequest, CurrentQueueResponse, Customer, CustomerKind, CustomerResponse,
    ListProvidersResponse, Membership, NotifyResponse, Occupant, Provider, ProviderPatch,
    ProviderResponse, ProviderView, QueueSnapshot, ResetResponse, StatsResponse, WalkInResponse,
};
