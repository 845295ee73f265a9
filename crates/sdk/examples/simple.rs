//! Simple SDK Example
//!
//! Registers a customer, queues them at the first provider and watches the
//! line until they are served.
//!
//! # Usage
//!
//! 1. Start the daemon:
//!    ```bash
//!    cargo run --package salonq-daemon
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --package salonq-sdk --example simple
//!    ```

use salonq_sdk::{CreateProviderRequest, SalonQClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("SalonQ SDK - Simple Example");
    println!("===========================\n");

    // 1. Connect to daemon
    let client = SalonQClient::connect("http://127.0.0.1:9630").await?;

    // 2. Make sure there is a provider
    let providers = client.list_providers().await?;
    let provider_id = match providers.first() {
        Some(view) => view.provider.id.clone(),
        None => {
            let created = client
                .create_provider(CreateProviderRequest {
                    name: "Corner Cuts".to_string(),
                    address: "1 Main St".to_string(),
                    phone: None,
                    opening_hour: Some("09:00".to_string()),
                })
                .await?;
            created.provider.id
        }
    };
    println!("Provider: {}", provider_id);

    // 3. Register and queue a customer
    let customer = client
        .register_customer("Sample Customer", "sample@example.com")
        .await?
        .customer;
    let mut watch = client.watch_queue(&provider_id).await?;
    client.join(&provider_id, &customer.id).await?;

    // 4. Print updates until the customer is gone from the line
    let mut queued = false;
    while let Some(snapshot) = watch.next().await {
        let snapshot = snapshot?;
        println!("revision {}: {:?}", snapshot.revision, snapshot.customer_ids());

        let present = snapshot.customer_ids().contains(&customer.id.as_str());
        if queued && !present {
            break;
        }
        queued |= present;
    }

    Ok(())
}
