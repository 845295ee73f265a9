//! JSON-RPC End-to-End Tests
//!
//! A real server on an ephemeral port, backed by in-memory SQLite, driven
//! through the SDK over HTTP and WebSocket.

use std::sync::Arc;
use std::time::Duration;

use jsonrpsee::server::ServerHandle;
use salonq_api_rpc::error::code;
use salonq_api_rpc::throttle::MutationThrottle;
use salonq_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use salonq_core::application::{
    DailySchedule, DirectoryService, FanOut, QueueService, ResetScheduler,
};
use salonq_core::port::id_provider::UuidProvider;
use salonq_core::port::time_provider::SystemTimeProvider;
use salonq_infra_sqlite::{
    create_pool, run_migrations, SqliteQueueMaintenance, SqliteQueueStore,
};
use salonq_sdk::{CreateProviderRequest, CustomerKind, ProviderPatch, SalonQClient};

/// Start a daemon-equivalent server; returns the client and the handle that keeps it alive
async fn start(throttle: MutationThrottle) -> (SalonQClient, ServerHandle) {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let store = Arc::new(SqliteQueueStore::new(pool));
    let maintenance = Arc::new(SqliteQueueMaintenance::new(&store));
    let fanout = FanOut::new(store.clone(), 16);
    let queue = Arc::new(QueueService::new(
        store.clone(),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        Arc::new(fanout.clone()),
    ));
    let directory = Arc::new(DirectoryService::new(
        store.clone(),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    ));
    let reset = Arc::new(ResetScheduler::new(
        maintenance.clone(),
        Arc::new(fanout.clone()),
        DailySchedule::midnight(),
    ));

    let handler = RpcHandler::new(queue, directory, fanout, maintenance, reset, throttle);
    let config = RpcServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let (addr, handle) = RpcServer::new(config, handler).start().await.unwrap();

    let client = SalonQClient::connect(format!("http://{}", addr))
        .await
        .unwrap();
    (client, handle)
}

fn salon(name: &str) -> CreateProviderRequest {
    CreateProviderRequest {
        name: name.to_string(),
        address: "4 Canal Rd".to_string(),
        phone: None,
        opening_hour: Some("10:00".to_string()),
    }
}

#[tokio::test]
async fn test_join_leave_over_rpc() {
    let (client, _server) = start(MutationThrottle::new(1000, 1000)).await;

    let p1 = client.create_provider(salon("Fade Room")).await.unwrap().provider;
    let p2 = client.create_provider(salon("Curl Up")).await.unwrap().provider;
    assert!(p1.is_open);

    let cust = client
        .register_customer("Cust One", "cust-1@example.com")
        .await
        .unwrap()
        .customer;
    assert_eq!(cust.kind, CustomerKind::Registered);

    let snapshot = client.join(&p1.id, &cust.id).await.unwrap();
    assert_eq!(snapshot.customer_ids(), vec![cust.id.as_str()]);

    let here = client.join(&p1.id, &cust.id).await.unwrap_err();
    assert_eq!(here.code(), Some(code::CONFLICT));
    assert_eq!(here.conflict_reason(), Some("ALREADY_QUEUED_HERE"));

    let elsewhere = client.join(&p2.id, &cust.id).await.unwrap_err();
    assert_eq!(elsewhere.conflict_reason(), Some("ALREADY_QUEUED_ELSEWHERE"));

    let where_is = client.current_queue(&cust.id).await.unwrap();
    assert!(where_is.in_queue);
    assert_eq!(where_is.position, Some(1));
    let membership = where_is.membership().unwrap();
    assert_eq!(membership.provider_id, p1.id);
    assert_eq!(membership.provider_name, "Fade Room");

    let left = client.leave(&p1.id, &cust.id).await.unwrap();
    assert!(left.queue.is_empty());
    let where_is = client.current_queue(&cust.id).await.unwrap();
    assert!(!where_is.in_queue);
    assert!(where_is.provider_id.is_none());

    assert!(client.join(&p2.id, &cust.id).await.is_ok());
}

#[tokio::test]
async fn test_provider_directory_and_gating() {
    let (client, _server) = start(MutationThrottle::new(1000, 1000)).await;

    let p = client.create_provider(salon("Snip")).await.unwrap().provider;
    let updated = client
        .update_provider(
            &p.id,
            ProviderPatch {
                phone: Some("555-0199".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .provider;
    assert_eq!(updated.phone.as_deref(), Some("555-0199"));
    assert_eq!(updated.name, "Snip");

    let closed = client.set_open(&p.id, false).await.unwrap();
    assert!(!closed.is_open);

    let err = client.walk_in(&p.id).await.unwrap_err();
    assert_eq!(err.code(), Some(code::STATE_CONFLICT));

    client.set_open(&p.id, true).await.unwrap();
    let admitted = client.walk_in(&p.id).await.unwrap();
    assert_eq!(admitted.customer.kind, CustomerKind::WalkIn);
    assert_eq!(admitted.snapshot.queue.len(), 1);

    let view = client.get_provider(&p.id).await.unwrap();
    assert_eq!(view.queue.len(), 1);
    assert_eq!(client.list_providers().await.unwrap().len(), 1);

    let served = client
        .advance(&p.id, &admitted.customer.id)
        .await
        .unwrap();
    assert!(served.queue.is_empty());
}

#[tokio::test]
async fn test_error_codes() {
    let (client, _server) = start(MutationThrottle::new(1000, 1000)).await;

    let missing = client.queue("no-such-provider").await.unwrap_err();
    assert_eq!(missing.code(), Some(code::NOT_FOUND));

    let malformed = client.queue("not a valid id").await.unwrap_err();
    assert_eq!(malformed.code(), Some(code::VALIDATION_ERROR));

    let bad_email = client
        .register_customer("Someone", "not-an-email")
        .await
        .unwrap_err();
    assert_eq!(bad_email.code(), Some(code::VALIDATION_ERROR));
}

#[tokio::test]
async fn test_watch_queue_over_websocket() {
    let (client, _server) = start(MutationThrottle::new(1000, 1000)).await;
    let p = client.create_provider(salon("Live")).await.unwrap().provider;
    let cust = client
        .register_customer("Viewer", "viewer@example.com")
        .await
        .unwrap()
        .customer;

    let mut watch = client.watch_queue(&p.id).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(2), watch.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(first.queue.is_empty());

    let joined = client.join(&p.id, &cust.id).await.unwrap();

    let mut last = first.revision;
    loop {
        let update = tokio::time::timeout(Duration::from_secs(2), watch.next())
            .await
            .expect("no broadcast after join")
            .unwrap()
            .unwrap();
        assert!(update.revision >= last);
        last = update.revision;
        if update.revision >= joined.revision {
            assert_eq!(update.customer_ids(), vec![cust.id.as_str()]);
            break;
        }
    }

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.rooms, 1);
    assert_eq!(stats.watchers, 1);
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.reset_at, "00:00");
}

#[tokio::test]
async fn test_watch_unknown_provider_is_rejected() {
    let (client, _server) = start(MutationThrottle::new(1000, 1000)).await;
    assert!(client.watch_queue("ghost").await.is_err());
}

#[tokio::test]
async fn test_notify_pushes_to_watchers_over_websocket() {
    let (client, _server) = start(MutationThrottle::new(1000, 1000)).await;
    let p = client.create_provider(salon("Screen")).await.unwrap().provider;
    let admitted = client.walk_in(&p.id).await.unwrap();

    let mut watch = client.watch_queue(&p.id).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(2), watch.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(first.revision, admitted.snapshot.revision);

    let notified = client
        .notify(&p.id, Some("lobby display reconnected"))
        .await
        .unwrap();
    assert_eq!(notified.watchers, 1);

    let pushed = tokio::time::timeout(Duration::from_secs(2), watch.next())
        .await
        .expect("notify must reach the watcher")
        .unwrap()
        .unwrap();
    assert_eq!(pushed.revision, first.revision);
    assert_eq!(pushed.customer_ids(), vec![admitted.customer.id.as_str()]);
}

#[tokio::test]
async fn test_admin_reset_and_notify() {
    let (client, _server) = start(MutationThrottle::new(1000, 1000)).await;
    let p = client.create_provider(salon("Busy")).await.unwrap().provider;
    client.walk_in(&p.id).await.unwrap();
    client.walk_in(&p.id).await.unwrap();

    let notified = client.notify(&p.id, None).await.unwrap();
    assert_eq!(notified.watchers, 0);

    let report = client.reset().await.unwrap();
    assert_eq!(report.providers_reset, 1);
    assert_eq!(report.entries_cleared, 2);
    assert_eq!(report.walk_ins_deleted, 2);

    assert!(client.queue(&p.id).await.unwrap().queue.is_empty());
    let stats = client.stats().await.unwrap();
    assert_eq!(stats.walk_ins, 0);
}

#[tokio::test]
async fn test_mutations_are_throttled() {
    let (client, _server) = start(MutationThrottle::new(2, 1)).await;

    // Two tokens: create + one walk-in
    let p = client.create_provider(salon("Slow")).await.unwrap().provider;
    client.walk_in(&p.id).await.unwrap();

    let err = client.walk_in(&p.id).await.unwrap_err();
    assert_eq!(err.code(), Some(code::THROTTLED));

    // Reads are never throttled
    assert_eq!(client.queue(&p.id).await.unwrap().queue.len(), 1);
}
