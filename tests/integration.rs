use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use topic_poll_server::client::ClientRegistry;
use topic_poll_server::config::TopicEntry;
use topic_poll_server::poll::PollCoordinator;
use topic_poll_server::protocol::FramedChannel;
use topic_poll_server::protocol::commands::{REGULAR_DISCONNECT, SELECTION_COMPLETED};
use topic_poll_server::protocol::responses::UPDATE_POLL_DATA;
use topic_poll_server::{Server, ServerConfig};

struct TestServer {
    addr: std::net::SocketAddr,
    coordinator: Arc<PollCoordinator>,
    registry: Arc<ClientRegistry>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

fn test_config() -> ServerConfig {
    ServerConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        relapse_period_secs: 30,
        tick_interval_ms: 10,
        idle_timeout_ticks: 500,
        stats_interval_secs: 0,
        topics: vec![
            TopicEntry { id: 1, label: "A".to_string() },
            TopicEntry { id: 2, label: "B".to_string() },
            TopicEntry { id: 3, label: "C".to_string() },
        ],
    }
}

// Start server on an ephemeral port
async fn start_test_server() -> TestServer {
    let server = Server::bind(&test_config()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let coordinator = server.coordinator();
    let registry = server.registry();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.run(shutdown.clone()));

    TestServer {
        addr,
        coordinator,
        registry,
        shutdown,
        handle,
    }
}

async fn connect(addr: std::net::SocketAddr) -> FramedChannel<TcpStream> {
    FramedChannel::new(TcpStream::connect(addr).await.unwrap())
}

// Reads one UPDATE_POLL_DATA message, returns both ids
async fn read_offer(client: &mut FramedChannel<TcpStream>) -> (i32, i32) {
    assert_eq!(client.read_int().await.unwrap(), UPDATE_POLL_DATA);
    let first = client.read_int().await.unwrap();
    let first_label = client.read_string().await.unwrap();
    let second = client.read_int().await.unwrap();
    let second_label = client.read_string().await.unwrap();

    assert_ne!(first, second);
    for (id, label) in [(first, first_label), (second, second_label)] {
        let expected = match id {
            1 => "A",
            2 => "B",
            3 => "C",
            other => panic!("unexpected topic {}", other),
        };
        assert_eq!(label, expected);
    }
    (first, second)
}

async fn wait_for_clients(registry: &ClientRegistry, expected: usize) {
    for _ in 0..200 {
        if registry.len().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("registry never reached {} clients", expected);
}

#[tokio::test]
async fn test_vote_and_disconnect_scenario() {
    let server = start_test_server().await;
    let mut client = connect(server.addr).await;

    assert_eq!(client.read_int().await.unwrap(), 30);
    let (first, _) = read_offer(&mut client).await;
    assert_eq!(server.registry.len().await, 1);
    assert_eq!(server.coordinator.client_count(), 1);

    client.write_int(SELECTION_COMPLETED).await.unwrap();
    client.write_int(first).await.unwrap();
    client.flush().await.unwrap();

    read_offer(&mut client).await;
    assert_eq!(server.coordinator.votes_for(first), 1);
    assert_eq!(server.coordinator.total_votes(), 1);

    client.write_int(REGULAR_DISCONNECT).await.unwrap();
    client.flush().await.unwrap();

    wait_for_clients(&server.registry, 0).await;
    assert_eq!(server.coordinator.client_count(), 0);
    assert!(client.read_int().await.is_err());

    server.shutdown.cancel();
    server.handle.await.unwrap();
}

#[tokio::test]
async fn test_second_connection_from_same_address_is_rejected() {
    let server = start_test_server().await;

    let mut first = connect(server.addr).await;
    first.read_int().await.unwrap();
    read_offer(&mut first).await;

    // Same loopback address, different port
    let mut second = connect(server.addr).await;
    let err = second.read_int().await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);

    assert_eq!(server.registry.len().await, 1);
    assert_eq!(server.coordinator.client_count(), 1);

    first.write_int(REGULAR_DISCONNECT).await.unwrap();
    first.flush().await.unwrap();
    wait_for_clients(&server.registry, 0).await;

    // The address is free again
    let mut third = connect(server.addr).await;
    assert_eq!(third.read_int().await.unwrap(), 30);
    read_offer(&mut third).await;

    server.shutdown.cancel();
    server.handle.await.unwrap();
    assert_eq!(server.registry.len().await, 0);
}

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let server = start_test_server().await;

    let mut client = connect(server.addr).await;
    client.read_int().await.unwrap();
    read_offer(&mut client).await;

    server.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(server.registry.len().await, 0);
    assert_eq!(server.coordinator.client_count(), 0);
    assert!(client.read_int().await.is_err());
}
