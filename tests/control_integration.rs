//! Control-Plane Integration Tests
//!
//! Drives a live server over real TCP connections: task lifecycle, result
//! emission, and structured error responses.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::sleep;

use argus::probe::checkers;
use argus::store::TaskStatus;
use argus::{
    ControlClient, ControlServer, Request, StoreBuilder, StoreHandles, StoreReader, TaskRegistry,
};

// =============================================================================
// Test Helpers
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    registry: Arc<TaskRegistry>,
    reader: StoreReader,
    // Held so the store actor outlives the test body.
    _handles: StoreHandles,
    _dir: tempfile::TempDir,
}

/// Start a full server on an ephemeral port over a temp store.
async fn start_server() -> TestServer {
    let dir = tempfile::tempdir().expect("tempdir");
    let handles = StoreBuilder::new(dir.path())
        .channel_capacity(256)
        .build()
        .expect("build store");
    let reader = handles.reader.clone();

    let registry = Arc::new(TaskRegistry::new(handles.writer.clone()));
    let catalogue = Arc::new(checkers::standard_catalogue().expect("catalogue"));

    let server = ControlServer::bind(
        "127.0.0.1:0".parse().expect("addr"),
        Arc::clone(&registry),
        catalogue,
    )
    .await
    .expect("bind control plane");
    let addr = server.local_addr().expect("local addr");

    tokio::spawn(server.run());
    sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        registry,
        reader,
        _handles: handles,
        _dir: dir,
    }
}

/// A TCP target the `tcp` probe can hit without elevated privileges.
async fn local_listener() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe target listener");
    let port = listener.local_addr().expect("listener addr").port();
    tokio::spawn(async move {
        loop {
            let _ = listener.accept().await;
        }
    });
    port
}

async fn connected_client(addr: SocketAddr) -> ControlClient {
    let mut client = ControlClient::new(addr);
    client.connect().await.expect("connect to control plane");
    client
}

// =============================================================================
// Acknowledgement and result emission
// =============================================================================

#[tokio::test]
async fn test_add_task_acknowledged_and_first_result_emitted() {
    let server = start_server().await;
    let port = local_listener().await;
    let mut client = connected_client(server.addr).await;

    let response = client
        .request(&Request::add_task(
            "svc1",
            "tcp",
            1,
            vec!["127.0.0.1".to_string(), port.to_string()],
        ))
        .await
        .expect("add_task request");

    assert_eq!(response.action, "add_task");
    assert_eq!(
        response.message,
        "Action [add_task] for service ID [svc1] processed."
    );

    // The first iteration runs immediately; give it and the store a moment.
    sleep(Duration::from_millis(800)).await;
    let results = server.reader.results("svc1").expect("read results");
    assert!(!results.is_empty(), "first result should be appended within ~1s");
    assert_eq!(results[0].iteration, 1);
}

#[tokio::test]
async fn test_add_ping_task_acknowledged() {
    // Adding a ping task is acknowledged immediately; the probe itself may
    // lack raw-socket privileges, which only affects iterations.
    let server = start_server().await;
    let mut client = connected_client(server.addr).await;

    let response = client
        .request(&Request::add_task(
            "svc1",
            "ping",
            1,
            vec!["127.0.0.1".to_string(), "1".to_string()],
        ))
        .await
        .expect("add_task request");

    assert_eq!(
        response.message,
        "Action [add_task] for service ID [svc1] processed."
    );
    assert_eq!(server.registry.task_count().await, 1);
}

// =============================================================================
// Registry semantics over the wire
// =============================================================================

#[tokio::test]
async fn test_duplicate_add_is_rejected() {
    let server = start_server().await;
    let port = local_listener().await;
    let mut client = connected_client(server.addr).await;

    let add = Request::add_task(
        "svc1",
        "tcp",
        1,
        vec!["127.0.0.1".to_string(), port.to_string()],
    );
    client.request(&add).await.expect("first add");
    let response = client.request(&add).await.expect("second add");

    assert!(
        response.message.contains("already exists"),
        "unexpected message: {}",
        response.message
    );
    assert_eq!(server.registry.task_count().await, 1);
}

#[tokio::test]
async fn test_stop_frees_the_service_id() {
    let server = start_server().await;
    let port = local_listener().await;
    let mut client = connected_client(server.addr).await;

    let add = Request::add_task(
        "svc1",
        "tcp",
        1,
        vec!["127.0.0.1".to_string(), port.to_string()],
    );
    client.request(&add).await.expect("add");

    let response = client
        .request(&Request::stop_task("svc1"))
        .await
        .expect("stop");
    assert_eq!(
        response.message,
        "Action [stop_task] for service ID [svc1] processed."
    );
    assert_eq!(server.registry.task_count().await, 0);

    let response = client.request(&add).await.expect("re-add");
    assert_eq!(
        response.message,
        "Action [add_task] for service ID [svc1] processed."
    );
}

#[tokio::test]
async fn test_pause_halts_emission_and_resume_continues_counter() {
    let server = start_server().await;
    let port = local_listener().await;
    let mut client = connected_client(server.addr).await;

    client
        .request(&Request::add_task(
            "svc1",
            "tcp",
            1,
            vec!["127.0.0.1".to_string(), port.to_string()],
        ))
        .await
        .expect("add");

    sleep(Duration::from_millis(1500)).await;
    let response = client
        .request(&Request::pause_task("svc1"))
        .await
        .expect("pause");
    assert_eq!(
        response.message,
        "Action [pause_task] for service ID [svc1] processed."
    );

    // Let any in-flight iteration drain, then confirm emission halted.
    sleep(Duration::from_millis(1300)).await;
    let halted = server.reader.results("svc1").expect("read").len();
    assert!(halted >= 1);
    sleep(Duration::from_millis(1300)).await;
    assert_eq!(
        server.reader.results("svc1").expect("read").len(),
        halted,
        "a paused task must stop emitting results"
    );

    client
        .request(&Request::resume_task("svc1"))
        .await
        .expect("resume");
    sleep(Duration::from_millis(1500)).await;

    let results = server.reader.results("svc1").expect("read");
    assert!(results.len() > halted, "a resumed task must emit again");
    let iterations: Vec<u64> = results.iter().map(|r| r.iteration).collect();
    let expected: Vec<u64> = (1..=iterations.len() as u64).collect();
    assert_eq!(
        iterations, expected,
        "the counter continues strictly increasing across the pause"
    );
}

#[tokio::test]
async fn test_lifecycle_transitions_are_mirrored() {
    let server = start_server().await;
    let port = local_listener().await;
    let mut client = connected_client(server.addr).await;

    client
        .request(&Request::add_task(
            "svc1",
            "tcp",
            2,
            vec!["127.0.0.1".to_string(), port.to_string()],
        ))
        .await
        .expect("add");
    client
        .request(&Request::pause_task("svc1"))
        .await
        .expect("pause");
    sleep(Duration::from_millis(200)).await;

    let tasks = server.reader.tasks().expect("read tasks");
    assert_eq!(tasks["svc1"].status, TaskStatus::Paused);
    assert_eq!(tasks["svc1"].task, "tcp");
    assert_eq!(tasks["svc1"].frequency, 2);
}

// =============================================================================
// Structured errors keep the connection open
// =============================================================================

#[tokio::test]
async fn test_unsupported_action_and_probe_keep_connection_usable() {
    let server = start_server().await;
    let port = local_listener().await;
    let mut client = connected_client(server.addr).await;

    let response = client
        .request(&Request {
            action: "render_task".to_string(),
            service_id: "svc1".to_string(),
            task: None,
            frequency: None,
            configuration: None,
        })
        .await
        .expect("unsupported action request");
    assert_eq!(response.message, "Action [render_task] is not supported.");

    let response = client
        .request(&Request::add_task("svc1", "smtp", 1, vec![]))
        .await
        .expect("unsupported probe request");
    assert!(
        response.message.contains("not supported"),
        "unexpected message: {}",
        response.message
    );

    // The same connection still serves valid requests.
    let response = client
        .request(&Request::add_task(
            "svc1",
            "tcp",
            1,
            vec!["127.0.0.1".to_string(), port.to_string()],
        ))
        .await
        .expect("valid request after errors");
    assert_eq!(
        response.message,
        "Action [add_task] for service ID [svc1] processed."
    );
}

#[tokio::test]
async fn test_lifecycle_actions_on_unknown_task() {
    let server = start_server().await;
    let mut client = connected_client(server.addr).await;

    for request in [
        Request::pause_task("ghost"),
        Request::resume_task("ghost"),
        Request::stop_task("ghost"),
    ] {
        let response = client.request(&request).await.expect("request");
        assert!(
            response.message.contains("not found"),
            "unexpected message: {}",
            response.message
        );
    }
}

#[tokio::test]
async fn test_invalid_add_task_fields() {
    let server = start_server().await;
    let mut client = connected_client(server.addr).await;

    // Zero frequency violates the positive-integer requirement.
    let response = client
        .request(&Request::add_task(
            "svc1",
            "tcp",
            0,
            vec!["127.0.0.1".to_string(), "22".to_string()],
        ))
        .await
        .expect("zero frequency request");
    assert!(
        response.message.contains("positive integer"),
        "unexpected message: {}",
        response.message
    );

    // Bad probe arguments are caught at add time.
    let response = client
        .request(&Request::add_task(
            "svc2",
            "ping",
            1,
            vec!["127.0.0.1".to_string(), "not-a-number".to_string()],
        ))
        .await
        .expect("bad arguments request");
    assert!(
        response.message.contains("invalid arguments"),
        "unexpected message: {}",
        response.message
    );
    assert_eq!(server.registry.task_count().await, 0);
}

// =============================================================================
// Multiple clients
// =============================================================================

#[tokio::test]
async fn test_two_clients_are_multiplexed() {
    let server = start_server().await;
    let port = local_listener().await;
    let mut first = connected_client(server.addr).await;
    let mut second = connected_client(server.addr).await;

    let response = first
        .request(&Request::add_task(
            "svc1",
            "tcp",
            1,
            vec!["127.0.0.1".to_string(), port.to_string()],
        ))
        .await
        .expect("first client add");
    assert_eq!(response.action, "add_task");

    // The second client manages the task the first one created.
    let response = second
        .request(&Request::pause_task("svc1"))
        .await
        .expect("second client pause");
    assert_eq!(
        response.message,
        "Action [pause_task] for service ID [svc1] processed."
    );
}
