use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tailbrain::config::RelayConfig;
use tailbrain::error::RelayError;
use tailbrain::relay::{self, Executor};
use tailbrain::{CommandRunner, HostCommand, RelayClient};
use warp::Filter;

/// Start a relay on an ephemeral loopback port and return its base URL.
fn spawn_relay(allowed: &[&str]) -> String {
    let config = RelayConfig {
        allowed_commands: allowed.iter().map(|s| s.to_string()).collect(),
        ..RelayConfig::default()
    };
    let routes = relay::routes(Arc::new(Executor::new(&config)));
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}

/// An address nothing is listening on.
fn closed_address() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[tokio::test]
async fn test_unreachable_relay_is_unavailable() {
    let client = RelayClient::new(format!("http://{}", closed_address()), Duration::from_secs(2));
    let err = client
        .run_host_command(&HostCommand::new("docker").arg("ps"))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::Unavailable { .. }), "got {err:?}");
    assert!(err.is_transport());
    assert!(client.health().await.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_round_trip_through_relay() {
    let client = RelayClient::new(spawn_relay(&["echo"]), Duration::from_secs(10));
    client.health().await.unwrap();

    let result = client
        .run_host_command(&HostCommand::new("echo").args(["hello", "world"]))
        .await
        .unwrap();

    assert_eq!(result.stdout, "hello world\n");
    assert_eq!(result.stderr, "");
    assert_eq!(result.exit_status, 0);
    assert!(result.success());
    println!("✅ Client and relay agree on the wire format");
}

#[cfg(unix)]
#[tokio::test]
async fn test_arguments_with_spaces_survive_transport() {
    let client = RelayClient::new(spawn_relay(&["echo"]), Duration::from_secs(10));
    let result = client
        .run_host_command(&HostCommand::new("echo").arg("my app; rm -rf /"))
        .await
        .unwrap();

    assert_eq!(result.stdout, "my app; rm -rf /\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_non_zero_exit_is_a_result() {
    let client = RelayClient::new(spawn_relay(&["false"]), Duration::from_secs(10));
    let result = client
        .run_host_command(&HostCommand::new("false"))
        .await
        .unwrap();

    assert_eq!(result.exit_status, 1);
    assert!(!result.success());
}

#[tokio::test]
async fn test_disallowed_program_is_rejected() {
    let client = RelayClient::new(spawn_relay(&["docker"]), Duration::from_secs(10));
    let err = client
        .run_host_command(&HostCommand::new("rm").arg("-rf"))
        .await
        .unwrap_err();

    match err {
        RelayError::Rejected { status, message, .. } => {
            assert_eq!(status, 403);
            assert!(message.contains("rm"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_launch_failure_is_execution_error() {
    let client = RelayClient::new(
        spawn_relay(&["no-such-program-tailbrain-test"]),
        Duration::from_secs(10),
    );
    let err = client
        .run_host_command(&HostCommand::new("no-such-program-tailbrain-test"))
        .await
        .unwrap_err();

    match &err {
        RelayError::Execution { code, .. } => assert!(code.is_some()),
        other => panic!("expected Execution, got {other:?}"),
    }
    assert!(!err.is_transport());
}

#[cfg(unix)]
#[tokio::test]
async fn test_dropped_call_does_not_cancel_host_command() {
    let dir = tempfile::TempDir::new().unwrap();
    let marker = dir.path().join("done");
    let client = RelayClient::new(spawn_relay(&["sh"]), Duration::from_secs(10));

    let command = HostCommand::new("sh")
        .arg("-c")
        .arg(format!("sleep 2; touch '{}'", marker.display()));
    let call = tokio::time::timeout(Duration::from_millis(500), client.run_host_command(&command)).await;
    assert!(call.is_err(), "call should have been abandoned");
    assert!(!marker.exists());

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(marker.exists(), "host command was killed with its request");
    println!("✅ Host command outlived the abandoned request");
}

#[cfg(unix)]
#[tokio::test]
async fn test_relay_timeout_is_execution_error() {
    let client = RelayClient::new(spawn_relay(&["sleep"]), Duration::from_secs(10));
    let err = client
        .run_host_command(&HostCommand::new("sleep").arg("10").timeout(Duration::from_secs(1)))
        .await
        .unwrap_err();

    match err {
        RelayError::Execution { message, .. } => assert!(message.contains("timed out")),
        other => panic!("expected Execution, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_success_body_is_invalid_response() {
    let bogus = warp::path("execute").map(|| "definitely not json");
    let (addr, server) = warp::serve(bogus).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let client = RelayClient::new(format!("http://{}", addr), Duration::from_secs(5));
    let err = client
        .run_host_command(&HostCommand::new("docker").arg("ps"))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::InvalidResponse { .. }), "got {err:?}");
}
