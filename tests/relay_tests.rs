use serde_json::{Value, json};
use std::sync::Arc;
use tailbrain::config::RelayConfig;
use tailbrain::relay::{self, Executor};
use warp::http::StatusCode;

fn executor(allowed: &[&str]) -> Arc<Executor> {
    let config = RelayConfig {
        allowed_commands: allowed.iter().map(|s| s.to_string()).collect(),
        ..RelayConfig::default()
    };
    Arc::new(Executor::new(&config))
}

fn body(response: &warp::http::Response<bytes::Bytes>) -> Value {
    serde_json::from_slice(response.body()).expect("response body is JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let routes = relay::routes(executor(&[]));
    let response = warp::test::request()
        .method("GET")
        .path("/health")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_diagnostic_endpoint_reports_host() {
    let routes = relay::routes(executor(&[]));
    let response = warp::test::request()
        .method("GET")
        .path("/test")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body(&response);
    assert_eq!(json["status"], "ok");
    assert!(json["hostname"].is_string());
    assert!(json["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
}

#[cfg(unix)]
#[tokio::test]
async fn test_execute_legacy_command_line() {
    let routes = relay::routes(executor(&["echo"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({ "command": "echo hi" }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body(&response);
    assert_eq!(json["stdout"], "hi\n");
    assert_eq!(json["stderr"], "");
    assert_eq!(json["exitStatus"], 0);
    assert_eq!(json["truncated"], false);
    println!("✅ echo hi round-tripped through the relay");
}

#[cfg(unix)]
#[tokio::test]
async fn test_execute_argv_form() {
    let routes = relay::routes(executor(&["echo"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({ "command": "echo", "args": ["one two", "three"] }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)["stdout"], "one two three\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_shell_operators_are_not_interpreted() {
    let routes = relay::routes(executor(&["echo"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({ "command": "echo hi && whoami; id | cat" }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)["stdout"], "hi && whoami; id | cat\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_non_zero_exit_is_still_200() {
    let routes = relay::routes(executor(&["false"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({ "command": "false" }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)["exitStatus"], 1);
}

#[tokio::test]
async fn test_missing_command_is_400() {
    let routes = relay::routes(executor(&["echo"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({}))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body(&response)["error"].is_string());
}

#[tokio::test]
async fn test_blank_command_is_400() {
    let routes = relay::routes(executor(&["echo"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({ "command": "   " }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let routes = relay::routes(executor(&["echo"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .header("content-type", "application/json")
        .body("{\"command\": ")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disallowed_program_is_403() {
    let routes = relay::routes(executor(&["docker", "tailscale"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({ "command": "rm -rf /tmp/nothing-here" }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let error = body(&response)["error"].as_str().unwrap_or_default().to_string();
    assert!(error.contains("rm"), "unexpected error: {error}");
}

#[tokio::test]
async fn test_launch_failure_is_500() {
    let routes = relay::routes(executor(&["no-such-program-tailbrain-test"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({ "command": "no-such-program-tailbrain-test" }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body(&response);
    assert!(json["error"].is_string());
    assert_eq!(json["stdout"], "");
    assert_eq!(json["stderr"], "");
    assert!(json["code"].is_i64(), "code missing from {json}");
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_is_500_with_partial_output() {
    let routes = relay::routes(executor(&["sh"]));
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({
            "command": "sh",
            "args": ["-c", "echo working; exec sleep 30"],
            "timeoutSecs": 1,
        }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body(&response);
    assert_eq!(json["stdout"], "working\n");
    assert!(json.as_object().unwrap().contains_key("code"));
    assert_eq!(json["code"], Value::Null);
}

#[cfg(unix)]
#[tokio::test]
async fn test_background_process_does_not_hold_request_past_timeout() {
    let routes = relay::routes(executor(&["sh"]));
    let started = std::time::Instant::now();
    let response = warp::test::request()
        .method("POST")
        .path("/execute")
        .json(&json!({
            "command": "sh",
            "args": ["-c", "sleep 6 & echo hi"],
            "timeoutSecs": 1,
        }))
        .reply(&routes)
        .await;

    assert!(started.elapsed() < std::time::Duration::from_secs(4));
    assert_eq!(response.status(), StatusCode::OK);
    let json = body(&response);
    assert_eq!(json["stdout"], "hi\n");
    assert_eq!(json["truncated"], true);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let routes = relay::routes(executor(&[]));
    let response = warp::test::request()
        .method("GET")
        .path("/nope")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
