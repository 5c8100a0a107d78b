use super::{ApiError, ApiState};
use crate::error::ValidationError;
use crate::ops::validate::{parse_port, port_from_json};
use crate::ops::{FunnelProtocol, NetworkSpec};
use crate::registry::RemoveOutcome;
use crate::types::{ContainerRecord, PortMapping};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};

type Handled = Result<Response, Rejection>;

fn ok<T: Serialize>(value: &T) -> Handled {
    Ok(warp::reply::json(value).into_response())
}

fn created<T: Serialize>(value: &T) -> Handled {
    Ok(warp::reply::with_status(warp::reply::json(value), StatusCode::CREATED).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeRequest {
    pub port: Option<Value>,
    pub service: Option<String>,
    pub local_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FunnelRequest {
    pub port: Option<Value>,
    pub protocol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FunnelQuery {
    pub protocol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub lines: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkRequest {
    pub name: Option<String>,
    pub driver: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeAppRequest {
    pub name: Option<String>,
    pub path: Option<String>,
    #[serde(alias = "upCommandArgs")]
    pub up_command: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeFileRequest {
    pub file_path: Option<String>,
}

/// A container as listed by the API: Docker's record plus parsed ports.
#[derive(Debug, Serialize)]
pub struct ContainerView {
    #[serde(flatten)]
    pub record: ContainerRecord,
    pub ports: Vec<PortMapping>,
}

impl From<ContainerRecord> for ContainerView {
    fn from(record: ContainerRecord) -> Self {
        let ports = record.port_mappings();
        Self { record, ports }
    }
}

pub fn health() -> impl Reply {
    warp::reply::json(&json!({ "status": "UP", "message": "Backend is running" }))
}

// Tailscale

pub async fn serve_status(state: ApiState) -> Handled {
    let entries = state
        .ops
        .serve_status()
        .await
        .map_err(|e| ApiError::operation("Failed to get Tailscale serve status", e))?;
    ok(&entries)
}

pub async fn add_serve_port(state: ApiState, body: ServeRequest) -> Handled {
    const CONTEXT: &str = "Failed to add Tailscale serve port";
    let port = port_from_json(body.port.as_ref()).map_err(|e| ApiError::operation(CONTEXT, e))?;
    let local_url = body.local_url.as_deref().unwrap_or_default();

    let outcome = state
        .ops
        .add_serve_port(port, body.service.as_deref(), local_url)
        .await
        .map_err(|e| ApiError::operation(CONTEXT, e))?;
    ok(&outcome)
}

pub async fn remove_serve_port(port: String, state: ApiState) -> Handled {
    const CONTEXT: &str = "Failed to remove Tailscale serve port";
    let port = parse_port(&port).map_err(|e| ApiError::operation(CONTEXT, e))?;
    let outcome = state
        .ops
        .remove_serve_port(port)
        .await
        .map_err(|e| ApiError::operation(CONTEXT, e))?;
    ok(&outcome)
}

pub async fn funnel_status(state: ApiState) -> Handled {
    let status = state
        .ops
        .funnel_status()
        .await
        .map_err(|e| ApiError::operation("Failed to get Tailscale funnel status", e))?;
    ok(&status)
}

fn protocol(raw: Option<&str>) -> Result<FunnelProtocol, ValidationError> {
    raw.map(str::parse::<FunnelProtocol>).transpose().map(Option::unwrap_or_default)
}

pub async fn add_funnel_port(state: ApiState, body: FunnelRequest) -> Handled {
    const CONTEXT: &str = "Failed to add Tailscale funnel port";
    let port = port_from_json(body.port.as_ref()).map_err(|e| ApiError::operation(CONTEXT, e))?;
    let protocol = protocol(body.protocol.as_deref()).map_err(|e| ApiError::operation(CONTEXT, e))?;

    let outcome = state
        .ops
        .add_funnel_port(port, protocol)
        .await
        .map_err(|e| ApiError::operation(CONTEXT, e))?;
    ok(&outcome)
}

pub async fn remove_funnel_port(port: String, state: ApiState, query: FunnelQuery) -> Handled {
    const CONTEXT: &str = "Failed to remove Tailscale funnel port";
    let port = parse_port(&port).map_err(|e| ApiError::operation(CONTEXT, e))?;
    let protocol = protocol(query.protocol.as_deref()).map_err(|e| ApiError::operation(CONTEXT, e))?;

    let outcome = state
        .ops
        .remove_funnel_port(port, protocol)
        .await
        .map_err(|e| ApiError::operation(CONTEXT, e))?;
    ok(&outcome)
}

// Containers

pub async fn list_containers(state: ApiState) -> Handled {
    let containers = state
        .ops
        .list_containers()
        .await
        .map_err(|e| ApiError::operation("Failed to get Docker containers", e))?;
    let views: Vec<ContainerView> = containers.into_iter().map(ContainerView::from).collect();
    ok(&views)
}

pub async fn container_action(id: String, action: String, state: ApiState) -> Handled {
    let context = format!("Failed to {} container {}", action, id);
    let result = match action.as_str() {
        "stop" => state.ops.stop_container(&id).await,
        "kill" => state.ops.kill_container(&id).await,
        "restart" => state.ops.restart_container(&id).await,
        _ => return Err(warp::reject::not_found()),
    };
    let outcome = result.map_err(|e| ApiError::operation(context, e))?;
    ok(&outcome)
}

pub async fn container_logs(id: String, state: ApiState, query: LogsQuery) -> Handled {
    let logs = state
        .ops
        .container_logs(&id, query.lines)
        .await
        .map_err(|e| ApiError::operation(format!("Failed to get logs for container {}", id), e))?;
    ok(&logs)
}

pub async fn container_stats(id: String, state: ApiState) -> Handled {
    let stats = state
        .ops
        .container_stats(&id)
        .await
        .map_err(|e| ApiError::operation(format!("Failed to get stats for container {}", id), e))?;
    ok(&json!({ "success": true, "stats": stats }))
}

pub async fn container_networks(id: String, state: ApiState) -> Handled {
    let networks = state
        .ops
        .container_networks(&id)
        .await
        .map_err(|e| ApiError::operation(format!("Failed to get networks for container {}", id), e))?;
    ok(&networks)
}

pub async fn network_link(container: String, network: String, action: String, state: ApiState) -> Handled {
    let result = match action.as_str() {
        "connect" => state.ops.connect_network(&container, &network).await,
        "disconnect" => state.ops.disconnect_network(&container, &network).await,
        _ => return Err(warp::reject::not_found()),
    };
    let outcome = result.map_err(|e| {
        ApiError::operation(format!("Failed to {} container to network", action), e)
    })?;
    ok(&outcome)
}

// Networks

pub async fn list_networks(state: ApiState) -> Handled {
    let networks = state
        .ops
        .list_networks()
        .await
        .map_err(|e| ApiError::operation("Failed to list Docker networks", e))?;
    ok(&networks)
}

pub async fn create_network(state: ApiState, body: NetworkRequest) -> Handled {
    let spec = NetworkSpec {
        name: body.name.unwrap_or_default(),
        driver: body.driver,
        options: body.options,
    };
    let network_id = state
        .ops
        .create_network(&spec)
        .await
        .map_err(|e| ApiError::operation("Failed to create Docker network", e))?;
    created(&json!({
        "success": true,
        "message": format!("Network {} created successfully", spec.name),
        "networkId": network_id,
    }))
}

pub async fn inspect_network(id: String, state: ApiState) -> Handled {
    let detail = state
        .ops
        .inspect_network(&id)
        .await
        .map_err(|e| ApiError::operation(format!("Failed to inspect Docker network {}", id), e))?;
    match detail {
        Some(detail) => ok(&detail),
        None => Err(ApiError::not_found("Network not found")),
    }
}

pub async fn remove_network(id: String, state: ApiState) -> Handled {
    let outcome = state
        .ops
        .remove_network(&id)
        .await
        .map_err(|e| ApiError::operation("Failed to remove Docker network", e))?;
    ok(&outcome)
}

// Compose

pub async fn list_apps(state: ApiState) -> Handled {
    ok(&state.registry.list().await)
}

pub async fn add_app(state: ApiState, body: ComposeAppRequest) -> Handled {
    let app = state
        .registry
        .add(
            body.name.as_deref().unwrap_or_default(),
            body.path.as_deref().unwrap_or_default(),
            body.up_command.as_deref(),
        )
        .await
        .map_err(|e| ApiError::operation("Failed to save Docker Compose app configuration", e))?;
    created(&app)
}

pub async fn get_app(id: String, state: ApiState) -> Handled {
    match state.registry.get(&id).await {
        Some(app) => ok(&app),
        None => Err(ApiError::not_found("Docker Compose app not found")),
    }
}

pub async fn update_app(id: String, state: ApiState, body: ComposeAppRequest) -> Handled {
    let updated = state
        .registry
        .update(
            &id,
            body.name.as_deref().unwrap_or_default(),
            body.path.as_deref().unwrap_or_default(),
            body.up_command.as_deref(),
        )
        .await
        .map_err(|e| ApiError::operation("Failed to save updated Docker Compose app configuration", e))?;

    match updated {
        Some(app) => ok(&app),
        None => Err(ApiError::not_found("Docker Compose app not found")),
    }
}

pub async fn remove_app(id: String, state: ApiState) -> Handled {
    let outcome = state
        .registry
        .remove(&id)
        .await
        .map_err(|e| ApiError::operation("Failed to save Docker Compose app configuration", e))?;

    match outcome {
        RemoveOutcome::Removed(_) => ok(&json!({ "message": "Docker Compose app removed" })),
        RemoveOutcome::NotFound => Err(ApiError::not_found("Docker Compose app not found")),
    }
}

pub async fn compose_up(state: ApiState, body: ComposeFileRequest) -> Handled {
    let path = body.file_path.unwrap_or_default();
    let outcome = state
        .ops
        .compose_up(&state.registry, &path)
        .await
        .map_err(|e| ApiError::operation("Failed to execute docker-compose up", e))?;
    ok(&outcome)
}

pub async fn compose_down(state: ApiState, body: ComposeFileRequest) -> Handled {
    let path = body.file_path.unwrap_or_default();
    let outcome = state
        .ops
        .compose_down(&path)
        .await
        .map_err(|e| ApiError::operation("Failed to execute docker-compose down", e))?;
    ok(&outcome)
}
