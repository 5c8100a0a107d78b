//! Dashboard HTTP API.

pub mod handlers;

use crate::error::{RelayError, Result, TailbrainError};
use crate::ops::HostOps;
use crate::registry::ComposeRegistry;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub ops: HostOps,
    pub registry: Arc<ComposeRegistry>,
}

impl ApiState {
    pub fn new(ops: HostOps, registry: Arc<ComposeRegistry>) -> Self {
        Self { ops, registry }
    }
}

/// A failed API request, rendered by [`handle_rejection`].
#[derive(Debug)]
pub enum ApiError {
    /// An operation failed; `context` is the user-facing summary.
    Operation {
        context: String,
        source: TailbrainError,
    },
    NotFound(String),
}

impl warp::reject::Reject for ApiError {}

impl ApiError {
    pub fn operation(context: impl Into<String>, source: impl Into<TailbrainError>) -> Rejection {
        warp::reject::custom(ApiError::Operation {
            context: context.into(),
            source: source.into(),
        })
    }

    pub fn not_found(message: impl Into<String>) -> Rejection {
        warp::reject::custom(ApiError::NotFound(message.into()))
    }
}

/// JSON error body: `{error, kind, details?, rawOutput?, command?, code?}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Exit status of a failed command, or the OS error of a failed launch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

impl ErrorBody {
    fn simple(kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind,
            ..Self::default()
        }
    }
}

/// Status code and body for an operation failure.
pub fn classify(context: &str, error: &TailbrainError) -> (StatusCode, ErrorBody) {
    let mut body = ErrorBody {
        error: context.to_string(),
        kind: "internal",
        details: Some(error.to_string()),
        raw_output: None,
        command: None,
        code: None,
    };

    let status = match error {
        TailbrainError::Validation(_) => {
            body.kind = "validation";
            StatusCode::BAD_REQUEST
        }
        TailbrainError::Relay(RelayError::Unavailable { .. }) => {
            body.kind = "relay_unavailable";
            StatusCode::SERVICE_UNAVAILABLE
        }
        TailbrainError::Relay(RelayError::Rejected { command, .. }) => {
            body.kind = "relay_rejected";
            body.command = Some(command.clone());
            StatusCode::BAD_GATEWAY
        }
        TailbrainError::Relay(RelayError::Execution {
            command,
            code,
            stdout,
            stderr,
            ..
        }) => {
            body.kind = "execution";
            body.command = Some(command.clone());
            body.code = *code;
            body.raw_output = non_empty(stderr).or_else(|| non_empty(stdout));
            StatusCode::INTERNAL_SERVER_ERROR
        }
        TailbrainError::Relay(RelayError::InvalidResponse { command, .. }) => {
            body.kind = "relay_invalid_response";
            body.command = Some(command.clone());
            StatusCode::BAD_GATEWAY
        }
        TailbrainError::CommandFailed {
            command,
            exit_status,
            stdout,
            stderr,
        } => {
            body.kind = "command_failed";
            body.command = Some(command.clone());
            body.code = Some(*exit_status);
            body.raw_output = non_empty(stderr).or_else(|| non_empty(stdout));
            StatusCode::INTERNAL_SERVER_ERROR
        }
        TailbrainError::Parse(e) => {
            body.kind = "parse";
            body.raw_output = Some(e.raw.clone());
            StatusCode::INTERNAL_SERVER_ERROR
        }
        TailbrainError::Registry(_) => {
            body.kind = "registry";
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, body)
}

fn non_empty(text: &str) -> Option<String> {
    (!text.trim().is_empty()).then(|| text.to_string())
}

pub async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let (status, body) = if let Some(api_error) = err.find::<ApiError>() {
        match api_error {
            ApiError::Operation { context, source } => {
                let (status, body) = classify(context, source);
                if status.is_server_error() {
                    warn!("{}: {}", context, source);
                }
                (status, body)
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorBody::simple("not_found", message)),
        }
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, ErrorBody::simple("not_found", "Not found"))
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                details: Some(e.to_string()),
                ..ErrorBody::simple("validation", "Invalid request body")
            },
        )
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, ErrorBody::simple("validation", "Invalid query string"))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, ErrorBody::simple("not_found", "Method not allowed"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, ErrorBody::simple("validation", "Request body too large"))
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorBody::simple("validation", "Expected a JSON body"),
        )
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::simple("internal", "Internal error"))
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

fn with_state(state: ApiState) -> impl Filter<Extract = (ApiState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn tailscale_routes(state: &ApiState) -> BoxedFilter<(Response,)> {
    let serve_list = warp::path!("api" / "tailscale" / "serve")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::serve_status);

    let serve_add = warp::path!("api" / "tailscale" / "serve")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::add_serve_port);

    let serve_remove = warp::path!("api" / "tailscale" / "serve" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(handlers::remove_serve_port);

    let funnel_status = warp::path!("api" / "tailscale" / "funnel")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::funnel_status);

    let funnel_add = warp::path!("api" / "tailscale" / "funnel")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::add_funnel_port);

    let funnel_remove = warp::path!("api" / "tailscale" / "funnel" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(warp::query::<handlers::FunnelQuery>())
        .and_then(handlers::remove_funnel_port);

    serve_list
        .or(serve_add)
        .unify()
        .or(serve_remove)
        .unify()
        .or(funnel_status)
        .unify()
        .or(funnel_add)
        .unify()
        .or(funnel_remove)
        .unify()
        .boxed()
}

fn container_routes(state: &ApiState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "docker" / "containers")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_containers);

    let action = warp::path!("api" / "docker" / "containers" / String / String)
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(handlers::container_action);

    let logs = warp::path!("api" / "docker" / "containers" / String / "logs")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(warp::query::<handlers::LogsQuery>())
        .and_then(handlers::container_logs);

    let stats = warp::path!("api" / "docker" / "containers" / String / "stats")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::container_stats);

    let networks = warp::path!("api" / "docker" / "containers" / String / "networks")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::container_networks);

    let link = warp::path!("api" / "docker" / "containers" / String / "networks" / String / String)
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(handlers::network_link);

    list.or(action)
        .unify()
        .or(logs)
        .unify()
        .or(stats)
        .unify()
        .or(networks)
        .unify()
        .or(link)
        .unify()
        .boxed()
}

fn network_routes(state: &ApiState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "docker" / "networks")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_networks);

    let create = warp::path!("api" / "docker" / "networks")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::create_network);

    let inspect = warp::path!("api" / "docker" / "networks" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::inspect_network);

    let remove = warp::path!("api" / "docker" / "networks" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(handlers::remove_network);

    list.or(create)
        .unify()
        .or(inspect)
        .unify()
        .or(remove)
        .unify()
        .boxed()
}

fn compose_routes(state: &ApiState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "docker-compose" / "apps")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_apps);

    let add = warp::path!("api" / "docker-compose" / "apps")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::add_app);

    let get = warp::path!("api" / "docker-compose" / "apps" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::get_app);

    let update = warp::path!("api" / "docker-compose" / "apps" / String)
        .and(warp::put())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::update_app);

    let remove = warp::path!("api" / "docker-compose" / "apps" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(handlers::remove_app);

    let up = warp::path!("api" / "docker-compose" / "up")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::compose_up);

    let down = warp::path!("api" / "docker-compose" / "down")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::compose_down);

    list.or(add)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(remove)
        .unify()
        .or(up)
        .unify()
        .or(down)
        .unify()
        .boxed()
}

/// Every API route with error recovery, CORS and access logging.
pub fn routes(state: ApiState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("api" / "health")
        .and(warp::get())
        .map(handlers::health);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_header("content-type");

    health
        .or(tailscale_routes(&state))
        .or(container_routes(&state))
        .or(network_routes(&state))
        .or(compose_routes(&state))
        .with(cors)
        .recover(handle_rejection)
        .with(warp::log("tailbrain::api"))
}

/// Dashboard API server
pub struct ApiServer {
    state: ApiState,
    addr: SocketAddr,
}

impl ApiServer {
    pub fn new(state: ApiState, addr: SocketAddr) -> Self {
        Self { state, addr }
    }

    pub async fn start(self) -> Result<()> {
        info!("📊 Starting dashboard API on {}", self.addr);

        let (addr, server) = warp::serve(routes(self.state))
            .try_bind_with_graceful_shutdown(self.addr, crate::relay::shutdown_signal())
            .map_err(|e| {
                TailbrainError::Other(anyhow::anyhow!("failed to bind API on {}: {}", self.addr, e))
            })?;

        info!("✅ Dashboard API listening on http://{}", addr);
        server.await;
        info!("Dashboard API stopped");
        Ok(())
    }
}
