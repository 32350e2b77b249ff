//! Gateway server - SSE streams, the POST message endpoint, health and OpenAPI

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited, StreamBody};
use hyper::body::{Body, Bytes, Frame, Incoming};
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE, ORIGIN,
    VARY,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use super::openapi::{self, ErrorResponse};
use crate::config::Settings;
use crate::error::McpError;
use crate::health::{HealthResponse, HealthService, SystemHealthService};
use crate::mcp::dispatcher::ServerContext;
use crate::mcp::session::{SessionId, SessionManager};
use crate::mcp::types::JsonRpcRequest;

/// Maximum POST body size (4MB)
pub const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

pub type GatewayBody = UnsyncBoxBody<Bytes, Infallible>;

/// HTTP front of the server; cheap to clone into connection tasks
#[derive(Clone)]
pub struct Gateway {
    settings: Arc<Settings>,
    sessions: SessionManager,
    health: Arc<dyn HealthService>,
}

impl Gateway {
    pub fn new(settings: Arc<Settings>, context: Arc<ServerContext>) -> Self {
        let sessions = SessionManager::new(
            context,
            settings.route("/messages"),
            settings.sse_ping_interval,
        );
        let health = Arc::new(SystemHealthService::new(settings.clone()));
        Self {
            settings,
            sessions,
            health,
        }
    }

    pub fn with_health_service(mut self, health: Arc<dyn HealthService>) -> Self {
        self.health = health;
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let target = self.settings.bind_target();
        let listener = TcpListener::bind(&target)
            .await
            .with_context(|| format!("Failed to bind to {}", target))?;

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Accept connections until `shutdown` resolves, then close every session
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener
            .local_addr()
            .context("Failed to read listener address")?;
        info!("{} listening on http://{}", self.settings.app_name, addr);
        info!("SSE endpoint: {}", self.settings.route("/sse"));

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    debug!("Connection from {}", peer);

                    let io = TokioIo::new(stream);
                    let gateway = self.clone();
                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let gateway = gateway.clone();
                            async move { Ok::<_, Infallible>(gateway.handle(req).await) }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            if !e.is_incomplete_message() {
                                debug!("Error serving connection: {}", e);
                            }
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, closing sessions");
                    break;
                }
            }
        }

        self.sessions.close_all().await;
        Ok(())
    }

    async fn handle(&self, req: Request<Incoming>) -> Response<GatewayBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let origin = req
            .headers()
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let response = if method == Method::OPTIONS {
            empty_response(StatusCode::NO_CONTENT)
        } else {
            match path.strip_prefix(self.settings.api_prefix.as_str()) {
                Some(route) => match (method, route) {
                    (Method::GET, "/sse") => sse_stream(self).await,
                    (Method::POST, "/messages") => post_message(self, req).await,
                    (Method::GET, "/health") => health_check(self).await,
                    (Method::GET, "/openapi.json") => openapi_document(self),
                    _ => not_found(&path),
                },
                None => not_found(&path),
            }
        };

        self.apply_cors(response, origin.as_deref())
    }

    fn apply_cors(
        &self,
        mut response: Response<GatewayBody>,
        origin: Option<&str>,
    ) -> Response<GatewayBody> {
        let cors = &self.settings.cors;
        let allowed = match origin {
            Some(origin) if cors.is_allowed(origin) => HeaderValue::from_str(origin).ok(),
            None if cors.allows_any() => Some(HeaderValue::from_static("*")),
            _ => None,
        };

        if let Some(allowed) = allowed {
            let headers = response.headers_mut();
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            );
            headers.insert(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type, Authorization"),
            );
            headers.insert(VARY, HeaderValue::from_static("Origin"));
        }
        response
    }
}

/// Open an SSE stream bound to a new session
#[utoipa::path(
    get,
    path = "/sse",
    responses(
        (status = 200, description = "Event stream; the first event names the message endpoint", content_type = "text/event-stream", body = String),
    ),
    tag = "mcp"
)]
pub(super) async fn sse_stream(gateway: &Gateway) -> Response<GatewayBody> {
    let session = gateway.sessions.open().await;
    info!("SSE client connected, session {}", session.id());

    let stream = ReceiverStream::new(session.into_frames())
        .map(|bytes| Ok::<_, Infallible>(Frame::data(bytes)));

    let mut response = Response::new(StreamBody::new(stream).boxed_unsync());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("X-Accel-Buffering", HeaderValue::from_static("no"));
    response
}

/// Queue a JSON-RPC message for a session; the reply arrives on its stream
#[utoipa::path(
    post,
    path = "/messages",
    params(
        ("session_id" = String, Query, description = "Session id announced by the endpoint event")
    ),
    request_body = JsonRpcRequest,
    responses(
        (status = 202, description = "Message accepted", body = String),
        (status = 400, description = "Missing or invalid session id, or unparseable message", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 413, description = "Body too large", body = ErrorResponse),
        (status = 503, description = "Session queue is full", body = ErrorResponse),
    ),
    tag = "mcp"
)]
pub(super) async fn post_message(
    gateway: &Gateway,
    req: Request<Incoming>,
) -> Response<GatewayBody> {
    let raw_id = match query_param(req.uri().query(), "session_id") {
        Some(id) if !id.is_empty() => id,
        _ => return reject(McpError::Protocol("session_id is required".to_string())),
    };

    let session_id: SessionId = match raw_id.parse() {
        Ok(id) => id,
        Err(_) => {
            debug!("Unparseable session id {}", raw_id);
            return reject(McpError::Protocol("Invalid session ID".to_string()));
        }
    };

    let body = match read_body_with_limit(req.into_body(), MAX_BODY_SIZE).await {
        Ok(body) => body,
        Err(BodyError::TooLarge) => {
            warn!("Rejected oversized message for session {}", session_id);
            return json_error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                &format!("Request body too large (max {} bytes)", MAX_BODY_SIZE),
            );
        }
        Err(BodyError::Read) => {
            return json_error_response(StatusCode::BAD_REQUEST, "Failed to read body");
        }
    };

    // Malformed bodies still go to the session so the client sees a parse error frame
    let well_formed = serde_json::from_slice::<Value>(&body).is_ok();
    let raw = String::from_utf8_lossy(&body).into_owned();

    if let Err(e) = gateway.sessions.dispatch_inbound(&session_id, raw).await {
        return reject(e);
    }

    if !well_formed {
        return reject(McpError::Protocol("Could not parse message".to_string()));
    }

    text_response(StatusCode::ACCEPTED, "Accepted")
}

/// Log a rejected POST and turn it into an error response
fn reject(err: McpError) -> Response<GatewayBody> {
    warn!("Rejected message: {}", err);
    let status = match err {
        McpError::SessionNotFound(_) | McpError::NotFound { .. } => StatusCode::NOT_FOUND,
        McpError::InvalidArgument(_) | McpError::Protocol(_) => StatusCode::BAD_REQUEST,
        McpError::SessionBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    json_error_response(status, &err.to_string())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse),
    ),
    tag = "system"
)]
pub(super) async fn health_check(gateway: &Gateway) -> Response<GatewayBody> {
    let report: HealthResponse = gateway.health.check_health().await;
    json_response(StatusCode::OK, &report)
}

fn openapi_document(gateway: &Gateway) -> Response<GatewayBody> {
    match openapi::document(&gateway.settings).to_pretty_json() {
        Ok(json) => raw_json_response(StatusCode::OK, json),
        Err(e) => {
            error!("Failed to render OpenAPI document: {}", e);
            json_error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn not_found(path: &str) -> Response<GatewayBody> {
    debug!("No route for {}", path);
    json_error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// First value of `key` in a query string
fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    query?.split('&').find_map(|param| {
        let mut parts = param.splitn(2, '=');
        if parts.next()? == key {
            Some(parts.next().unwrap_or_default().to_string())
        } else {
            None
        }
    })
}

enum BodyError {
    TooLarge,
    Read,
}

async fn read_body_with_limit<B>(body: B, max_size: usize) -> Result<Bytes, BodyError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limited = Limited::new(body, max_size);
    match limited.collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(BodyError::TooLarge),
        Err(e) => {
            debug!("Failed to read body: {}", e);
            Err(BodyError::Read)
        }
    }
}

fn full_body(bytes: impl Into<Bytes>) -> GatewayBody {
    Full::new(bytes.into()).boxed_unsync()
}

fn with_status(status: StatusCode, body: GatewayBody) -> Response<GatewayBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

fn empty_response(status: StatusCode) -> Response<GatewayBody> {
    with_status(status, full_body(Bytes::new()))
}

fn text_response(status: StatusCode, text: &'static str) -> Response<GatewayBody> {
    let mut response = with_status(status, full_body(text));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn raw_json_response(status: StatusCode, body: String) -> Response<GatewayBody> {
    let mut response = with_status(status, full_body(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<GatewayBody> {
    match serde_json::to_string(value) {
        Ok(body) => raw_json_response(status, body),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn json_error_response(status: StatusCode, error: &str) -> Response<GatewayBody> {
    json_response(status, &ErrorResponse::new(error))
}
