//! Axum server exposing the dispatcher at `/api/v1/{module}/{operation}`.
//!
//! The transport's only jobs are parsing (body, query, bearer token),
//! mapping the HTTP method onto a dispatch verb, and turning the returned
//! envelope into a response whose status matches the envelope's code. All
//! routing semantics live in the dispatcher.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use campus_core::{Envelope, HttpVerb};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    started: Instant,
}

/// HTTP front end with deferred startup: construct, bind, then serve.
pub struct ApiServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    listener: Option<TcpListener>,
}

impl ApiServer {
    #[must_use]
    pub fn new(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            dispatcher,
            listener: None,
        }
    }

    /// Bind the listener and report the actual local address (useful when
    /// the configured port is 0).
    ///
    /// # Errors
    ///
    /// Bind failures.
    pub async fn start(&mut self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let local = listener.local_addr().context("no local address")?;
        self.listener = Some(listener);
        info!(%local, "api server listening");
        Ok(local)
    }

    /// Serve until the shutdown future resolves, binding first if
    /// [`start`](ApiServer::start) has not run.
    ///
    /// # Errors
    ///
    /// Bind or accept-loop failures.
    pub async fn serve<F>(mut self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.listener.is_none() {
            self.start().await?;
        }
        let listener = self
            .listener
            .take()
            .context("listener missing after start")?;
        let router = build_router(
            AppState {
                dispatcher: self.dispatcher,
                started: Instant::now(),
            },
            &self.config,
        );
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("server error")
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    }
}

fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/{module}/{operation}", any(dispatch))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    config.request_timeout,
                ))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    respond(Envelope::ok_with(
        "ok",
        json!({"uptime_secs": state.started.elapsed().as_secs()}),
    ))
}

async fn dispatch(
    State(state): State<AppState>,
    Path((module, operation)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(verb) = verb_of(&method) else {
        return respond(Envelope::fail(404, "operation not found"));
    };
    let body = match parse_body(&body) {
        Ok(map) => map,
        Err(envelope) => return respond(envelope),
    };
    let query: Map<String, Value> = query
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    let token = bearer_token(&headers);

    let envelope = state
        .dispatcher
        .handle(&module, &operation, verb, body, query, token)
        .await;
    respond(envelope)
}

fn verb_of(method: &Method) -> Option<HttpVerb> {
    match *method {
        Method::GET => Some(HttpVerb::Get),
        Method::POST => Some(HttpVerb::Post),
        Method::PUT => Some(HttpVerb::Put),
        Method::DELETE => Some(HttpVerb::Delete),
        _ => None,
    }
}

/// Lenient body handling: no body reads as an empty object, anything else
/// must be a JSON object.
fn parse_body(body: &Bytes) -> Result<Map<String, Value>, Envelope> {
    if body.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(Envelope::fail(422, "request body must be a JSON object")),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn respond(envelope: Envelope) -> Response {
    let status =
        StatusCode::from_u16(envelope.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::Request;
    use tower::ServiceExt;

    use crate::app::{build_dispatcher, seed_superadmin, Stores};

    use super::*;

    async fn test_router() -> Router {
        let stores = Stores::in_memory();
        seed_superadmin(&stores, "root@example.com", "root-password")
            .await
            .unwrap();
        let dispatcher = Arc::new(build_dispatcher(&ServerConfig::default(), &stores).unwrap());
        build_router(
            AppState {
                dispatcher,
                started: Instant::now(),
            },
            &ServerConfig::default(),
        )
    }

    async fn envelope_of(response: Response) -> (StatusCode, Envelope) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_uptime() {
        let router = test_router().await;
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let (status, envelope) = envelope_of(response).await;
        assert_eq!(status, StatusCode::OK);
        assert!(envelope.success);
        assert!(envelope.data.unwrap().get("uptime_secs").is_some());
    }

    #[tokio::test]
    async fn unknown_module_maps_to_http_404() {
        let router = test_router().await;
        let response = router
            .oneshot(
                Request::get("/api/v1/ghosts/list")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let (status, envelope) = envelope_of(response).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(envelope.message, "api module not found");
    }

    #[tokio::test]
    async fn non_object_body_is_a_422() {
        let router = test_router().await;
        let response = router
            .oneshot(
                Request::post("/api/v1/users/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("[1, 2, 3]"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let (status, envelope) = envelope_of(response).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(envelope.message, "request body must be a JSON object");
    }

    #[tokio::test]
    async fn empty_body_reads_as_an_empty_object() {
        let router = test_router().await;
        let response = router
            .oneshot(
                Request::post("/api/v1/users/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let (status, envelope) = envelope_of(response).await;
        // Validation runs and reports both missing credential fields.
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(envelope.errors.as_deref().map(<[String]>::len), Some(2));
    }

    #[tokio::test]
    async fn unsupported_method_maps_to_404() {
        let router = test_router().await;
        let response = router
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/v1/users/list")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let (status, envelope) = envelope_of(response).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(envelope.message, "operation not found");
    }

    #[tokio::test]
    async fn login_then_authorized_list_works_over_http() {
        let router = test_router().await;
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/users/login",
                json!({"email": "root@example.com", "password": "root-password"}),
            ))
            .await
            .unwrap();
        let (status, envelope) = envelope_of(response).await;
        assert_eq!(status, StatusCode::OK);
        let token = envelope.data.unwrap()["token"].as_str().unwrap().to_string();

        let response = router
            .oneshot(
                Request::get("/api/v1/users/list?page=1&limit=5")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let (status, envelope) = envelope_of(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope.data.unwrap()["limit"], 5);
    }

    #[tokio::test]
    async fn missing_token_is_a_401() {
        let router = test_router().await;
        let response = router
            .oneshot(
                Request::get("/api/v1/users/list")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let (status, envelope) = envelope_of(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(envelope.message, "no token provided");
    }
}
