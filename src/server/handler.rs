// src/server/handler.rs
use crate::engine::Engine;
use crate::error::RouterError;
use crate::health::HealthReport;
use crate::registry::Backend;
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::debug;

/// Tower service wrapping the engine. Every failure is mapped to a JSON
/// `{"error": <kind>}` response, so the service itself is infallible.
#[derive(Clone)]
pub struct RequestHandler {
    engine: Arc<Engine>,
}

impl RequestHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let engine = self.engine.clone();
        Box::pin(async move { Ok(dispatch(engine, req).await) })
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    host: String,
    port: u16,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteRequest {
    source_key: String,
    path: String,
    method: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthReportRequest {
    id: String,
    #[serde(flatten)]
    report: HealthReport,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectRequest {
    source_key: String,
    requests_per_second: f64,
}

async fn dispatch(engine: Arc<Engine>, req: Request<Body>) -> Response<Body> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, path.as_str()) {
        (&Method::GET, "/health") => Ok(json_ok(&engine.health_view())),
        (&Method::GET, "/stats") => Ok(json_ok(&engine.summary())),
        (&Method::GET, "/servers") => {
            let backends = engine.backends();
            let view: Vec<&Backend> = backends.iter().map(|b| b.as_ref()).collect();
            Ok(json_ok(&view))
        }
        (&Method::GET, "/alerts") => Ok(json_ok(&engine.alerts())),
        (&Method::POST, "/servers") => register(engine, req).await,
        (&Method::POST, "/route") => route(engine, req).await,
        (&Method::POST, "/health-report") => health_report(engine, req).await,
        (&Method::POST, "/security/detect") => detect_threat(engine, req).await,
        (&Method::DELETE, p) if p.starts_with("/servers/") => {
            let id = p.trim_start_matches("/servers/").to_string();
            deregister(engine, &id)
        }
        _ => Ok(json_response(
            StatusCode::NOT_FOUND,
            &json!({ "error": "not_found" }),
        )),
    };

    result.unwrap_or_else(|err| err.into())
}

async fn register(
    engine: Arc<Engine>,
    req: Request<Body>,
) -> Result<Response<Body>, RouterError> {
    let body: RegisterRequest = read_json(req).await?;
    let backend = engine.register(&body.host, body.port)?;
    Ok(json_response(StatusCode::CREATED, &*backend))
}

fn deregister(engine: Arc<Engine>, id: &str) -> Result<Response<Body>, RouterError> {
    let backend = engine.deregister(id)?;
    Ok(json_ok(&json!({ "status": "removed", "id": backend.id })))
}

async fn route(engine: Arc<Engine>, req: Request<Body>) -> Result<Response<Body>, RouterError> {
    let body: RouteRequest = read_json(req).await?;
    debug!(
        source_key = %body.source_key,
        path = %body.path,
        method = %body.method,
        "routing request"
    );

    let backend = engine.route(&body.source_key)?;
    Ok(json_ok(&json!({
        "id": backend.id,
        "server": backend.address.to_string(),
    })))
}

async fn health_report(
    engine: Arc<Engine>,
    req: Request<Body>,
) -> Result<Response<Body>, RouterError> {
    let body: HealthReportRequest = read_json(req).await?;
    let snapshot = engine.report_health(&body.id, body.report)?;
    Ok(json_ok(&snapshot))
}

async fn detect_threat(
    engine: Arc<Engine>,
    req: Request<Body>,
) -> Result<Response<Body>, RouterError> {
    let body: DetectRequest = read_json(req).await?;
    let detected = engine.detect_threat(&body.source_key, body.requests_per_second);
    Ok(json_ok(&json!({ "threatDetected": detected })))
}

async fn read_json<T: DeserializeOwned>(req: Request<Body>) -> Result<T, RouterError> {
    let bytes = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|e| RouterError::InvalidInput(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| RouterError::InvalidInput(e.to_string()))
}

fn json_ok<T: Serialize>(value: &T) -> Response<Body> {
    json_response(StatusCode::OK, value)
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(value).unwrap()))
        .unwrap()
}
