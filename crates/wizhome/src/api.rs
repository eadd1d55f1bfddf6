use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::engine::DeviceKind;
use crate::engine::DeviceState;
use crate::engine::Engine;
use crate::engine::EngineError;
use crate::engine::Home;
use crate::prompt::PromptKind;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

/// Body for POST /v1/devices
#[derive(Debug, Deserialize)]
struct NewDevice {
    name: String,
    kind: DeviceKind,
    /// Initial state for on/off devices
    #[serde(default)]
    on: bool,
    /// Initial value for sensors
    value: Option<String>,
}

/// Body for POST /v1/people
#[derive(Debug, Deserialize)]
struct NewPerson {
    name: String,
    #[serde(default)]
    bio: String,
}

/// Body for POST /v1/rules
#[derive(Debug, Deserialize)]
struct NewRule {
    description: String,
}

/// Body for PUT /v1/address
#[derive(Debug, Deserialize)]
struct SetAddress {
    address: String,
}

/// Query for GET /v1/prompt
#[derive(Debug, Deserialize)]
struct PromptQuery {
    kind: Option<PromptKind>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    version: &'static str,
    engine: Arc<Engine>,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Engine(EngineError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Engine(EngineError::Task(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn found(removed: bool) -> ApiResult<StatusCode> {
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for GET /v1/home
async fn home(State(state): State<AppState>) -> Json<Home> {
    Json(Home::clone(&state.engine.state_snapshot()))
}

/// Handler for POST /v1/devices
#[tracing::instrument(skip(state))]
async fn add_device(
    State(state): State<AppState>,
    Json(body): Json<NewDevice>,
) -> ApiResult<impl IntoResponse> {
    if body.name.is_empty() {
        return Err(ApiError::BadRequest("device name must not be empty".to_string()));
    }
    let device_state = match body.kind {
        DeviceKind::OnOff => DeviceState::OnOff { on: body.on },
        DeviceKind::Sensor => DeviceState::Sensor { value: body.value },
    };
    let device = state.engine.add_device(body.name, device_state).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// Handler for DELETE /v1/devices/{id}
async fn remove_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    found(state.engine.remove_device(id).await?)
}

/// Handler for POST /v1/people
#[tracing::instrument(skip(state))]
async fn add_person(
    State(state): State<AppState>,
    Json(body): Json<NewPerson>,
) -> ApiResult<impl IntoResponse> {
    if body.name.is_empty() {
        return Err(ApiError::BadRequest("person name must not be empty".to_string()));
    }
    let person = state.engine.add_person(body.name, body.bio).await?;
    Ok((StatusCode::CREATED, Json(person)))
}

/// Handler for DELETE /v1/people/{id}
async fn remove_person(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    found(state.engine.remove_person(id).await?)
}

/// Handler for POST /v1/rules
#[tracing::instrument(skip(state))]
async fn add_rule(
    State(state): State<AppState>,
    Json(body): Json<NewRule>,
) -> ApiResult<impl IntoResponse> {
    let rule = state.engine.add_rule(body.description).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Handler for DELETE /v1/rules/{id}
async fn remove_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    found(state.engine.remove_rule(id).await?)
}

/// Handler for PUT /v1/address
async fn set_address(
    State(state): State<AppState>,
    Json(body): Json<SetAddress>,
) -> ApiResult<StatusCode> {
    state.engine.set_address(body.address).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /v1/events
async fn events(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.state_snapshot().events.clone())
}

/// Handler for DELETE /v1/events/{id}
async fn remove_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    found(state.engine.remove_event(id).await?)
}

/// Handler for GET /v1/prompt
async fn prompt(State(state): State<AppState>, Query(query): Query<PromptQuery>) -> String {
    state
        .engine
        .prompt(query.kind.unwrap_or(PromptKind::Narrate))
}

/// Handler for POST /v1/actions/narrate
#[tracing::instrument(skip(state))]
async fn narrate(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let event = state.engine.narrate().await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Handler for POST /v1/actions/predict
#[tracing::instrument(skip(state))]
async fn predict(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let report = state.engine.predict_states().await?;
    Ok(Json(report))
}

/// Create the API router with all endpoints
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/home", get(home))
        .route("/v1/devices", post(add_device))
        .route("/v1/devices/:id", delete(remove_device))
        .route("/v1/people", post(add_person))
        .route("/v1/people/:id", delete(remove_person))
        .route("/v1/rules", post(add_rule))
        .route("/v1/rules/:id", delete(remove_rule))
        .route("/v1/address", put(set_address))
        .route("/v1/events", get(events))
        .route("/v1/events/:id", delete(remove_event))
        .route("/v1/prompt", get(prompt))
        .route("/v1/actions/narrate", post(narrate))
        .route("/v1/actions/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// This function will bind to the specified address and serve the API endpoints.
/// It will run until the provided shutdown signal is triggered.
///
/// # Arguments
/// * `listen` - The IP address to listen on (e.g., "127.0.0.1")
/// * `port` - The port to listen on (e.g., 8565)
/// * `engine` - The engine owning the home context
/// * `shutdown_rx` - A oneshot receiver that will trigger graceful shutdown
///
/// # Returns
/// Returns Ok(()) if the server shuts down gracefully, or an error if startup fails
pub async fn serve(
    listen: &str,
    port: u16,
    engine: Arc<Engine>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    let app = create_router(AppState { version, engine });

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::chat::MockChatClient;

    fn app(chat: MockChatClient) -> Router {
        let engine = Arc::new(Engine::new(Home::default(), Arc::new(chat)));
        let runner = engine.clone();
        tokio::spawn(async move { runner.run().await });
        create_router(AppState {
            version: "test",
            engine,
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_ping() {
        let app = app(MockChatClient::new());
        let (status, body) = send(&app, "GET", "/v1/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_info_reports_version() {
        let app = app(MockChatClient::new());
        let (status, body) = send(&app, "GET", "/v1/info", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], "test");
    }

    #[tokio::test]
    async fn test_manage_home() {
        let app = app(MockChatClient::new());

        let (status, device) = send(
            &app,
            "POST",
            "/v1/devices",
            Some(json!({"name": "Oven", "kind": "on_off", "on": true})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(device["kind"], "on_off");
        assert_eq!(device["on"], true);

        let (status, _) = send(
            &app,
            "POST",
            "/v1/people",
            Some(json!({"name": "Alex", "bio": "Night owl"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &app,
            "POST",
            "/v1/rules",
            Some(json!({"description": "Oven off at night"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &app,
            "PUT",
            "/v1/address",
            Some(json!({"address": "12 Elm Street"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, home) = send(&app, "GET", "/v1/home", None).await;
        assert_eq!(home["devices"][0]["name"], "Oven");
        assert_eq!(home["people"][0]["bio"], "Night owl");
        assert_eq!(home["rules"][0]["description"], "Oven off at night");
        assert_eq!(home["address"], "12 Elm Street");

        let uri = format!("/v1/devices/{}", device["id"].as_str().unwrap());
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not found");
    }

    #[tokio::test]
    async fn test_empty_device_name_rejected() {
        let app = app(MockChatClient::new());
        let (status, _) = send(
            &app,
            "POST",
            "/v1/devices",
            Some(json!({"name": "", "kind": "sensor"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_prompt_preview() {
        let app = app(MockChatClient::new());
        send(
            &app,
            "POST",
            "/v1/devices",
            Some(json!({"name": "Thermostat", "kind": "sensor", "value": "21C"})),
        )
        .await;

        let request = Request::builder()
            .uri("/v1/prompt?kind=device_states")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("- Thermostat (Sensor) is 21C"));
        assert!(text.contains("\"<device name> is <state>\""));
    }

    #[tokio::test]
    async fn test_narrate_and_predict() {
        let app = app(MockChatClient::with_replies([
            "Alex turned the oven on for a midnight snack.",
            "Oven is On\nGarage is open",
        ]));
        send(
            &app,
            "POST",
            "/v1/devices",
            Some(json!({"name": "Oven", "kind": "on_off"})),
        )
        .await;

        let (status, event) = send(&app, "POST", "/v1/actions/narrate", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            event["description"],
            "Alex turned the oven on for a midnight snack."
        );

        let (status, report) = send(&app, "POST", "/v1/actions/predict", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["updates"].as_array().unwrap().len(), 1);
        assert_eq!(report["skipped"][0]["reason"], "unknown_device");
        assert_eq!(report["skipped"][0]["name"], "Garage");

        let (_, events) = send(&app, "GET", "/v1/events", None).await;
        let events = events.as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["description"], "Oven is now On");

        let uri = format!("/v1/events/{}", events[0]["id"].as_str().unwrap());
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
