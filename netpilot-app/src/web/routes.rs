use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use log::{info, warn};
use netpilot::error::{ErrorKind, ErrorReport, ValidationError};
use netpilot::session::{
    Connector, DeviceCredentials, DeviceSlot, ExecuteOptions, SessionKey, SessionManager,
};
use netpilot::template::{self, CommandTemplate};
use uuid::Uuid;

use crate::interpret::Interpreter;
use crate::web::protocol::{
    ConnectionStatus, ErrorBody, ExecuteRequest, ExecuteResponse, InterpretRequest,
    InterpretResponse, RenderRequest, RenderResponse,
};

pub const TIMEOUT_MESSAGE: &str = "Connection timeout. Please check the device IP and connectivity.";
pub const AUTH_MESSAGE: &str = "Authentication failed. Please check username and password.";

/// Context passed to the interpreter for a batch of show commands.
const BATCH_CONTEXT: &str = "Multiple show commands";

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Application state shared across routes
pub struct AppState<C: Connector> {
    pub sessions: Arc<SessionManager<C>>,
    pub interpreter: Arc<Interpreter>,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            interpreter: Arc::clone(&self.interpreter),
        }
    }
}

/// Create router with all routes
pub fn create_router<C: Connector>(state: AppState<C>) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/templates", get(list_templates))
        .route("/api/templates/:name/render", post(render_template))
        .route("/api/execute", post(execute_commands::<C>))
        .route("/api/test-connection", post(test_connection::<C>))
        .route("/api/interpret", post(interpret_output::<C>))
        .with_state(state)
}

async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /api/templates - named templates keyed by id
async fn list_templates() -> Json<BTreeMap<&'static str, &'static CommandTemplate>> {
    Json(template::TEMPLATES.iter().map(|t| (t.key, t)).collect())
}

/// POST /api/templates/:name/render - fill in a template
async fn render_template(
    Path(name): Path<String>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderResponse>, AppError> {
    let commands = template::find(&name)?.render(&request.fields)?;
    Ok(Json(RenderResponse { commands }))
}

/// POST /api/execute - run a command batch in a one-shot session
async fn execute_commands<C: Connector>(
    State(state): State<AppState<C>>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, AppError> {
    let ExecuteRequest {
        device,
        commands,
        save_config,
    } = request;

    let key = SessionKey::new(Uuid::new_v4().to_string(), DeviceSlot::Adhoc);
    info!("{}: executing {} command(s) on {}", key, commands.len(), device.host);

    state
        .sessions
        .connect(key.clone(), device)
        .await
        .map_err(AppError::Session)?;
    let outcome = state
        .sessions
        .execute(&key, &commands, ExecuteOptions { save_config })
        .await;
    state.sessions.disconnect(&key).await;
    let result = outcome.map_err(AppError::Session)?;

    let error = result.has_errors().then(|| {
        result
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.command, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    });

    let interpretation = match result.interpretation_input() {
        Some(input) if state.interpreter.is_enabled() => {
            Some(state.interpreter.interpret(&input, Some(BATCH_CONTEXT)).await)
        }
        _ => None,
    };

    Ok(Json(ExecuteResponse {
        success: true,
        output: result.combined_output,
        error,
        interpretation,
    }))
}

/// POST /api/test-connection - connect, report, disconnect. Always 200.
async fn test_connection<C: Connector>(
    State(state): State<AppState<C>>,
    Json(device): Json<DeviceCredentials>,
) -> Json<ConnectionStatus> {
    let status = match state.sessions.check_connection(device).await {
        Ok(summary) => ConnectionStatus {
            success: true,
            message: format!(
                "Successfully connected to device. Prompt: {}. {}",
                summary.prompt, summary.enable_status
            ),
        },
        Err(e) => {
            let report = ErrorReport::from(&e);
            let message = match report.kind {
                ErrorKind::Timeout => TIMEOUT_MESSAGE.to_string(),
                ErrorKind::AuthenticationFailed => AUTH_MESSAGE.to_string(),
                _ => format!("Connection error: {}", report.message),
            };
            ConnectionStatus {
                success: false,
                message,
            }
        }
    };
    Json(status)
}

/// POST /api/interpret - pass-through to the interpreter
async fn interpret_output<C: Connector>(
    State(state): State<AppState<C>>,
    Json(request): Json<InterpretRequest>,
) -> Json<InterpretResponse> {
    let interpretation = state
        .interpreter
        .interpret(&request.output, request.command.as_deref())
        .await;
    Json(InterpretResponse {
        interpretation,
        success: true,
    })
}

/// Error type for API handlers
#[derive(Debug)]
pub enum AppError {
    /// Connecting or running the batch failed.
    Session(netpilot::Error),
    /// Bad template name or fields.
    Template(ValidationError),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Template(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Session(err) => {
                let report = ErrorReport::from(&err);
                match report.kind {
                    ErrorKind::Timeout => (StatusCode::REQUEST_TIMEOUT, TIMEOUT_MESSAGE.to_string()),
                    ErrorKind::AuthenticationFailed => {
                        (StatusCode::UNAUTHORIZED, AUTH_MESSAGE.to_string())
                    }
                    ErrorKind::Validation => (StatusCode::BAD_REQUEST, report.message),
                    ErrorKind::Execution => {
                        warn!("execute failed: {}", err);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            format!("Error executing commands: {}", report.message),
                        )
                    }
                }
            }
            AppError::Template(err @ ValidationError::UnknownTemplate(_)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            AppError::Template(err) => (StatusCode::BAD_REQUEST, err.to_string()),
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::interpret::{InterpreterConfig, NOT_CONFIGURED};
    use crate::testing::{self, FakeConnector, SentLog};

    fn app() -> (Router, SentLog, Arc<SessionManager<FakeConnector>>) {
        let connector = FakeConnector::default();
        let sent = Arc::clone(&connector.sent);
        let sessions = Arc::new(SessionManager::new(connector));
        let state = AppState {
            sessions: Arc::clone(&sessions),
            interpreter: Arc::new(Interpreter::new(InterpreterConfig::default()).unwrap()),
        };
        (create_router(state), sent, sessions)
    }

    fn device(host: &str, password: &str) -> Value {
        json!({
            "device_type": "cisco_ios",
            "host": host,
            "username": "admin",
            "password": password,
            "port": 22,
            "secret": testing::ENABLE_SECRET,
        })
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index_page() {
        let (app, _, _) = app();
        let (status, body) = send(app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("/api/execute"));
    }

    #[tokio::test]
    async fn test_list_templates() {
        let (app, _, _) = app();
        let (status, body) = send(app, "GET", "/api/templates", None).await;
        assert_eq!(status, StatusCode::OK);

        let templates: Value = parse(&body);
        assert_eq!(templates["interface_config"]["name"], "Configure Interface");
        assert_eq!(templates["vlan_config"]["commands"][5], "int {interface}.{vlan_id}");
    }

    #[tokio::test]
    async fn test_render_template() {
        let (app, _, _) = app();
        let body = json!({"fields": {
            "interface": "Gi0/0",
            "vlan_id": "20",
            "ip_address": "10.0.20.1",
            "subnet_mask": "255.255.255.0",
        }});
        let (status, body) = send(app, "POST", "/api/templates/vlan_config/render", Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let rendered: RenderResponse = parse(&body);
        assert!(rendered.commands.contains(&"encapsulation dot1Q 20".to_string()));
    }

    #[tokio::test]
    async fn test_render_errors() {
        let (app, _, _) = app();
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/templates/interface_config/render",
            Some(json!({"fields": {"interface": "Gi0/1"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(parse::<ErrorBody>(&body).detail.contains("ip_address"));

        let (status, _) = send(app, "POST", "/api/templates/acl/render", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_execute_runs_show_first() {
        let (app, sent, sessions) = app();
        let body = json!({
            "device": device("192.168.122.2", testing::PASSWORD),
            "commands": ["interface Gi0/1", "show ip interface brief", "no shutdown"],
            "save_config": false,
        });
        let (status, body) = send(app, "POST", "/api/execute", Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let response: ExecuteResponse = parse(&body);
        assert!(response.success);
        assert!(response.error.is_none());
        assert!(response.output.starts_with("\nR1#show ip interface brief\n"));
        // No API key configured.
        assert!(response.interpretation.is_none());

        assert_eq!(
            *sent.lock().unwrap(),
            vec!["show ip interface brief", "interface Gi0/1", "no shutdown"]
        );
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_execute_saves_by_default() {
        let (app, sent, _) = app();
        let body = json!({
            "device": device("192.168.122.2", testing::PASSWORD),
            "commands": ["hostname R2"],
        });
        let (status, body) = send(app, "POST", "/api/execute", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(parse::<ExecuteResponse>(&body).output.ends_with("[OK]"));
        assert_eq!(sent.lock().unwrap().last().unwrap(), "write memory");
    }

    #[tokio::test]
    async fn test_execute_error_statuses() {
        let (app, _, _) = app();

        let cases = [
            (device(testing::UNREACHABLE, testing::PASSWORD), StatusCode::REQUEST_TIMEOUT),
            (device("192.168.122.2", "wrong"), StatusCode::UNAUTHORIZED),
            (device("", testing::PASSWORD), StatusCode::BAD_REQUEST),
            (device(testing::SLOW, testing::PASSWORD), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (device, expected) in cases {
            let body = json!({"device": device, "commands": ["show clock"]});
            let (status, body) = send(app.clone(), "POST", "/api/execute", Some(body)).await;
            assert_eq!(status, expected);

            let detail = parse::<ErrorBody>(&body).detail;
            match expected {
                StatusCode::REQUEST_TIMEOUT => assert_eq!(detail, TIMEOUT_MESSAGE),
                StatusCode::UNAUTHORIZED => assert_eq!(detail, AUTH_MESSAGE),
                StatusCode::INTERNAL_SERVER_ERROR => {
                    assert!(detail.starts_with("Error executing commands: "));
                    assert!(detail.contains("This usually means"));
                }
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_connection_check() {
        let (app, _, sessions) = app();
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/test-connection",
            Some(device("192.168.122.2", testing::PASSWORD)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let result: ConnectionStatus = parse(&body);
        assert!(result.success);
        assert_eq!(
            result.message,
            "Successfully connected to device. Prompt: R1#. Enable mode accessible"
        );
        assert!(sessions.is_empty().await);

        let (status, body) = send(
            app,
            "POST",
            "/api/test-connection",
            Some(device("192.168.122.2", "wrong")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let result: ConnectionStatus = parse(&body);
        assert!(!result.success);
        assert_eq!(result.message, AUTH_MESSAGE);
    }

    #[tokio::test]
    async fn test_interpret_without_key() {
        let (app, _, _) = app();
        let body = json!({"output": "Gi0/1 up up"});
        let (status, body) = send(app, "POST", "/api/interpret", Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let response: InterpretResponse = parse(&body);
        assert!(response.success);
        assert_eq!(response.interpretation, NOT_CONFIGURED);
    }
}
