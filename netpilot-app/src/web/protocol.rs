//! Request and response bodies of the HTTP API.

use netpilot::session::DeviceCredentials;
use netpilot::template::Fields;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// `POST /api/execute`
#[derive(Deserialize)]
pub struct ExecuteRequest {
    pub device: DeviceCredentials,
    pub commands: Vec<String>,
    #[serde(default = "default_true")]
    pub save_config: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub interpretation: Option<String>,
}

/// `POST /api/test-connection` takes a bare [`DeviceCredentials`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

/// `POST /api/interpret`
#[derive(Debug, Deserialize)]
pub struct InterpretRequest {
    pub output: String,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InterpretResponse {
    pub interpretation: String,
    pub success: bool,
}

/// `POST /api/templates/:name/render`
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenderResponse {
    pub commands: Vec<String>,
}

/// Body of every non-2xx answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
