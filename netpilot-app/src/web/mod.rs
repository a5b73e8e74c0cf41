//! HTTP front end: the form page and the JSON API.

pub mod protocol;
pub mod routes;
pub mod server;

pub use routes::{AppError, AppState, create_router};
pub use server::{WebServer, WebServerConfig};
