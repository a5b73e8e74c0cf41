use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use netpilot::session::{Connector, SessionManager};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::interpret::Interpreter;
use crate::web::routes::{self, AppState};

/// Web server configuration
pub struct WebServerConfig {
    pub bind_addr: SocketAddr,
    pub web_dir: Option<PathBuf>,
}

/// Web server instance
pub struct WebServer<C: Connector> {
    config: WebServerConfig,
    state: AppState<C>,
}

impl<C: Connector> WebServer<C> {
    pub fn new(
        config: WebServerConfig,
        sessions: Arc<SessionManager<C>>,
        interpreter: Arc<Interpreter>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                sessions,
                interpreter,
            },
        }
    }

    /// Serve until `shutdown` resolves.
    pub async fn start(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let mut app = routes::create_router(self.state);

        if let Some(web_dir) = &self.config.web_dir {
            if web_dir.exists() {
                info!("serving static files from {}", web_dir.display());
                app = app.nest_service("/static", ServeDir::new(web_dir));
            } else {
                warn!("web dir {} does not exist, /static disabled", web_dir.display());
            }
        }

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        let app = app.layer(cors).layer(TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr)
            .await
            .with_context(|| format!("binding {}", self.config.bind_addr))?;
        info!("web server listening on http://{}", self.config.bind_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
