use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use netpilot::session::{SessionManager, SshConnector};
use secrecy::SecretString;

use netpilot_app::chat::{BotApi, Conversation, TelegramBot};
use netpilot_app::config::{Cli, Command};
use netpilot_app::interpret::Interpreter;
use netpilot_app::web::{WebServer, WebServerConfig};

/// How often idle sessions are looked for.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let session_config = cli.session.session_config();
    let idle_timeout = session_config.idle_timeout;
    let sessions = Arc::new(SessionManager::new(SshConnector::new(session_config)));
    let sweeper = sessions.spawn_idle_sweeper(SWEEP_INTERVAL, idle_timeout);

    let outcome = match cli.command {
        Command::Serve(args) => {
            let interpreter = Interpreter::new(cli.interpreter.interpreter_config())?;
            if interpreter.is_enabled() {
                info!("output interpretation enabled ({})", interpreter.model());
            } else {
                warn!("OPENAI_API_KEY not set, output interpretation disabled");
            }
            let config = WebServerConfig {
                bind_addr: args.bind,
                web_dir: args.web_dir,
            };
            WebServer::new(config, Arc::clone(&sessions), Arc::new(interpreter))
                .start(shutdown_signal())
                .await
        }
        Command::Bot(args) => {
            let api = BotApi::new(SecretString::from(args.token), args.api_url)?;
            let conversation = Arc::new(Conversation::new(Arc::clone(&sessions)));
            TelegramBot::new(
                api,
                conversation,
                Duration::from_secs(args.poll_timeout),
                idle_timeout,
            )
            .run(shutdown_signal())
            .await
        }
    };

    sweeper.abort();
    sessions.shutdown().await;
    outcome
}
