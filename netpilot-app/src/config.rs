//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use netpilot::session::SessionConfig;
use netpilot::transport::HostKeyVerification;
use secrecy::SecretString;

use crate::chat::telegram::DEFAULT_API_URL;
use crate::interpret::{DEFAULT_BASE_URL, DEFAULT_MODEL, InterpreterConfig};

/// CLI arguments for netpilot
#[derive(Parser, Debug)]
#[command(name = "netpilot")]
#[command(about = "Configure Cisco IOS devices over SSH from a web form or a Telegram chat")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub session: SessionArgs,

    #[command(flatten)]
    pub interpreter: InterpreterArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API and the web form
    Serve(ServeArgs),

    /// Run the Telegram bot
    Bot(BotArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "NETPILOT_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Directory served under /static
    #[arg(long, env = "NETPILOT_WEB_DIR", value_name = "DIR")]
    pub web_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BotArgs {
    /// Telegram Bot API token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Long-polling timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub poll_timeout: u64,

    #[arg(long, env = "TELEGRAM_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

/// SSH host key policy, as in OpenSSH's `StrictHostKeyChecking`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKeyPolicy {
    Strict,
    AcceptNew,
    Disabled,
}

impl From<HostKeyPolicy> for HostKeyVerification {
    fn from(policy: HostKeyPolicy) -> Self {
        match policy {
            HostKeyPolicy::Strict => HostKeyVerification::Strict,
            HostKeyPolicy::AcceptNew => HostKeyVerification::AcceptNew,
            HostKeyPolicy::Disabled => HostKeyVerification::Disabled,
        }
    }
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Seconds allowed for connect and login
    #[arg(long, env = "NETPILOT_CONNECT_TIMEOUT", default_value_t = 30)]
    pub connect_timeout: u64,

    /// Seconds to wait for each prompt
    #[arg(long, env = "NETPILOT_READ_TIMEOUT", default_value_t = 20)]
    pub read_timeout: u64,

    /// Close sessions idle for this many seconds
    #[arg(long, env = "NETPILOT_IDLE_TIMEOUT", default_value_t = 1800)]
    pub idle_timeout: u64,

    /// Append a transcript of every session to this file
    #[arg(long, env = "NETPILOT_TRANSCRIPT", value_name = "FILE")]
    pub transcript: Option<PathBuf>,

    #[arg(long, env = "NETPILOT_HOST_KEYS", value_enum, default_value_t = HostKeyPolicy::AcceptNew)]
    pub host_keys: HostKeyPolicy,
}

impl SessionArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            transcript_path: self.transcript.clone(),
            host_key_verification: self.host_keys.into(),
            idle_timeout: Duration::from_secs(self.idle_timeout),
        }
    }
}

#[derive(Args, Debug)]
pub struct InterpreterArgs {
    /// API key for output interpretation; without it interpretation is off
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,
}

impl InterpreterArgs {
    pub fn interpreter_config(&self) -> InterpreterConfig {
        InterpreterConfig {
            api_key: self
                .api_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from),
            model: self.model.clone(),
            base_url: self.api_base_url.clone(),
            ..InterpreterConfig::default()
        }
    }
}
