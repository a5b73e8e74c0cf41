//! Generic driver implementation that works with any platform.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::Driver;
use super::config_session::ConfigModeSession;
use super::privilege::PrivilegeManager;
use super::response::Response;
use crate::channel::{DEFAULT_SEARCH_DEPTH, PtyChannel, SessionTranscript, last_line};
use crate::error::{ChannelError, DriverError, Result};
use crate::platform::{DefaultBehavior, PlatformDefinition, VendorBehavior};
use crate::transport::{SshConfig, SshTransport};

/// Password prompts answered during one escalation before giving up.
/// IOS asks three times before printing `% Bad secrets`.
const MAX_SECRET_PROMPTS: usize = 3;

/// Driver for any platform definition, over an SSH PTY channel.
///
/// This handles:
/// - SSH transport and shell channel lifetime
/// - Command execution bounded by the device prompt
/// - Privilege level navigation, including the enable password exchange
/// - Vendor-specific output normalization
pub struct GenericDriver {
    ssh_config: SshConfig,
    platform: PlatformDefinition,
    behavior: Arc<dyn VendorBehavior>,
    transport: Option<SshTransport>,
    channel: Option<PtyChannel>,
    privilege_manager: PrivilegeManager,

    /// Bound on each wait for a prompt.
    read_timeout: Duration,

    /// Any privilege level's prompt.
    prompt_pattern: Regex,

    transcript_path: Option<PathBuf>,
}

impl std::fmt::Debug for GenericDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericDriver")
            .field("ssh_config", &self.ssh_config)
            .field("platform", &self.platform)
            .field("is_open", &self.channel.is_some())
            .field("privilege_manager", &self.privilege_manager)
            .field("read_timeout", &self.read_timeout)
            .field("transcript_path", &self.transcript_path)
            .finish_non_exhaustive()
    }
}

impl GenericDriver {
    /// Create a driver. Nothing is sent until [`Driver::open`].
    pub fn new(ssh_config: SshConfig, platform: PlatformDefinition) -> Result<Self> {
        let prompt_pattern = combined_prompt_pattern(&platform)?;
        let behavior = platform
            .behavior
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultBehavior));
        let privilege_manager = PrivilegeManager::new(platform.privilege_levels.clone());
        let read_timeout = ssh_config.timeout;

        Ok(Self {
            ssh_config,
            platform,
            behavior,
            transport: None,
            channel: None,
            privilege_manager,
            read_timeout,
            prompt_pattern,
            transcript_path: None,
        })
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Append a verbose transcript of the session to `path`.
    pub fn set_transcript_path(&mut self, path: Option<PathBuf>) {
        self.transcript_path = path;
    }

    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    pub fn host(&self) -> &str {
        &self.ssh_config.host
    }

    /// Whether the login secret is still held (only before `open`).
    pub fn holds_secret(&self) -> bool {
        self.ssh_config.auth.holds_secret()
    }

    fn channel_mut(&mut self) -> Result<&mut PtyChannel> {
        self.channel
            .as_mut()
            .ok_or_else(|| DriverError::NotConnected.into())
    }

    /// Read up to the next prompt. Returns the raw output and the prompt.
    async fn read_until_prompt(&mut self) -> Result<(String, String)> {
        let timeout = self.read_timeout;
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;
        let data = channel
            .read_until_prompt(&self.prompt_pattern, timeout)
            .await?;

        let prompt = String::from_utf8_lossy(last_line(&data)).into_owned();
        let raw = String::from_utf8_lossy(&data).into_owned();
        self.track_prompt(&prompt);
        Ok((raw, prompt))
    }

    fn track_prompt(&mut self, prompt: &str) {
        if let Err(e) = self.privilege_manager.observe_prompt(prompt) {
            debug!("{}: {}", self.ssh_config.host, e);
            self.privilege_manager.forget_current();
        }
    }

    /// Everything after the handshake: first prompt, paging off.
    async fn prepare_session(&mut self) -> Result<()> {
        let (_, prompt) = self.read_until_prompt().await?;
        info!(
            "{}: connected at '{}' ({})",
            self.ssh_config.host,
            prompt,
            self.privilege_manager.current().unwrap_or("unknown level")
        );

        for command in self.platform.on_open_commands.clone() {
            let response = self.send_command(&command).await?;
            if let Some(failure) = response.failure_message {
                debug!("{}: '{}' rejected: {}", self.ssh_config.host, command, failure);
            }
        }
        Ok(())
    }

    /// Walk the privilege graph to `target`, answering password prompts
    /// with `secret`.
    async fn navigate(&mut self, target: &str, secret: Option<&SecretString>) -> Result<()> {
        let current = match self.privilege_manager.current() {
            Some(current) => current.to_string(),
            None => {
                let prompt = self.find_prompt().await?;
                self.privilege_manager
                    .current()
                    .map(str::to_string)
                    .ok_or(DriverError::UnknownPrivilege { prompt })?
            }
        };

        let path = self.privilege_manager.route(&current, target)?;
        for hop in path.windows(2) {
            let (from, to) = (&hop[0], &hop[1]);
            let transition = self.privilege_manager.transition(from, to).ok_or_else(|| {
                DriverError::NoPrivilegePath {
                    from: from.clone(),
                    to: to.clone(),
                }
            })?;

            debug!(
                "{}: {} -> {} via '{}'",
                self.ssh_config.host, from, to, transition.command
            );
            self.channel_mut()?.send(&transition.command).await?;

            match &transition.auth_prompt {
                Some(auth_prompt) => self.answer_secret_prompt(auth_prompt, secret).await?,
                None => {
                    self.read_until_prompt().await?;
                }
            }

            if self.privilege_manager.current() != Some(to.as_str()) {
                return Err(DriverError::PrivilegeAcquisitionFailed { target: to.clone() }.into());
            }
        }
        Ok(())
    }

    /// Handle the exchange after an escalation command that may ask for a
    /// password. Ends once a regular prompt is back.
    async fn answer_secret_prompt(
        &mut self,
        auth_prompt: &Regex,
        secret: Option<&SecretString>,
    ) -> Result<()> {
        let either = Regex::new(&format!(
            "(?:{})|(?:{})",
            auth_prompt.as_str(),
            self.prompt_pattern.as_str()
        ))
        .map_err(ChannelError::InvalidPattern)?;
        let timeout = self.read_timeout;
        let mut answered = false;

        for round in 0..=MAX_SECRET_PROMPTS {
            let data = self
                .channel_mut()?
                .read_until_prompt(&either, timeout)
                .await?;
            let line = String::from_utf8_lossy(last_line(&data)).into_owned();

            if !auth_prompt.is_match(line.as_bytes()) {
                self.track_prompt(&line);
                return Ok(());
            }
            if round == MAX_SECRET_PROMPTS {
                break;
            }

            let channel = self.channel_mut()?;
            match secret {
                Some(secret) if !answered => {
                    channel.send_hidden(secret.expose_secret()).await?;
                    answered = true;
                }
                // A rejected or missing secret: send blank answers until the
                // device gives up and returns a prompt.
                _ => channel.send("").await?,
            }
        }

        Err(DriverError::PrivilegeAcquisitionFailed {
            target: "password prompt did not clear".to_string(),
        }
        .into())
    }
}

/// One pattern matching the prompt of every privilege level.
fn combined_prompt_pattern(platform: &PlatformDefinition) -> Result<Regex> {
    let alternatives: Vec<String> = platform
        .privilege_levels
        .values()
        .map(|level| format!("(?:{})", level.pattern.as_str()))
        .collect();

    if alternatives.is_empty() {
        return Err(DriverError::InvalidConfig {
            message: format!("platform '{}' defines no privilege levels", platform.name),
        }
        .into());
    }

    Regex::new(&alternatives.join("|")).map_err(|e| ChannelError::InvalidPattern(e).into())
}

impl Driver for GenericDriver {
    async fn open(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let connected = SshTransport::connect(&self.ssh_config).await;
        // Spent whether or not the handshake succeeded.
        self.ssh_config.forget_secret();
        let transport = connected?;

        let raw_channel = transport.open_channel().await?;
        let transcript = match &self.transcript_path {
            Some(path) => match SessionTranscript::open(path).await {
                Ok(transcript) => Some(transcript),
                Err(e) => {
                    warn!("{}: transcript disabled: {}", self.ssh_config.host, e);
                    None
                }
            },
            None => None,
        };

        self.transport = Some(transport);
        self.channel = Some(PtyChannel::new(
            raw_channel,
            DEFAULT_SEARCH_DEPTH,
            transcript,
        ));

        if let Err(e) = self.prepare_session().await {
            if let Err(close_err) = self.close().await {
                debug!("{}: close after failed open: {}", self.ssh_config.host, close_err);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.privilege_manager.forget_current();

        match self.transport.take() {
            Some(transport) => {
                debug!("{}: disconnecting", self.ssh_config.host);
                transport.close().await
            }
            None => Ok(()),
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();
        self.channel_mut()?.send(command).await?;
        let (raw_result, prompt) = self.read_until_prompt().await?;

        let result = self.behavior.normalize_output(&raw_result, command);
        let failure = self
            .behavior
            .detect_failure(&result)
            .or_else(|| self.platform.failure_in(&result).map(str::to_string));
        let response = Response::new(command, result, raw_result, prompt, start.elapsed());

        Ok(match failure {
            Some(message) => {
                debug!("{}: '{}' failed: {}", self.ssh_config.host, command, message);
                response.with_failure(message)
            }
            None => response,
        })
    }

    async fn send_config(&mut self, commands: &[&str]) -> Result<Vec<Response>> {
        let mut session = ConfigModeSession::enter(self).await?;
        let mut responses = Vec::with_capacity(commands.len());

        for command in commands {
            match session.send_command(command).await {
                Ok(response) => responses.push(response),
                Err(e) => {
                    session.abandon();
                    return Err(e);
                }
            }
        }

        session.finish().await?;
        Ok(responses)
    }

    async fn save_config(&mut self) -> Result<Response> {
        let command = self.platform.save_command.clone();
        if command.is_empty() {
            return Err(DriverError::InvalidConfig {
                message: format!("platform '{}' has no save command", self.platform.name),
            }
            .into());
        }

        let level = self.platform.default_privilege.clone();
        self.acquire_privilege(&level).await?;
        self.send_command(&command).await
    }

    async fn find_prompt(&mut self) -> Result<String> {
        let channel = self.channel_mut()?;
        channel.clear_buffer();
        channel.send("").await?;
        let (_, prompt) = self.read_until_prompt().await?;
        Ok(prompt)
    }

    async fn check_enable_mode(&mut self) -> Result<bool> {
        self.find_prompt().await?;
        let privileged = self.platform.default_privilege.as_str();
        Ok(self
            .privilege_manager
            .current()
            .is_some_and(|current| self.privilege_manager.is_within(current, privileged)))
    }

    async fn enable(&mut self, secret: Option<&SecretString>) -> Result<()> {
        if self.check_enable_mode().await? {
            return Ok(());
        }
        let target = self.platform.default_privilege.clone();
        self.navigate(&target, secret).await
    }

    async fn acquire_privilege(&mut self, target: &str) -> Result<()> {
        self.navigate(target, None).await
    }

    fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    fn is_alive(&self) -> bool {
        let transport_up = self
            .transport
            .as_ref()
            .is_some_and(|transport| !transport.is_closed());
        let channel_up = self.channel.as_ref().is_some_and(PtyChannel::is_open);
        transport_up && channel_up
    }

    fn current_privilege(&self) -> Option<&str> {
        self.privilege_manager.current()
    }
}
