//! The session registry: at most one live device session per key.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::batch::CommandBatch;
use super::connector::Connector;
use super::credentials::{DeviceCredentials, DeviceInfo};
use super::result::ExecutionResult;
use crate::driver::Driver;
use crate::error::{DriverError, Result};

/// The device role a session is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSlot {
    Router,
    Switch,
    /// One-shot sessions (a single web request).
    Adhoc,
}

impl fmt::Display for DeviceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceSlot::Router => "router",
            DeviceSlot::Switch => "switch",
            DeviceSlot::Adhoc => "adhoc",
        };
        f.write_str(name)
    }
}

/// Who a session belongs to and which slot it fills.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    /// Chat user id, web request id, ...
    pub owner: String,
    pub slot: DeviceSlot,
}

impl SessionKey {
    pub fn new(owner: impl Into<String>, slot: DeviceSlot) -> Self {
        Self {
            owner: owner.into(),
            slot,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.slot)
    }
}

/// Outcome of the opportunistic enable attempt made on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum EnableStatus {
    AlreadyEnabled,
    Entered,
    Failed(String),
}

impl EnableStatus {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EnableStatus::Failed(_))
    }
}

impl fmt::Display for EnableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnableStatus::AlreadyEnabled => f.write_str("Already in enable mode"),
            EnableStatus::Entered => f.write_str("Enable mode accessible"),
            EnableStatus::Failed(reason) => {
                write!(f, "Enable mode requires password or failed: {reason}")
            }
        }
    }
}

/// A secret-free view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub device: DeviceInfo,
    pub prompt: String,
    pub enable_status: EnableStatus,
    pub connected: bool,
}

/// Options for [`SessionManager::execute`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Persist the running configuration after the batch.
    pub save_config: bool,
}

/// One live device session. Holds no secrets.
pub struct Session<D> {
    info: DeviceInfo,
    driver: D,
    connected: bool,
    last_prompt: String,
    enable_status: EnableStatus,
    last_used: Instant,
}

impl<D: Driver> Session<D> {
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn last_prompt(&self) -> &str {
        &self.last_prompt
    }

    pub fn enable_status(&self) -> &EnableStatus {
        &self.enable_status
    }

    pub fn is_connected(&self) -> bool {
        self.connected && self.driver.is_alive()
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            device: self.info.clone(),
            prompt: self.last_prompt.clone(),
            enable_status: self.enable_status.clone(),
            connected: self.is_connected(),
        }
    }

    fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DriverError::NotConnected.into())
        }
    }

    async fn run_batch(&mut self, batch: &CommandBatch, save: bool) -> ExecutionResult {
        let mut result = ExecutionResult::default();

        for command in &batch.show {
            match self.driver.send_command(command).await {
                Ok(response) => {
                    self.last_prompt = response.prompt.clone();
                    result.record_show(&response);
                }
                Err(e) => {
                    warn!("{}: '{}' failed: {}", self.info.host, command, e);
                    result.record_show_error(command, &e);
                }
            }
        }

        if !batch.config.is_empty() {
            let commands: Vec<&str> = batch.config.iter().map(String::as_str).collect();
            match self.driver.send_config(&commands).await {
                Ok(responses) => result.record_config(&responses),
                Err(e) => {
                    warn!("{}: configuration block failed: {}", self.info.host, e);
                    result.record_config_error(&e);
                }
            }
        }

        if save {
            match self.driver.save_config().await {
                Ok(response) => {
                    self.last_prompt = response.prompt.clone();
                    result.record_save(&response);
                }
                Err(e) => {
                    warn!("{}: save failed: {}", self.info.host, e);
                    result.record_save_error(&e);
                }
            }
        } else {
            for command in &batch.dropped_saves {
                result.record_dropped_save(command);
            }
        }

        self.connected = self.driver.is_alive();
        result
    }

    /// Best effort: the session counts as closed even if the device never
    /// acknowledges.
    async fn close(&mut self) {
        if let Err(e) = self.driver.close().await {
            debug!("{}: close failed: {}", self.info.host, e);
        }
        self.connected = false;
    }
}

/// Check the prompt and try enable mode on a freshly opened driver.
///
/// `secret` is dropped by the caller right after this returns.
async fn establish<D: Driver>(
    driver: &mut D,
    info: &DeviceInfo,
    secret: Option<&SecretString>,
) -> Result<(String, EnableStatus)> {
    let prompt = driver.find_prompt().await?;

    let enable_status = match driver.check_enable_mode().await {
        Ok(true) => EnableStatus::AlreadyEnabled,
        Ok(false) => match driver.enable(secret).await {
            Ok(()) => EnableStatus::Entered,
            Err(e) => EnableStatus::Failed(e.to_string()),
        },
        Err(e) => EnableStatus::Failed(e.to_string()),
    };

    if let EnableStatus::Failed(reason) = &enable_status {
        warn!("{}: continuing in user mode: {}", info, reason);
        return Ok((prompt, enable_status));
    }

    // The prompt changes from `>` to `#` on enable.
    let prompt = match driver.find_prompt().await {
        Ok(current) => current,
        Err(e) => {
            debug!("{}: prompt re-read failed: {}", info, e);
            prompt
        }
    };
    Ok((prompt, enable_status))
}

/// Registry of live device sessions.
///
/// Operations on one session are serialized by that session's mutex;
/// sessions under different keys run concurrently. The registry lock is
/// never held across network I/O.
pub struct SessionManager<C: Connector> {
    connector: C,
    sessions: RwLock<HashMap<SessionKey, Arc<Mutex<Session<C::Driver>>>>>,
}

impl<C: Connector> SessionManager<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Open a session for `key`, replacing (and closing) any existing one.
    ///
    /// Enable mode is attempted with the credentials' enable secret; failing
    /// to enter it is recorded in the summary, not returned as an error.
    pub async fn connect(
        &self,
        key: SessionKey,
        mut credentials: DeviceCredentials,
    ) -> Result<SessionSummary> {
        credentials.validate()?;
        let info = DeviceInfo::from(&credentials);
        let secret = credentials.secret.take();

        let previous = self.sessions.write().await.remove(&key);
        if let Some(previous) = previous {
            info!("{}: replacing existing session", key);
            previous.lock().await.close().await;
        }

        let mut driver = self.connector.connect(credentials).await?;
        let established = establish(&mut driver, &info, secret.as_ref()).await;
        drop(secret);

        let (prompt, enable_status) = match established {
            Ok(state) => state,
            Err(e) => {
                if let Err(close_err) = driver.close().await {
                    debug!("{}: close after failed connect: {}", info, close_err);
                }
                return Err(e);
            }
        };

        let session = Session {
            info,
            driver,
            connected: true,
            last_prompt: prompt,
            enable_status,
            last_used: Instant::now(),
        };
        let summary = session.summary();
        info!("{}: connected to {} at '{}'", key, summary.device, summary.prompt);

        let raced = self
            .sessions
            .write()
            .await
            .insert(key.clone(), Arc::new(Mutex::new(session)));
        if let Some(raced) = raced {
            debug!("{}: closing session from a concurrent connect", key);
            raced.lock().await.close().await;
        }
        Ok(summary)
    }

    /// Connect, report the prompt and enable status, disconnect. Nothing is
    /// registered.
    pub async fn check_connection(
        &self,
        mut credentials: DeviceCredentials,
    ) -> Result<SessionSummary> {
        credentials.validate()?;
        let info = DeviceInfo::from(&credentials);
        let secret = credentials.secret.take();

        let mut driver = self.connector.connect(credentials).await?;
        let established = establish(&mut driver, &info, secret.as_ref()).await;
        drop(secret);

        if let Err(e) = driver.close().await {
            debug!("{}: close after connection check: {}", info, e);
        }
        let (prompt, enable_status) = established?;
        Ok(SessionSummary {
            device: info,
            prompt,
            enable_status,
            connected: false,
        })
    }

    async fn session(&self, key: &SessionKey) -> Result<Arc<Mutex<Session<C::Driver>>>> {
        self.sessions
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| DriverError::NotConnected.into())
    }

    /// Run a free-form command list: show commands first, then one
    /// configuration block, then the optional save.
    ///
    /// Per-command failures are recorded in the result; only a missing or
    /// dead session is an error.
    pub async fn execute<S: AsRef<str>>(
        &self,
        key: &SessionKey,
        commands: &[S],
        options: ExecuteOptions,
    ) -> Result<ExecutionResult> {
        let batch = CommandBatch::classify(commands);
        let session = self.session(key).await?;
        let mut session = session.lock().await;
        session.ensure_connected()?;
        session.touch();

        debug!(
            "{}: {} show, {} config, save={}",
            key,
            batch.show.len(),
            batch.config.len(),
            options.save_config
        );
        Ok(session.run_batch(&batch, options.save_config).await)
    }

    /// Apply a configuration script as one block, optionally saving.
    pub async fn apply_config<S: AsRef<str>>(
        &self,
        key: &SessionKey,
        commands: &[S],
        save: bool,
    ) -> Result<ExecutionResult> {
        let batch = CommandBatch::config_script(commands);
        let session = self.session(key).await?;
        let mut session = session.lock().await;
        session.ensure_connected()?;
        session.touch();
        Ok(session.run_batch(&batch, save).await)
    }

    /// Run one show command and return its output.
    pub async fn run_show(&self, key: &SessionKey, command: &str) -> Result<String> {
        let session = self.session(key).await?;
        let mut session = session.lock().await;
        session.ensure_connected()?;
        session.touch();

        let response = session.driver.send_command(command).await?;
        session.last_prompt = response.prompt.clone();
        match response.failure_detail() {
            Some(message) => Err(DriverError::CommandFailed { message }.into()),
            None => Ok(response.result),
        }
    }

    /// Close and forget the session under `key`. Returns whether one existed;
    /// disconnecting twice is not an error.
    pub async fn disconnect(&self, key: &SessionKey) -> bool {
        let removed = self.sessions.write().await.remove(key);
        match removed {
            Some(session) => {
                session.lock().await.close().await;
                info!("{}: disconnected", key);
                true
            }
            None => false,
        }
    }

    pub async fn is_connected(&self, key: &SessionKey) -> bool {
        match self.session(key).await {
            Ok(session) => session.lock().await.is_connected(),
            Err(_) => false,
        }
    }

    pub async fn info(&self, key: &SessionKey) -> Option<SessionSummary> {
        let session = self.session(key).await.ok()?;
        let session = session.lock().await;
        Some(session.summary())
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Close sessions idle for at least `max_idle`, and dead ones. A session
    /// busy with a command is never idle. Returns how many were closed.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();
        {
            let mut sessions = self.sessions.write().await;
            sessions.retain(|key, session| {
                let stale = match session.try_lock() {
                    Ok(s) => now.saturating_duration_since(s.last_used) >= max_idle || !s.is_connected(),
                    Err(_) => false,
                };
                if stale {
                    expired.push((key.clone(), Arc::clone(session)));
                }
                !stale
            });
        }

        let count = expired.len();
        for (key, session) in expired {
            session.lock().await.close().await;
            info!("{}: closed after idling", key);
        }
        count
    }

    /// Sweep every `interval` with the given idle limit. The task ends once
    /// the manager is dropped.
    pub fn spawn_idle_sweeper(self: &Arc<Self>, interval: Duration, max_idle: Duration) -> JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let closed = manager.sweep_idle(max_idle).await;
                if closed > 0 {
                    debug!("idle sweep closed {} session(s)", closed);
                }
            }
        })
    }

    /// Close every session.
    pub async fn shutdown(&self) {
        let drained: Vec<_> = self.sessions.write().await.drain().collect();
        for (key, session) in drained {
            session.lock().await.close().await;
            debug!("{}: closed on shutdown", key);
        }
    }
}
