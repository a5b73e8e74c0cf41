//! Turning credentials into an open driver.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use log::debug;

use super::credentials::DeviceCredentials;
use crate::driver::{Driver, DriverBuilder, GenericDriver};
use crate::error::Result;
use crate::transport::HostKeyVerification;

/// Timeouts and SSH policy shared by every session a manager opens.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on TCP connect, key exchange and login.
    pub connect_timeout: Duration,

    /// Bound on each wait for a prompt.
    pub read_timeout: Duration,

    /// Verbose transcript of every session, appended to one file.
    pub transcript_path: Option<PathBuf>,

    pub host_key_verification: HostKeyVerification,

    /// Sessions unused for this long are closed by the idle sweep.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(20),
            transcript_path: None,
            host_key_verification: HostKeyVerification::default(),
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Opens drivers. The seam between the session manager and the network.
pub trait Connector: Send + Sync + 'static {
    type Driver: Driver + 'static;

    /// Connect and log in. The credentials are consumed; the returned driver
    /// keeps no login secret.
    fn connect(
        &self,
        credentials: DeviceCredentials,
    ) -> impl Future<Output = Result<Self::Driver>> + Send;
}

/// Connects over SSH with [`GenericDriver`].
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    config: SessionConfig,
}

impl SshConnector {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Connector for SshConnector {
    type Driver = GenericDriver;

    async fn connect(&self, credentials: DeviceCredentials) -> Result<GenericDriver> {
        credentials.validate()?;
        let DeviceCredentials {
            host,
            username,
            password,
            port,
            device_type,
            ..
        } = credentials;

        debug!("opening {}@{}:{} as {}", username, host, port, device_type);

        let mut builder = DriverBuilder::new(host)
            .port(port)
            .username(username)
            .password(password)
            .platform(device_type)
            .timeout(self.config.connect_timeout)
            .read_timeout(self.config.read_timeout)
            .host_key_verification(self.config.host_key_verification);
        if let Some(path) = &self.config.transcript_path {
            builder = builder.transcript_path(path.clone());
        }

        let mut driver = builder.build()?;
        driver.open().await?;
        Ok(driver)
    }
}
