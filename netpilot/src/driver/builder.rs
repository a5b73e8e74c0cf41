//! Builder for creating device drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::generic::GenericDriver;
use crate::error::{DriverError, Result, ValidationError};
use crate::platform::{PlatformDefinition, PlatformRegistry};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

/// Platform used when none is given.
pub const DEFAULT_PLATFORM: &str = "cisco_ios";

/// Builder for constructing device drivers.
///
/// # Example
///
/// ```rust,no_run
/// use netpilot::driver::{Driver, DriverBuilder};
/// use secrecy::SecretString;
///
/// # async fn example() -> Result<(), netpilot::Error> {
/// let mut driver = DriverBuilder::new("192.168.122.2")
///     .username("admin")
///     .password(SecretString::from("cisco"))
///     .platform("cisco_ios")
///     .build()?;
/// driver.open().await?;
/// let response = driver.send_command("show ip interface brief").await?;
/// println!("{}", response.result);
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    platform_name: String,
    custom_platform: Option<PlatformDefinition>,
    timeout: Duration,
    read_timeout: Option<Duration>,
    terminal_size: Option<(u32, u32)>,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    transcript_path: Option<PathBuf>,
}

impl DriverBuilder {
    /// Create a new driver builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            platform_name: DEFAULT_PLATFORM.to_string(),
            custom_platform: None,
            timeout: Duration::from_secs(30),
            read_timeout: None,
            terminal_size: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            transcript_path: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: SecretString) -> Self {
        self.auth = AuthMethod::Password(password);
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>, passphrase: Option<SecretString>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase,
        };
        self
    }

    /// Set the platform by registry name (default: `cisco_ios`).
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform_name = platform.into();
        self
    }

    /// Use a platform definition that is not in the registry.
    pub fn custom_platform(mut self, platform: PlatformDefinition) -> Self {
        self.custom_platform = Some(platform);
        self
    }

    /// Bound on TCP connect, key exchange and authentication.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound on each wait for a prompt (defaults to the connect timeout).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Override the platform's terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_size = Some((width, height));
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Append a verbose session transcript to this file.
    pub fn transcript_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript_path = Some(path.into());
        self
    }

    /// Build the driver.
    ///
    /// This does not connect. Call `open()` on the returned driver.
    pub fn build(self) -> Result<GenericDriver> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::EmptyHost.into());
        }
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "username is required".to_string(),
        })?;

        let platform = match self.custom_platform {
            Some(custom) => custom,
            None => PlatformRegistry::resolve(&self.platform_name)?,
        };
        let (terminal_width, terminal_height) = self
            .terminal_size
            .unwrap_or((platform.terminal_width, platform.terminal_height));

        let ssh_config = SshConfig {
            host: self.host.trim().to_string(),
            port: self.port,
            username,
            auth: self.auth,
            timeout: self.timeout,
            terminal_width,
            terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        let mut driver = GenericDriver::new(ssh_config, platform)?;
        if let Some(read_timeout) = self.read_timeout {
            driver.set_read_timeout(read_timeout);
        }
        driver.set_transcript_path(self.transcript_path);
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Driver;
    use crate::error::{Error, ErrorKind};

    #[test]
    fn test_build_defaults_to_cisco_ios() {
        let driver = DriverBuilder::new("10.0.0.1")
            .username("admin")
            .password(SecretString::from("cisco"))
            .build()
            .unwrap();
        assert_eq!(driver.platform().name, "cisco_ios");
        assert!(!driver.is_open());
    }

    #[test]
    fn test_build_requires_username() {
        let err = DriverBuilder::new("10.0.0.1").build().unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::InvalidConfig { .. })));
    }

    #[test]
    fn test_build_rejects_empty_host() {
        let err = DriverBuilder::new("  ").username("admin").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_build_unknown_platform() {
        let err = DriverBuilder::new("10.0.0.1")
            .username("admin")
            .platform("vyos")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
