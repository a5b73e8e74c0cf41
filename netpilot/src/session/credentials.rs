//! Device credentials and the secret-free device description kept with a
//! live session.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::driver::DEFAULT_PLATFORM;
use crate::error::ValidationError;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Everything needed to log in to one device.
///
/// Consumed by [`SessionManager::connect`](super::SessionManager::connect):
/// the secrets live only until the login and enable exchanges are over.
#[derive(Deserialize)]
pub struct DeviceCredentials {
    pub host: String,
    pub username: String,

    #[serde(deserialize_with = "secret")]
    pub password: SecretString,

    #[serde(default = "default_port", deserialize_with = "port_or_default")]
    pub port: u16,

    /// Enable secret.
    #[serde(default, alias = "enable_password", deserialize_with = "optional_secret")]
    pub secret: Option<SecretString>,

    /// Platform hint, a [`PlatformRegistry`](crate::platform::PlatformRegistry) key.
    #[serde(default = "default_device_type", alias = "platform")]
    pub device_type: String,
}

impl DeviceCredentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            port: DEFAULT_SSH_PORT,
            secret: None,
            device_type: default_device_type(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the enable secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    /// Reject credentials that cannot possibly work, before any network call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingField("username".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("port", &self.port)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("device_type", &self.device_type)
            .finish()
    }
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_device_type() -> String {
    DEFAULT_PLATFORM.to_string()
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

// Web forms send "" for an empty enable password.
fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|value| !value.is_empty())
        .map(SecretString::from))
}

fn port_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    Ok(Option::<u16>::deserialize(deserializer)?.unwrap_or(DEFAULT_SSH_PORT))
}

/// The parts of [`DeviceCredentials`] that are safe to keep and show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub device_type: String,
}

impl From<&DeviceCredentials> for DeviceInfo {
    fn from(credentials: &DeviceCredentials) -> Self {
        Self {
            host: credentials.host.trim().to_string(),
            port: credentials.port,
            username: credentials.username.clone(),
            device_type: credentials.device_type.clone(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_deserialize_defaults() {
        let credentials: DeviceCredentials = serde_json::from_str(
            r#"{"host": "192.168.122.2", "username": "admin", "password": "cisco"}"#,
        )
        .unwrap();

        assert_eq!(credentials.port, 22);
        assert_eq!(credentials.device_type, "cisco_ios");
        assert!(credentials.secret.is_none());
        assert_eq!(credentials.password.expose_secret(), "cisco");
    }

    #[test]
    fn test_deserialize_aliases_and_nulls() {
        let credentials: DeviceCredentials = serde_json::from_str(
            r#"{"host": "r1", "username": "admin", "password": "p", "port": null,
                "enable_password": "en", "platform": "cisco_xe"}"#,
        )
        .unwrap();

        assert_eq!(credentials.port, 22);
        assert_eq!(credentials.device_type, "cisco_xe");
        assert_eq!(credentials.secret.unwrap().expose_secret(), "en");

        let credentials: DeviceCredentials = serde_json::from_str(
            r#"{"host": "r1", "username": "admin", "password": "p", "secret": ""}"#,
        )
        .unwrap();
        assert!(credentials.secret.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credentials = DeviceCredentials::new("r1", "admin", "hunter2").with_secret("enable-me");
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("enable-me"));
        assert!(debug.contains("r1"));
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            DeviceCredentials::new(" ", "admin", "p").validate(),
            Err(ValidationError::EmptyHost)
        );
        assert_eq!(
            DeviceCredentials::new("r1", "", "p").validate(),
            Err(ValidationError::MissingField("username".into()))
        );
        assert!(DeviceCredentials::new("r1", "admin", "p").validate().is_ok());
    }

    #[test]
    fn test_device_info_has_no_secrets() {
        let credentials = DeviceCredentials::new("r1", "admin", "hunter2").with_port(2222);
        let info = DeviceInfo::from(&credentials);
        assert_eq!(info.to_string(), "admin@r1:2222");
    }
}
