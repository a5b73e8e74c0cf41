//! Error types for netpilot.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netpilot operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Malformed user input, caught before any network call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key not present in known_hosts (strict mode)
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out. The wording mirrors the message network
    /// engineers already search for when a device prompt goes missing.
    #[error("Pattern not detected within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Transcript file could not be written
    #[error("Transcript error: {0}")]
    Transcript(#[source] io::Error),
}

/// Driver layer errors (command execution, privilege escalation).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// Command execution failed
    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    /// Failed to acquire target privilege level
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// Invalid configuration in the driver builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unknown privilege level detected
    #[error("Unknown privilege level from prompt: '{prompt}'")]
    UnknownPrivilege { prompt: String },

    /// No path found between privilege levels
    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    /// No platform registered under this name
    #[error("Unknown platform '{name}'")]
    UnknownPlatform { name: String },

    /// A platform with this name is already registered
    #[error("Platform '{name}' is already registered")]
    AlreadyRegistered { name: String },
}

/// Input validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field or template placeholder has no value
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// Not a dotted-quad IPv4 address
    #[error("invalid IPv4 address '{0}'")]
    InvalidIpv4(String),

    /// VLAN id outside 1-4094 or not a number
    #[error("invalid VLAN id '{0}' (expected 1-4094)")]
    InvalidVlanId(String),

    /// Template text is malformed
    #[error("malformed template '{template}': {message}")]
    MalformedTemplate { template: String, message: String },

    /// No template with this name
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    /// Host must not be empty
    #[error("device host must not be empty")]
    EmptyHost,
}

/// Coarse error classification surfaced to front ends.
///
/// `Timeout` and `AuthenticationFailed` are always distinct outcomes so the
/// caller can show a targeted message; everything else that happens once
/// the network is involved collapses to `Execution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Device unreachable or too slow to answer within the bounded window.
    Timeout,
    /// Bad credentials.
    AuthenticationFailed,
    /// Anything else once a session is involved.
    Execution,
    /// Malformed input, rejected before any network call.
    Validation,
}

impl Error {
    /// Classify this error for presentation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(TransportError::Timeout(_))
            | Error::Transport(TransportError::ConnectionFailed { .. }) => ErrorKind::Timeout,
            Error::Transport(TransportError::AuthenticationFailed { .. }) => {
                ErrorKind::AuthenticationFailed
            }
            Error::Validation(_) | Error::Platform(PlatformError::UnknownPlatform { .. }) => {
                ErrorKind::Validation
            }
            _ => ErrorKind::Execution,
        }
    }

    /// Whether the underlying message is the "prompt not detected" signature.
    pub fn is_prompt_not_detected(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::PatternTimeout(_)))
            || self.to_string().contains(PROMPT_NOT_DETECTED)
    }
}

/// Message fragment identifying a prompt-detection failure.
pub const PROMPT_NOT_DETECTED: &str = "Pattern not detected";

/// Remediation text appended to prompt-detection failures.
pub const PROMPT_HINT: &str = "\n\nThis usually means:\n\
1. The device needs an enable password\n\
2. The device has a non-standard prompt\n\
3. Commands are taking too long to execute\n\n\
Check the session transcript for details.";

/// A classified, presentation-ready error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Error classification (never altered by message augmentation).
    pub kind: ErrorKind,

    /// Human-readable message.
    pub message: String,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        let mut message = err.to_string();
        if err.kind() == ErrorKind::Execution && err.is_prompt_not_detected() {
            message.push_str(PROMPT_HINT);
        }
        Self {
            kind: err.kind(),
            message,
        }
    }
}

impl From<Error> for ErrorReport {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result type alias using netpilot's Error.
pub type Result<T> = std::result::Result<T, Error>;
