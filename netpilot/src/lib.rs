//! # netpilot
//!
//! Async SSH session manager for configuring Cisco IOS devices.
//!
//! netpilot keeps long-lived interactive shells to routers and switches,
//! tracks the device's privilege level from its prompt and runs command
//! batches: show commands first, then a single configuration block, then an
//! optional save.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Prompt-driven privilege navigation (user, privileged, configuration)
//! - Enable-mode password handling without keeping the secret around
//! - Named command templates and typed configuration builders
//! - A session registry with per-session serialization and idle expiry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netpilot::session::{
//!     DeviceCredentials, DeviceSlot, ExecuteOptions, SessionKey, SessionManager, SshConnector,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netpilot::Error> {
//!     let manager = SessionManager::new(SshConnector::default());
//!     let key = SessionKey::new("ops", DeviceSlot::Router);
//!
//!     let credentials = DeviceCredentials::new("192.168.122.2", "admin", "cisco")
//!         .with_secret("class");
//!     let summary = manager.connect(key.clone(), credentials).await?;
//!     println!("{} ({})", summary.prompt, summary.enable_status);
//!
//!     let result = manager
//!         .execute(&key, &["show ip interface brief"], ExecuteOptions::default())
//!         .await?;
//!     println!("{}", result.combined_output);
//!
//!     manager.disconnect(&key).await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod platform;
pub mod session;
pub mod template;
pub mod transport;
pub mod validate;

pub use driver::{Driver, DriverBuilder, GenericDriver, Response};
pub use error::{Error, ErrorKind, ErrorReport, Result};
pub use platform::{PlatformDefinition, PrivilegeLevel};
pub use session::{
    DeviceCredentials, DeviceSlot, EnableStatus, ExecuteOptions, ExecutionResult, SessionKey,
    SessionManager, SessionSummary, SshConnector,
};
pub use transport::{AuthMethod, SshConfig};
