//! High-level driver for device interaction.
//!
//! The [`Driver`] trait is the seam the session manager is written against.
//! [`GenericDriver`] implements it over SSH for any registered platform.

mod builder;
mod config_session;
mod generic;
mod privilege;
mod response;

pub use builder::{DEFAULT_PLATFORM, DriverBuilder};
pub use config_session::ConfigModeSession;
pub use generic::GenericDriver;
pub use privilege::{PrivilegeManager, Transition};
pub use response::Response;

use std::future::Future;

use secrecy::SecretString;

use crate::error::Result;

/// Trait for device drivers.
pub trait Driver: Send + Sync {
    /// Open the connection to the device.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection. Closing a closed driver is a no-op.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send a command and wait for the prompt.
    ///
    /// Device-side errors (`% Invalid input`) come back as a [`Response`]
    /// with `failure_message` set, not as `Err`.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Send commands in configuration mode.
    ///
    /// Enters configuration mode, sends every command in order and returns
    /// to the level the driver started from.
    ///
    /// ```rust,no_run
    /// use netpilot::driver::Driver;
    ///
    /// # async fn example(driver: &mut impl Driver) -> Result<(), netpilot::Error> {
    /// let responses = driver.send_config(&[
    ///     "interface GigabitEthernet0/1",
    ///     "description Uplink to Core",
    ///     "no shutdown",
    /// ]).await?;
    /// # Ok(())
    /// # }
    /// ```
    fn send_config(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send;

    /// Persist the running configuration.
    fn save_config(&mut self) -> impl Future<Output = Result<Response>> + Send;

    /// Send a bare return and report the prompt the device answers with.
    fn find_prompt(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Whether the device is at privileged level or above.
    fn check_enable_mode(&mut self) -> impl Future<Output = Result<bool>> + Send;

    /// Enter privileged mode, answering a password prompt with `secret`.
    ///
    /// The secret is used for this exchange only.
    fn enable(&mut self, secret: Option<&SecretString>) -> impl Future<Output = Result<()>> + Send;

    /// Acquire a specific privilege level.
    fn acquire_privilege(&mut self, privilege: &str) -> impl Future<Output = Result<()>> + Send;

    /// Check if the driver is connected.
    fn is_open(&self) -> bool;

    /// Check if the underlying SSH session is still alive.
    ///
    /// Returns `false` if the driver is not connected, the peer went away or
    /// an I/O error killed the session.
    fn is_alive(&self) -> bool;

    /// Get the current privilege level name.
    fn current_privilege(&self) -> Option<&str>;
}
