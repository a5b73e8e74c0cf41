//! RAII guard for configuration mode.
//!
//! The guard holds `&mut GenericDriver`, so nothing else can talk to the
//! device while configuration mode is open. `finish()` consumes the guard and
//! returns the driver to the level it was at before.

use log::warn;

use super::Driver;
use super::generic::GenericDriver;
use super::response::Response;
use crate::error::{DriverError, Result};

/// An open configuration-mode block on one device.
pub struct ConfigModeSession<'a> {
    driver: &'a mut GenericDriver,
    original_privilege: String,
    finished: bool,
}

impl<'a> ConfigModeSession<'a> {
    /// Enter the platform's configuration level.
    pub async fn enter(driver: &'a mut GenericDriver) -> Result<Self> {
        let config_privilege = driver.platform().config_privilege.clone();
        if config_privilege.is_empty() {
            return Err(DriverError::InvalidConfig {
                message: format!(
                    "platform '{}' has no configuration level",
                    driver.platform().name
                ),
            }
            .into());
        }

        let original_privilege = driver
            .current_privilege()
            .map(str::to_string)
            .unwrap_or_else(|| driver.platform().default_privilege.clone());

        driver.acquire_privilege(&config_privilege).await?;

        Ok(Self {
            driver,
            original_privilege,
            finished: false,
        })
    }

    /// Send one configuration line.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.driver.send_command(command).await
    }

    /// Leave configuration mode.
    ///
    /// A block may already have left configuration mode with its own `exit`
    /// lines; only the remaining hops are taken.
    pub async fn finish(mut self) -> Result<()> {
        self.finished = true;
        if self.driver.current_privilege() != Some(self.original_privilege.as_str()) {
            let target = self.original_privilege.clone();
            self.driver.acquire_privilege(&target).await?;
        }
        Ok(())
    }

    /// Drop the guard without touching the device, after the channel has
    /// already failed.
    pub fn abandon(mut self) {
        self.finished = true;
    }
}

impl Drop for ConfigModeSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("configuration session dropped without finish() or abandon()");
        }
    }
}
