//! In-memory device used by the front end tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use netpilot::driver::{Driver, Response};
use netpilot::error::{ChannelError, TransportError};
use netpilot::session::{Connector, DeviceCredentials};
use netpilot::Result;
use secrecy::{ExposeSecret, SecretString};

pub const PASSWORD: &str = "cisco";
pub const ENABLE_SECRET: &str = "class";
/// Connecting to this host times out.
pub const UNREACHABLE: &str = "10.255.255.1";
/// This host logs in but never shows a prompt.
pub const SLOW: &str = "10.0.0.99";

pub const INTERFACE_BRIEF: &str = "\
Interface              IP-Address      OK? Method Status                Protocol
GigabitEthernet0/0     192.168.122.2   YES manual up                    up
GigabitEthernet0/1     unassigned      YES unset  administratively down down";

/// Everything sent to any fake device, in order.
pub type SentLog = Arc<Mutex<Vec<String>>>;

pub struct FakeDriver {
    host: String,
    sent: SentLog,
    open: bool,
    privileged: bool,
}

impl FakeDriver {
    fn prompt(&self) -> String {
        if self.privileged { "R1#" } else { "R1>" }.to_string()
    }

    fn reply(&mut self, command: &str, prompt: &str) -> Result<Response> {
        self.sent.lock().unwrap().push(command.to_string());
        if self.host == SLOW {
            return Err(ChannelError::PatternTimeout(Duration::from_secs(20)).into());
        }
        let result = match command {
            "show ip interface brief" => INTERFACE_BRIEF.to_string(),
            "write memory" => "Building configuration...\n[OK]".to_string(),
            c if c.starts_with("show ") => format!("output of {c}"),
            _ => String::new(),
        };
        Ok(Response::new(command, result, "", prompt, Duration::ZERO))
    }
}

impl Driver for FakeDriver {
    async fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let prompt = self.prompt();
        self.reply(command, &prompt)
    }

    async fn send_config(&mut self, commands: &[&str]) -> Result<Vec<Response>> {
        let mut responses = Vec::new();
        for command in commands {
            responses.push(self.reply(command, "R1(config)#")?);
        }
        Ok(responses)
    }

    async fn save_config(&mut self) -> Result<Response> {
        let prompt = self.prompt();
        self.reply("write memory", &prompt)
    }

    async fn find_prompt(&mut self) -> Result<String> {
        if self.host == SLOW {
            return Err(ChannelError::PatternTimeout(Duration::from_secs(20)).into());
        }
        Ok(self.prompt())
    }

    async fn check_enable_mode(&mut self) -> Result<bool> {
        Ok(self.privileged)
    }

    async fn enable(&mut self, secret: Option<&SecretString>) -> Result<()> {
        match secret {
            Some(s) if s.expose_secret() == ENABLE_SECRET => {
                self.privileged = true;
                Ok(())
            }
            _ => Err(netpilot::error::DriverError::PrivilegeAcquisitionFailed {
                target: "privilege_exec".into(),
            }
            .into()),
        }
    }

    async fn acquire_privilege(&mut self, _privilege: &str) -> Result<()> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_alive(&self) -> bool {
        self.open
    }

    fn current_privilege(&self) -> Option<&str> {
        None
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub sent: SentLog,
}

impl Connector for FakeConnector {
    type Driver = FakeDriver;

    async fn connect(&self, credentials: DeviceCredentials) -> Result<FakeDriver> {
        credentials.validate()?;
        if credentials.host == UNREACHABLE {
            return Err(TransportError::Timeout(Duration::from_secs(30)).into());
        }
        if credentials.password.expose_secret() != PASSWORD {
            return Err(TransportError::AuthenticationFailed {
                user: credentials.username.clone(),
            }
            .into());
        }
        Ok(FakeDriver {
            host: credentials.host.clone(),
            sent: Arc::clone(&self.sent),
            open: true,
            privileged: false,
        })
    }
}
