//! Response type for command execution results.

use std::fmt;
use std::time::Duration;

/// Output of one command sent to the device.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Output with the command echo and trailing prompt removed.
    pub result: String,

    /// Output exactly as read, ANSI sequences already stripped.
    pub raw_result: String,

    /// The prompt that ended the read.
    pub prompt: String,

    /// Time from send to prompt.
    pub elapsed: Duration,

    /// Failure marker found in the output (e.g. `% Invalid input detected`).
    pub failure_message: Option<String>,
}

impl Response {
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    /// Mark the response as failed.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// The device's error text for a failed command: the failure line plus
    /// whatever the device printed with it.
    pub fn failure_detail(&self) -> Option<String> {
        let marker = self.failure_message.as_deref()?;
        let detail = self
            .result
            .lines()
            .find(|line| line.contains(marker))
            .map(str::trim)
            .unwrap_or(marker);
        Some(detail.to_string())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_detail() {
        let response = Response::new(
            "shw ver",
            "      ^\n% Invalid input detected at '^' marker.",
            "",
            "R1#",
            Duration::from_millis(40),
        )
        .with_failure("% Invalid input detected");

        assert!(!response.is_success());
        assert_eq!(
            response.failure_detail().as_deref(),
            Some("% Invalid input detected at '^' marker.")
        );
    }

    #[test]
    fn test_success_has_no_detail() {
        let response = Response::new("show clock", "10:00:00 UTC", "", "R1#", Duration::ZERO);
        assert!(response.is_success());
        assert_eq!(response.failure_detail(), None);
        assert_eq!(response.to_string(), "10:00:00 UTC");
    }
}
