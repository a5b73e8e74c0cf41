//! The structured result of running a command batch.

use serde::Serialize;

use crate::driver::Response;
use crate::error::{Error, ErrorReport};

/// Label used in [`CommandError`] for a failure of the block as a whole.
pub const CONFIG_BLOCK: &str = "configuration block";

/// Output of one show command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub command: String,
    pub output: String,
}

/// A command that failed, on the device or on the way to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandError {
    pub command: String,
    pub message: String,
}

/// Everything a batch produced. Built step by step; one failed step never
/// stops the steps after it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionResult {
    /// The whole exchange as text, with inline error markers.
    pub combined_output: String,
    /// Show command outputs, in execution order.
    pub per_command: Vec<CommandOutput>,
    pub config_output: Option<String>,
    pub save_output: Option<String>,
    pub errors: Vec<CommandError>,
    pub warnings: Vec<String>,
}

impl ExecutionResult {
    pub(crate) fn record_show(&mut self, response: &Response) {
        self.combined_output.push_str(&format!(
            "\n{}{}\n{}\n",
            response.prompt, response.command, response.result
        ));
        if let Some(detail) = response.failure_detail() {
            self.errors.push(CommandError {
                command: response.command.clone(),
                message: detail,
            });
        }
        self.per_command.push(CommandOutput {
            command: response.command.clone(),
            output: response.result.clone(),
        });
    }

    pub(crate) fn record_show_error(&mut self, command: &str, error: &Error) {
        let message = ErrorReport::from(error).message;
        self.combined_output
            .push_str(&format!("\nError executing '{command}': {message}\n"));
        self.errors.push(CommandError {
            command: command.to_string(),
            message,
        });
    }

    pub(crate) fn record_config(&mut self, responses: &[Response]) {
        let mut text = String::new();
        let mut prompt = "";
        for response in responses {
            text.push_str(prompt);
            text.push_str(&response.command);
            text.push('\n');
            if !response.result.is_empty() {
                text.push_str(&response.result);
                text.push('\n');
            }
            if let Some(detail) = response.failure_detail() {
                self.errors.push(CommandError {
                    command: response.command.clone(),
                    message: detail,
                });
            }
            prompt = response.prompt.as_str();
        }
        text.push_str(prompt);

        self.combined_output.push_str(&format!("\n{text}\n"));
        self.config_output = Some(text);
    }

    pub(crate) fn record_config_error(&mut self, error: &Error) {
        let message = ErrorReport::from(error).message;
        self.combined_output
            .push_str(&format!("\nError executing config commands: {message}\n"));
        self.errors.push(CommandError {
            command: CONFIG_BLOCK.to_string(),
            message,
        });
    }

    pub(crate) fn record_save(&mut self, response: &Response) {
        self.combined_output.push_str(&format!("\n{}", response.result));
        if let Some(detail) = response.failure_detail() {
            self.warnings
                .push(format!("Could not save config: {detail}"));
        }
        self.save_output = Some(response.result.clone());
    }

    pub(crate) fn record_dropped_save(&mut self, command: &str) {
        self.warnings
            .push(format!("Ignored '{command}': saving is controlled by save_config"));
    }

    pub(crate) fn record_save_error(&mut self, error: &Error) {
        let message = ErrorReport::from(error).message;
        self.combined_output
            .push_str(&format!("\nWarning: Could not save config: {message}"));
        self.warnings.push(format!("Could not save config: {message}"));
    }

    /// Whether any command failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Show outputs formatted for the interpreter, one section per command.
    pub fn interpretation_input(&self) -> Option<String> {
        if self.per_command.is_empty() {
            return None;
        }
        let sections: Vec<String> = self
            .per_command
            .iter()
            .map(|c| format!("Command: {}\nOutput:\n{}", c.command, c.output))
            .collect();
        Some(sections.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ChannelError;

    fn response(command: &str, result: &str, prompt: &str) -> Response {
        Response::new(command, result, "", prompt, Duration::ZERO)
    }

    #[test]
    fn test_show_output_format() {
        let mut result = ExecutionResult::default();
        result.record_show(&response("show clock", "10:00:00 UTC", "R1#"));
        assert_eq!(result.combined_output, "\nR1#show clock\n10:00:00 UTC\n");
        assert_eq!(result.per_command.len(), 1);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_show_error_is_inline_and_hinted() {
        let mut result = ExecutionResult::default();
        let error = Error::from(ChannelError::PatternTimeout(Duration::from_secs(20)));
        result.record_show_error("show run", &error);

        assert!(result.combined_output.starts_with("\nError executing 'show run': Channel error: Pattern not detected"));
        assert!(result.combined_output.contains("needs an enable password"));
        assert_eq!(result.errors[0].command, "show run");
    }

    #[test]
    fn test_config_transcript() {
        let mut result = ExecutionResult::default();
        result.record_config(&[
            response("interface Gi0/1", "", "R1(config-if)#"),
            response("no shutdown", "", "R1(config-if)#"),
            response("foo", "% Invalid input detected at '^' marker.", "R1(config-if)#")
                .with_failure("% Invalid input detected"),
        ]);

        assert_eq!(
            result.config_output.as_deref(),
            Some(
                "interface Gi0/1\nR1(config-if)#no shutdown\nR1(config-if)#foo\n\
                 % Invalid input detected at '^' marker.\nR1(config-if)#"
            )
        );
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].command, "foo");
    }

    #[test]
    fn test_save_error_is_warning() {
        let mut result = ExecutionResult::default();
        let error = Error::from(ChannelError::Closed);
        result.record_save_error(&error);
        assert!(result.combined_output.starts_with("\nWarning: Could not save config: "));
        assert_eq!(result.warnings.len(), 1);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_interpretation_input() {
        let mut result = ExecutionResult::default();
        assert_eq!(result.interpretation_input(), None);
        result.record_show(&response("show clock", "10:00", "R1#"));
        result.record_show(&response("show users", "vty 0", "R1#"));
        assert_eq!(
            result.interpretation_input().unwrap(),
            "Command: show clock\nOutput:\n10:00\n\nCommand: show users\nOutput:\nvty 0"
        );
    }
}
