//! Platform definitions: prompt patterns, privilege levels and the
//! per-vendor details of talking to a device CLI.

mod definition;
mod privilege_level;
mod registry;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use privilege_level::PrivilegeLevel;
pub use registry::PlatformRegistry;

/// Vendor-specific output handling.
pub trait VendorBehavior: Send + Sync {
    /// Normalize command output (strip command echo, trailing prompt).
    fn normalize_output(&self, raw: &str, command: &str) -> String;

    /// Detect command failure beyond the platform's `failed_when_contains`.
    fn detect_failure(&self, _output: &str) -> Option<String> {
        None
    }
}

/// Default vendor behavior implementation.
pub struct DefaultBehavior;

impl VendorBehavior for DefaultBehavior {
    fn normalize_output(&self, raw: &str, command: &str) -> String {
        let text = raw.replace("\r\n", "\n").replace('\r', "");
        let mut lines: Vec<&str> = text.lines().collect();

        // Command echo
        if lines
            .first()
            .is_some_and(|first| first.trim_end().ends_with(command.trim()))
        {
            lines.remove(0);
        }

        // Trailing prompt
        lines.pop();

        lines.join("\n").trim_end().to_string()
    }
}
