//! Cisco IOS / IOS-XE platform definition.
//!
//! Prompt patterns follow scrapli's IOS-XE driver.
//!
//! ```text
//! Router>                      # exec
//! Router#                      # privilege_exec
//! Router(config)#              # configuration
//! Router(config-if)#           # configuration (sub-mode)
//! Router(dhcp-config)#         # configuration (DHCP pool)
//! ```
//!
//! ```text
//! ┌──────┐  enable   ┌────────────────┐  configure terminal  ┌───────────────┐
//! │ exec ├───────────► privilege_exec ├──────────────────────► configuration │
//! │  >   │  disable  │       #        │         end          │  (config*)#   │
//! └──────┘◄──────────┴────────────────┘◄─────────────────────┴───────────────┘
//! ```

use std::sync::Arc;

use crate::platform::{DefaultBehavior, PlatformDefinition, PrivilegeLevel, VendorBehavior};

/// Platform name for Cisco IOS.
pub const PLATFORM_NAME: &str = "cisco_ios";

/// Alias registered for IOS-XE devices, which share the same CLI dialect.
pub const PLATFORM_ALIAS_XE: &str = "cisco_xe";

const EXEC_PATTERN: &str = r"(?mi)^[\w.\-@/:]{1,63}>\s?$";
const PRIVILEGE_EXEC_PATTERN: &str = r"(?mi)^[\w.\-@/:]{1,63}#\s?$";
const CONFIGURATION_PATTERN: &str =
    r"(?mi)^[\w.\-@/:]{1,63}\([\w.\-@/:+]{0,63}conf[\w.\-@/:+]{0,63}\)#\s?$";
const ENABLE_PASSWORD_PATTERN: &str = r"(?mi)^(?:enable\s)?password:\s?$";

/// `%` messages that reject a line without one of the generic markers.
const REJECTIONS: &[&str] = &["% Bad mask", "overlaps with", "%Error", "% Error"];

/// IOS output handling: generic normalization, plus the `%` rejections
/// raised by `ip address` and friends.
pub struct IosBehavior;

impl VendorBehavior for IosBehavior {
    fn normalize_output(&self, raw: &str, command: &str) -> String {
        DefaultBehavior.normalize_output(raw, command)
    }

    fn detect_failure(&self, output: &str) -> Option<String> {
        output
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with('%') && REJECTIONS.iter().any(|r| line.contains(r)))
            .map(str::to_string)
    }
}

/// Create the Cisco IOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", EXEC_PATTERN).expect("valid exec prompt pattern");

    let privilege_exec = PrivilegeLevel::new("privilege_exec", PRIVILEGE_EXEC_PATTERN)
        .expect("valid privileged prompt pattern")
        .with_parent("exec")
        .with_escalate("enable")
        .with_deescalate("disable")
        .with_auth(ENABLE_PASSWORD_PATTERN)
        .expect("valid enable password pattern")
        .with_not_contains("(conf");

    let configuration = PrivilegeLevel::new("configuration", CONFIGURATION_PATTERN)
        .expect("valid configuration prompt pattern")
        .with_parent("privilege_exec")
        .with_escalate("configure terminal")
        .with_deescalate("end");

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_config_privilege("configuration")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Unknown command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_save_command("write memory")
        .with_terminal_size(511, 24)
        .with_behavior(Arc::new(IosBehavior))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cisco_ios_platform() {
        let platform = platform();
        assert_eq!(platform.name, "cisco_ios");
        assert_eq!(platform.privilege_levels.len(), 3);
        assert_eq!(platform.default_privilege, "privilege_exec");
        assert_eq!(platform.config_privilege, "configuration");
        assert_eq!(platform.save_command, "write memory");
    }

    #[test]
    fn test_exec_prompt_match() {
        let platform = platform();
        let exec = platform.get_privilege("exec").unwrap();
        assert!(exec.matches("Router>"));
        assert!(exec.matches("core-sw1.lab> "));
        assert!(!exec.matches("Router#"));
    }

    #[test]
    fn test_privilege_exec_prompt_match() {
        let platform = platform();
        let priv_exec = platform.get_privilege("privilege_exec").unwrap();
        assert!(priv_exec.matches("Router#"));
        assert!(priv_exec.matches("R1# "));
        assert!(!priv_exec.matches("Router>"));
        assert!(!priv_exec.matches("Router(config)#"));
        assert!(!priv_exec.matches("Router(config-if)#"));
    }

    #[test]
    fn test_configuration_prompt_match() {
        let platform = platform();
        let config = platform.get_privilege("configuration").unwrap();
        assert!(config.matches("Router(config)#"));
        assert!(config.matches("Router(config-if)#"));
        assert!(config.matches("Switch(config-vlan)#"));
        assert!(config.matches("Router(dhcp-config)#"));
        assert!(config.matches("Router(config-if-range)#"));
        assert!(!config.matches("Router#"));
    }

    #[test]
    fn test_enable_password_prompt() {
        let platform = platform();
        let priv_exec = platform.get_privilege("privilege_exec").unwrap();
        let auth = priv_exec.escalate_prompt.as_ref().unwrap();
        assert!(auth.is_match(b"Router>enable\r\nPassword: "));
    }

    #[test]
    fn test_ios_rejections() {
        assert_eq!(
            IosBehavior.detect_failure("% Bad mask /24 for address 10.0.0.1"),
            Some("% Bad mask /24 for address 10.0.0.1".to_string())
        );
        assert_eq!(
            IosBehavior.detect_failure("\n% 10.0.0.0 overlaps with GigabitEthernet0/0\n"),
            Some("% 10.0.0.0 overlaps with GigabitEthernet0/0".to_string())
        );
        assert_eq!(IosBehavior.detect_failure("Interface GigabitEthernet0/1 overlaps"), None);
        assert!(platform().behavior.is_some());
    }

    #[test]
    fn test_failure_markers() {
        let platform = platform();
        assert_eq!(
            platform.failure_in("          ^\n% Invalid input detected at '^' marker."),
            Some("% Invalid input detected")
        );
        assert_eq!(platform.failure_in("Building configuration...\n[OK]"), None);
    }
}
