//! Command templates: named, placeholder-based command lists and the
//! interface/VLAN/DHCP builders used by the chat wizards.
//!
//! Rendering is pure. Nothing here talks to a device.

mod builders;
mod named;

pub use builders::{ConfigBuilder, DhcpPoolConfig, InterfaceConfig, VlanConfig};
pub use named::{CommandTemplate, TEMPLATES, find};

use std::collections::HashMap;

/// Placeholder values keyed by placeholder name.
pub type Fields = HashMap<String, String>;

/// Value of an optional field. Blank values and the literal `skip` (any
/// case) count as absent.
pub fn optional<'a>(fields: &'a Fields, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("skip"))
}
