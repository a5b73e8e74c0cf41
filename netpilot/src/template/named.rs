//! Named templates offered by the web front end.

use serde::Serialize;

use super::Fields;
use crate::error::ValidationError;

/// A command list with `{placeholder}` slots.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommandTemplate {
    /// Lookup key, e.g. `interface_config`.
    #[serde(skip)]
    pub key: &'static str,

    /// Human-readable title.
    #[serde(rename = "name")]
    pub title: &'static str,

    pub commands: &'static [&'static str],
}

/// Built-in templates.
pub static TEMPLATES: &[CommandTemplate] = &[
    CommandTemplate {
        key: "interface_config",
        title: "Configure Interface",
        commands: &[
            "enable",
            "conf t",
            "interface {interface}",
            "ip address {ip_address} {subnet_mask}",
            "no shutdown",
            "end",
            "write memory",
        ],
    },
    CommandTemplate {
        key: "vlan_config",
        title: "Configure VLAN Sub-interfaces",
        commands: &[
            "enable",
            "conf t",
            "int {interface}",
            "no shutdown",
            "exit",
            "int {interface}.{vlan_id}",
            "encapsulation dot1Q {vlan_id}",
            "ip address {ip_address} {subnet_mask}",
            "exit",
        ],
    },
];

/// Look up a template by key.
pub fn find(key: &str) -> Result<&'static CommandTemplate, ValidationError> {
    TEMPLATES
        .iter()
        .find(|template| template.key == key)
        .ok_or_else(|| ValidationError::UnknownTemplate(key.to_string()))
}

impl CommandTemplate {
    /// Distinct placeholder names, in first-use order.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for line in self.commands {
            let mut rest = *line;
            while let Some(open) = rest.find('{') {
                let Some(len) = rest[open + 1..].find('}') else {
                    break;
                };
                let name = &rest[open + 1..open + 1 + len];
                if !names.contains(&name) {
                    names.push(name);
                }
                rest = &rest[open + 2 + len..];
            }
        }
        names
    }

    /// Substitute every placeholder. Fails on the first missing field.
    pub fn render(&self, fields: &Fields) -> Result<Vec<String>, ValidationError> {
        self.commands
            .iter()
            .map(|line| substitute(self.key, line, fields))
            .collect()
    }
}

fn substitute(key: &str, line: &str, fields: &Fields) -> Result<String, ValidationError> {
    let malformed = |message: &str| ValidationError::MalformedTemplate {
        template: key.to_string(),
        message: message.to_string(),
    };

    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| malformed(&format!("unterminated placeholder in '{line}'")))?;
        let name = after[..close].trim();
        if name.is_empty() {
            return Err(malformed(&format!("empty placeholder in '{line}'")));
        }
        let value = fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ValidationError::MissingField(name.to_string()))?;
        out.push_str(value);
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err(malformed(&format!("unmatched '}}' in '{line}'")));
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_interface_template() {
        let template = find("interface_config").unwrap();
        let commands = template
            .render(&fields(&[
                ("interface", "GigabitEthernet0/1"),
                ("ip_address", "10.0.0.1"),
                ("subnet_mask", "255.255.255.0"),
            ]))
            .unwrap();

        assert_eq!(
            commands,
            vec![
                "enable",
                "conf t",
                "interface GigabitEthernet0/1",
                "ip address 10.0.0.1 255.255.255.0",
                "no shutdown",
                "end",
                "write memory",
            ]
        );
    }

    #[test]
    fn test_render_sub_interface_template() {
        let template = find("vlan_config").unwrap();
        let commands = template
            .render(&fields(&[
                ("interface", "Gi0/0"),
                ("vlan_id", "20"),
                ("ip_address", "192.168.20.1"),
                ("subnet_mask", "255.255.255.0"),
            ]))
            .unwrap();

        assert!(commands.contains(&"int Gi0/0.20".to_string()));
        assert!(commands.contains(&"encapsulation dot1Q 20".to_string()));
    }

    #[test]
    fn test_missing_field_is_named() {
        let template = find("interface_config").unwrap();
        let err = template
            .render(&fields(&[("interface", "Gi0/1"), ("ip_address", "10.0.0.1")]))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("subnet_mask".into()));
    }

    #[test]
    fn test_malformed_placeholder() {
        let err = substitute("t", "interface {interface", &fields(&[("interface", "Gi0/1")]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedTemplate { .. }));

        let err = substitute("t", "interface {}", &Fields::new()).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedTemplate { .. }));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            find("vlan_config").unwrap().placeholders(),
            vec!["interface", "vlan_id", "ip_address", "subnet_mask"]
        );
    }

    #[test]
    fn test_unknown_template() {
        assert_eq!(
            find("acl_config").unwrap_err(),
            ValidationError::UnknownTemplate("acl_config".into())
        );
    }
}
