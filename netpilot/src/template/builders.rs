//! Configuration builders behind the chat wizards.
//!
//! Each builder validates its fields once, in `from_fields`, so `commands()`
//! cannot fail.

use std::net::Ipv4Addr;

use super::{Fields, optional};
use crate::error::ValidationError;
use crate::validate::{parse_ipv4, parse_ipv4_list, parse_vlan_id};

/// A validated configuration that expands to a full IOS command script,
/// `configure terminal` through `write memory`.
pub trait ConfigBuilder {
    fn commands(&self) -> Vec<String>;
}

fn required<'a>(fields: &'a Fields, name: &str) -> Result<&'a str, ValidationError> {
    fields
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ValidationError::MissingField(name.to_string()))
}

/// Layer 3 interface address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub interface: String,
    pub description: Option<String>,
    pub ip_address: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
}

impl InterfaceConfig {
    /// Fields: `interface`, `ip_address`, `subnet_mask`, optional `description`.
    pub fn from_fields(fields: &Fields) -> Result<Self, ValidationError> {
        Ok(Self {
            interface: required(fields, "interface")?.to_string(),
            description: optional(fields, "description").map(str::to_string),
            ip_address: parse_ipv4(required(fields, "ip_address")?)?,
            subnet_mask: parse_ipv4(required(fields, "subnet_mask")?)?,
        })
    }
}

impl ConfigBuilder for InterfaceConfig {
    fn commands(&self) -> Vec<String> {
        let mut commands = vec![
            "configure terminal".to_string(),
            format!("interface {}", self.interface),
        ];
        if let Some(description) = &self.description {
            commands.push(format!("description {description}"));
        }
        commands.extend([
            format!("ip address {} {}", self.ip_address, self.subnet_mask),
            "no shutdown".to_string(),
            "exit".to_string(),
            "write memory".to_string(),
        ]);
        commands
    }
}

/// Access VLAN with optional name and member ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanConfig {
    pub vlan_id: u16,
    pub name: Option<String>,
    /// A single port (`Fa0/1`), a range (`Fa0/1-5`) or a list (`Gi0/1,Gi0/3`).
    pub ports: Option<String>,
}

impl VlanConfig {
    /// Fields: `vlan_id`, optional `vlan_name` and `vlan_ports`.
    pub fn from_fields(fields: &Fields) -> Result<Self, ValidationError> {
        Ok(Self {
            vlan_id: parse_vlan_id(required(fields, "vlan_id")?)?,
            name: optional(fields, "vlan_name").map(str::to_string),
            ports: optional(fields, "vlan_ports").map(str::to_string),
        })
    }
}

impl ConfigBuilder for VlanConfig {
    fn commands(&self) -> Vec<String> {
        let mut commands = vec![
            "configure terminal".to_string(),
            format!("vlan {}", self.vlan_id),
        ];
        if let Some(name) = &self.name {
            commands.push(format!("name {name}"));
        }
        commands.push("exit".to_string());

        if let Some(ports) = &self.ports {
            if ports.contains(['-', ',']) {
                commands.push(format!("interface range {ports}"));
            } else {
                commands.push(format!("interface {ports}"));
            }
            commands.extend([
                "switchport mode access".to_string(),
                format!("switchport access vlan {}", self.vlan_id),
                "exit".to_string(),
            ]);
        }

        commands.extend(["exit".to_string(), "write memory".to_string()]);
        commands
    }
}

/// DHCP server pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpPoolConfig {
    pub pool_name: String,
    pub network: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub default_router: Ipv4Addr,
    pub dns_servers: Vec<Ipv4Addr>,
}

impl DhcpPoolConfig {
    /// Fields: `pool_name`, `network`, `mask`, `default_router`, optional
    /// comma-separated `dns_servers`.
    pub fn from_fields(fields: &Fields) -> Result<Self, ValidationError> {
        let dns_servers = match optional(fields, "dns_servers") {
            Some(list) => parse_ipv4_list(list)?,
            None => Vec::new(),
        };
        Ok(Self {
            pool_name: required(fields, "pool_name")?.to_string(),
            network: parse_ipv4(required(fields, "network")?)?,
            mask: parse_ipv4(required(fields, "mask")?)?,
            default_router: parse_ipv4(required(fields, "default_router")?)?,
            dns_servers,
        })
    }
}

impl ConfigBuilder for DhcpPoolConfig {
    fn commands(&self) -> Vec<String> {
        let mut commands = vec![
            "configure terminal".to_string(),
            "service dhcp".to_string(),
            format!("ip dhcp pool {}", self.pool_name),
            format!("network {} {}", self.network, self.mask),
            format!("default-router {}", self.default_router),
        ];
        if !self.dns_servers.is_empty() {
            let servers: Vec<String> = self.dns_servers.iter().map(Ipv4Addr::to_string).collect();
            commands.push(format!("dns-server {}", servers.join(" ")));
        }
        commands.extend([
            "exit".to_string(),
            "exit".to_string(),
            "write memory".to_string(),
        ]);
        commands
    }
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
    fn test_interface_without_description() {
        let config = InterfaceConfig::from_fields(&fields(&[
            ("interface", "GigabitEthernet0/1"),
            ("ip_address", "10.0.0.1"),
            ("subnet_mask", "255.255.255.0"),
        ]))
        .unwrap();

        assert_eq!(
            config.commands(),
            vec![
                "configure terminal",
                "interface GigabitEthernet0/1",
                "ip address 10.0.0.1 255.255.255.0",
                "no shutdown",
                "exit",
                "write memory",
            ]
        );
    }

    #[test]
    fn test_interface_with_description() {
        let config = InterfaceConfig::from_fields(&fields(&[
            ("interface", "Gi0/2"),
            ("description", "Uplink to core"),
            ("ip_address", "10.0.1.1"),
            ("subnet_mask", "255.255.255.252"),
        ]))
        .unwrap();
        assert_eq!(config.commands()[2], "description Uplink to core");
    }

    #[test]
    fn test_interface_rejects_bad_address() {
        let err = InterfaceConfig::from_fields(&fields(&[
            ("interface", "Gi0/1"),
            ("ip_address", "10.0.0.256"),
            ("subnet_mask", "255.255.255.0"),
        ]))
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidIpv4("10.0.0.256".into()));

        let err = InterfaceConfig::from_fields(&fields(&[("interface", "Gi0/1")])).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("ip_address".into()));
    }

    #[test]
    fn test_vlan_skipped_name_with_port_range() {
        let config = VlanConfig::from_fields(&fields(&[
            ("vlan_id", "10"),
            ("vlan_name", "skip"),
            ("vlan_ports", "Fa0/1-5"),
        ]))
        .unwrap();

        assert_eq!(
            config.commands(),
            vec![
                "configure terminal",
                "vlan 10",
                "exit",
                "interface range Fa0/1-5",
                "switchport mode access",
                "switchport access vlan 10",
                "exit",
                "exit",
                "write memory",
            ]
        );
    }

    #[test]
    fn test_vlan_port_forms() {
        let list = VlanConfig {
            vlan_id: 20,
            name: Some("USERS".into()),
            ports: Some("Gi0/1,Gi0/3".into()),
        };
        let commands = list.commands();
        assert_eq!(commands[2], "name USERS");
        assert!(commands.contains(&"interface range Gi0/1,Gi0/3".to_string()));

        let single = VlanConfig {
            vlan_id: 20,
            name: None,
            ports: Some("Fa0/7".into()),
        };
        assert!(single.commands().contains(&"interface Fa0/7".to_string()));

        let bare = VlanConfig {
            vlan_id: 30,
            name: None,
            ports: None,
        };
        assert_eq!(
            bare.commands(),
            vec!["configure terminal", "vlan 30", "exit", "exit", "write memory"]
        );
    }

    #[test]
    fn test_dhcp_pool() {
        let config = DhcpPoolConfig::from_fields(&fields(&[
            ("pool_name", "LAN"),
            ("network", "192.168.1.0"),
            ("mask", "255.255.255.0"),
            ("default_router", "192.168.1.1"),
            ("dns_servers", "8.8.8.8, 8.8.4.4"),
        ]))
        .unwrap();

        assert_eq!(
            config.commands(),
            vec![
                "configure terminal",
                "service dhcp",
                "ip dhcp pool LAN",
                "network 192.168.1.0 255.255.255.0",
                "default-router 192.168.1.1",
                "dns-server 8.8.8.8 8.8.4.4",
                "exit",
                "exit",
                "write memory",
            ]
        );
    }

    #[test]
    fn test_dhcp_pool_without_dns() {
        let config = DhcpPoolConfig::from_fields(&fields(&[
            ("pool_name", "LAN"),
            ("network", "192.168.1.0"),
            ("mask", "255.255.255.0"),
            ("default_router", "192.168.1.1"),
            ("dns_servers", "skip"),
        ]))
        .unwrap();
        assert!(!config.commands().iter().any(|c| c.starts_with("dns-server")));
    }
}
