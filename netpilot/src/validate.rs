//! Input checks run before anything touches the network.

use std::net::Ipv4Addr;

use crate::error::ValidationError;

/// Whether `input` is a dotted-quad IPv4 address: four dot-separated
/// integers, each 0-255.
///
/// Leading zeros are accepted (`010.0.0.1`), as IOS accepts them.
pub fn is_valid_ipv4(input: &str) -> bool {
    let parts: Vec<&str> = input.trim().split('.').collect();
    parts.len() == 4
        && parts.iter().all(|part| {
            !part.is_empty()
                && part.bytes().all(|b| b.is_ascii_digit())
                && part.parse::<u32>().is_ok_and(|octet| octet <= 255)
        })
}

/// Parse a dotted-quad IPv4 address.
pub fn parse_ipv4(input: &str) -> Result<Ipv4Addr, ValidationError> {
    if !is_valid_ipv4(input) {
        return Err(ValidationError::InvalidIpv4(input.trim().to_string()));
    }
    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(input.trim().split('.')) {
        *slot = part
            .parse()
            .map_err(|_| ValidationError::InvalidIpv4(input.trim().to_string()))?;
    }
    Ok(Ipv4Addr::from(octets))
}

/// Parse a comma-separated list of IPv4 addresses (DNS servers).
///
/// The error names the first bad entry.
pub fn parse_ipv4_list(input: &str) -> Result<Vec<Ipv4Addr>, ValidationError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_ipv4)
        .collect()
}

/// Parse a VLAN id in the usable range 1-4094.
pub fn parse_vlan_id(input: &str) -> Result<u16, ValidationError> {
    match input.trim().parse::<u16>() {
        Ok(id) if (1..=4094).contains(&id) => Ok(id),
        _ => Err(ValidationError::InvalidVlanId(input.trim().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ipv4() {
        for ip in ["0.0.0.0", "10.0.0.1", "192.168.122.2", "255.255.255.255", " 10.1.1.1 "] {
            assert!(is_valid_ipv4(ip), "{ip} should be valid");
        }
    }

    #[test]
    fn test_invalid_ipv4() {
        for ip in [
            "",
            "10.0.0",
            "10.0.0.1.5",
            "256.0.0.1",
            "10.0.0.-1",
            "10.0.0.a",
            "10..0.1",
            "+1.2.3.4",
            "1.2.3.4/24",
        ] {
            assert!(!is_valid_ipv4(ip), "{ip} should be invalid");
        }
    }

    #[test]
    fn test_parse_ipv4() {
        assert_eq!(parse_ipv4("10.0.0.1").unwrap(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(
            parse_ipv4("300.1.1.1").unwrap_err(),
            ValidationError::InvalidIpv4("300.1.1.1".into())
        );
    }

    #[test]
    fn test_parse_ipv4_list() {
        let servers = parse_ipv4_list("8.8.8.8, 8.8.4.4").unwrap();
        assert_eq!(servers, vec![Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)]);

        assert_eq!(
            parse_ipv4_list("8.8.8.8,1.1.1").unwrap_err(),
            ValidationError::InvalidIpv4("1.1.1".into())
        );
    }

    #[test]
    fn test_parse_vlan_id() {
        assert_eq!(parse_vlan_id("10").unwrap(), 10);
        assert_eq!(parse_vlan_id(" 4094 ").unwrap(), 4094);
        assert!(parse_vlan_id("0").is_err());
        assert!(parse_vlan_id("4095").is_err());
        assert!(parse_vlan_id("ten").is_err());
    }
}
