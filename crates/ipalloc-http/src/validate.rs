//! Request validation
//!
//! Checks applied before a request reaches the store: the IP must fall in
//! the configured CIDR range and the device name must be plain ASCII
//! alphanumerics.

use std::net::IpAddr;

use ipnet::Ipv4Net;
use thiserror::Error;

/// Reasons a request is rejected before it reaches the store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("IP Address is not in range")]
    IpNotInRange,

    #[error("CIDR string is malformed")]
    CidrNotValid,

    #[error("Device name is invalid '{0}'")]
    DeviceNameInvalid(String),
}

/// Parse an IPv4 range in CIDR notation, e.g. `1.2.0.0/16`
///
/// Host bits are dropped, so `1.2.3.4/16` names the `1.2.0.0/16` network.
pub fn parse_range(cidr: &str) -> Result<Ipv4Net, ValidationError> {
    cidr.parse::<Ipv4Net>()
        .map(|net| net.trunc())
        .map_err(|_| ValidationError::CidrNotValid)
}

/// Parse `ip` and check it lies inside `range`
///
/// Anything that is not an IPv4 address inside the range is
/// [`ValidationError::IpNotInRange`]. Returns the address in canonical
/// dotted-quad form.
pub fn check_ip(range: &Ipv4Net, ip: &str) -> Result<String, ValidationError> {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) if range.contains(&addr) => Ok(addr.to_string()),
        _ => Err(ValidationError::IpNotInRange),
    }
}

/// Check `ip` against the CIDR range given as text
pub fn ip_in_range(cidr: &str, ip: &str) -> Result<String, ValidationError> {
    check_ip(&parse_range(cidr)?, ip)
}

/// Device names are one or more ASCII letters or digits
pub fn device_name_valid(device: &str) -> bool {
    !device.is_empty() && device.chars().all(|c| c.is_ascii_alphanumeric())
}

/// [`device_name_valid`] as a `Result`
pub fn check_device_name(device: &str) -> Result<(), ValidationError> {
    if device_name_valid(device) {
        Ok(())
    } else {
        Err(ValidationError::DeviceNameInvalid(device.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: &str = "1.2.0.0/16";

    #[test]
    fn test_ip_in_range() {
        assert_eq!(ip_in_range(RANGE, "1.2.1.2"), Ok("1.2.1.2".to_string()));
        assert_eq!(ip_in_range(RANGE, "1.3.1.2"), Err(ValidationError::IpNotInRange));
        assert!(ip_in_range(RANGE, "bob").is_err(), "garbage IP must error");
    }

    #[test]
    fn test_ipv6_not_in_range() {
        assert_eq!(ip_in_range(RANGE, "::1"), Err(ValidationError::IpNotInRange));
    }

    #[test]
    fn test_malformed_cidr() {
        assert_eq!(ip_in_range("1.2.0.0", "1.2.1.2"), Err(ValidationError::CidrNotValid));
        assert_eq!(ip_in_range("1.2.0.0/33", "1.2.1.2"), Err(ValidationError::CidrNotValid));
        assert_eq!(ip_in_range("nope/8", "1.2.1.2"), Err(ValidationError::CidrNotValid));
    }

    #[test]
    fn test_range_boundaries() {
        let range = parse_range("1.2.3.4/16").unwrap();
        assert_eq!(range.to_string(), "1.2.0.0/16");
        assert!(check_ip(&range, "1.2.0.0").is_ok());
        assert!(check_ip(&range, "1.2.255.255").is_ok());
        assert!(check_ip(&range, "1.1.255.255").is_err());

        let everything = parse_range("0.0.0.0/0").unwrap();
        assert!(check_ip(&everything, "9.9.9.9").is_ok());

        let single = parse_range("1.2.3.4/32").unwrap();
        assert!(check_ip(&single, "1.2.3.4").is_ok());
        assert!(check_ip(&single, "1.2.3.5").is_err());
    }

    #[test]
    fn test_ipv6_range_is_malformed() {
        assert_eq!(parse_range("::/0"), Err(ValidationError::CidrNotValid));
    }

    #[test]
    fn test_validate_device_name() {
        assert!(device_name_valid("aDevice2"));
        assert!(!device_name_valid("device Name"));
        assert!(!device_name_valid("deviceName "));
        assert!(!device_name_valid(""));
        assert!(!device_name_valid("dev-1"));
    }

    #[test]
    fn test_check_device_name_message() {
        let err = check_device_name("bad name").unwrap_err();
        assert_eq!(err.to_string(), "Device name is invalid 'bad name'");
    }
}
