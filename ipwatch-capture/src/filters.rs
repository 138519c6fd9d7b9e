//! BPF capture filter construction

use ipwatch_core::{config, Error, Result};

/// Fixed filter: ARP with a non-zero sender, or ICMPv6 neighbor
/// solicitations and advertisements with a specified source
pub const FIXED_FILTER: &str = "((arp && not src 0) || \
     (icmp6 && \
       (icmp6[icmp6type] == icmp6-neighborsolicit || \
        icmp6[icmp6type] == icmp6-neighboradvert) && \
       not src ::))";

/// Build the capture filter, ANDing in the operator-supplied expression
/// when present
///
/// The operator expression is bounded to
/// [`config::USER_FILTER_MAX`] bytes.
pub fn capture_filter(user_filter: Option<&str>) -> Result<String> {
    match user_filter {
        None => Ok(FIXED_FILTER.to_string()),
        Some(user) => {
            if user.len() > config::USER_FILTER_MAX {
                return Err(Error::config(format!(
                    "capture filter exceeds maximum length of {} bytes",
                    config::USER_FILTER_MAX
                )));
            }
            Ok(format!("{} and ({})", FIXED_FILTER, user))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_filter() {
        let filter = capture_filter(None).unwrap();
        assert!(filter.contains("arp"));
        assert!(filter.contains("icmp6-neighborsolicit"));
        assert!(filter.contains("icmp6-neighboradvert"));
        assert!(filter.contains("not src ::"));
    }

    #[test]
    fn test_user_filter_appended() {
        let filter = capture_filter(Some("vlan 100")).unwrap();
        assert!(filter.starts_with(FIXED_FILTER));
        assert!(filter.ends_with(" and (vlan 100)"));
    }

    #[test]
    fn test_user_filter_bounded() {
        let long = "host 192.0.2.1 or ".repeat(100);
        assert!(capture_filter(Some(&long)).is_err());
    }
}
