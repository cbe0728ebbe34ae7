//! Host and process fingerprints embedded in generated ObjectIds
//!
//! The machine fingerprint is the first 3 bytes of an MD5 digest over the
//! hostname followed by every interface's non-loopback IP addresses and
//! hardware address. Each input is best effort: when the hostname or the
//! interface list cannot be read, the digest is taken over whatever is left
//! (possibly nothing). Hosts with the same hostname and no usable interfaces
//! therefore share a fingerprint.

use md5::{Digest, Md5};
use std::net::IpAddr;
use tracing::debug;

/// Addresses bound to one network interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInterface {
    /// Interface name (e.g. `eth0`)
    pub name: String,
    /// Every IP address bound to the interface, loopback included
    pub addrs: Vec<IpAddr>,
    /// Raw hardware address; empty when the interface has none or it is all zero
    pub hardware_addr: Vec<u8>,
}

impl NetworkInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Record a hardware address. All-zero addresses (loopback, tunnels)
    /// count as no address.
    pub fn set_hardware_addr(&mut self, addr: &[u8]) {
        if addr.iter().any(|&b| b != 0) {
            self.hardware_addr = addr.to_vec();
        } else {
            self.hardware_addr.clear();
        }
    }

    /// Hardware address as lowercase colon-separated hex (`02:42:ac:11:00:02`)
    pub fn hardware_addr_string(&self) -> String {
        self.hardware_addr
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// Compute the 3-byte machine fingerprint of the running host
pub fn machine_fingerprint() -> [u8; 3] {
    let hostname = local_hostname();
    if hostname.is_none() {
        debug!("hostname unavailable, machine fingerprint degraded");
    }

    let interfaces = network_interfaces();
    if interfaces.is_none() {
        debug!("network interfaces unavailable, machine fingerprint degraded");
    }

    let source = fingerprint_source(hostname.as_deref(), interfaces.as_deref());
    digest_fingerprint(&source)
}

/// Process fingerprint: the OS process id.
///
/// Only the low 16 bits end up in an ObjectId.
pub fn process_fingerprint() -> u32 {
    std::process::id()
}

/// Assemble the bytes hashed into the machine fingerprint.
///
/// Absent parts contribute nothing.
pub fn fingerprint_source(
    hostname: Option<&str>,
    interfaces: Option<&[NetworkInterface]>,
) -> Vec<u8> {
    let mut source = String::new();

    if let Some(name) = hostname {
        source.push_str(name);
    }

    for iface in interfaces.unwrap_or_default() {
        for addr in iface.addrs.iter().filter(|addr| !addr.is_loopback()) {
            source.push_str(&addr.to_string());
        }
        source.push_str(&iface.hardware_addr_string());
    }

    source.into_bytes()
}

/// First 3 bytes of the MD5 digest of `source`
pub fn digest_fingerprint(source: &[u8]) -> [u8; 3] {
    let sum = Md5::digest(source);
    [sum[0], sum[1], sum[2]]
}

fn local_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

/// Enumerate interfaces with `getifaddrs`, grouping entries by name in the
/// order the kernel reports them.
#[cfg(unix)]
fn network_interfaces() -> Option<Vec<NetworkInterface>> {
    use nix::ifaddrs::getifaddrs;
    use std::net::{SocketAddrV4, SocketAddrV6};

    let addrs = getifaddrs().ok()?;
    let mut interfaces: Vec<NetworkInterface> = Vec::new();

    for entry in addrs {
        let idx = match interfaces
            .iter()
            .position(|iface| iface.name == entry.interface_name)
        {
            Some(idx) => idx,
            None => {
                interfaces.push(NetworkInterface::new(entry.interface_name.clone()));
                interfaces.len() - 1
            }
        };

        let Some(address) = entry.address else {
            continue;
        };

        if let Some(sin) = address.as_sockaddr_in() {
            interfaces[idx].addrs.push(IpAddr::V4(*SocketAddrV4::from(*sin).ip()));
        } else if let Some(sin6) = address.as_sockaddr_in6() {
            interfaces[idx].addrs.push(IpAddr::V6(*SocketAddrV6::from(*sin6).ip()));
        } else {
            #[cfg(any(
                target_os = "linux",
                target_os = "android",
                target_os = "macos",
                target_os = "ios",
                target_os = "freebsd"
            ))]
            if let Some(mac) = address.as_link_addr().and_then(|link| link.addr()) {
                interfaces[idx].set_hardware_addr(&mac);
            }
        }
    }

    Some(interfaces)
}

#[cfg(not(unix))]
fn network_interfaces() -> Option<Vec<NetworkInterface>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn iface(name: &str, addrs: Vec<IpAddr>, mac: Vec<u8>) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            addrs,
            hardware_addr: mac,
        }
    }

    #[test]
    fn test_hardware_addr_string() {
        let eth = iface("eth0", vec![], vec![0x02, 0x42, 0xac, 0x11, 0x00, 0x02]);
        assert_eq!(eth.hardware_addr_string(), "02:42:ac:11:00:02");
        assert_eq!(NetworkInterface::new("tun0").hardware_addr_string(), "");
    }

    #[test]
    fn test_set_hardware_addr_ignores_zero() {
        let mut lo = NetworkInterface::new("lo");
        lo.set_hardware_addr(&[0; 6]);
        assert!(lo.hardware_addr.is_empty());
        assert_eq!(lo.hardware_addr_string(), "");

        let mut eth = NetworkInterface::new("eth0");
        eth.set_hardware_addr(&[0x02, 0x42, 0xac, 0x11, 0x00, 0x02]);
        assert_eq!(eth.hardware_addr_string(), "02:42:ac:11:00:02");
    }

    #[test]
    fn test_source_skips_loopback_addresses() {
        let mut lo = iface(
            "lo",
            vec![IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)],
            vec![],
        );
        lo.set_hardware_addr(&[0; 6]);
        let interfaces = vec![
            lo,
            iface(
                "eth0",
                vec![IpAddr::V4(Ipv4Addr::new(172, 17, 0, 2))],
                vec![0x02, 0x42, 0xac, 0x11, 0x00, 0x02],
            ),
        ];

        let source = fingerprint_source(Some("db-host"), Some(&interfaces));
        assert_eq!(
            String::from_utf8(source).unwrap(),
            "db-host172.17.0.202:42:ac:11:00:02"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_enumerated_interfaces_omit_zero_hardware_addr() {
        let Some(interfaces) = network_interfaces() else {
            return;
        };

        for iface in &interfaces {
            assert!(
                iface.hardware_addr.is_empty() || iface.hardware_addr.iter().any(|&b| b != 0),
                "{} kept an all-zero hardware address",
                iface.name
            );
        }

        let source = String::from_utf8(fingerprint_source(None, Some(&interfaces))).unwrap();
        assert!(!source.contains("00:00:00:00:00:00"), "source={}", source);
    }

    #[test]
    fn test_source_degrades_without_inputs() {
        assert!(fingerprint_source(None, None).is_empty());
        assert_eq!(fingerprint_source(Some("host"), None), b"host".to_vec());
        assert_eq!(fingerprint_source(Some("host"), Some(&[])), b"host".to_vec());
    }

    #[test]
    fn test_digest_known_values() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(digest_fingerprint(b""), [0xd4, 0x1d, 0x8c]);
        // md5("abc") = 900150983cd24fb0d6963f7d28e17f72
        assert_eq!(digest_fingerprint(b"abc"), [0x90, 0x01, 0x50]);
    }

    #[test]
    fn test_identical_hosts_share_fingerprint() {
        let a = fingerprint_source(Some("container"), Some(&[]));
        let b = fingerprint_source(Some("container"), Some(&[]));
        assert_eq!(digest_fingerprint(&a), digest_fingerprint(&b));
    }

    #[test]
    fn test_machine_fingerprint_is_stable() {
        assert_eq!(machine_fingerprint(), machine_fingerprint());
    }

    #[test]
    fn test_process_fingerprint_is_pid() {
        assert_eq!(process_fingerprint(), std::process::id());
    }
}
