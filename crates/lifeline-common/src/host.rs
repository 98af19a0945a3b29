//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Host identity discovery for registry registration."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use tracing::debug;

const HOSTNAME_FILE: &str = "/etc/hostname";

/// Resolve the node name from `HOSTNAME`, then the system host name file.
pub fn detect_hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.trim().is_empty() {
            return Some(name.trim().to_owned());
        }
    }
    fs::read_to_string(HOSTNAME_FILE)
        .ok()
        .map(|raw| raw.trim().to_owned())
        .filter(|name| !name.is_empty())
}

/// Resolve the address advertised to the registry.
///
/// `POD_IP` wins when set; otherwise the source address of an outbound UDP
/// route is used. Connecting a UDP socket sends no packets.
pub fn detect_host_ip() -> IpAddr {
    if let Some(ip) = std::env::var("POD_IP")
        .ok()
        .and_then(|raw| raw.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }
    match detect_outbound_ipv4() {
        Some(ip) => IpAddr::V4(ip),
        None => {
            debug!("no routable IPv4 address found; advertising loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

fn detect_outbound_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(10, 255, 255, 255), 1)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}
