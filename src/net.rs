use std::io;
use std::net::{IpAddr, Ipv4Addr};

use sysinfo::Networks;
use tokio::net::TcpListener;

/// First non-loopback IPv4 address across the host's interfaces, for the
/// startup banner. Interfaces are visited in name order.
pub fn local_ipv4() -> IpAddr {
    let networks = Networks::new_with_refreshed_list();
    let mut interfaces: Vec<_> = networks.list().iter().collect();
    interfaces.sort_by(|(a, _), (b, _)| a.cmp(b));

    first_external_ipv4(
        interfaces
            .into_iter()
            .flat_map(|(_, data)| data.ip_networks())
            .map(|network| network.addr),
    )
}

fn first_external_ipv4(addrs: impl IntoIterator<Item = IpAddr>) -> IpAddr {
    addrs
        .into_iter()
        .find(|ip| ip.is_ipv4() && !ip.is_loopback() && !ip.is_unspecified())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Binds `host:port`, moving on to the next port while the address is taken.
pub async fn bind_with_retry(host: &str, port: u16, retries: u16) -> io::Result<TcpListener> {
    let mut attempt_port = port;
    let mut attempts_left = retries;

    loop {
        match TcpListener::bind((host, attempt_port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse && attempts_left > 0 => {
                let Some(next) = attempt_port.checked_add(1) else {
                    return Err(e);
                };
                tracing::warn!(port = attempt_port, next, "Port in use, trying the next one.");
                attempt_port = next;
                attempts_left -= 1;
            }
            Err(e) => return Err(e),
        }
    }
}
