use std::io;
use std::net::{IpAddr, ToSocketAddrs};

/// Turns a configured host name or IP literal into an address.
///
/// Called from a background thread, so implementations may block.
pub trait Resolver: Send + Sync {
    fn resolve(&self, host: &str) -> io::Result<IpAddr>;
}

/// System resolver. IP literals are returned as-is, names go through DNS and
/// IPv4 results are preferred.
pub struct DnsResolver;

impl Resolver for DnsResolver {
    fn resolve(&self, host: &str) -> io::Result<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let addrs: Vec<IpAddr> = (host, 0).to_socket_addrs()?.map(|a| a.ip()).collect();
        addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no addresses found for {}", host),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn ip_literals_skip_dns() {
        let ip = DnsResolver.resolve("192.168.0.141").unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(192, 168, 0, 141)));
    }

    #[test]
    fn localhost_resolves() {
        assert!(DnsResolver.resolve("localhost").unwrap().is_loopback());
    }
}
