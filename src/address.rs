use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// The host part of a target address, tagged with the form it was written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Name(String),
}

/// A syntactically valid `host:port` pair the sender can dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddr {
    pub host: Host,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddrError {
    #[error("invalid IP address '{0}'")]
    InvalidIp(String),
    #[error("invalid IP address port '{0}'")]
    InvalidPort(String),
    #[error("invalid IP address '{0}', expected host:port or [ipv6]:port")]
    Malformed(String),
}

impl FromStr for TargetAddr {
    type Err = AddrError;

    // The three forms are tried in a fixed order: anything shaped like a dotted quad is
    // an IPv4 address, even when it fails to parse as one, and is never re-read as a
    // hostname. Only after the host is accepted is the port range checked.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = || AddrError::Malformed(input.to_string());

        let (host, port) = input.rsplit_once(':').ok_or_else(malformed)?;
        if !is_digits(port) {
            return Err(malformed());
        }

        let host = if is_ipv4_shape(host) {
            let ip = host
                .parse::<Ipv4Addr>()
                .map_err(|_| AddrError::InvalidIp(host.to_string()))?;
            Host::Ipv4(ip)
        } else if let Some(inner) = ipv6_shape(host) {
            let ip = inner
                .parse::<Ipv6Addr>()
                .map_err(|_| AddrError::InvalidIp(inner.to_string()))?;
            Host::Ipv6(ip)
        } else if is_hostname_shape(host) {
            Host::Name(host.to_string())
        } else {
            return Err(malformed());
        };

        // Digits that overflow u16 are as out of range as 70000.
        let port = match port.parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => return Err(AddrError::InvalidPort(input.to_string())),
        };

        Ok(Self { host, port })
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Host::Ipv4(ip) => write!(f, "{}:{}", ip, self.port),
            Host::Ipv6(ip) => write!(f, "[{}]:{}", ip, self.port),
            Host::Name(name) => write!(f, "{}:{}", name, self.port),
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_ipv4_shape(host: &str) -> bool {
    let mut octets = 0;
    for part in host.split('.') {
        if !is_digits(part) {
            return false;
        }
        octets += 1;
    }
    octets == 4
}

fn ipv6_shape(host: &str) -> Option<&str> {
    let inner = host.strip_prefix('[')?.strip_suffix(']')?;
    let valid = !inner.is_empty() && inner.bytes().all(|b| b == b':' || b.is_ascii_hexdigit());
    valid.then_some(inner)
}

fn is_hostname_shape(host: &str) -> bool {
    !host.is_empty()
        && host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
