use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

use crate::address::TargetAddr;

/// Protocol names accepted by `--protocol`.
pub const PROTOCOLS: [&str; 6] = ["tcp", "tcp4", "tcp6", "udp", "udp4", "udp6"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown network '{0}'")]
pub struct UnknownNetwork(String);

impl FromStr for Transport {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tcp" => Transport::Tcp,
            "tcp4" => Transport::Tcp4,
            "tcp6" => Transport::Tcp6,
            "udp" => Transport::Udp,
            "udp4" => Transport::Udp4,
            "udp6" => Transport::Udp6,
            _ => return Err(UnknownNetwork(s.to_string())),
        })
    }
}

impl Transport {
    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Transport::Tcp | Transport::Udp => true,
            Transport::Tcp4 | Transport::Udp4 => addr.is_ipv4(),
            Transport::Tcp6 | Transport::Udp6 => addr.is_ipv6(),
        }
    }

    /// Resolves the target and opens a single connection to it. TCP tries every resolved
    /// address of the right family in order, UDP connects an ephemeral socket to the first.
    pub async fn connect(self, target: &TargetAddr) -> io::Result<Connection> {
        let target = target.to_string();
        let candidates: Vec<SocketAddr> = tokio::net::lookup_host(&target)
            .await?
            .filter(|addr| self.accepts(addr))
            .collect();
        let first = *candidates.first().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no suitable address found for {target}"),
            )
        })?;

        match self {
            Transport::Tcp | Transport::Tcp4 | Transport::Tcp6 => {
                let mut last_err = None;
                for addr in candidates {
                    match TcpStream::connect(addr).await {
                        Ok(stream) => {
                            tracing::debug!("Connected to {} over tcp", addr);
                            return Ok(Connection::Tcp(stream));
                        }
                        Err(err) => {
                            tracing::debug!("Connecting to {} failed: {}", addr, err);
                            last_err = Some(err);
                        }
                    }
                }
                Err(last_err.unwrap_or_else(|| io::Error::other("no address to connect to")))
            }
            Transport::Udp | Transport::Udp4 | Transport::Udp6 => {
                let local = if first.is_ipv4() {
                    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
                } else {
                    SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
                };
                let socket = UdpSocket::bind(local).await?;
                socket.connect(first).await?;
                tracing::debug!("Connected to {} over udp", first);
                Ok(Connection::Udp(socket))
            }
        }
    }
}

/// Destination for rendered records.
pub trait RecordSink {
    /// Writes one newline-terminated record and returns the number of bytes it accounts for.
    async fn write_line(&mut self, line: &[u8]) -> io::Result<usize>;

    async fn close(&mut self) -> io::Result<()>;
}

#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl RecordSink for Connection {
    async fn write_line(&mut self, line: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(stream) => {
                stream.write_all(line).await?;
                Ok(line.len())
            }
            // One record per datagram.
            Connection::Udp(socket) => socket.send(line).await,
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.shutdown().await,
            Connection::Udp(_) => Ok(()),
        }
    }
}

/// Dry-run sink: nothing leaves the process, but every record is counted as if it was written.
#[derive(Debug, Default)]
pub struct Discard;

impl RecordSink for Discard {
    async fn write_line(&mut self, line: &[u8]) -> io::Result<usize> {
        Ok(line.len())
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
