//! Transport layer for UDP communication
//!
//! [`Transport`] is the seam between the connection handler and the network.
//! [`UdpTransport`] is the real socket; tests plug in scripted transports.

mod state;

pub use state::{ConnectionState, StateTransition};

use crate::config::NetworkSettings;
use crate::protocol::error::{ProtocolError, Result};
use async_trait::async_trait;
use log::{debug, trace};
use std::net::SocketAddr;
use tokio::net::{UdpSocket, lookup_host};

/// Datagram transport to a single AniDB endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one datagram
    async fn send(&self, data: &[u8]) -> Result<()>;

    /// Receive one datagram into `buffer`, returning its length
    async fn recv(&self, buffer: &mut [u8]) -> Result<usize>;
}

/// UDP socket connected to the AniDB server
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    server_addr: SocketAddr,
}

impl UdpTransport {
    /// Resolve the server, bind a local socket and connect it
    pub async fn bind(settings: &NetworkSettings) -> Result<Self> {
        let server_addr = lookup_host((settings.host.as_str(), settings.port))
            .await?
            .next()
            .ok_or_else(|| {
                ProtocolError::invalid_request(format!(
                    "Could not resolve {}:{}",
                    settings.host, settings.port
                ))
            })?;

        let bind_addr: SocketAddr = if server_addr.is_ipv4() {
            ([0, 0, 0, 0], settings.local_port).into()
        } else {
            ([0u16; 8], settings.local_port).into()
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server_addr).await?;
        debug!(
            "UDP socket {} connected to {server_addr}",
            socket.local_addr()?
        );

        Ok(Self {
            socket,
            server_addr,
        })
    }

    /// Remote endpoint
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Local endpoint
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        trace!("Sending {} bytes to {}", data.len(), self.server_addr);
        self.socket.send(data).await?;
        Ok(())
    }

    async fn recv(&self, buffer: &mut [u8]) -> Result<usize> {
        let size = self.socket.recv(buffer).await?;
        trace!("Received {size} bytes from {}", self.server_addr);
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_exchange_over_loopback() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let settings = NetworkSettings {
            host: "127.0.0.1".to_string(),
            port: server.local_addr().unwrap().port(),
            ..NetworkSettings::default()
        };

        let transport = UdpTransport::bind(&settings).await.unwrap();
        assert_eq!(transport.server_addr(), server.local_addr().unwrap());

        transport.send(b"PING").await.unwrap();
        let mut buf = [0u8; 64];
        let (len, peer) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"PING");

        server.send_to(b"300 PONG", peer).await.unwrap();
        let len = transport.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"300 PONG");
    }
}
