use std::{
    future::Future,
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
};

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::proto::{Packet, WireError, MAX_MESSAGE_SIZE};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("The upstream resolver could not be reached: {0}")]
    Unavailable(#[from] io::Error),
    #[error("The upstream resolver sent a reply that could not be decoded: {0}")]
    MalformedResponse(#[source] WireError),
    #[error("The upstream resolver answered id {found} to a query with id {expected}")]
    IdMismatch { expected: u16, found: u16 },
}

/// Something that can answer a single query on behalf of the forwarder.
pub trait Upstream: Send + Sync {
    fn query(&self, request: &Packet)
        -> impl Future<Output = Result<Packet, UpstreamError>> + Send;
}

/// Sends each query from a fresh socket to one resolver and waits for its reply.
#[derive(Debug, Clone)]
pub struct UdpUpstream {
    addr: SocketAddr,
}

impl UdpUpstream {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Upstream for UdpUpstream {
    async fn query(&self, request: &Packet) -> Result<Packet, UpstreamError> {
        let local: SocketAddr = if self.addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(self.addr).await?;
        socket.send(&request.encode()).await?;

        let mut buf = [0u8; MAX_MESSAGE_SIZE];
        let size = socket.recv(&mut buf).await?;
        let reply = Packet::decode(&buf[..size]).map_err(UpstreamError::MalformedResponse)?;
        if reply.header().id != request.header().id {
            return Err(UpstreamError::IdMismatch {
                expected: request.header().id,
                found: reply.header().id,
            });
        }
        Ok(reply)
    }
}
