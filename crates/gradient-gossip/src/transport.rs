//! UDP transport for gossip datagrams
//!
//! A thin wrapper around tokio's UdpSocket with:
//! - Configurable send/receive buffer sizes
//! - Deadline-bounded receive
//! - Best-effort fan-out to a peer list, with bounded name resolution

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::config::DEFAULT_READ_TIMEOUT;
use crate::error::{Error, Result};

/// Outcome of a deadline-bounded receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recv {
    /// `len` bytes arrived from `from`
    Datagram { len: usize, from: SocketAddr },
    /// The read deadline expired first
    TimedOut,
}

/// Gossip socket handle.
#[derive(Debug, Clone)]
pub struct GossipTransport {
    socket: Arc<UdpSocket>,
    resolve_timeout: Duration,
}

impl GossipTransport {
    /// Bind to `addr` with the given kernel buffer sizes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(addr: SocketAddr, sndbuf: usize, rcvbuf: usize) -> Result<Self> {
        let bind_err = |source| Error::Bind { addr, source };

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;

        // Set buffer sizes before binding
        socket.set_send_buffer_size(sndbuf).map_err(bind_err)?;
        socket.set_recv_buffer_size(rcvbuf).map_err(bind_err)?;

        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;

        let std_socket: std::net::UdpSocket = socket.into();
        let tokio_socket = UdpSocket::from_std(std_socket).map_err(bind_err)?;

        info!(
            "Gossip transport bound to {} (sndbuf={}, rcvbuf={})",
            addr, sndbuf, rcvbuf
        );

        Ok(Self {
            socket: Arc::new(tokio_socket),
            resolve_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// Cap on resolving a single peer name during [`broadcast`](Self::broadcast).
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive one datagram, giving up after `timeout`.
    pub async fn recv_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<Recv> {
        match tokio::time::timeout(timeout, self.socket.recv_from(buf)).await {
            Ok(Ok((len, from))) => Ok(Recv::Datagram { len, from }),
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Ok(Recv::TimedOut),
        }
    }

    /// Send raw bytes to a resolved address.
    pub async fn send_raw(&self, addr: SocketAddr, data: &[u8]) -> Result<()> {
        self.socket.send_to(data, addr).await?;
        Ok(())
    }

    /// Resolve `peer` (`host:port`) to its first address, giving up after the
    /// resolve timeout.
    pub async fn resolve(&self, peer: &str) -> Option<SocketAddr> {
        match tokio::time::timeout(self.resolve_timeout, tokio::net::lookup_host(peer)).await {
            Ok(Ok(mut addrs)) => {
                let addr = addrs.next();
                if addr.is_none() {
                    debug!("Peer {} resolved to no addresses", peer);
                }
                addr
            }
            Ok(Err(e)) => {
                debug!("Failed to resolve peer {}: {}", peer, e);
                None
            }
            Err(_) => {
                debug!("Resolving peer {} timed out after {:?}", peer, self.resolve_timeout);
                None
            }
        }
    }

    /// Send `payload` to every peer, resolving `host:port` names each time.
    ///
    /// Failures are logged and skipped; returns how many sends succeeded.
    pub async fn broadcast(&self, peers: &[String], payload: &[u8]) -> usize {
        let mut sent = 0;
        for peer in peers {
            let Some(addr) = self.resolve(peer).await else {
                continue;
            };
            match self.send_raw(addr, payload).await {
                Ok(()) => {
                    trace!("Gossip sent {} bytes to {}", payload.len(), addr);
                    sent += 1;
                }
                Err(e) => debug!("Gossip send to {} failed: {}", addr, e),
            }
        }
        sent
    }
}
