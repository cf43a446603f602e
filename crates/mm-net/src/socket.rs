//! UDP multicast transport.
//!
//! The socket is nonblocking; the owning thread polls `recv` and sleeps
//! between empty reads. Loss and reordering are expected; nothing here
//! retries or acknowledges.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

/// Errors opening the transport. Everything after open is best-effort.
#[derive(Debug)]
pub enum NetError {
    Bind(io::Error),
    JoinGroup(io::Error),
}

impl std::fmt::Display for NetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetError::Bind(e) => write!(f, "bind failed: {}", e),
            NetError::JoinGroup(e) => write!(f, "multicast join failed: {}", e),
        }
    }
}

impl std::error::Error for NetError {}

/// A joined multicast group endpoint.
pub struct MulticastSocket {
    socket: UdpSocket,
    group: SocketAddrV4,
}

impl MulticastSocket {
    /// Bind the port and join the group on all interfaces.
    pub fn open(group: Ipv4Addr, port: u16) -> Result<Self, NetError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
            .map_err(NetError::Bind)?;
        socket
            .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
            .map_err(NetError::JoinGroup)?;
        socket.set_nonblocking(true).map_err(NetError::Bind)?;
        tracing::info!(%group, port, "joined multicast group");
        Ok(Self { socket, group: SocketAddrV4::new(group, port) })
    }

    /// Nonblocking receive. `None` when nothing is pending.
    pub fn recv(&self, buf: &mut [u8]) -> Option<usize> {
        match self.socket.recv_from(buf) {
            Ok((len, _)) => Some(len),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                tracing::warn!(error = %e, "recv failed");
                None
            }
        }
    }

    /// Clone the endpoint so send and receive can live on different
    /// threads.
    pub fn try_clone(&self) -> io::Result<MulticastSocket> {
        Ok(MulticastSocket { socket: self.socket.try_clone()?, group: self.group })
    }

    /// Fire-and-forget send to the group.
    pub fn send(&self, payload: &[u8]) {
        if let Err(e) = self.socket.send_to(payload, self.group) {
            tracing::warn!(error = %e, "send failed");
        }
    }
}
