//! Datagram transport for the UDP endpoints.
//!
//! Each [`Packet`] travels as exactly one datagram of [`WIRE_LEN`] bytes.
//! Checksums are not inspected here; a damaged packet is handed up as-is.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::packet::{Packet, PacketError, WIRE_LEN};

/// Failure to move a datagram or to parse one.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("packet decode error: {0}")]
    Packet(#[from] PacketError),
}

/// A tokio `UdpSocket` carrying encoded packets.
///
/// Sending and receiving take `&self`; an endpoint holds one socket for its
/// whole run.
#[derive(Debug)]
pub struct Socket {
    /// Resolved bound address; port `0` is replaced by the one the OS picked.
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Open a socket on `local_addr`, e.g. `127.0.0.1:0` for any free port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Put `packet` on the wire towards `dest`.
    pub async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(&packet.encode(), dest).await?;
        Ok(())
    }

    /// Wait for one datagram and return the packet with its source address.
    ///
    /// A datagram that is not exactly [`WIRE_LEN`] bytes yields
    /// [`SocketError::Packet`]; the socket stays usable afterwards.
    pub async fn recv_from(&self) -> Result<(Packet, SocketAddr), SocketError> {
        // One spare byte so oversized datagrams are reported, not truncated.
        let mut buf = [0u8; WIRE_LEN + 1];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        let packet = Packet::decode(&buf[..n])?;
        Ok((packet, addr))
    }
}
