//! Running the protocol entities over a real UDP socket.
//!
//! ```text
//!  run_sender                               run_receiver
//!    SrSender ──DATA──▶ Socket ~~~ UDP ~~~▶ Socket ──▶ SrReceiver
//!       ▲                                                  │
//!       └────────────── ACK ◀── Socket ◀~~~~~~~~~~~~~~~~~~~┘
//! ```
//!
//! Each loop owns an [`UdpContext`] that collects the packets, timer changes
//! and deliveries produced by one protocol callback. After the callback
//! returns, the outbox is flushed to the socket. The retransmission timer is
//! a deadline polled with `tokio::select!` next to `recv_from`.

use std::future;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep_until, Instant};

use crate::config::SrConfig;
use crate::context::{Application, Channel, Timer};
use crate::packet::{Message, Packet};
use crate::receiver::{ReceiverStats, SrReceiver};
use crate::sender::{AckOutcome, SenderStats, SrSender};
use crate::socket::{Socket, SocketError};

/// Parameters for a UDP transfer.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub protocol: SrConfig,
    /// Wall-clock length of one protocol time unit; the retransmission
    /// timeout is `protocol.rtt() * time_unit`.
    pub time_unit: Duration,
    /// Consecutive timeouts without the window moving before the sender
    /// gives up.
    pub max_retries: u32,
    /// How long the receiver keeps re-acknowledging after its last delivery.
    pub linger: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            protocol: SrConfig::default(),
            time_unit: Duration::from_millis(10),
            max_retries: 8,
            linger: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error("no acknowledgement after {0} consecutive timeouts")]
    MaxRetriesExceeded(u32),
}

/// What the receiver handed to the application.
#[derive(Debug, Clone)]
pub struct Received {
    pub messages: Vec<Message>,
    pub stats: ReceiverStats,
}

struct UdpContext {
    outbox: Vec<Packet>,
    inbox: Vec<Message>,
    deadline: Option<Instant>,
    time_unit: Duration,
}

impl UdpContext {
    fn new(time_unit: Duration) -> Self {
        Self {
            outbox: Vec::new(),
            inbox: Vec::new(),
            deadline: None,
            time_unit,
        }
    }

    async fn flush(&mut self, socket: &Socket, peer: SocketAddr) -> Result<(), SocketError> {
        for packet in self.outbox.drain(..) {
            socket.send_to(&packet, peer).await?;
        }
        Ok(())
    }
}

impl Channel for UdpContext {
    fn to_channel(&mut self, packet: Packet) {
        self.outbox.push(packet);
    }
}

impl Timer for UdpContext {
    fn start_timer(&mut self, increment: f64) {
        self.deadline = Some(Instant::now() + self.time_unit.mul_f64(increment));
    }

    fn stop_timer(&mut self) {
        self.deadline = None;
    }
}

impl Application for UdpContext {
    fn to_application(&mut self, message: Message) {
        self.inbox.push(message);
    }
}

/// Resolve at `deadline`, or never when no timer is armed.
async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => future::pending().await,
    }
}

/// Receive one packet, skipping datagrams that do not decode.
async fn next_packet(socket: &Socket) -> Result<(Packet, SocketAddr), SocketError> {
    loop {
        match socket.recv_from().await {
            Err(SocketError::Packet(e)) => log::debug!("[udp] dropping malformed datagram: {e}"),
            other => return other,
        }
    }
}

/// Send `messages` to `peer` and wait until every one is acknowledged.
///
/// Messages are submitted only while the window has room, so none is
/// dropped for a full window.
pub async fn run_sender(
    socket: &Socket,
    peer: SocketAddr,
    messages: &[Message],
    config: &EndpointConfig,
) -> Result<SenderStats, EndpointError> {
    let mut sender = SrSender::new(config.protocol);
    let mut ctx = UdpContext::new(config.time_unit);
    let mut pending = messages.iter();
    let mut retries = 0u32;

    log::info!("[A] sending {} messages to {peer}", messages.len());
    loop {
        while sender.can_send() {
            let Some(message) = pending.next() else { break };
            sender.submit(&mut ctx, message);
        }
        ctx.flush(socket, peer).await?;

        if pending.len() == 0 && !sender.has_unacked() {
            break;
        }

        let deadline = ctx.deadline;
        tokio::select! {
            result = next_packet(socket) => {
                let (packet, addr) = result?;
                if addr != peer {
                    log::debug!("[A] ignoring datagram from {addr}");
                    continue;
                }
                if let AckOutcome::Accepted { advanced } = sender.on_ack(&mut ctx, &packet) {
                    if advanced > 0 {
                        retries = 0;
                    }
                }
            }
            _ = expiry(deadline) => {
                ctx.deadline = None;
                retries += 1;
                if retries > config.max_retries {
                    return Err(EndpointError::MaxRetriesExceeded(config.max_retries));
                }
                sender.on_timeout(&mut ctx);
            }
        }
    }

    log::info!("[A] all {} messages acknowledged", messages.len());
    Ok(*sender.stats())
}

/// Receive `count` in-order messages from whoever sends them.
///
/// After the last delivery the receiver lingers for `config.linger`,
/// re-acknowledging retransmissions whose first ACK was lost.
pub async fn run_receiver(
    socket: &Socket,
    count: usize,
    config: &EndpointConfig,
) -> Result<Received, EndpointError> {
    let mut receiver = SrReceiver::new(config.protocol);
    let mut ctx = UdpContext::new(config.time_unit);
    let mut messages = Vec::with_capacity(count);

    log::info!("[B] waiting for {count} messages on {}", socket.local_addr);
    while messages.len() < count {
        let (packet, addr) = next_packet(socket).await?;
        receiver.on_packet(&mut ctx, &packet);
        messages.append(&mut ctx.inbox);
        ctx.flush(socket, addr).await?;
    }
    messages.truncate(count);

    let linger_until = Instant::now() + config.linger;
    loop {
        tokio::select! {
            result = next_packet(socket) => {
                let (packet, addr) = result?;
                receiver.on_packet(&mut ctx, &packet);
                ctx.inbox.clear();
                ctx.flush(socket, addr).await?;
            }
            _ = sleep_until(linger_until) => break,
        }
    }

    log::info!("[B] delivered {} messages", messages.len());
    Ok(Received {
        messages,
        stats: *receiver.stats(),
    })
}
