//! Selective-repeat send-side state machine (entity A).
//!
//! [`SrSender`] keeps up to `window` packets in flight, tracks an individual
//! ACK flag per sequence number and drives one retransmission timer bound to
//! the oldest unacknowledged packet.
//!
//! # Protocol contract
//!
//! - At most `window` packets are outstanding; a submission while the window
//!   is full is counted and dropped.
//! - ACKs are **individual**: `acknum = K` acknowledges packet `K` only.
//!   `base` slides over every contiguous acknowledged packet.
//! - The timer is started when the window goes from empty to non-empty,
//!   restarted whenever `base` advances and stopped when the window drains.
//! - On timeout **every** unacknowledged packet in the window is resent and
//!   the timer is started again.
//!
//! # Sequence-number layout
//!
//! ```text
//!   base               next_seq
//!    │  acked  unacked    │
//!  ──┼──────────────────┼─────────────▶ seq space (mod 2·window)
//!    │<── in flight ───▶│<─ sendable ─▶
//! ```

use crate::config::SrConfig;
use crate::context::{Channel, Timer};
use crate::packet::{Message, Packet};
use crate::seq::{SeqNum, SeqSpace};
use crate::timer::RetransmitTimer;

/// Diagnostic counters for entity A.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SenderStats {
    /// Messages rejected because the window was full.
    pub window_full: u64,
    /// ACKs that acknowledged a packet for the first time.
    pub new_acks: u64,
    /// Packets retransmitted after a timeout.
    pub packets_resent: u64,
    /// Timer expiries with at least one packet outstanding.
    pub timeouts: u64,
    /// First transmissions.
    pub packets_sent: u64,
    pub corrupted_acks: u64,
    pub duplicate_acks: u64,
}

/// Result of [`SrSender::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The message went out under this sequence number.
    Sent(SeqNum),
    /// The window was full; the message was discarded.
    Dropped,
}

/// Result of [`SrSender::on_ack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Checksum mismatch; ignored.
    Corrupted,
    /// The acknum does not name an outstanding packet.
    OutOfWindow,
    /// The packet was already acknowledged.
    Duplicate,
    /// A new ACK; `base` moved forward by `advanced` slots.
    Accepted { advanced: usize },
}

/// Selective-repeat send-side state for one connection.
#[derive(Debug)]
pub struct SrSender {
    space: SeqSpace,
    /// Oldest unacknowledged sequence number.
    base: SeqNum,
    /// Sequence number for the next new packet.
    next_seq: SeqNum,
    /// Sent packets, indexed by sequence number.
    buffer: Vec<Option<Packet>>,
    acked: Vec<bool>,
    timer: RetransmitTimer,
    stats: SenderStats,
}

impl SrSender {
    pub fn new(config: SrConfig) -> Self {
        let space = SeqSpace::new(&config);
        Self {
            space,
            base: 0,
            next_seq: 0,
            buffer: vec![None; space.modulus()],
            acked: vec![false; space.modulus()],
            timer: RetransmitTimer::new(config.rtt()),
            stats: SenderStats::default(),
        }
    }

    pub fn base(&self) -> SeqNum {
        self.base
    }

    pub fn next_seq(&self) -> SeqNum {
        self.next_seq
    }

    /// Number of packets sent but not yet slid out of the window.
    pub fn in_flight(&self) -> usize {
        self.space.distance(self.base, self.next_seq)
    }

    /// `true` when one more packet fits in the window.
    pub fn can_send(&self) -> bool {
        self.in_flight() < self.space.window()
    }

    pub fn has_unacked(&self) -> bool {
        self.base != self.next_seq
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Called when the application has a message to send.
    pub fn submit<C>(&mut self, ctx: &mut C, message: &Message) -> SubmitOutcome
    where
        C: Channel + Timer + ?Sized,
    {
        if !self.can_send() {
            self.stats.window_full += 1;
            log::debug!("[A] window full ({} in flight), message dropped", self.in_flight());
            return SubmitOutcome::Dropped;
        }

        let seq = self.next_seq;
        let packet = Packet::data(seq, message);
        self.buffer[seq] = Some(packet);
        self.acked[seq] = false;

        ctx.to_channel(packet);
        self.stats.packets_sent += 1;
        log::debug!("[A] → DATA seq={seq} in_flight={}", self.in_flight() + 1);

        self.timer.arm(ctx);
        self.next_seq = self.space.next(seq);
        SubmitOutcome::Sent(seq)
    }

    /// Called when a packet (always an ACK) arrives from the channel.
    pub fn on_ack<C>(&mut self, ctx: &mut C, packet: &Packet) -> AckOutcome
    where
        C: Channel + Timer + ?Sized,
    {
        if packet.is_corrupted() {
            self.stats.corrupted_acks += 1;
            log::debug!("[A] ← corrupted ACK, ignored");
            return AckOutcome::Corrupted;
        }

        // A stale ACK for a slot that already slid out must not mark it, or a
        // later slide could run past `next_seq`.
        let ack = match self.space.index(packet.acknum) {
            Some(ack) if self.space.distance(self.base, ack) < self.in_flight() => ack,
            _ => {
                log::debug!(
                    "[A] ← ACK {} outside window [{}, {})",
                    packet.acknum,
                    self.base,
                    self.next_seq
                );
                return AckOutcome::OutOfWindow;
            }
        };

        if self.acked[ack] {
            self.stats.duplicate_acks += 1;
            log::debug!("[A] ← duplicate ACK {ack}");
            return AckOutcome::Duplicate;
        }

        self.acked[ack] = true;
        self.stats.new_acks += 1;

        let mut advanced = 0;
        while self.base != self.next_seq && self.acked[self.base] {
            self.acked[self.base] = false;
            self.buffer[self.base] = None;
            self.base = self.space.next(self.base);
            advanced += 1;
        }
        log::debug!("[A] ← ACK {ack} (slid {advanced}, base={})", self.base);

        if !self.has_unacked() {
            self.timer.cancel(ctx);
        } else if advanced > 0 {
            self.timer.restart(ctx);
        }
        AckOutcome::Accepted { advanced }
    }

    /// Called when the retransmission timer fires.
    ///
    /// Returns the number of packets resent.
    pub fn on_timeout<C>(&mut self, ctx: &mut C) -> usize
    where
        C: Channel + Timer + ?Sized,
    {
        self.timer.expired();
        let outstanding = self.in_flight();
        if outstanding == 0 {
            log::warn!("[A] timer fired with nothing outstanding");
            return 0;
        }
        self.stats.timeouts += 1;

        let mut resent = 0;
        for i in 0..outstanding {
            let seq = self.space.add(self.base, i);
            if self.acked[seq] {
                continue;
            }
            if let Some(packet) = self.buffer[seq] {
                ctx.to_channel(packet);
                resent += 1;
            }
        }
        self.stats.packets_resent += resent as u64;
        log::debug!("[A] timeout: resent {resent} packet(s) from base={}", self.base);

        self.timer.restart(ctx);
        resent
    }
}
