//! Selective-repeat receive-side state machine (entity B).
//!
//! [`SrReceiver`] implements the receiver side of selective repeat:
//!
//! - Every intact packet is acknowledged individually with
//!   `acknum = seqnum`, including duplicates and packets from the previous
//!   window, so the sender recovers from lost ACKs.
//! - Packets inside the reception window `[expected, expected + window)` are
//!   buffered, even out of order.
//! - Whenever the slot at `expected` is filled, the contiguous run starting
//!   there is delivered to the application and the window slides.
//! - Corrupted packets are dropped without any reply; the sender's timeout
//!   drives recovery.

use crate::config::SrConfig;
use crate::context::{Application, Channel};
use crate::packet::Packet;
use crate::seq::{SeqNum, SeqSpace};

/// Diagnostic counters for entity B.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Messages handed to the application.
    pub packets_delivered: u64,
    pub acks_sent: u64,
    pub corrupted: u64,
    /// Intact packets already buffered or delivered.
    pub duplicates: u64,
    pub out_of_window: u64,
}

/// Result of [`SrReceiver::on_packet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Checksum mismatch; dropped without an ACK.
    Corrupted,
    /// Intact checksum but a sequence number outside the space; dropped
    /// without an ACK.
    Invalid,
    /// Re-acknowledged; already buffered.
    Duplicate,
    /// Re-acknowledged; not inside the reception window.
    OutOfWindow,
    /// Stored until the gap before it is filled.
    Buffered,
    /// Filled the head of the window; this many messages were delivered.
    Delivered(usize),
}

/// Selective-repeat receive-side state for one connection.
#[derive(Debug)]
pub struct SrReceiver {
    space: SeqSpace,
    /// Oldest sequence number not yet delivered to the application.
    expected: SeqNum,
    recv_buffer: Vec<Option<Packet>>,
    received: Vec<bool>,
    stats: ReceiverStats,
}

impl SrReceiver {
    pub fn new(config: SrConfig) -> Self {
        let space = SeqSpace::new(&config);
        Self {
            space,
            expected: 0,
            recv_buffer: vec![None; space.modulus()],
            received: vec![false; space.modulus()],
            stats: ReceiverStats::default(),
        }
    }

    pub fn expected_seq(&self) -> SeqNum {
        self.expected
    }

    /// Number of out-of-order packets waiting for a gap to fill.
    pub fn buffered(&self) -> usize {
        self.received.iter().filter(|&&r| r).count()
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Called when a data packet arrives from the channel.
    pub fn on_packet<C>(&mut self, ctx: &mut C, packet: &Packet) -> PacketOutcome
    where
        C: Channel + Application + ?Sized,
    {
        if packet.is_corrupted() {
            self.stats.corrupted += 1;
            log::debug!("[B] ← corrupted packet, dropped");
            return PacketOutcome::Corrupted;
        }
        let Some(seq) = self.space.index(packet.seqnum) else {
            log::warn!("[B] ← packet with invalid seq {}, dropped", packet.seqnum);
            return PacketOutcome::Invalid;
        };

        ctx.to_channel(Packet::ack(seq));
        self.stats.acks_sent += 1;

        if !self.space.in_window(self.expected, seq) {
            self.stats.out_of_window += 1;
            log::debug!("[B] ← DATA seq={seq} outside window, re-ACKed");
            return PacketOutcome::OutOfWindow;
        }
        if self.received[seq] {
            self.stats.duplicates += 1;
            log::debug!("[B] ← duplicate DATA seq={seq}, re-ACKed");
            return PacketOutcome::Duplicate;
        }

        self.received[seq] = true;
        self.recv_buffer[seq] = Some(*packet);

        let mut delivered = 0;
        while self.received[self.expected] {
            if let Some(buffered) = self.recv_buffer[self.expected].take() {
                ctx.to_application(buffered.message());
            }
            self.received[self.expected] = false;
            self.expected = self.space.next(self.expected);
            self.stats.packets_delivered += 1;
            delivered += 1;
        }
        log::debug!(
            "[B] ← DATA seq={seq}; → ACK {seq}; delivered {delivered}, expecting {}",
            self.expected
        );

        if delivered == 0 {
            PacketOutcome::Buffered
        } else {
            PacketOutcome::Delivered(delivered)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Message;

    #[derive(Default)]
    struct Recorder {
        acks: Vec<i32>,
        delivered: Vec<Message>,
    }

    impl Channel for Recorder {
        fn to_channel(&mut self, packet: Packet) {
            self.acks.push(packet.acknum);
        }
    }

    impl Application for Recorder {
        fn to_application(&mut self, message: Message) {
            self.delivered.push(message);
        }
    }

    fn data(seq: usize) -> Packet {
        Packet::data(seq, &Message::filled(b'a' + seq as u8))
    }

    #[test]
    fn initial_state() {
        let r = SrReceiver::new(SrConfig::default());
        assert_eq!(r.expected_seq(), 0);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn in_order_packet_delivered() {
        let mut r = SrReceiver::new(SrConfig::default());
        let mut ctx = Recorder::default();

        assert_eq!(r.on_packet(&mut ctx, &data(0)), PacketOutcome::Delivered(1));
        assert_eq!(ctx.acks, [0]);
        assert_eq!(ctx.delivered, [Message::filled(b'a')]);
        assert_eq!(r.expected_seq(), 1);
    }

    #[test]
    fn out_of_order_packet_buffered() {
        let mut r = SrReceiver::new(SrConfig::default());
        let mut ctx = Recorder::default();

        assert_eq!(r.on_packet(&mut ctx, &data(2)), PacketOutcome::Buffered);
        assert_eq!(ctx.acks, [2]);
        assert!(ctx.delivered.is_empty());
        assert_eq!(r.buffered(), 1);
    }

    #[test]
    fn duplicate_buffered_packet_reacked() {
        let mut r = SrReceiver::new(SrConfig::default());
        let mut ctx = Recorder::default();
        r.on_packet(&mut ctx, &data(3));

        assert_eq!(r.on_packet(&mut ctx, &data(3)), PacketOutcome::Duplicate);
        assert_eq!(ctx.acks, [3, 3]);
        assert_eq!(r.stats().duplicates, 1);
    }

    #[test]
    fn previous_window_packet_reacked_not_delivered() {
        let mut r = SrReceiver::new(SrConfig::default());
        let mut ctx = Recorder::default();
        r.on_packet(&mut ctx, &data(0));

        // Retransmission after a lost ACK.
        assert_eq!(r.on_packet(&mut ctx, &data(0)), PacketOutcome::OutOfWindow);
        assert_eq!(ctx.acks, [0, 0]);
        assert_eq!(ctx.delivered.len(), 1);
        assert_eq!(r.stats().packets_delivered, 1);
    }

    #[test]
    fn beyond_window_not_buffered() {
        let mut r = SrReceiver::new(SrConfig::default());
        let mut ctx = Recorder::default();
        assert_eq!(r.on_packet(&mut ctx, &data(6)), PacketOutcome::OutOfWindow);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn corrupted_packet_silently_dropped() {
        let mut r = SrReceiver::new(SrConfig::default());
        let mut ctx = Recorder::default();
        let mut pkt = data(0);
        pkt.payload[0] = b'Z';

        assert_eq!(r.on_packet(&mut ctx, &pkt), PacketOutcome::Corrupted);
        assert!(ctx.acks.is_empty());
        assert!(ctx.delivered.is_empty());
        assert_eq!(r.expected_seq(), 0);
    }

    #[test]
    fn invalid_seq_with_matching_checksum_dropped() {
        let mut r = SrReceiver::new(SrConfig::default());
        let mut ctx = Recorder::default();
        // seqnum and acknum shifted in opposite directions keep the sum intact.
        let mut pkt = data(0);
        pkt.seqnum += 100;
        pkt.acknum -= 100;
        assert!(!pkt.is_corrupted());

        assert_eq!(r.on_packet(&mut ctx, &pkt), PacketOutcome::Invalid);
        assert!(ctx.acks.is_empty());
    }

    #[test]
    fn gap_fill_drains_run() {
        let mut r = SrReceiver::new(SrConfig::default());
        let mut ctx = Recorder::default();
        r.on_packet(&mut ctx, &data(1));
        r.on_packet(&mut ctx, &data(2));

        assert_eq!(r.on_packet(&mut ctx, &data(0)), PacketOutcome::Delivered(3));
        assert_eq!(r.expected_seq(), 3);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn seq_wrap_around() {
        let mut r = SrReceiver::new(SrConfig::new(2, 10.0).unwrap());
        let mut ctx = Recorder::default();
        for seq in [0, 1, 2, 3, 0, 1] {
            r.on_packet(&mut ctx, &data(seq));
        }
        assert_eq!(ctx.delivered.len(), 6);
        assert_eq!(r.expected_seq(), 2);
    }
}
