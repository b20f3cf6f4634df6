//! Packets, messages and integrity checking.
//!
//! Every unit exchanged between the entities is a [`Packet`]: a data packet
//! from A to B or an acknowledgement from B to A. This module is responsible
//! for:
//! - Building data and acknowledgement packets with a valid checksum.
//! - Detecting corruption ([`Packet::is_corrupted`]).
//! - Serialising a packet into a fixed-size datagram for the UDP transport.
//!
//! No I/O happens here.
//!
//! # Wire format
//!
//! All integers are **big-endian** two's-complement.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Acknowledgment Number                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Checksum                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Payload (20 bytes) ...                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Decoding only checks the length. A datagram whose contents were damaged
//! still decodes; the protocol notices through the checksum and discards it.

use std::fmt;

use thiserror::Error;

use crate::config::{NOT_IN_USE, PAYLOAD_LEN};

/// Byte length of an encoded packet.
pub const WIRE_LEN: usize = 12 + PAYLOAD_LEN;

// Byte offsets of each field within the serialised packet.
const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 4;
const OFF_CHECKSUM: usize = 8;
const OFF_PAYLOAD: usize = 12;

/// Payload byte carried by every acknowledgement.
const ACK_FILLER: u8 = b'0';

/// An opaque, fixed-length unit of application data.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message(pub [u8; PAYLOAD_LEN]);

impl Message {
    /// A message of `PAYLOAD_LEN` copies of `byte`.
    pub fn filled(byte: u8) -> Self {
        Self([byte; PAYLOAD_LEN])
    }

    /// Copy up to `PAYLOAD_LEN` bytes of `data`, padding the rest with zeros.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut bytes = [0u8; PAYLOAD_LEN];
        let n = data.len().min(PAYLOAD_LEN);
        bytes[..n].copy_from_slice(&data[..n]);
        Self(bytes)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// A protocol packet as handed to and received from the channel.
///
/// Header fields are plain `i32`s because the channel may overwrite them with
/// arbitrary values; consumers validate them before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub seqnum: i32,
    pub acknum: i32,
    pub checksum: i32,
    pub payload: [u8; PAYLOAD_LEN],
}

impl Packet {
    /// Build a data packet carrying `message` under sequence number `seq`.
    pub fn data(seq: usize, message: &Message) -> Self {
        Self::with_checksum(seq as i32, NOT_IN_USE, message.0)
    }

    /// Build the acknowledgement for data packet `seq`.
    ///
    /// The payload is filler; acknowledgements carry no data.
    pub fn ack(seq: usize) -> Self {
        Self::with_checksum(seq as i32, seq as i32, [ACK_FILLER; PAYLOAD_LEN])
    }

    fn with_checksum(seqnum: i32, acknum: i32, payload: [u8; PAYLOAD_LEN]) -> Self {
        let mut packet = Self {
            seqnum,
            acknum,
            checksum: 0,
            payload,
        };
        packet.checksum = compute_checksum(&packet);
        packet
    }

    /// `true` when the stored checksum disagrees with the packet's contents.
    pub fn is_corrupted(&self) -> bool {
        self.checksum != compute_checksum(self)
    }

    /// The payload as an application message.
    pub fn message(&self) -> Message {
        Message(self.payload)
    }

    /// Serialise into a fixed-size datagram.
    pub fn encode(&self) -> [u8; WIRE_LEN] {
        let mut buf = [0u8; WIRE_LEN];
        buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&self.seqnum.to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 4].copy_from_slice(&self.acknum.to_be_bytes());
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].copy_from_slice(&self.checksum.to_be_bytes());
        buf[OFF_PAYLOAD..].copy_from_slice(&self.payload);
        buf
    }

    /// Parse a datagram produced by [`Packet::encode`].
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() != WIRE_LEN {
            return Err(PacketError::WrongLength(buf.len()));
        }
        let field = |off: usize| {
            i32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
        };
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&buf[OFF_PAYLOAD..]);
        Ok(Self {
            seqnum: field(OFF_SEQ),
            acknum: field(OFF_ACK),
            checksum: field(OFF_CHECKSUM),
            payload,
        })
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("datagram is {0} bytes, expected {}", WIRE_LEN)]
    WrongLength(usize),
}

/// Additive checksum over the sequence number, acknowledgement number and
/// every payload byte.
///
/// Not cryptographic: it only has to change when the channel overwrites part
/// of a packet.
pub fn compute_checksum(packet: &Packet) -> i32 {
    packet
        .payload
        .iter()
        .fold(packet.seqnum.wrapping_add(packet.acknum), |sum, &b| {
            sum.wrapping_add(i32::from(b))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_packet_is_valid() {
        let pkt = Packet::data(3, &Message::filled(b'a'));
        assert_eq!(pkt.seqnum, 3);
        assert_eq!(pkt.acknum, NOT_IN_USE);
        assert!(!pkt.is_corrupted());
        assert_eq!(pkt.checksum, 3 - 1 + 20 * i32::from(b'a'));
    }

    #[test]
    fn ack_mirrors_seq_and_uses_filler() {
        let ack = Packet::ack(7);
        assert_eq!(ack.seqnum, 7);
        assert_eq!(ack.acknum, 7);
        assert_eq!(ack.payload, [b'0'; PAYLOAD_LEN]);
        assert!(!ack.is_corrupted());
    }

    #[test]
    fn payload_overwrite_detected() {
        let mut pkt = Packet::data(0, &Message::filled(b'b'));
        pkt.payload[0] = b'Z';
        assert!(pkt.is_corrupted());
    }

    #[test]
    fn header_overwrite_detected() {
        let mut pkt = Packet::data(1, &Message::filled(b'c'));
        pkt.seqnum = 999_999;
        assert!(pkt.is_corrupted());

        let mut ack = Packet::ack(4);
        ack.acknum = 999_999;
        assert!(ack.is_corrupted());
    }

    #[test]
    fn message_from_short_slice_is_padded() {
        let m = Message::from_slice(b"hi");
        assert_eq!(&m.0[..2], b"hi");
        assert!(m.0[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn encode_decode_preserves_fields() {
        let pkt = Packet::data(11, &Message::from_slice(b"hello, world"));
        let decoded = Packet::decode(&pkt.encode()).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn negative_acknum_big_endian_on_wire() {
        let bytes = Packet::data(0x0102, &Message::filled(0)).encode();
        assert_eq!(&bytes[OFF_SEQ..OFF_SEQ + 4], &[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(&bytes[OFF_ACK..OFF_ACK + 4], &[0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn decode_wrong_length_returns_error() {
        assert_eq!(Packet::decode(&[]), Err(PacketError::WrongLength(0)));
        assert_eq!(
            Packet::decode(&[0u8; WIRE_LEN + 1]),
            Err(PacketError::WrongLength(WIRE_LEN + 1))
        );
    }

    #[test]
    fn damaged_datagram_decodes_but_is_corrupted() {
        let mut bytes = Packet::ack(2).encode();
        bytes[OFF_PAYLOAD] = b'Z';
        let pkt = Packet::decode(&bytes).unwrap();
        assert!(pkt.is_corrupted());
    }
}
