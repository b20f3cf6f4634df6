//! `selective-repeat` — a Selective-Repeat ARQ protocol over an unreliable channel.
//!
//! # Architecture
//!
//! ```text
//!  Application                                         Application
//!      │ submit(msg)                          to_application ▲
//!  ┌───▼──────┐      data packets        ┌──────────────────┴┐
//!  │ SrSender │─────────────────────────▶│    SrReceiver     │
//!  │   (A)    │◀─────────────────────────│       (B)         │
//!  └───┬──────┘     individual ACKs      └───────────────────┘
//!      │ start/stop
//!  ┌───▼──────┐
//!  │  Timer   │   (one per entity, bound to the oldest unacked packet)
//!  └──────────┘
//! ```
//!
//! The state machines only run inside callbacks. The channel, the timer and
//! the application are supplied by the caller through the traits in
//! [`context`]: the [`simulator`] provides an emulated lossy channel, the
//! [`endpoint`] loops a real UDP socket.
//!
//! Each module has a single responsibility:
//! - [`config`]    — protocol constants and validated configuration
//! - [`seq`]       — modular sequence-number arithmetic
//! - [`packet`]    — packets, checksum, wire format
//! - [`context`]   — channel / timer / application interfaces
//! - [`timer`]     — the single retransmission timer's state machine
//! - [`sender`]    — entity A: sliding window, individual ACKs, retransmission
//! - [`receiver`]  — entity B: buffering, in-order delivery, acknowledgement
//! - [`simulator`] — discrete-event lossy/corrupting channel emulator
//! - [`socket`]    — async UDP socket abstraction
//! - [`endpoint`]  — tokio event loops running A or B over UDP

pub mod config;
pub mod context;
pub mod endpoint;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod seq;
pub mod simulator;
pub mod socket;
pub mod timer;

pub use config::{SrConfig, MAX_WINDOW, NOT_IN_USE, PAYLOAD_LEN, RTT, SEQ_SPACE, WINDOW_SIZE};
pub use context::{Application, Channel, Entity, Timer};
pub use packet::{Message, Packet};
pub use receiver::{PacketOutcome, SrReceiver};
pub use sender::{AckOutcome, SrSender, SubmitOutcome};
