//! Collaborators the protocol entities talk to.
//!
//! The state machines never own a socket, a clock or an application. Each
//! callback receives a context implementing the traits it needs:
//!
//! | Entity | Context bound             |
//! |--------|---------------------------|
//! | A      | [`Channel`] + [`Timer`]   |
//! | B      | [`Channel`] + [`Application`] |
//!
//! The emulator, the UDP endpoints and the tests each provide their own
//! implementation.

use std::fmt;

use crate::packet::{Message, Packet};

/// Which side of the connection an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// The sender.
    A,
    /// The receiver.
    B,
}

impl Entity {
    /// The entity at the other end of the channel.
    pub fn peer(self) -> Self {
        match self {
            Entity::A => Entity::B,
            Entity::B => Entity::A,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::A => f.write_str("A"),
            Entity::B => f.write_str("B"),
        }
    }
}

/// The unreliable channel towards the peer.
pub trait Channel {
    /// Hand `packet` over for eventual delivery. The channel may drop or
    /// corrupt it.
    fn to_channel(&mut self, packet: Packet);
}

/// The entity's single retransmission timer.
pub trait Timer {
    /// Arm the timer to fire after `increment` time units. Must not be called
    /// while the timer is running.
    fn start_timer(&mut self, increment: f64);

    /// Cancel the running timer. Must not be called while it is stopped.
    fn stop_timer(&mut self);
}

/// The application layer consuming in-order messages.
pub trait Application {
    fn to_application(&mut self, message: Message);
}
