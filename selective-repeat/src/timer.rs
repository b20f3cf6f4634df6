//! The sender's single retransmission timer.
//!
//! Selective repeat is normally described with one timer per packet. Here a
//! single timer tracks the oldest unacknowledged packet (`base`) and a
//! timeout retransmits the whole outstanding window.
//!
//! [`RetransmitTimer`] is the only code that calls [`Timer::start_timer`] and
//! [`Timer::stop_timer`], and it guards both calls with its own state:
//!
//! ```text
//!            arm / restart
//!  STOPPED ─────────────────▶ RUNNING
//!     ▲                          │  restart (stop + start)
//!     │   cancel / expired       │◀─┘
//!     └──────────────────────────┘
//! ```
//!
//! It is therefore impossible for the protocol to start a running timer or
//! stop a stopped one.

use crate::context::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
}

/// Start/stop bookkeeping for one entity's timer.
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    state: TimerState,
    /// Duration handed to `start_timer`.
    rto: f64,
}

impl RetransmitTimer {
    pub fn new(rto: f64) -> Self {
        Self {
            state: TimerState::Stopped,
            rto,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Start the timer if it is not already running.
    pub fn arm<T: Timer + ?Sized>(&mut self, timer: &mut T) {
        if self.state == TimerState::Stopped {
            timer.start_timer(self.rto);
            self.state = TimerState::Running;
        }
    }

    /// Start a fresh timeout, cancelling the current one first.
    pub fn restart<T: Timer + ?Sized>(&mut self, timer: &mut T) {
        if self.state == TimerState::Running {
            timer.stop_timer();
        }
        timer.start_timer(self.rto);
        self.state = TimerState::Running;
    }

    /// Stop the timer if it is running.
    pub fn cancel<T: Timer + ?Sized>(&mut self, timer: &mut T) {
        if self.state == TimerState::Running {
            timer.stop_timer();
            self.state = TimerState::Stopped;
        }
    }

    /// Record that the timer fired. The timer subsystem has already
    /// disarmed it, so nothing is stopped.
    pub fn expired(&mut self) {
        self.state = TimerState::Stopped;
    }
}
