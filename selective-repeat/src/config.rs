//! Protocol constants and validated runtime configuration.
//!
//! The defaults mirror the parameters the protocol is normally exercised
//! with: a window of 6 packets, a sequence space of 12 and a round-trip
//! timeout of 16 simulated time units.

use thiserror::Error;

/// Round-trip timeout in simulated time units.
pub const RTT: f64 = 16.0;

/// Maximum number of buffered, unacknowledged packets.
pub const WINDOW_SIZE: usize = 6;

/// Sequence numbers wrap modulo this value.
///
/// Always twice the window so an old instance of a sequence number can never
/// be mistaken for a new one.
pub const SEQ_SPACE: usize = 2 * WINDOW_SIZE;

/// Largest accepted window.
///
/// Keeps every sequence number representable in the `i32` header fields and
/// bounds the per-slot buffers both entities allocate.
pub const MAX_WINDOW: usize = 1 << 16;

/// Filler for header fields that carry no meaning (the acknum of data packets).
pub const NOT_IN_USE: i32 = -1;

/// Length of every message and packet payload in bytes.
pub const PAYLOAD_LEN: usize = 20;

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("window size must be at least 1")]
    ZeroWindow,
    #[error("window size must be at most {} (got {0})", MAX_WINDOW)]
    WindowTooLarge(usize),
    #[error("round-trip timeout must be a positive, finite number (got {0})")]
    BadTimeout(f64),
    #[error("probability `{name}` must lie in [0, 1] (got {value})")]
    BadProbability { name: &'static str, value: f64 },
    #[error("mean interarrival time must be positive (got {0})")]
    BadInterarrival(f64),
    #[error("simulation time limit must be positive (got {0})")]
    BadMaxTime(f64),
}

/// Window and timeout parameters shared by both entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrConfig {
    window_size: usize,
    rtt: f64,
}

impl Default for SrConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            rtt: RTT,
        }
    }
}

impl SrConfig {
    pub fn new(window_size: usize, rtt: f64) -> Result<Self, ConfigError> {
        if window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if window_size > MAX_WINDOW {
            return Err(ConfigError::WindowTooLarge(window_size));
        }
        if !rtt.is_finite() || rtt <= 0.0 {
            return Err(ConfigError::BadTimeout(rtt));
        }
        Ok(Self { window_size, rtt })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn rtt(&self) -> f64 {
        self.rtt
    }

    /// Size of the sequence-number space, `2 * window_size`.
    pub fn seq_space(&self) -> usize {
        2 * self.window_size
    }
}

/// Reject a probability outside `[0, 1]`.
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::BadProbability { name, value })
    }
}
