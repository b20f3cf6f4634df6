//! Modular sequence-number arithmetic.
//!
//! Sender and receiver both index fixed-size slot arrays by sequence number,
//! so every wrap-around computation goes through [`SeqSpace`].
//!
//! ```text
//!        start                 start + window
//!          │                         │
//!  ... 10 11 │ 0  1  2  3  4  5 │ 6  7 ...   (modulus 12, window 6)
//!            │<── in_window ──▶│
//! ```

use crate::config::SrConfig;

/// Sequence number used to index slot arrays, always `< modulus`.
pub type SeqNum = usize;

/// A window of `window` slots over a sequence space of `modulus` numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
    window: usize,
    modulus: usize,
}

impl SeqSpace {
    pub fn new(config: &SrConfig) -> Self {
        Self {
            window: config.window_size(),
            modulus: config.seq_space(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn modulus(&self) -> usize {
        self.modulus
    }

    /// `s + 1` modulo the space.
    #[inline]
    pub fn next(&self, s: SeqNum) -> SeqNum {
        self.add(s, 1)
    }

    #[inline]
    pub fn add(&self, s: SeqNum, n: usize) -> SeqNum {
        (s + n % self.modulus) % self.modulus
    }

    /// Number of steps forward from `from` to `to`, in `[0, modulus)`.
    #[inline]
    pub fn distance(&self, from: SeqNum, to: SeqNum) -> usize {
        (to + self.modulus - from) % self.modulus
    }

    /// `true` when `s` is one of the `window` numbers starting at `start`.
    #[inline]
    pub fn in_window(&self, start: SeqNum, s: SeqNum) -> bool {
        self.distance(start, s) < self.window
    }

    /// Validate a header field read off the channel.
    ///
    /// Header fields may have been corrupted in transit without the additive
    /// checksum noticing, so they are never used as indices unchecked.
    pub fn index(&self, raw: i32) -> Option<SeqNum> {
        usize::try_from(raw).ok().filter(|&s| s < self.modulus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> SeqSpace {
        SeqSpace::new(&SrConfig::default())
    }

    #[test]
    fn next_wraps() {
        let s = space();
        assert_eq!(s.next(0), 1);
        assert_eq!(s.next(11), 0);
        assert_eq!(s.add(10, 5), 3);
    }

    #[test]
    fn distance_across_wrap() {
        let s = space();
        assert_eq!(s.distance(10, 2), 4);
        assert_eq!(s.distance(2, 10), 8);
        assert_eq!(s.distance(5, 5), 0);
    }

    #[test]
    fn window_membership() {
        let s = space();
        assert!(s.in_window(9, 9));
        assert!(s.in_window(9, 2)); // 9,10,11,0,1,2
        assert!(!s.in_window(9, 3));
        // Previous window is not part of the current one.
        assert!(!s.in_window(6, 5));
    }

    #[test]
    fn index_rejects_out_of_range() {
        let s = space();
        assert_eq!(s.index(0), Some(0));
        assert_eq!(s.index(11), Some(11));
        assert_eq!(s.index(12), None);
        assert_eq!(s.index(-1), None);
        assert_eq!(s.index(999_999), None);
    }
}
