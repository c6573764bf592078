//! Wraparound-safe sequence number and timestamp newtypes.
//!
//! RTP sequence numbers are 16-bit and timestamps are 32-bit; both wrap.
//! Modeling them as bare integers invites exactly the kind of off-by-wrap
//! bug the original design's self-comparison artifact produced (see
//! DESIGN.md). Each type wraps a [`std::num::Wrapping`] so `+`/`-` already
//! wrap modulo 2^16 / 2^32, and exposes the explicit, wrap-aware helpers the
//! writer and reader paths need beyond plain arithmetic.

use std::num::Wrapping;
use std::ops::{Add, Sub};

/// Host-order RTP sequence number, wrapping at 2^16.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RtpSequence(pub Wrapping<u16>);

impl RtpSequence {
    pub const fn new(raw: u16) -> Self {
        Self(Wrapping(raw))
    }

    pub const fn get(self) -> u16 {
        self.0 .0
    }
}

impl Add<u16> for RtpSequence {
    type Output = Self;
    fn add(self, rhs: u16) -> Self {
        Self(self.0 + Wrapping(rhs))
    }
}

impl Sub for RtpSequence {
    type Output = Wrapping<u16>;
    fn sub(self, rhs: Self) -> Wrapping<u16> {
        self.0 - rhs.0
    }
}

impl From<u16> for RtpSequence {
    fn from(raw: u16) -> Self {
        Self::new(raw)
    }
}

/// Host-order RTP timestamp, wrapping at 2^32.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RtpTimestamp(pub Wrapping<u32>);

impl RtpTimestamp {
    pub const fn new(raw: u32) -> Self {
        Self(Wrapping(raw))
    }

    pub const fn get(self) -> u32 {
        self.0 .0
    }
}

impl Add<u32> for RtpTimestamp {
    type Output = Self;
    fn add(self, rhs: u32) -> Self {
        Self(self.0 + Wrapping(rhs))
    }
}

impl Sub for RtpTimestamp {
    type Output = Wrapping<u32>;
    fn sub(self, rhs: Self) -> Wrapping<u32> {
        self.0 - rhs.0
    }
}

impl From<u32> for RtpTimestamp {
    fn from(raw: u32) -> Self {
        Self::new(raw)
    }
}

/// Threshold used by [`seq_is_newer`]: a sequence number this close to the
/// top of the 16-bit range is treated as "about to wrap".
const SEQ_WRAP_GUARD: u16 = u16::MAX - 100;

/// Threshold used by [`ts_wrapped_in`]: a timestamp this close to the top
/// of the 32-bit range is treated as "about to wrap".
const TS_WRAP_GUARD: u32 = u32::MAX - 1000;

/// True if `new` should replace `prev` as a "highest seen" watermark: either
/// `new` is strictly greater in host order, or `prev` was close to wrapping
/// and `new` looks like the post-wrap continuation.
pub fn seq_is_newer(prev: RtpSequence, new: RtpSequence) -> bool {
    new.get() > prev.get() || (prev.get() > SEQ_WRAP_GUARD && new.get() < 100)
}

/// Same idea as [`seq_is_newer`] but for the watermark used when deciding
/// whether a video write starts a new complete frame (guard window is
/// narrower, matching the original's `< 1000` check for that branch).
pub fn seq_is_newer_narrow_guard(prev: RtpSequence, new: RtpSequence) -> bool {
    new.get() >= prev.get() || (prev.get() > SEQ_WRAP_GUARD && new.get() < 100)
}

/// True if `prev` is close enough to the top of the 32-bit range, and `new`
/// close enough to zero, that this is a timestamp wrap-in rather than an
/// ordinary jump backwards.
pub fn ts_wrapped_in(prev: RtpTimestamp, new: RtpTimestamp) -> bool {
    prev.get() > TS_WRAP_GUARD && new.get() < 1000
}

/// True if `new` should replace `prev` as a "highest seen" ts watermark:
/// the timestamp analogue of [`seq_is_newer`].
pub fn ts_is_newer(prev: RtpTimestamp, new: RtpTimestamp) -> bool {
    new.get() > prev.get() || ts_wrapped_in(prev, new)
}

/// Wrap-aware absolute distance between two sequence numbers, implemented
/// as the evident *intent* of the original's wraparound branch (which had a
/// self-comparison bug — see DESIGN.md): when `prev` is near the top of the
/// range and `new` has wrapped around to a small value, the true distance
/// is `(u16::MAX - prev) + new`; otherwise it's the ordinary signed gap.
pub fn seq_distance(prev: RtpSequence, new: RtpSequence) -> u32 {
    if prev.get() > SEQ_WRAP_GUARD && new.get() < 100 {
        (u16::MAX - prev.get()) as u32 + new.get() as u32
    } else {
        (new.get() as i32 - prev.get() as i32).unsigned_abs()
    }
}

/// Wrap-aware absolute distance between two timestamps; same rationale as
/// [`seq_distance`].
pub fn ts_distance(prev: RtpTimestamp, new: RtpTimestamp) -> u32 {
    if ts_wrapped_in(prev, new) {
        (u32::MAX - prev.get()).wrapping_add(new.get())
    } else {
        (new.get() as i64 - prev.get() as i64).unsigned_abs() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_wraps_on_add() {
        let s = RtpSequence::new(u16::MAX);
        assert_eq!((s + 1).get(), 0);
    }

    #[test]
    fn seq_is_newer_handles_wrap_in() {
        assert!(seq_is_newer(RtpSequence::new(65500), RtpSequence::new(10)));
        assert!(seq_is_newer(RtpSequence::new(100), RtpSequence::new(101)));
        assert!(!seq_is_newer(RtpSequence::new(101), RtpSequence::new(100)));
    }

    #[test]
    fn seq_distance_handles_wrap() {
        assert_eq!(seq_distance(RtpSequence::new(65530), RtpSequence::new(5)), 11);
        assert_eq!(seq_distance(RtpSequence::new(10), RtpSequence::new(15)), 5);
    }

    #[test]
    fn ts_distance_handles_wrap() {
        let prev = RtpTimestamp::new(u32::MAX - 10);
        let new = RtpTimestamp::new(5);
        assert_eq!(ts_distance(prev, new), 16);
    }
}
