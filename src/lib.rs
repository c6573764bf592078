//! Reordering, loss-tracking and NACK-feedback jitter buffer for RTP media
//! streams.
//!
//! A [`JitterBuffer`] sits between a network receiver of RTP packets and a
//! downstream decoder. It absorbs network jitter, restores packet order,
//! detects gaps, and (for video) produces NACK feedback and keyframe
//! requests through an injected [`Session`] collaborator. All public
//! operations are synchronous and safe to call from any thread; a single
//! internal lock serializes mutation.
//!
//! ```
//! use rtp_jitter_buffer::{JbKind, JitterBuffer};
//!
//! let jb = JitterBuffer::new(JbKind::Audio, 1, 10);
//! ```

mod buffer;
mod clock;
mod config;
mod constants;
mod controller;
mod error;
mod index;
mod nack;
mod node_pool;
mod packet;
mod reader;
mod session;
mod types;
mod writer;

pub use buffer::{GetOutcome, JitterBuffer, MoreDataReason, PeekKey, PeekedFrame};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{FrameLenInfo, JbFlags, JbKind, TsModeConfig};
pub use error::JbError;
pub use packet::StoredPacket;
pub use session::Session;
pub use types::{RtpSequence, RtpTimestamp};
