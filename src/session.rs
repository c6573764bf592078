//! Decouples the jitter buffer from whatever concrete media session type a
//! caller has, the way the original design treats "the session" as an
//! opaque handle used only for keyframe requests and a low-bitrate hint.

/// The collaborator a [`crate::JitterBuffer`] asks for keyframes and
/// consults for video bitrate governance.
///
/// A video jitter buffer with no `Session` attached silently skips both
/// side effects; this mirrors the original's "session-less JB" behaviour.
pub trait Session: Send + Sync {
    /// Ask the session to request a keyframe from the remote sender. Called
    /// on resyncs, discontinuities and full resets for video buffers.
    fn request_keyframe(&self);

    /// The `jb_video_low_bitrate` session variable, read once by
    /// [`crate::JitterBuffer::set_session`]. Implementations should return
    /// `None` unless a value in `(128, 10240)` kbps has been configured.
    fn low_bitrate_kbps(&self) -> Option<u32>;

    /// Whether the session currently considers its video bitrate
    /// unmanageable (i.e. forced down by a prior bout of depth growth).
    fn is_bitrate_unmanageable(&self) -> bool;

    /// Flip the unmanageable flag tracked by the session.
    fn set_bitrate_unmanageable(&self, unmanageable: bool);

    /// Ask the session to force the outgoing video bitrate down to the
    /// given value, in kbps.
    fn set_bitrate_kbps(&self, kbps: u32);
}
