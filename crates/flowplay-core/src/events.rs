//! Outbound events from the engine to the application.
//!
//! The engine publishes a stream of tagged messages over an unbounded
//! channel created at construction. State-entry events (`Buffering`,
//! `Preload`, `Playing`, `End`) are emitted at most once per transition;
//! `Frame` carries ownership of the emitted frame.

use crate::media::VideoFrame;
use crate::metrics::PerformanceSnapshot;

/// An observable playback event.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// The engine is accumulating lookahead; playback is held.
    Buffering,
    /// The engine wants more input from the producer.
    Preload,
    /// Forward progress: the stream is playing.
    Playing,
    /// Stream capabilities from the decoder's header.
    Header {
        /// Stream carries video.
        has_video: bool,
        /// Stream carries audio.
        has_audio: bool,
    },
    /// Best-effort parsed stream metadata (`Null` when unparseable).
    MediaInfo(serde_json::Value),
    /// A frame is due for rendering now. Ownership transfers to the receiver.
    Frame(VideoFrame),
    /// Updated decode-throughput averages.
    Performance(PerformanceSnapshot),
    /// The stream has ended.
    End,
}
