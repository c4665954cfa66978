//! Decoder boundary.
//!
//! The bitstream decoder lives outside this crate: the engine feeds it raw
//! compressed bytes through [`Decoder::feed`] and consumes its typed output
//! as [`DecoderMessage`] values. Messages must reach
//! [`PlaybackEngine::handle_message`](crate::engine::PlaybackEngine::handle_message)
//! on the same control thread that drives ticks. If the decoder runs on its
//! own thread, marshal its messages through the control loop's channel
//! before they touch the engine.

/// A typed message emitted asynchronously by the decoder.
///
/// The engine is the sole consumer. Messages are processed in emission
/// order.
#[derive(Debug, Clone)]
pub enum DecoderMessage {
    /// The decoder is initialized and ready for input.
    Ready,
    /// Stream capabilities, sent once per stream.
    Header {
        /// Stream carries video.
        has_video: bool,
        /// Stream carries audio.
        has_audio: bool,
    },
    /// Embedded stream metadata, unparsed.
    MediaInfo {
        /// Raw metadata payload (JSON on the observed streams).
        raw: Vec<u8>,
    },
    /// A decoded video frame.
    Video {
        /// Decoder-reported timestamp in milliseconds (not yet rebased).
        timestamp_ms: i64,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Luma plane stride in bytes.
        stride_y: u32,
        /// Chroma plane stride in bytes.
        stride_uv: u32,
        /// Pixel payload.
        data: Vec<u8>,
    },
    /// A decoded raw audio chunk.
    Audio {
        /// Decoder-reported timestamp in milliseconds (used only to seed
        /// the time base; chunks are otherwise untimed).
        timestamp_ms: i64,
        /// PCM payload.
        data: Vec<u8>,
    },
    /// Decode-progress report for one consumed unit.
    Decode {
        /// Wall time spent decoding the unit, in milliseconds.
        cost_ms: f64,
        /// Media duration of the unit, in milliseconds.
        duration_ms: f64,
    },
    /// End of stream; no further media messages will follow.
    Complete,
}

/// Input side of the decoder: accepts raw compressed bytes.
///
/// The decoder is torn down by dropping it; the engine releases its handle
/// on `destroy`.
pub trait Decoder: Send {
    /// Feeds a raw compressed buffer for decoding.
    fn feed(&mut self, data: &[u8]);
}
