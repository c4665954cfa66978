//! Core media types: decoded frames, raw audio, stream capabilities, and the
//! stream time base.
//!
//! Timestamps are rebased milliseconds: the first timestamp the decoder
//! reports (video or audio, whichever arrives first) becomes the stream's
//! time base, and every later timestamp is expressed relative to it, so the
//! visible timeline always starts at zero regardless of the decoder's
//! internal numbering.

/// A decoded video frame ready for rendering.
///
/// The pixel payload is an opaque owned buffer; planar formats carry two
/// stride values (luma and chroma). Ownership transfers to the application
/// when the frame is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Opaque pixel payload.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Luma plane stride in bytes.
    pub stride_y: u32,
    /// Chroma plane stride in bytes.
    pub stride_uv: u32,
    /// Rebased presentation timestamp in milliseconds.
    pub timestamp_ms: i64,
}

/// A raw PCM chunk from the decoder.
///
/// Audio chunks carry no independent timestamp: they are assumed contiguous
/// and are timed by the sink once merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Raw PCM payload.
    pub data: Vec<u8>,
}

/// Stream capability flags from the stream header.
///
/// Both flags default to `true` until the header arrives; a header declaring
/// neither modality is a protocol anomaly the engine reports but does not
/// recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCaps {
    /// Stream carries video.
    pub has_video: bool,
    /// Stream carries audio.
    pub has_audio: bool,
}

impl Default for StreamCaps {
    fn default() -> Self {
        Self {
            has_video: true,
            has_audio: true,
        }
    }
}

/// The stream's captured time reference.
///
/// Holds an explicit `Option` rather than a zero sentinel so a legitimate
/// first timestamp of 0 is indistinguishable from no other value.
/// Once captured, the base never changes for the lifetime of the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeBase {
    base_ms: Option<i64>,
}

impl TimeBase {
    /// Creates an unset time base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes a raw decoder timestamp and returns it rebased.
    ///
    /// The first observed timestamp becomes the base; later calls subtract
    /// it. Results saturate at zero (a raw timestamp below the base cannot
    /// produce a negative playback time).
    pub fn rebase(&mut self, raw_ms: i64) -> i64 {
        let base = *self.base_ms.get_or_insert(raw_ms);
        (raw_ms - base).max(0)
    }

    /// Returns the captured base, if any.
    pub fn base_ms(&self) -> Option<i64> {
        self.base_ms
    }

    /// Returns true once the base has been captured.
    pub fn is_set(&self) -> bool {
        self.base_ms.is_some()
    }
}
