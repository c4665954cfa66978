//! Construction-time playback options.

/// Options recognized by [`PlaybackEngine::new`](crate::engine::PlaybackEngine::new).
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Initial sink volume, 0.0–1.0.
    pub volume: f32,
    /// Start muted.
    pub muted: bool,
    /// Startup buffering threshold in milliseconds. Used as the minimum
    /// lookahead until the clock first advances, then promoted to
    /// `buffering_time_ms`.
    pub preload_time_ms: i64,
    /// Steady-state buffering threshold in milliseconds.
    pub buffering_time_ms: i64,
    /// Nominal buffered-frame target. A threshold input to the pacing
    /// controller only, never enforced as a hard cap.
    pub cache_segment_count: usize,
    /// Number of pending audio chunks enqueued as a separate first slice to
    /// compensate start-of-stream audio/video skew.
    pub audio_head_chunks: usize,
    /// Start with playback gated for restricted-autoplay hosts; cleared by
    /// `unblock()`.
    pub start_blocked: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            preload_time_ms: 1000,
            buffering_time_ms: 3000,
            cache_segment_count: 128,
            audio_head_chunks: 32,
            start_blocked: false,
        }
    }
}
