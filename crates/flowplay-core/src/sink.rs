//! Audio sink boundary.
//!
//! The engine never talks to audio hardware directly: it drives an
//! [`AudioSink`], which accepts merged PCM, exposes the hardware playback
//! clock, and absorbs the restricted-autoplay quirks of the host. The sink's
//! clock is the master clock whenever the stream carries audio.
//!
//! [`SystemClockSink`] is the provided reference implementation: a
//! wall-clock model of a playback position that can be paused but never
//! rewound. It performs no device output (that concern lives outside this
//! crate) and exists so demos and tests exercise the exact clock contract
//! real sinks must honor.

use std::time::{Duration, Instant};

/// The audio output boundary the engine drives.
///
/// Implementations must guarantee that `current_time` is monotonically
/// non-decreasing while unpaused; hardware playback clocks never rewind.
pub trait AudioSink: Send {
    /// Enqueues a merged PCM buffer for playback.
    fn enqueue(&mut self, pcm: Vec<u8>);

    /// Suspends playback; the clock holds its position.
    fn pause(&mut self);

    /// Resumes playback; the clock advances again.
    fn resume(&mut self);

    /// Current volume, 0.0–1.0.
    fn volume(&self) -> f32;

    /// Sets the volume, 0.0–1.0.
    fn set_volume(&mut self, volume: f32);

    /// Returns whether the sink is muted.
    fn muted(&self) -> bool;

    /// Sets the mute state.
    fn set_muted(&mut self, muted: bool);

    /// Lifts the restricted-autoplay block, resuming the clock at the
    /// blocked position plus `offset`.
    fn unblock(&mut self, offset: Duration);

    /// Elapsed playback position of the hardware clock.
    fn current_time(&self) -> Duration;

    /// Total duration of PCM handed to the sink so far. A measure of how far
    /// ahead the stream has been decoded, not of the playback position.
    fn available_duration(&self) -> Duration;

    /// Mirrors the externally driven playback position while the sink is
    /// blocked (video-only fallback hint).
    fn set_blocked_position(&mut self, pos: Duration);
}

/// PCM format used to convert enqueued byte counts into durations.
///
/// Samples are assumed 16-bit signed little-endian.
#[derive(Debug, Clone, Copy)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

impl AudioFormat {
    /// Bytes of PCM per second of playback.
    fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64 * 2
    }
}

/// Wall-clock reference implementation of [`AudioSink`].
///
/// Models the one property of audio hardware this crate depends on: once
/// started, the playback clock advances on its own and never rewinds. The
/// clock starts when the first PCM arrives (audio hardware plays as soon as
/// it is fed), pausing freezes the position, and resuming continues from
/// it. While blocked, the clock reports the externally mirrored position
/// until `unblock`.
#[derive(Debug)]
pub struct SystemClockSink {
    format: AudioFormat,
    volume: f32,
    muted: bool,
    paused: bool,
    queued_bytes: u64,
    /// Position accumulated across completed run intervals.
    accumulated: Duration,
    /// Start of the current run interval; `None` while not running.
    running_since: Option<Instant>,
    blocked: bool,
    blocked_pos: Duration,
}

impl SystemClockSink {
    /// Creates an unblocked sink. The clock starts with the first enqueued
    /// PCM.
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            volume: 1.0,
            muted: false,
            paused: false,
            queued_bytes: 0,
            accumulated: Duration::ZERO,
            running_since: None,
            blocked: false,
            blocked_pos: Duration::ZERO,
        }
    }

    /// Creates a sink gated for a restricted-autoplay host. The clock stays
    /// at the mirrored blocked position until `unblock`.
    pub fn blocked(format: AudioFormat) -> Self {
        Self {
            blocked: true,
            ..Self::new(format)
        }
    }

    fn start_clock_if_playable(&mut self) {
        if !self.blocked && !self.paused && self.queued_bytes > 0 && self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }
}

impl AudioSink for SystemClockSink {
    fn enqueue(&mut self, pcm: Vec<u8>) {
        self.queued_bytes += pcm.len() as u64;
        self.start_clock_if_playable();
    }

    fn pause(&mut self) {
        self.paused = true;
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn resume(&mut self) {
        self.paused = false;
        self.start_clock_if_playable();
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn unblock(&mut self, offset: Duration) {
        if !self.blocked {
            return;
        }
        self.blocked = false;
        self.accumulated = self.blocked_pos + offset;
        self.start_clock_if_playable();
    }

    fn current_time(&self) -> Duration {
        if self.blocked {
            return self.blocked_pos;
        }
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }

    fn available_duration(&self) -> Duration {
        let bps = self.format.bytes_per_second();
        Duration::from_micros(self.queued_bytes * 1_000_000 / bps)
    }

    fn set_blocked_position(&mut self, pos: Duration) {
        self.blocked_pos = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_clock_holds_until_first_pcm_arrives() {
        let mut sink = SystemClockSink::new(AudioFormat::default());
        sink.resume();
        sleep(Duration::from_millis(10));
        assert_eq!(sink.current_time(), Duration::ZERO);
    }

    #[test]
    fn test_clock_advances_and_never_rewinds() {
        let mut sink = SystemClockSink::new(AudioFormat::default());
        sink.enqueue(vec![0; 1024]);
        sleep(Duration::from_millis(10));
        let t1 = sink.current_time();
        sleep(Duration::from_millis(10));
        let t2 = sink.current_time();
        assert!(t1 > Duration::ZERO);
        assert!(t2 >= t1);
    }

    #[test]
    fn test_pause_freezes_the_position() {
        let mut sink = SystemClockSink::new(AudioFormat::default());
        sink.enqueue(vec![0; 1024]);
        sleep(Duration::from_millis(10));
        sink.pause();
        let frozen = sink.current_time();
        sleep(Duration::from_millis(10));
        assert_eq!(sink.current_time(), frozen);

        sink.resume();
        sleep(Duration::from_millis(5));
        assert!(sink.current_time() > frozen);
    }

    #[test]
    fn test_available_duration_counts_enqueued_pcm() {
        // 48 kHz stereo s16le: 192000 bytes per second.
        let mut sink = SystemClockSink::new(AudioFormat::default());
        sink.enqueue(vec![0; 19200]);
        assert_eq!(sink.available_duration(), Duration::from_millis(100));
        sink.enqueue(vec![0; 19200]);
        assert_eq!(sink.available_duration(), Duration::from_millis(200));
    }

    #[test]
    fn test_blocked_sink_reports_mirrored_position() {
        let mut sink = SystemClockSink::blocked(AudioFormat::default());
        sink.resume();
        sleep(Duration::from_millis(5));
        assert_eq!(sink.current_time(), Duration::ZERO);

        sink.set_blocked_position(Duration::from_millis(500));
        assert_eq!(sink.current_time(), Duration::from_millis(500));

        sink.unblock(Duration::ZERO);
        assert!(sink.current_time() >= Duration::from_millis(500));
    }

    #[test]
    fn test_volume_clamps() {
        let mut sink = SystemClockSink::new(AudioFormat::default());
        sink.set_volume(1.5);
        assert_eq!(sink.volume(), 1.0);
        sink.set_volume(-0.5);
        assert_eq!(sink.volume(), 0.0);
    }
}
