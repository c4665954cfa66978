//! Playback engine: state machine, clock model, frame selection, pacing.
//!
//! [`PlaybackEngine`] turns the decoder's unsynchronized output into a paced
//! sequence of render events locked to the audio clock (or, video-only, to
//! the emission cadence itself). It owns the playback state machine and the
//! two buffers between decoder and renderer, and drives its collaborators
//! (audio sink, tick scheduler, decoder) through their trait boundaries.
//!
//! # Threading
//!
//! The engine is single-threaded by construction: every mutation goes
//! through `&mut self`, and the two event sources (scheduler ticks, decoder
//! messages) must be serialized onto the one control loop that owns the
//! engine. Nothing here blocks; ticks and message handlers run to
//! completion.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::config::PlayerConfig;
use crate::decoder::{Decoder, DecoderMessage};
use crate::events::PlayerEvent;
use crate::media::{AudioChunk, StreamCaps, TimeBase, VideoFrame};
use crate::metrics::DecodeMetrics;
use crate::queue::{FrameQueue, PendingAudio};
use crate::sink::AudioSink;
use crate::ticker::TickScheduler;

/// Tolerance window: a buffered frame within this distance of the clock is
/// due for rendering.
pub const FRAME_TOLERANCE_MS: i64 = 25;

/// Nominal tick rate until stream metadata reports a frame rate
/// (~41.6 ms per frame).
pub const DEFAULT_FRAME_RATE: f64 = 24.0;

/// Multiplier on the average decode cost below which the lookahead gap
/// counts as thin enough to request more input.
const DECODE_HEADROOM_FACTOR: f64 = 1.3;

/// Externally observable playback lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Constructed, no decoder activity seen yet.
    Created,
    /// Accumulating lookahead; emission is held.
    Buffering,
    /// Playable, but the producer should keep feeding.
    Preload,
    /// Actively emitting.
    Playing,
    /// Suspended by an explicit `pause`.
    Paused,
    /// Stream complete. Terminal for normal playback; only `destroy` exits.
    End,
    /// Torn down. Terminal and irreversible.
    Destroyed,
}

/// The synchronization and flow-control core.
///
/// # State machine
///
/// ```text
/// new()                      → Created
/// decoder Ready              → Buffering
/// decoder Decode progress    → Playing           (event on entry)
/// lookahead gap too small    → Buffering         (sink paused)
/// queue shallow / thin gap   → Preload           ("keep feeding")
/// pause() ⇄ resume()         → Paused ⇄ Playing  (idempotent)
/// decoder Complete           → End               (sticky; ticks may still drain)
/// destroy()                  → Destroyed         (terminal, everything no-ops)
/// ```
///
/// Construction hands back the event receiver; the application drains it
/// after every tick or message it delivers.
pub struct PlaybackEngine {
    config: PlayerConfig,
    state: PlaybackState,
    caps: StreamCaps,
    ended: bool,
    /// Restricted-autoplay gate; emission is held while set.
    blocked: bool,
    base: TimeBase,
    frames: FrameQueue,
    pending_audio: PendingAudio,
    metrics: DecodeMetrics,
    /// Tick rate the pacing controller returns to, overridden by metadata.
    nominal_fps: f64,
    /// Active minimum lookahead; starts at the startup threshold and is
    /// promoted to the steady-state one once the clock first advances.
    min_buffering_ms: i64,
    /// Timestamp of the frame anchoring the current buffering measurement.
    /// `None` = not tracking.
    buffering_anchor: Option<i64>,
    /// Set when this engine paused the sink to buffer; cleared on the one
    /// resume that ends the stall.
    sink_paused_for_buffering: bool,
    /// One-shot guard for start-of-stream audio head compensation.
    head_sliced: bool,
    /// Clock cache for the current tick; in video-only streams this *is*
    /// the clock (timestamp of the last emitted frame).
    clock_ms: i64,
    sink: Option<Box<dyn AudioSink>>,
    scheduler: Option<Box<dyn TickScheduler>>,
    decoder: Option<Box<dyn Decoder>>,
    events: Sender<PlayerEvent>,
}

impl PlaybackEngine {
    /// Creates an engine wired to its collaborators and returns it together
    /// with the outbound event receiver.
    ///
    /// The scheduler is started immediately at the nominal rate; ticks are
    /// ignored until the decoder reports ready.
    pub fn new(
        config: PlayerConfig,
        mut sink: Box<dyn AudioSink>,
        scheduler: Box<dyn TickScheduler>,
        decoder: Box<dyn Decoder>,
    ) -> (Self, Receiver<PlayerEvent>) {
        sink.set_volume(config.volume);
        sink.set_muted(config.muted);
        scheduler.set_rate(DEFAULT_FRAME_RATE);
        scheduler.start();

        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let engine = Self {
            min_buffering_ms: config.preload_time_ms,
            blocked: config.start_blocked,
            config,
            state: PlaybackState::Created,
            caps: StreamCaps::default(),
            ended: false,
            base: TimeBase::new(),
            frames: FrameQueue::new(),
            pending_audio: PendingAudio::new(),
            metrics: DecodeMetrics::new(),
            nominal_fps: DEFAULT_FRAME_RATE,
            buffering_anchor: None,
            sink_paused_for_buffering: false,
            head_sliced: false,
            clock_ms: 0,
            sink: Some(sink),
            scheduler: Some(scheduler),
            decoder: Some(decoder),
            events: events_tx,
        };
        (engine, events_rx)
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Returns true once the decoder has reported end of stream.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Number of video frames currently buffered.
    pub fn buffered_frames(&self) -> usize {
        self.frames.len()
    }

    /// Current playback position in milliseconds: the audio clock when the
    /// stream carries audio, else the timestamp of the last emitted frame,
    /// else 0.
    pub fn current_time_ms(&self) -> i64 {
        if self.caps.has_audio {
            self.sink_time_ms()
        } else if self.caps.has_video {
            self.clock_ms
        } else {
            0
        }
    }

    /// How far ahead the stream has been decoded, in milliseconds: the
    /// sink's produced duration when audio is present, else the newest
    /// buffered frame's timestamp. A preload heuristic input, not the
    /// render clock.
    pub fn available_duration_ms(&self) -> i64 {
        if self.caps.has_audio {
            if let Some(sink) = &self.sink {
                return sink.available_duration().as_millis() as i64;
            }
        }
        if self.caps.has_video {
            if let Some(tail) = self.frames.tail_timestamp() {
                return tail;
            }
        }
        0
    }

    /// Feeds a raw compressed buffer to the decoder.
    pub fn process(&mut self, data: &[u8]) {
        if self.state == PlaybackState::Destroyed {
            return;
        }
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.feed(data);
        }
    }

    /// Suspends playback: pauses the sink and stops the scheduler.
    /// Idempotent.
    pub fn pause(&mut self) {
        if matches!(self.state, PlaybackState::Paused | PlaybackState::Destroyed) {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.pause();
        }
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop();
        }
        self.state = PlaybackState::Paused;
        tracing::debug!("paused");
    }

    /// Resumes playback: restarts the sink and the scheduler. Idempotent.
    pub fn resume(&mut self) {
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Destroyed) {
            return;
        }
        self.state = PlaybackState::Playing;
        self.sink_paused_for_buffering = false;
        if let Some(sink) = self.sink.as_mut() {
            sink.resume();
        }
        if let Some(scheduler) = &self.scheduler {
            scheduler.start();
        }
        tracing::debug!("resumed");
    }

    /// Tears the engine down: clears both buffers and releases the sink,
    /// scheduler and decoder handles. Irreversible; every later operation,
    /// tick or message is a silent no-op.
    pub fn destroy(&mut self) {
        if self.state == PlaybackState::Destroyed {
            return;
        }
        self.frames.clear();
        self.pending_audio.clear();
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
        self.sink = None;
        self.decoder = None;
        self.state = PlaybackState::Destroyed;
        tracing::debug!("destroyed");
    }

    /// Current sink volume (0.0 when no sink exists).
    pub fn volume(&self) -> f32 {
        self.sink.as_ref().map(|s| s.volume()).unwrap_or(0.0)
    }

    /// Sets the sink volume.
    pub fn set_volume(&mut self, volume: f32) {
        if let Some(sink) = self.sink.as_mut() {
            sink.set_volume(volume);
        }
    }

    /// Current mute state (true when no sink exists).
    pub fn muted(&self) -> bool {
        self.sink.as_ref().map(|s| s.muted()).unwrap_or(true)
    }

    /// Sets the mute state.
    pub fn set_muted(&mut self, muted: bool) {
        if let Some(sink) = self.sink.as_mut() {
            sink.set_muted(muted);
        }
    }

    /// Lifts the restricted-autoplay gate and forwards the unblock to the
    /// sink.
    pub fn unblock(&mut self) {
        if self.state == PlaybackState::Destroyed {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            self.blocked = false;
            sink.unblock(Duration::ZERO);
        }
    }

    // ------------------------------------------------------------------
    // Scheduler ticks
    // ------------------------------------------------------------------

    /// Runs one scheduler tick: clock update, buffering decision, pacing,
    /// and at most one frame emission.
    pub fn on_tick(&mut self) {
        if matches!(self.state, PlaybackState::Created | PlaybackState::Destroyed) {
            return;
        }

        let run_epilogue = if self.caps.has_audio && self.caps.has_video {
            self.tick_audio_video()
        } else if self.caps.has_audio {
            self.tick_audio_only();
            true
        } else if self.caps.has_video {
            self.tick_video_only()
        } else {
            // Neither modality: undefined stream, clock pinned at 0.
            true
        };

        if run_epilogue {
            self.tick_epilogue();
        }
    }

    /// Audio+video tick: the audio clock is the master.
    ///
    /// Returns false when the tick ends early (buffering, blocked, or clock
    /// not started) and the epilogue must not run.
    fn tick_audio_video(&mut self) -> bool {
        self.clock_ms = self.sink_time_ms();

        let mut gap: Option<i64> = None;
        if let Some(tail_ts) = self.frames.tail_timestamp() {
            let measured = match self.buffering_anchor {
                None => {
                    self.buffering_anchor = Some(tail_ts);
                    tail_ts - self.clock_ms
                }
                Some(anchor_ts) => tail_ts - anchor_ts,
            };
            // A measured 0 means "not yet measured" (anchor taken this very
            // tick, or no new lookahead accumulated), not "drained".
            if measured != 0 {
                gap = Some(measured);
            }
        }

        let starving = self.frames.is_empty()
            || (!self.ended && gap.is_some_and(|g| g < self.min_buffering_ms));
        if starving {
            if self.state == PlaybackState::End {
                // Queue drained after end of stream; hold the terminal state.
                return false;
            }
            self.enter_buffering();
            return false;
        }

        if self.clock_ms > 0 {
            self.min_buffering_ms = self.config.buffering_time_ms;
        }
        self.buffering_anchor = None;
        if self.sink_paused_for_buffering {
            self.sink_paused_for_buffering = false;
            if let Some(sink) = self.sink.as_mut() {
                sink.resume();
            }
            tracing::debug!("lookahead recovered, sink resumed");
        }

        if self.blocked || self.clock_ms == 0 {
            return false;
        }

        // Pacing before selection: match the tick rate to queue depth.
        let depth = self.frames.len();
        let target = self.config.cache_segment_count;
        let rate = if depth * 2 >= target * 3 {
            // ≥ 1.5× target: drain faster.
            self.nominal_fps * 3.0
        } else if depth * 3 < target {
            // < target/3: slow down, avoid busy-polling a starved queue.
            self.nominal_fps / 1.5
        } else {
            self.nominal_fps
        };
        self.set_rate(rate);

        if let Some(frame) = self.frames.take_due(self.clock_ms, FRAME_TOLERANCE_MS) {
            tracing::trace!(ts = frame.timestamp_ms, clock = self.clock_ms, "frame due");
            self.emit(PlayerEvent::Frame(frame));
        }
        true
    }

    /// Audio-only tick: watch the sink's remaining runway and ask for more
    /// input once, not every tick.
    fn tick_audio_only(&mut self) {
        let available_ms = self
            .sink
            .as_ref()
            .map(|s| s.available_duration().as_millis() as i64)
            .unwrap_or(0);
        self.clock_ms = self.sink_time_ms();

        if !matches!(self.state, PlaybackState::Preload | PlaybackState::End)
            && self.clock_ms > 0
            && available_ms - self.clock_ms < self.config.buffering_time_ms
        {
            self.state = PlaybackState::Preload;
            self.emit(PlayerEvent::Preload);
        }
    }

    /// Video-only tick: no clock to compare against, so emit exactly one
    /// frame per tick, oldest first, and let the cadence carry the timing.
    ///
    /// Returns false when buffering holds the tick.
    fn tick_video_only(&mut self) -> bool {
        if !self.ended && self.state == PlaybackState::Buffering {
            return false;
        }

        if !self.ended && self.frames.len() * 3 < self.config.cache_segment_count {
            self.set_rate(self.nominal_fps / 1.5);
        }

        if let Some(frame) = self.frames.pop() {
            self.clock_ms = frame.timestamp_ms;
            let pos = Duration::from_millis(frame.timestamp_ms.max(0) as u64);
            self.emit(PlayerEvent::Frame(frame));
            if let Some(sink) = self.sink.as_mut() {
                sink.set_blocked_position(pos);
            }
        }
        true
    }

    /// Post-branch lookahead checks shared by the modality paths: video-only
    /// starvation and the "keep feeding" preload request.
    fn tick_epilogue(&mut self) {
        let gap_ms = if self.caps.has_video {
            self.frames
                .tail_timestamp()
                .map(|tail| tail - self.clock_ms)
                .unwrap_or(i64::MAX)
        } else {
            i64::MAX
        };

        if !self.ended
            && self.caps.has_video
            && !self.caps.has_audio
            && !matches!(self.state, PlaybackState::Buffering | PlaybackState::End)
            && gap_ms < self.config.buffering_time_ms
        {
            tracing::debug!(gap_ms, "video-only lookahead low, buffering");
            self.state = PlaybackState::Buffering;
            self.emit(PlayerEvent::Buffering);
            return;
        }

        if self.caps.has_video
            && !matches!(
                self.state,
                PlaybackState::Preload | PlaybackState::Buffering | PlaybackState::End
            )
            && (self.frames.len() < self.config.cache_segment_count
                || (gap_ms as f64) < self.metrics.average_decode_cost() * DECODE_HEADROOM_FACTOR)
        {
            self.state = PlaybackState::Preload;
            self.emit(PlayerEvent::Preload);
        }
    }

    fn enter_buffering(&mut self) {
        if self.state != PlaybackState::Buffering {
            tracing::debug!(
                min_ms = self.min_buffering_ms,
                "lookahead below threshold, buffering"
            );
            self.emit(PlayerEvent::Buffering);
        }
        self.state = PlaybackState::Buffering;
        // The sink is paused on every starved tick, not only the first: the
        // audio hardware clock must not run ahead of the stalled stream.
        if let Some(sink) = self.sink.as_mut() {
            sink.pause();
        }
        self.sink_paused_for_buffering = true;
    }

    // ------------------------------------------------------------------
    // Decoder messages
    // ------------------------------------------------------------------

    /// Dispatches one decoder message. All mutation happens synchronously
    /// here; messages must arrive in emission order on the control thread.
    pub fn handle_message(&mut self, msg: DecoderMessage) {
        if self.state == PlaybackState::Destroyed {
            return;
        }

        match msg {
            DecoderMessage::Ready => {
                tracing::debug!("decoder ready");
                if self.state != PlaybackState::Buffering {
                    self.emit(PlayerEvent::Buffering);
                }
                self.state = PlaybackState::Buffering;
            }
            DecoderMessage::Header {
                has_video,
                has_audio,
            } => {
                self.caps = StreamCaps {
                    has_video,
                    has_audio,
                };
                if !has_audio && self.sink.take().is_some() {
                    tracing::debug!("no audio track, released the sink");
                }
                if !has_video && !has_audio {
                    tracing::warn!(
                        "stream declares neither audio nor video; the clock will not advance"
                    );
                }
                self.emit(PlayerEvent::Header {
                    has_video,
                    has_audio,
                });
            }
            DecoderMessage::MediaInfo { raw } => self.on_media_info(&raw),
            DecoderMessage::Video {
                timestamp_ms,
                width,
                height,
                stride_y,
                stride_uv,
                data,
            } => {
                let timestamp_ms = self.base.rebase(timestamp_ms);
                self.frames.push(VideoFrame {
                    data,
                    width,
                    height,
                    stride_y,
                    stride_uv,
                    timestamp_ms,
                });
            }
            DecoderMessage::Audio { timestamp_ms, data } => {
                self.base.rebase(timestamp_ms);
                self.pending_audio.push(AudioChunk { data });
            }
            DecoderMessage::Decode {
                cost_ms,
                duration_ms,
            } => self.on_decode_progress(cost_ms, duration_ms),
            DecoderMessage::Complete => {
                tracing::debug!("stream complete");
                self.ended = true;
                if self.state != PlaybackState::End {
                    self.emit(PlayerEvent::End);
                }
                self.state = PlaybackState::End;
            }
        }
    }

    /// Best-effort metadata parse; failures degrade to `Null` and are never
    /// surfaced. A frame rate found in the `onMetaData` array overrides the
    /// nominal tick rate immediately.
    fn on_media_info(&mut self, raw: &[u8]) {
        let parsed = serde_json::from_slice::<serde_json::Value>(raw)
            .unwrap_or(serde_json::Value::Null);

        if let Some(entries) = parsed.get("onMetaData").and_then(|v| v.as_array()) {
            for entry in entries {
                if let Some(fps) = entry.get("framerate").and_then(|v| v.as_f64()) {
                    if fps > 0.0 {
                        tracing::debug!(fps, "frame rate from stream metadata");
                        self.nominal_fps = fps;
                        self.set_rate(fps);
                        break;
                    }
                }
            }
        }

        self.emit(PlayerEvent::MediaInfo(parsed));
    }

    /// Decode progress: the stream is moving. Enter `Playing`, reset pacing
    /// to nominal, refresh metrics, and flush pending audio to the sink.
    fn on_decode_progress(&mut self, cost_ms: f64, duration_ms: f64) {
        if !self.ended {
            let entering_playback = self.state == PlaybackState::Buffering
                || (self.caps.has_video && self.state != PlaybackState::Playing)
                || (!self.caps.has_video
                    && self.caps.has_audio
                    && self.state != PlaybackState::Playing);
            if entering_playback {
                self.emit(PlayerEvent::Playing);
            }
            self.state = PlaybackState::Playing;
        }

        self.set_rate(self.nominal_fps);
        self.metrics.observe(cost_ms, duration_ms);
        self.emit(PlayerEvent::Performance(self.metrics.snapshot()));

        if self.caps.has_audio {
            self.clock_ms = self.sink_time_ms();
            if !self.head_sliced {
                // One-time head compensation: the first video frame goes out
                // immediately and the first bounded run of audio chunks is
                // handed to the sink as its own buffer, correcting
                // start-of-stream A/V skew.
                self.head_sliced = true;
                if let Some(frame) = self.frames.pop() {
                    self.emit(PlayerEvent::Frame(frame));
                }
                let head = self.pending_audio.drain_head(self.config.audio_head_chunks);
                self.enqueue_audio(head);
            }
            let rest = self.pending_audio.drain_all();
            self.enqueue_audio(rest);
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn sink_time_ms(&self) -> i64 {
        self.sink
            .as_ref()
            .map(|s| s.current_time().as_millis() as i64)
            .unwrap_or(0)
    }

    fn set_rate(&self, fps: f64) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.set_rate(fps);
        }
    }

    fn enqueue_audio(&mut self, pcm: Vec<u8>) {
        if pcm.is_empty() {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.enqueue(pcm);
        }
    }

    fn emit(&self, event: PlayerEvent) {
        // The receiver may already be gone during application teardown.
        let _ = self.events.send(event);
    }
}
