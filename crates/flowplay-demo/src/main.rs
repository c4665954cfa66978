//! flowplay demo application.
//!
//! A headless run of the playback sync engine against a scripted decoder:
//! a synthetic 24 fps audio+video stream is "decoded" in bursts, and the
//! engine paces it out against the reference wall-clock sink. All engine
//! events are logged; a summary is printed at the end.
//!
//! The loop below is the single control thread the core requires: ticks and
//! decoder messages are serialized through one `select!`, and the event
//! receiver is drained after every delivery.
//!
//! ```bash
//! RUST_LOG=flowplay_core=debug,flowplay_demo=info cargo run -p flowplay-demo
//! ```

use std::time::Duration;

use crossbeam_channel::{select, Sender};

use flowplay_core::{
    AudioFormat, Decoder, DecoderMessage, PlaybackEngine, PlaybackState, PlayerConfig,
    PlayerEvent, SystemClockSink, Ticker, DEFAULT_FRAME_RATE,
};

/// Synthetic stream length in frames (~4 seconds at 24 fps).
const TOTAL_FRAMES: usize = 96;

/// Frames (and audio chunks) emitted per decode burst.
const BURST_FRAMES: usize = 12;

/// Bytes of 48 kHz stereo s16le PCM covering one 24 fps frame interval.
const PCM_BYTES_PER_FRAME: usize = 8000;

/// Decoder stub that emits a deterministic message script.
///
/// Each `feed` call plays the next step: first the stream preamble (ready,
/// header, metadata), then bursts of frames and audio capped by a decode
/// progress report, and finally the completion message. Payload bytes are
/// ignored; a real adapter would parse them.
struct ScriptedDecoder {
    messages: Sender<DecoderMessage>,
    emitted_frames: usize,
    preamble_sent: bool,
    complete_sent: bool,
}

impl ScriptedDecoder {
    fn new(messages: Sender<DecoderMessage>) -> Self {
        Self {
            messages,
            emitted_frames: 0,
            preamble_sent: false,
            complete_sent: false,
        }
    }

    fn send(&self, msg: DecoderMessage) {
        let _ = self.messages.send(msg);
    }

    fn frame_timestamp(index: usize) -> i64 {
        (index as i64 * 1000) / 24
    }
}

impl Decoder for ScriptedDecoder {
    fn feed(&mut self, _data: &[u8]) {
        if !self.preamble_sent {
            self.preamble_sent = true;
            self.send(DecoderMessage::Ready);
            self.send(DecoderMessage::Header {
                has_video: true,
                has_audio: true,
            });
            self.send(DecoderMessage::MediaInfo {
                raw: br#"{"onMetaData":[{"framerate":24.0,"width":320,"height":180}]}"#.to_vec(),
            });
            return;
        }

        if self.emitted_frames >= TOTAL_FRAMES {
            if !self.complete_sent {
                self.complete_sent = true;
                self.send(DecoderMessage::Complete);
            }
            return;
        }

        let burst = BURST_FRAMES.min(TOTAL_FRAMES - self.emitted_frames);
        for i in self.emitted_frames..self.emitted_frames + burst {
            let ts = Self::frame_timestamp(i);
            self.send(DecoderMessage::Video {
                timestamp_ms: ts,
                width: 320,
                height: 180,
                stride_y: 320,
                stride_uv: 160,
                data: vec![0x10; 320 * 180 * 3 / 2],
            });
            self.send(DecoderMessage::Audio {
                timestamp_ms: ts,
                data: vec![0; PCM_BYTES_PER_FRAME],
            });
        }
        self.emitted_frames += burst;

        // Deterministic jitter in the reported decode cost.
        let cost_ms = 3.0 + (self.emitted_frames % 5) as f64;
        self.send(DecoderMessage::Decode {
            cost_ms,
            duration_ms: 1000.0 / 24.0,
        });
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flowplay_core=debug".parse().unwrap())
                .add_directive("flowplay_demo=info".parse().unwrap()),
        )
        .init();

    let (msg_tx, msg_rx) = crossbeam_channel::unbounded();
    let (_ticker, ticker_handle, tick_rx) = Ticker::spawn(DEFAULT_FRAME_RATE);

    let (mut engine, events) = PlaybackEngine::new(
        PlayerConfig {
            // Short startup threshold: the synthetic stream is only a few
            // seconds long.
            preload_time_ms: 250,
            buffering_time_ms: 500,
            cache_segment_count: 32,
            ..PlayerConfig::default()
        },
        Box::new(SystemClockSink::new(AudioFormat::default())),
        Box::new(ticker_handle),
        Box::new(ScriptedDecoder::new(msg_tx)),
    );

    // Kick off the stream preamble.
    engine.process(b"");

    let mut frames_rendered = 0usize;
    let mut last_performance = None;
    let mut ended = false;
    let mut last_progress = std::time::Instant::now();
    let deadline = std::time::Instant::now() + Duration::from_secs(30);

    while std::time::Instant::now() < deadline {
        select! {
            recv(tick_rx) -> tick => {
                if tick.is_err() {
                    break;
                }
                engine.on_tick();
            }
            recv(msg_rx) -> msg => match msg {
                Ok(msg) => engine.handle_message(msg),
                Err(_) => break,
            },
            default(Duration::from_millis(250)) => {}
        }

        for event in events.try_iter() {
            match event {
                PlayerEvent::Frame(frame) => {
                    frames_rendered += 1;
                    last_progress = std::time::Instant::now();
                    tracing::info!(
                        ts = frame.timestamp_ms,
                        clock = engine.current_time_ms(),
                        rendered = frames_rendered,
                        "render frame"
                    );
                }
                PlayerEvent::Preload => {
                    // The engine wants more input: feed the next burst.
                    tracing::info!("preload requested, feeding decoder");
                    engine.process(b"");
                }
                PlayerEvent::Buffering => {
                    tracing::info!("buffering, feeding decoder");
                    engine.process(b"");
                }
                PlayerEvent::Playing => tracing::info!("playing"),
                PlayerEvent::Header {
                    has_video,
                    has_audio,
                } => tracing::info!(has_video, has_audio, "stream header"),
                PlayerEvent::MediaInfo(info) => tracing::info!(%info, "stream metadata"),
                PlayerEvent::Performance(snapshot) => last_performance = Some(snapshot),
                PlayerEvent::End => {
                    tracing::info!("stream ended");
                    ended = true;
                }
            }
        }

        // Done once the tail has drained, or when the last frames landed
        // outside the tolerance window and will never come due.
        if ended
            && (engine.buffered_frames() == 0
                || last_progress.elapsed() > Duration::from_secs(2))
        {
            break;
        }
    }

    if let Some(perf) = last_performance {
        tracing::info!(
            avg_decode_cost_ms = perf.average_decode_cost_ms,
            avg_unit_duration_ms = perf.average_unit_duration_ms,
            "decode metrics"
        );
    }
    tracing::info!(
        frames_rendered,
        final_state = ?engine.state(),
        clock_ms = engine.current_time_ms(),
        "demo finished"
    );

    engine.destroy();
    assert_eq!(engine.state(), PlaybackState::Destroyed);
}
