//! flowplay-core: playback synchronization and flow control.
//!
//! This crate is the timing brain of a streaming playback engine. It turns
//! an unsynchronized stream of decoded video frames and raw audio,
//! arriving asynchronously from a decoder, into a single paced sequence of
//! "render this frame now" events locked to the audio hardware clock (or to
//! the emission cadence for video-only streams), while adapting the tick
//! rate to fluctuating decode throughput.
//!
//! It contains:
//!
//! - Core types: [`media`], [`config`], [`events`]
//! - Buffers and metrics: [`queue`], [`metrics`]
//! - Collaborator boundaries: [`sink`], [`ticker`], [`decoder`]
//! - The engine itself: [`engine`]
//!
//! This crate decodes nothing and renders nothing. The decoder, the audio
//! output device and the renderer live outside it, behind the [`decoder`],
//! [`sink`] and event boundaries.
//!
//! # Control model
//!
//! One logical control thread owns the [`engine::PlaybackEngine`] and feeds
//! it from exactly two sources: scheduler ticks and decoder messages.
//! Serialize both onto one loop (e.g. a `crossbeam_channel::select!` over
//! the tick receiver and a decoder message channel) and drain the event
//! receiver after each delivery.

pub mod config;
pub mod decoder;
pub mod engine;
pub mod events;
pub mod media;
pub mod metrics;
pub mod queue;
pub mod sink;
pub mod ticker;

pub use config::PlayerConfig;
pub use decoder::{Decoder, DecoderMessage};
pub use engine::{PlaybackEngine, PlaybackState, DEFAULT_FRAME_RATE, FRAME_TOLERANCE_MS};
pub use events::PlayerEvent;
pub use media::{AudioChunk, StreamCaps, TimeBase, VideoFrame};
pub use metrics::{DecodeMetrics, PerformanceSnapshot};
pub use sink::{AudioFormat, AudioSink, SystemClockSink};
pub use ticker::{TickScheduler, Ticker, TickerHandle};
