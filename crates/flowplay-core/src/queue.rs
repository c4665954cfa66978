//! Buffers between the decoder and the frame selector.
//!
//! Two strict-FIFO buffers: a queue of decoded video frames consumed by the
//! per-tick selector, and an accumulator of raw audio chunks held back until
//! the next decode-progress flush. Both are appended at the tail and
//! consumed at the head. There is no eviction: back-pressure is applied by
//! slowing the producer, never by dropping buffered data.

use std::collections::VecDeque;

use crate::media::{AudioChunk, VideoFrame};

/// FIFO queue of decoded video frames awaiting selection.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<VideoFrame>,
}

impl FrameQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame at the tail.
    pub fn push(&mut self, frame: VideoFrame) {
        self.frames.push_back(frame);
    }

    /// Removes and returns the head frame.
    pub fn pop(&mut self) -> Option<VideoFrame> {
        self.frames.pop_front()
    }

    /// Returns the number of buffered frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frames are buffered.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the timestamp of the newest buffered frame.
    pub fn tail_timestamp(&self) -> Option<i64> {
        self.frames.back().map(|f| f.timestamp_ms)
    }

    /// Selects the first frame (head to tail) within `tolerance_ms` of
    /// `clock_ms` and removes it together with every older frame.
    ///
    /// Skipped older frames are dropped, never emitted individually. Returns
    /// `None`, leaving the queue untouched, when no buffered frame is due.
    pub fn take_due(&mut self, clock_ms: i64, tolerance_ms: i64) -> Option<VideoFrame> {
        let due = self
            .frames
            .iter()
            .position(|f| (clock_ms - f.timestamp_ms).abs() <= tolerance_ms)?;
        if due > 0 {
            tracing::trace!("dropping {} stale frame(s) behind the clock", due);
        }
        self.frames.drain(..=due).last()
    }

    /// Drops all buffered frames.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Accumulator of raw audio chunks pending a flush to the sink.
#[derive(Debug, Default)]
pub struct PendingAudio {
    chunks: Vec<AudioChunk>,
}

impl PendingAudio {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk at the tail.
    pub fn push(&mut self, chunk: AudioChunk) {
        self.chunks.push(chunk);
    }

    /// Returns the number of pending chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Removes up to `count` chunks from the head, concatenated into one
    /// buffer. Used for the one-time head-compensation slice.
    pub fn drain_head(&mut self, count: usize) -> Vec<u8> {
        let count = count.min(self.chunks.len());
        concat(self.chunks.drain(..count))
    }

    /// Removes every pending chunk, concatenated into one buffer.
    pub fn drain_all(&mut self) -> Vec<u8> {
        concat(self.chunks.drain(..))
    }

    /// Drops all pending chunks.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

fn concat(chunks: impl Iterator<Item = AudioChunk>) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend_from_slice(&chunk.data);
    }
    out
}
