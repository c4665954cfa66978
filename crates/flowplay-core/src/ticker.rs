//! Periodic tick scheduler.
//!
//! The ticker is the engine's only timing primitive: a worker thread that
//! sends a tick on a channel at the configured rate while started. The
//! pacing controller rewrites the rate through [`TickScheduler`], and the
//! change takes effect immediately: the timed wait is interrupted
//! rather than left to run out at the old interval.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Lowest accepted tick rate; `set_rate` ignores anything at or below this.
const MIN_RATE_FPS: f64 = 0.001;

/// Rate-control surface the engine drives.
///
/// `set_rate` is the explicit backpressure signal: the pacing controller
/// speeds the scheduler up to drain an overfull queue and slows it down to
/// avoid busy-polling a starved one.
pub trait TickScheduler: Send {
    /// Sets the tick rate in ticks per second.
    fn set_rate(&self, fps: f64);

    /// Starts tick delivery.
    fn start(&self);

    /// Stops tick delivery. Reversible with `start`.
    fn stop(&self);
}

struct TickerShared {
    /// Current tick interval in microseconds.
    interval_us: AtomicU64,
    /// Whether ticks are being delivered.
    running: AtomicBool,
    /// Set once on teardown; the worker exits at the next wakeup.
    shutdown: AtomicBool,
    /// Wakes the worker early on rate change, start/stop, or shutdown.
    wakeup: Condvar,
    lock: Mutex<()>,
}

/// Cloneable control handle for a [`Ticker`] worker.
#[derive(Clone)]
pub struct TickerHandle {
    shared: Arc<TickerShared>,
}

impl TickerHandle {
    fn notify(&self) {
        let _guard = self.shared.lock.lock();
        self.shared.wakeup.notify_all();
    }
}

impl TickScheduler for TickerHandle {
    fn set_rate(&self, fps: f64) {
        if fps <= MIN_RATE_FPS {
            tracing::warn!("ignoring non-positive tick rate {fps}");
            return;
        }
        let interval_us = (1_000_000.0 / fps) as u64;
        let prev = self
            .shared
            .interval_us
            .swap(interval_us, Ordering::Release);
        if prev != interval_us {
            tracing::trace!("tick interval {}us -> {}us", prev, interval_us);
            self.notify();
        }
    }

    fn start(&self) {
        if !self.shared.running.swap(true, Ordering::Release) {
            self.notify();
        }
    }

    fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
    }
}

/// Owner of the scheduler worker thread.
///
/// Created with [`Ticker::spawn`]; the worker is signalled and joined when
/// the `Ticker` is dropped.
pub struct Ticker {
    handle: TickerHandle,
    worker: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawns the worker at `initial_fps`, stopped.
    ///
    /// Returns the owner, a control handle for the engine, and the receiver
    /// the application's control loop drains. Ticks carry their send
    /// instant.
    pub fn spawn(
        initial_fps: f64,
    ) -> (Self, TickerHandle, crossbeam_channel::Receiver<Instant>) {
        let (tick_tx, tick_rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(TickerShared {
            interval_us: AtomicU64::new((1_000_000.0 / initial_fps.max(MIN_RATE_FPS)) as u64),
            running: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            wakeup: Condvar::new(),
            lock: Mutex::new(()),
        });
        let handle = TickerHandle {
            shared: Arc::clone(&shared),
        };
        let engine_handle = handle.clone();

        let worker = thread::spawn(move || {
            tracing::debug!("ticker worker started");
            loop {
                if shared.shutdown.load(Ordering::Acquire) {
                    break;
                }
                let interval = Duration::from_micros(shared.interval_us.load(Ordering::Acquire));
                let timed_out = {
                    let mut guard = shared.lock.lock();
                    shared
                        .wakeup
                        .wait_for(&mut guard, interval)
                        .timed_out()
                };
                if shared.shutdown.load(Ordering::Acquire) {
                    break;
                }
                // A notified wakeup means the interval or run state changed;
                // re-arm with the new settings instead of ticking early.
                if timed_out && shared.running.load(Ordering::Acquire) {
                    if tick_tx.send(Instant::now()).is_err() {
                        break;
                    }
                }
            }
            tracing::debug!("ticker worker exited");
        });

        (
            Self {
                handle,
                worker: Some(worker),
            },
            engine_handle,
            tick_rx,
        )
    }

    /// Returns a control handle for this ticker.
    pub fn handle(&self) -> TickerHandle {
        self.handle.clone()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.shared.shutdown.store(true, Ordering::Release);
        self.handle.notify();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
