// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! The per-frame dequeue, present, requeue cycle and the gate that pauses
//! and cancels it.

use crate::{
    capture::{CaptureDriver, CaptureSession},
    display::{OverlayDriver, OverlaySession},
    error::Result,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Condvar, Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};
use tracing::{debug, trace_span};

/// Pause gate and cancellation token shared by the controller and the relay
/// worker.
///
/// The worker passes through the gate once per iteration, so pausing takes
/// effect between frames and never interrupts a frame in flight. Cancelling
/// opens the gate for good, which lets a stop follow a pause without the
/// controller having to resume first.
#[derive(Debug, Default)]
pub struct Gate {
    paused: Mutex<bool>,
    cond: Condvar,
    cancelled: AtomicBool,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        *self.lock() = true;
    }

    pub fn resume(&self) {
        *self.lock() = false;
        self.cond.notify_all();
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        // taking the lock orders the store before a waiter's check
        let _paused = self.lock();
        self.cond.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.lock()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Blocks while the gate is paused. Returns `false` once cancelled.
    pub fn wait(&self) -> bool {
        let mut paused = self.lock();
        while *paused && !self.is_cancelled() {
            paused = self.cond.wait(paused).unwrap_or_else(PoisonError::into_inner);
        }
        !self.is_cancelled()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counters reported when the relay ends.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Frames presented
    pub frames: u64,
    /// Dequeue waits that expired without a frame
    pub timeouts: u64,
    /// Rolling frame rate at the last presented frame
    pub fps: i64,
}

/// Rolling frame rate over the last few frame intervals.
#[derive(Debug)]
pub struct FpsCounter {
    prev: Instant,
    history: Vec<i64>,
    index: usize,
}

impl FpsCounter {
    pub fn new(window: usize) -> Self {
        Self {
            prev: Instant::now(),
            history: vec![0; window.max(1)],
            index: 0,
        }
    }

    /// Records a frame and returns the averaged rate.
    pub fn update(&mut self) -> i64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.prev);
        self.prev = now;

        self.history[self.index] = 1e9 as i64 / (elapsed.as_nanos() as i64).max(1);
        self.index = (self.index + 1) % self.history.len();

        (self.history.iter().sum::<i64>() as f64 / self.history.len() as f64).round() as i64
    }
}

const FPS_WINDOW: usize = 30;

/// Relays frames until the gate is cancelled or a driver call fails.
///
/// Each iteration dequeues a filled buffer, points the overlay at it and
/// hands it back to the capture driver. The buffer is requeued even when
/// presenting fails so it is never stranded outside the driver; only a
/// failed requeue leaves it held. Dequeue waits are bounded by `poll` so
/// cancellation is observed while no frames arrive.
pub fn relay_loop<C: CaptureDriver, O: OverlayDriver>(
    capture: &mut CaptureSession<C>,
    overlay: &mut OverlaySession<O>,
    gate: &Gate,
    poll: Duration,
) -> Result<RelayStats> {
    let mut stats = RelayStats::default();
    let mut fps = FpsCounter::new(FPS_WINDOW);

    while gate.wait() {
        let Some(frame) = capture.dequeue(poll)? else {
            stats.timeouts += 1;
            continue;
        };
        let _span = trace_span!("relay_frame", index = frame.index).entered();

        let presented = overlay.present(frame.offset);
        capture.requeue(frame.index)?;
        presented?;

        stats.frames += 1;
        stats.fps = fps.update();
        if stats.frames % FPS_WINDOW as u64 == 0 {
            debug!(
                frames = stats.frames,
                fps = stats.fps,
                bytes = frame.bytes_used,
                "relay"
            );
        }
    }

    Ok(stats)
}
