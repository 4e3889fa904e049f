// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Lifecycle controller for one capture-to-overlay relay.

use crate::{
    capture::{CaptureDriver, CaptureParams, CaptureSession},
    display::{OverlayDriver, OverlaySession},
    error::{Error, Result},
    geometry::{check_show_rect, clamp, Rect, ScreenInfo},
    relay::{relay_loop, Gate, RelayStats},
};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use tracing::{debug, error, info, warn};

/// Number of analog inputs served by the capture device.
pub const CHANNELS: u32 = 2;

/// What to show and where, supplied with a start request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel: u32,
    /// Destination window on the screen
    pub show: Rect,
    /// Source window within the captured frame
    pub crop: Rect,
}

/// Lifecycle of the relay as seen by the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Starting,
    Running,
    Paused,
    Stopping,
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
        }
    }
}

/// Tuning shared by every session the controller starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayOptions {
    pub capture: CaptureParams,
    /// Longest dequeue wait before the worker rechecks cancellation
    pub poll_timeout: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            capture: CaptureParams::default(),
            poll_timeout: Duration::from_millis(100),
        }
    }
}

/// Source of the devices a relay runs on.
pub trait Platform {
    type Capture: CaptureDriver + 'static;
    type Overlay: OverlayDriver + 'static;

    /// Reads the active screen geometry.
    fn read_screen(&self) -> Result<ScreenInfo>;

    fn open_capture(&self) -> Result<Self::Capture>;

    fn open_overlay(&self) -> Result<Self::Overlay>;
}

struct Sessions<C: CaptureDriver, O: OverlayDriver> {
    capture: CaptureSession<C>,
    overlay: OverlaySession<O>,
}

struct Worker {
    gate: Arc<Gate>,
    handle: JoinHandle<Result<RelayStats>>,
}

/// Handle to one relay pipeline.
///
/// Owns the sessions (through its worker) and the lifecycle state, so
/// independent pipelines can coexist. All operations are called from a single
/// controller thread; the relay itself runs on one worker thread per start.
pub struct Relay<P: Platform> {
    platform: P,
    options: RelayOptions,
    screen: ScreenInfo,
    state: SessionState,
    config: Option<ChannelConfig>,
    worker: Option<Worker>,
}

impl<P: Platform> Relay<P> {
    /// Reads the screen geometry used to validate show rectangles.
    pub fn init(platform: P, options: RelayOptions) -> Result<Self> {
        let screen = platform.read_screen()?;
        info!(%screen, "relay initialized");
        Ok(Self {
            platform,
            options,
            screen,
            state: SessionState::Uninitialized,
            config: None,
            worker: None,
        })
    }

    /// Current lifecycle state. A worker that has already exited reports
    /// [`SessionState::Stopped`] even before it is reaped.
    pub fn state(&self) -> SessionState {
        match &self.worker {
            Some(worker) if worker.handle.is_finished() => SessionState::Stopped,
            _ => self.state,
        }
    }

    pub fn screen(&self) -> &ScreenInfo {
        &self.screen
    }

    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    /// Configuration of the current or last started session.
    pub fn config(&self) -> Option<&ChannelConfig> {
        self.config.as_ref()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Opens both sessions and starts relaying `config.channel`.
    ///
    /// A running relay is stopped first. The request is validated before
    /// anything is touched; if opening fails part way, whatever was opened is
    /// closed again and the state returns to [`SessionState::Uninitialized`].
    pub fn start(&mut self, config: ChannelConfig) -> Result<()> {
        self.reap_and_log();

        if config.channel >= CHANNELS {
            return Err(Error::InvalidChannel {
                channel: config.channel,
                available: CHANNELS,
            });
        }
        check_show_rect(config.show, &self.screen)?;

        if self.worker.is_some() {
            info!("restarting relay");
            if let Err(e) = self.stop() {
                warn!("previous relay ended with: {e}");
            }
        }

        self.state = SessionState::Starting;
        let sessions = match self.open_sessions(&config) {
            Ok(sessions) => sessions,
            Err(e) => {
                self.state = SessionState::Uninitialized;
                return Err(e);
            }
        };

        let gate = Arc::new(Gate::new());
        let worker_gate = gate.clone();
        let poll = self.options.poll_timeout;
        let handle = thread::Builder::new()
            .name(format!("relay-ch{}", config.channel))
            .spawn(move || run_worker(sessions, &worker_gate, poll));
        let handle = match handle {
            Ok(handle) => handle,
            Err(source) => {
                self.state = SessionState::Uninitialized;
                return Err(Error::StreamIo {
                    op: "spawn relay worker",
                    source,
                });
            }
        };

        self.worker = Some(Worker { gate, handle });
        self.config = Some(config);
        self.state = SessionState::Running;
        info!(
            channel = config.channel,
            show = %config.show,
            crop = %config.crop,
            "relay running"
        );
        Ok(())
    }

    fn open_sessions(
        &self,
        config: &ChannelConfig,
    ) -> Result<Sessions<P::Capture, P::Overlay>> {
        // overlay configuration needs the negotiated capture layout
        let driver = self.platform.open_capture()?;
        let capture = CaptureSession::open(driver, config.channel, &self.options.capture)?;

        let layout = *capture.layout();
        let crop = clamp(config.crop, Rect::sized(layout.width, layout.height))?;

        let driver = self.platform.open_overlay()?;
        let mut overlay = OverlaySession::open(driver, self.screen, layout, crop, config.show)?;
        overlay.start()?;

        Ok(Sessions { capture, overlay })
    }

    /// Holds the relay before its next frame.
    pub fn pause(&mut self) {
        self.reap_and_log();
        match (&self.worker, self.state) {
            (Some(worker), SessionState::Running) => {
                worker.gate.pause();
                self.state = SessionState::Paused;
                debug!("relay paused");
            }
            (_, state) => debug!(?state, "pause ignored"),
        }
    }

    /// Releases a paused relay.
    pub fn run(&mut self) {
        self.reap_and_log();
        match (&self.worker, self.state) {
            (Some(worker), SessionState::Paused) => {
                worker.gate.resume();
                self.state = SessionState::Running;
                debug!("relay resumed");
            }
            (_, state) => debug!(?state, "run ignored"),
        }
    }

    /// Cancels the worker, waits for it to exit and closes both sessions.
    ///
    /// Returns the outcome of the relay, or `None` when nothing was running.
    pub fn stop(&mut self) -> Result<Option<RelayStats>> {
        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };
        self.state = SessionState::Stopping;
        worker.gate.cancel();
        self.teardown(worker).map(Some)
    }

    /// Tears down a worker that ended on its own.
    ///
    /// Returns the outcome when the relay stopped since the last call.
    pub fn reap(&mut self) -> Option<Result<RelayStats>> {
        if !self.worker.as_ref()?.handle.is_finished() {
            return None;
        }
        let worker = self.worker.take()?;
        self.state = SessionState::Stopping;
        Some(self.teardown(worker))
    }

    fn reap_and_log(&mut self) {
        if let Some(Err(e)) = self.reap() {
            warn!("relay had stopped: {e}");
        }
    }

    fn teardown(&mut self, worker: Worker) -> Result<RelayStats> {
        // the worker closes both sessions before it exits
        let exit = worker.handle.join();
        self.state = SessionState::Stopped;

        let result = exit.map_err(|_| Error::WorkerPanicked)?;
        match &result {
            Ok(stats) => info!(frames = stats.frames, "relay stopped"),
            Err(e) => error!("relay stopped: {e}"),
        }
        result
    }
}

impl<P: Platform> Drop for Relay<P> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("{e}");
        }
    }
}

/// Runs the relay on the worker thread, then stops streaming and closes the
/// overlay before the capture device so the sessions never outlive the loop.
fn run_worker<C: CaptureDriver, O: OverlayDriver>(
    sessions: Sessions<C, O>,
    gate: &Gate,
    poll: Duration,
) -> Result<RelayStats> {
    let Sessions {
        mut capture,
        mut overlay,
    } = sessions;

    let result = capture
        .start_streaming()
        .and_then(|()| relay_loop(&mut capture, &mut overlay, gate, poll));

    if let Err(e) = capture.stop_streaming() {
        warn!(device = %capture.name(), "{e}");
    }
    overlay.close();
    capture.close();
    result
}
