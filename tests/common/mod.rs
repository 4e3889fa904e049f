// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! In-memory capture and display drivers for exercising the relay without
//! hardware.

#![allow(dead_code)]

use edgefirst_relay::{
    buffer::MappedRegion,
    capture::{CaptureDriver, CaptureParams, Dequeued, DriverBuffer},
    controller::Platform,
    display::{LayerConfig, OverlayDriver},
    format::{FourCC, NV12},
    geometry::ScreenInfo,
    Error, Result,
};
use std::{
    collections::VecDeque,
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

/// Everything the mocks observed, shared with the test.
#[derive(Debug, Default)]
pub struct Counters {
    pub capture_opens: AtomicUsize,
    pub capture_drops: AtomicUsize,
    pub overlay_opens: AtomicUsize,
    pub overlay_drops: AtomicUsize,
    pub stream_on: AtomicUsize,
    pub stream_off: AtomicUsize,
    /// Buffers outside the driver queue when streaming was turned off
    pub held_at_stream_off: AtomicUsize,
    /// Queue requests for a buffer that was already queued
    pub double_queue: AtomicUsize,
    pub frames: AtomicUsize,
    pub layer_closes: AtomicUsize,
    pub layer_releases: AtomicUsize,
    pub video_stops: AtomicUsize,
    pub last_planes: Mutex<Option<[u32; 3]>>,
    pub layer_config: Mutex<Option<LayerConfig>>,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[derive(Clone, Debug)]
pub struct CaptureBehaviour {
    pub width: u32,
    pub height: u32,
    pub format: FourCC,
    pub can_stream: bool,
    /// Buffers granted regardless of the request
    pub granted: Option<u32>,
    /// Buffer index whose initial queue fails
    pub fail_queue_at: Option<u32>,
    /// 1-based dequeue call that fails
    pub fail_dequeue_at: Option<usize>,
    /// Time the driver takes to fill a buffer
    pub frame_interval: Duration,
    /// No signal: every dequeue times out
    pub starved: bool,
    /// Input selection is refused
    pub reject_format: bool,
}

impl Default for CaptureBehaviour {
    fn default() -> Self {
        Self {
            width: 720,
            height: 576,
            format: NV12,
            can_stream: true,
            granted: None,
            fail_queue_at: None,
            fail_dequeue_at: None,
            frame_interval: Duration::from_millis(1),
            starved: false,
            reject_format: false,
        }
    }
}

pub struct MockCapture {
    behaviour: CaptureBehaviour,
    counters: Arc<Counters>,
    buffers: u32,
    queued: VecDeque<u32>,
    dequeues: usize,
    streaming: bool,
}

impl MockCapture {
    pub fn new(behaviour: CaptureBehaviour, counters: Arc<Counters>) -> Self {
        bump(&counters.capture_opens);
        Self {
            behaviour,
            counters,
            buffers: 0,
            queued: VecDeque::new(),
            dequeues: 0,
            streaming: false,
        }
    }

    fn frame_len(&self) -> u32 {
        self.behaviour.width * self.behaviour.height * 2
    }
}

impl CaptureDriver for MockCapture {
    fn name(&self) -> &str {
        "mock-capture"
    }

    fn can_stream(&mut self) -> io::Result<bool> {
        Ok(self.behaviour.can_stream)
    }

    fn select_input(&mut self, _channel: u32, _params: &CaptureParams) -> io::Result<()> {
        match self.behaviour.reject_format {
            true => Err(io::Error::from_raw_os_error(libc::EINVAL)),
            false => Ok(()),
        }
    }

    fn format(&mut self) -> io::Result<(u32, u32, FourCC)> {
        let b = &self.behaviour;
        Ok((b.width, b.height, b.format))
    }

    fn request_buffers(&mut self, count: u32) -> io::Result<u32> {
        self.buffers = self.behaviour.granted.unwrap_or(count);
        Ok(self.buffers)
    }

    fn query_buffer(&mut self, index: u32) -> io::Result<DriverBuffer> {
        if index >= self.buffers {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        Ok(DriverBuffer {
            length: self.frame_len(),
            offset: index * self.frame_len(),
        })
    }

    fn map_buffer(&mut self, buffer: &DriverBuffer) -> io::Result<MappedRegion> {
        MappedRegion::anonymous(buffer.length as usize)
    }

    fn queue(&mut self, index: u32) -> io::Result<()> {
        if !self.streaming && self.behaviour.fail_queue_at == Some(index) {
            return Err(io::Error::from_raw_os_error(libc::ENOMEM));
        }
        if self.queued.contains(&index) {
            bump(&self.counters.double_queue);
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        self.queued.push_back(index);
        Ok(())
    }

    fn dequeue(&mut self, timeout: Duration) -> io::Result<Option<Dequeued>> {
        self.dequeues += 1;
        if self.behaviour.fail_dequeue_at == Some(self.dequeues) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        if !self.streaming {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        let next = match self.behaviour.starved {
            true => None,
            false => self.queued.pop_front(),
        };
        match next {
            Some(index) => {
                thread::sleep(self.behaviour.frame_interval.min(timeout));
                Ok(Some(Dequeued {
                    index: index as usize,
                    bytes_used: self.frame_len(),
                    offset: index * self.frame_len(),
                }))
            }
            None => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn stream_on(&mut self) -> io::Result<()> {
        self.streaming = true;
        bump(&self.counters.stream_on);
        Ok(())
    }

    fn stream_off(&mut self) -> io::Result<()> {
        self.streaming = false;
        let held = self.buffers as usize - self.queued.len();
        self.counters
            .held_at_stream_off
            .store(held, Ordering::SeqCst);
        // the driver gives every queued buffer back
        self.queued.clear();
        bump(&self.counters.stream_off);
        Ok(())
    }
}

impl Drop for MockCapture {
    fn drop(&mut self) {
        bump(&self.counters.capture_drops);
    }
}

#[derive(Clone, Debug)]
pub struct OverlayBehaviour {
    /// Handle returned by the layer request, zero means refused
    pub layer: u32,
    /// 1-based present call that fails
    pub fail_present_at: Option<usize>,
}

impl Default for OverlayBehaviour {
    fn default() -> Self {
        Self {
            layer: 100,
            fail_present_at: None,
        }
    }
}

pub struct MockOverlay {
    behaviour: OverlayBehaviour,
    counters: Arc<Counters>,
    presents: usize,
}

impl MockOverlay {
    pub fn new(behaviour: OverlayBehaviour, counters: Arc<Counters>) -> Self {
        bump(&counters.overlay_opens);
        Self {
            behaviour,
            counters,
            presents: 0,
        }
    }
}

impl OverlayDriver for MockOverlay {
    fn name(&self) -> &str {
        "mock-overlay"
    }

    fn lcd_on(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn request_layer(&mut self) -> io::Result<u32> {
        Ok(self.behaviour.layer)
    }

    fn set_layer(&mut self, _layer: u32, config: &LayerConfig) -> io::Result<()> {
        *self.counters.layer_config.lock().unwrap() = Some(*config);
        Ok(())
    }

    fn open_layer(&mut self, _layer: u32) -> io::Result<()> {
        Ok(())
    }

    fn lower_layer(&mut self, _layer: u32) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOTTY))
    }

    fn video_start(&mut self, _layer: u32) -> io::Result<()> {
        Ok(())
    }

    fn video_stop(&mut self, _layer: u32) -> io::Result<()> {
        bump(&self.counters.video_stops);
        Ok(())
    }

    fn set_frame(&mut self, _layer: u32, planes: [u32; 3]) -> io::Result<()> {
        self.presents += 1;
        if self.behaviour.fail_present_at == Some(self.presents) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        *self.counters.last_planes.lock().unwrap() = Some(planes);
        bump(&self.counters.frames);
        Ok(())
    }

    fn close_layer(&mut self, _layer: u32) -> io::Result<()> {
        bump(&self.counters.layer_closes);
        Ok(())
    }

    fn release_layer(&mut self, _layer: u32) -> io::Result<()> {
        bump(&self.counters.layer_releases);
        Ok(())
    }
}

impl Drop for MockOverlay {
    fn drop(&mut self) {
        bump(&self.counters.overlay_drops);
    }
}

pub struct MockPlatform {
    pub screen: ScreenInfo,
    pub capture: CaptureBehaviour,
    pub overlay: OverlayBehaviour,
    pub counters: Arc<Counters>,
    /// Capture device node missing
    pub capture_unavailable: bool,
    /// Display device node missing
    pub overlay_unavailable: bool,
}

fn unavailable(device: &str) -> Error {
    Error::DeviceUnavailable {
        device: device.to_owned(),
        source: io::Error::from_raw_os_error(libc::ENOENT),
    }
}

impl MockPlatform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: ScreenInfo::new(width, height, 32),
            capture: CaptureBehaviour::default(),
            overlay: OverlayBehaviour::default(),
            counters: Arc::default(),
            capture_unavailable: false,
            overlay_unavailable: false,
        }
    }

    pub fn with_capture(mut self, capture: CaptureBehaviour) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_overlay(mut self, overlay: OverlayBehaviour) -> Self {
        self.overlay = overlay;
        self
    }
}

impl Platform for MockPlatform {
    type Capture = MockCapture;
    type Overlay = MockOverlay;

    fn read_screen(&self) -> Result<ScreenInfo> {
        Ok(self.screen)
    }

    fn open_capture(&self) -> Result<MockCapture> {
        if self.capture_unavailable {
            return Err(unavailable("/dev/video1"));
        }
        Ok(MockCapture::new(self.capture.clone(), self.counters.clone()))
    }

    fn open_overlay(&self) -> Result<MockOverlay> {
        if self.overlay_unavailable {
            return Err(unavailable("/dev/disp"));
        }
        Ok(MockOverlay::new(self.overlay.clone(), self.counters.clone()))
    }
}

/// Polls `f` until it yields a value or two seconds pass.
pub fn wait_for<T>(mut f: impl FnMut() -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(v) = f() {
            return v;
        }
        assert!(Instant::now() < deadline, "timed out");
        thread::sleep(Duration::from_millis(2));
    }
}
