// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Capture session on top of a V4L2 style buffer-queue driver.

use crate::{
    buffer::{BufferPool, BufferState, MappedRegion},
    error::{Error, Result},
    format::{FourCC, PixelLayout},
};
use std::{io, time::Duration};
use tracing::{debug, info, warn};

/// Analog video standard of the capture input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnalogStandard {
    Ntsc,
    Pal,
}

impl AnalogStandard {
    /// Value understood by the decoder's private format.
    pub fn system(self) -> u8 {
        match self {
            AnalogStandard::Ntsc => 0,
            AnalogStandard::Pal => 1,
        }
    }
}

/// Driver parameters applied before the capture format is negotiated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureParams {
    pub standard: AnalogStandard,
    /// Tile rows when several inputs are composed into one frame
    pub rows: u8,
    /// Tile columns when several inputs are composed into one frame
    pub columns: u8,
    /// Number of buffers requested from the driver
    pub buffer_count: u32,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            standard: AnalogStandard::Pal,
            rows: 1,
            columns: 1,
            buffer_count: 4,
        }
    }
}

/// Length and mmap offset of a driver buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DriverBuffer {
    pub length: u32,
    pub offset: u32,
}

/// A filled buffer handed out by the driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dequeued {
    pub index: usize,
    pub bytes_used: u32,
    /// Buffer offset in the driver's mmap space
    pub offset: u32,
}

/// Buffer-queue protocol of a capture driver.
///
/// Implementations are thin wrappers over driver calls; ownership tracking
/// and error classification live in [`CaptureSession`]. Dropping the driver
/// closes the device.
pub trait CaptureDriver: Send {
    /// Device name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether the device supports streaming I/O.
    fn can_stream(&mut self) -> io::Result<bool>;

    /// Programs input selection, analog standard and tiling.
    fn select_input(&mut self, channel: u32, params: &CaptureParams) -> io::Result<()>;

    /// Reads back the negotiated width, height and pixel format.
    fn format(&mut self) -> io::Result<(u32, u32, FourCC)>;

    /// Requests `count` mmap buffers, returning how many were granted.
    fn request_buffers(&mut self, count: u32) -> io::Result<u32>;

    fn query_buffer(&mut self, index: u32) -> io::Result<DriverBuffer>;

    fn map_buffer(&mut self, buffer: &DriverBuffer) -> io::Result<MappedRegion>;

    fn queue(&mut self, index: u32) -> io::Result<()>;

    /// Waits up to `timeout` for a filled buffer. `Ok(None)` means the
    /// timeout expired.
    fn dequeue(&mut self, timeout: Duration) -> io::Result<Option<Dequeued>>;

    fn stream_on(&mut self) -> io::Result<()>;

    fn stream_off(&mut self) -> io::Result<()>;
}

/// Owns a capture device, its negotiated layout and its buffer pool.
pub struct CaptureSession<D: CaptureDriver> {
    name: String,
    driver: Option<D>,
    layout: PixelLayout,
    pool: BufferPool,
    streaming: bool,
}

impl<D: CaptureDriver> CaptureSession<D> {
    /// Negotiates the capture format and builds the buffer pool.
    ///
    /// Every granted buffer is mapped, filled and queued before this returns.
    /// On failure the buffers mapped so far are released and the device is
    /// closed.
    pub fn open(mut driver: D, channel: u32, params: &CaptureParams) -> Result<Self> {
        let name = driver.name().to_owned();

        match driver.can_stream() {
            Ok(true) => debug!(device = %name, "capable of streaming"),
            Ok(false) => return Err(Error::NotStreamingCapable { device: name }),
            Err(source) => return Err(Error::DeviceUnavailable { device: name, source }),
        }

        driver
            .select_input(channel, params)
            .map_err(Error::FormatRejected)?;
        let (width, height, format) = driver.format().map_err(Error::FormatRejected)?;
        let layout = PixelLayout::new(width, height, format);

        let mut session = Self {
            name,
            driver: Some(driver),
            layout,
            pool: BufferPool::default(),
            streaming: false,
        };
        if let Err(e) = session.allocate(params.buffer_count) {
            session.close();
            return Err(e);
        }

        info!(
            device = %session.name,
            buffers = session.pool.len(),
            "capture init done"
        );
        Ok(session)
    }

    fn allocate(&mut self, count: u32) -> Result<()> {
        let failed = |index: usize| move |source| Error::BufferAllocationFailed { index, source };

        let driver = self.driver.as_mut().ok_or_else(|| failed(0)(closed()))?;
        let granted = driver.request_buffers(count).map_err(failed(0))?;
        if granted == 0 {
            return Err(Error::BufferAllocationFailed {
                index: 0,
                source: io::Error::other("driver granted no buffers"),
            });
        }
        if granted != count {
            warn!(requested = count, granted, "driver adjusted buffer count");
        }
        self.pool = BufferPool::with_capacity(granted as usize);

        for i in 0..granted {
            let index = i as usize;
            let buffer = driver.query_buffer(i).map_err(failed(index))?;
            let region = driver.map_buffer(&buffer).map_err(failed(index))?;
            self.pool.push(buffer.offset, region);
            driver.queue(i).map_err(failed(index))?;
            self.pool.give(index)?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn is_open(&self) -> bool {
        self.driver.is_some()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Turns streaming on. Buffers reclaimed by an earlier
    /// [`stop_streaming`](Self::stop_streaming) are queued again first.
    pub fn start_streaming(&mut self) -> Result<()> {
        if self.streaming {
            return Ok(());
        }
        let held: Vec<usize> = self
            .pool
            .iter()
            .filter(|b| b.state() == BufferState::HeldByRelay)
            .map(|b| b.index())
            .collect();
        for index in held {
            self.requeue(index)?;
        }

        self.driver()?
            .stream_on()
            .map_err(Error::stream("VIDIOC_STREAMON"))?;
        self.streaming = true;
        info!(device = %self.name, "stream on");
        Ok(())
    }

    /// Waits for the next filled buffer and takes ownership of it.
    pub fn dequeue(&mut self, timeout: Duration) -> Result<Option<Dequeued>> {
        let frame = self
            .driver()?
            .dequeue(timeout)
            .map_err(Error::stream("VIDIOC_DQBUF"))?;
        if let Some(frame) = frame {
            self.pool.take(frame.index)?;
        }
        Ok(frame)
    }

    /// Hands buffer `index` back to the driver.
    pub fn requeue(&mut self, index: usize) -> Result<()> {
        match self.pool.get(index).map(|b| b.state()) {
            Some(BufferState::HeldByRelay) => {}
            Some(state) => return Err(Error::BufferOwnership { index, state }),
            None => return Err(Error::UnknownBuffer(index)),
        }
        self.driver()?
            .queue(index as u32)
            .map_err(Error::stream("VIDIOC_QBUF"))?;
        self.pool.give(index)?;
        Ok(())
    }

    /// Turns streaming off. The driver gives up every queued buffer, so all
    /// of them are held by the relay afterwards.
    pub fn stop_streaming(&mut self) -> Result<()> {
        if !self.streaming {
            return Ok(());
        }
        self.streaming = false;
        info!(device = %self.name, "stream off");
        self.driver()?
            .stream_off()
            .map_err(Error::stream("VIDIOC_STREAMOFF"))?;
        self.pool.reclaim();
        Ok(())
    }

    /// Unmaps every buffer and closes the device. Safe to call on a
    /// partially opened or already closed session.
    pub fn close(&mut self) {
        if self.streaming {
            if let Err(e) = self.stop_streaming() {
                warn!(device = %self.name, "{e}");
            }
        }
        self.pool.clear();
        if self.driver.take().is_some() {
            debug!(device = %self.name, "capture closed");
        }
    }

    fn driver(&mut self) -> Result<&mut D> {
        self.driver.as_mut().ok_or_else(|| Error::StreamIo {
            op: "capture",
            source: closed(),
        })
    }
}

impl<D: CaptureDriver> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "session closed")
}
