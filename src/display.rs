// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Display overlay session: one hardware scaler layer showing capture
//! buffers in place.

use crate::{
    error::{Error, Result},
    format::{LayerFormat, PixelLayout},
    geometry::{Rect, ScreenInfo},
};
use std::io;
use tracing::{debug, info, warn};

/// One-time parameters of the overlay layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayerConfig {
    /// Region of the captured frame to show
    pub src_win: Rect,
    /// Position and size on the screen
    pub scn_win: Rect,
    /// Size of the frames the layer reads
    pub frame_width: u32,
    pub frame_height: u32,
    pub format: LayerFormat,
    /// Global layer alpha, 0xff is opaque
    pub alpha: u8,
}

/// Layer protocol of a display controller driver.
///
/// Dropping the driver closes the device.
pub trait OverlayDriver: Send {
    /// Device name used in logs and errors.
    fn name(&self) -> &str;

    /// Switches the panel on.
    fn lcd_on(&mut self) -> io::Result<()>;

    /// Requests a scaler mode layer and returns its handle.
    fn request_layer(&mut self) -> io::Result<u32>;

    fn set_layer(&mut self, layer: u32, config: &LayerConfig) -> io::Result<()>;

    fn open_layer(&mut self, layer: u32) -> io::Result<()>;

    /// Moves the layer beneath every other layer.
    fn lower_layer(&mut self, layer: u32) -> io::Result<()>;

    fn video_start(&mut self, layer: u32) -> io::Result<()>;

    fn video_stop(&mut self, layer: u32) -> io::Result<()>;

    /// Points the layer at a new frame.
    fn set_frame(&mut self, layer: u32, planes: [u32; 3]) -> io::Result<()>;

    fn close_layer(&mut self, layer: u32) -> io::Result<()>;

    fn release_layer(&mut self, layer: u32) -> io::Result<()>;
}

/// Owns the display device and the overlay layer configured for one capture
/// session.
pub struct OverlaySession<D: OverlayDriver> {
    name: String,
    driver: Option<D>,
    layer: Option<u32>,
    layer_open: bool,
    video_on: bool,
    layout: PixelLayout,
    screen: ScreenInfo,
    config: LayerConfig,
}

impl<D: OverlayDriver> OverlaySession<D> {
    /// Requests and configures the overlay layer.
    ///
    /// `crop` must already be clamped to the capture frame and `show`
    /// validated against `screen`. On failure everything acquired so far is
    /// released.
    pub fn open(
        driver: D,
        screen: ScreenInfo,
        layout: PixelLayout,
        crop: Rect,
        show: Rect,
    ) -> Result<Self> {
        let config = LayerConfig {
            src_win: crop,
            scn_win: show,
            frame_width: layout.width,
            frame_height: layout.height,
            format: layout.layer_format(),
            alpha: 0xff,
        };
        let mut session = Self {
            name: driver.name().to_owned(),
            driver: Some(driver),
            layer: None,
            layer_open: false,
            video_on: false,
            layout,
            screen,
            config,
        };
        debug!(device = %session.name, "opened");

        if let Err(e) = session.configure() {
            session.close();
            return Err(e);
        }
        Ok(session)
    }

    fn configure(&mut self) -> Result<()> {
        let name = &self.name;
        let driver = self
            .driver
            .as_mut()
            .ok_or_else(|| Error::LayerRequestFailed(closed()))?;

        if let Err(e) = driver.lcd_on() {
            warn!(device = %name, "lcd on failed: {e}");
        }

        let layer = driver.request_layer().map_err(Error::LayerRequestFailed)?;
        if layer == 0 {
            return Err(Error::LayerRequestFailed(io::Error::other(
                "driver returned no layer handle",
            )));
        }
        self.layer = Some(layer);
        info!(device = %name, layer, "video layer requested");

        driver
            .set_layer(layer, &self.config)
            .map_err(Error::LayerRequestFailed)?;
        driver.open_layer(layer).map_err(Error::LayerRequestFailed)?;
        self.layer_open = true;

        if let Err(e) = driver.lower_layer(layer) {
            warn!(device = %name, layer, "cannot lower video layer: {e}");
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer(&self) -> Option<u32> {
        self.layer
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn screen(&self) -> &ScreenInfo {
        &self.screen
    }

    pub fn is_open(&self) -> bool {
        self.driver.is_some()
    }

    pub fn is_started(&self) -> bool {
        self.video_on
    }

    /// Enables video output on the layer.
    pub fn start(&mut self) -> Result<()> {
        let (driver, layer) = self.layer_driver()?;
        driver
            .video_start(layer)
            .map_err(Error::stream("DISP_CMD_VIDEO_START"))?;
        self.video_on = true;
        Ok(())
    }

    /// Shows the frame whose first plane starts at `base`.
    pub fn present(&mut self, base: u32) -> Result<()> {
        let planes = self.layout.plane_addresses(base);
        let (driver, layer) = self.layer_driver()?;
        driver
            .set_frame(layer, planes)
            .map_err(Error::stream("DISP_CMD_VIDEO_SET_FB"))
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.video_on {
            return Ok(());
        }
        self.video_on = false;
        let (driver, layer) = self.layer_driver()?;
        driver
            .video_stop(layer)
            .map_err(Error::stream("DISP_CMD_VIDEO_STOP"))
    }

    /// Stops video, closes and releases the layer and closes the device.
    /// Safe to call on a partially opened or already closed session.
    pub fn close(&mut self) {
        if let Err(e) = self.stop() {
            warn!(device = %self.name, "{e}");
        }
        if let (Some(driver), Some(layer)) = (self.driver.as_mut(), self.layer.take()) {
            if self.layer_open {
                if let Err(e) = driver.close_layer(layer) {
                    warn!(device = %self.name, layer, "layer close failed: {e}");
                }
                self.layer_open = false;
            }
            if let Err(e) = driver.release_layer(layer) {
                warn!(device = %self.name, layer, "layer release failed: {e}");
            }
        }
        if self.driver.take().is_some() {
            debug!(device = %self.name, "display closed");
        }
    }

    fn layer_driver(&mut self) -> Result<(&mut D, u32)> {
        match (self.driver.as_mut(), self.layer) {
            (Some(driver), Some(layer)) => Ok((driver, layer)),
            _ => Err(Error::StreamIo {
                op: "overlay",
                source: closed(),
            }),
        }
    }
}

impl<D: OverlayDriver> Drop for OverlaySession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "session closed")
}
