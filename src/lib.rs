// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst Relay Library
//!
//! This library relays live frames from a V4L2 capture device into a
//! hardware display overlay without copying them. Captured buffers are shown
//! in place: each frame is dequeued from the capture driver, the overlay
//! layer is pointed at it and the buffer is handed straight back.
//!
//! ## Features
//!
//! - **Zero-Copy Relay**: The overlay scans out the capture driver's own
//!   mmap buffers; no pixel data passes through the CPU.
//! - **Buffer Ownership Tracking**: Every pool buffer is owned by either the
//!   driver or the relay, never both, including on error paths.
//! - **Lifecycle Control**: Start, pause, resume and stop a relay from a
//!   controller thread while one worker thread performs all device I/O.
//! - **Geometry Validation**: Crop windows are clamped to the capture frame,
//!   show windows are checked against the screen before any device opens.
//! - **Control Protocol**: Decoder for the monitor server command format.
//!
//! ## Example
//!
//! ```no_run
//! use edgefirst_relay::{
//!     controller::{ChannelConfig, Relay, RelayOptions},
//!     geometry::Rect,
//!     sunxi::{DeviceConfig, Sunxi},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = Sunxi::new(DeviceConfig::default());
//! let mut relay = Relay::init(platform, RelayOptions::default())?;
//!
//! relay.start(ChannelConfig {
//!     channel: 0,
//!     show: Rect::new(0, 0, 720, 576),
//!     crop: Rect::new(0, 0, 720, 576),
//! })?;
//! relay.pause();
//! relay.run();
//! relay.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Requirements
//!
//! - **Linux**: V4L2 capture driver with mmap streaming
//! - **Display**: Allwinner A10/A20 display controller (`/dev/disp`) for
//!   the bundled [`sunxi`] drivers; other controllers plug in through the
//!   [`display::OverlayDriver`] trait
//!
//! ## Safety
//!
//! This library uses `unsafe` code for ioctl calls and buffer mappings. All
//! unsafe operations are isolated to the [`sys`], [`sunxi`] and [`buffer`]
//! modules and wrapped with safe APIs.

pub mod buffer;
pub mod capture;
pub mod control;
pub mod controller;
pub mod display;
pub mod error;
pub mod format;
pub mod geometry;
pub mod relay;
pub mod sunxi;
pub mod sys;

pub use error::{Error, Result};
