// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_relay::{
    capture::{AnalogStandard, CaptureParams},
    controller::{ChannelConfig, RelayOptions},
    geometry::Rect,
    sunxi::DeviceConfig,
};
use serde_json::json;
use std::{path::PathBuf, time::Duration};
use zenoh::config::{Config, WhatAmI};

/// Analog video standard of the capture input.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum Standard {
    /// 525 lines, 30 frames per second
    Ntsc,
    /// 625 lines, 25 frames per second
    Pal,
}

impl From<Standard> for AnalogStandard {
    fn from(value: Standard) -> Self {
        match value {
            Standard::Ntsc => AnalogStandard::Ntsc,
            Standard::Pal => AnalogStandard::Pal,
        }
    }
}

/// Command-line arguments for EdgeFirst Relay.
///
/// The relay shows a capture channel on a display overlay and is driven by
/// start/pause/run/stop commands received over Zenoh. Arguments can be
/// specified via command line or environment variables.
///
/// # Example
///
/// ```bash
/// # Show channel 1 scaled into the top-left quarter of a 1280x720 panel
/// edgefirst-relay --channel 1 --show "0 0 640 360"
///
/// # Wait for a controller instead of starting at launch
/// export IDLE=true
/// edgefirst-relay
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Capture device path
    #[arg(long, env = "CAPTURE", default_value = "/dev/video1")]
    pub capture: PathBuf,

    /// Display controller device path
    #[arg(long, env = "DISPLAY_DEVICE", default_value = "/dev/disp")]
    pub display: PathBuf,

    /// Framebuffer device used to read the screen geometry
    #[arg(long, env = "FRAMEBUFFER", default_value = "/dev/fb0")]
    pub framebuffer: PathBuf,

    /// Analog video standard of the capture input
    #[arg(long, env = "STANDARD", default_value = "pal", value_enum)]
    pub standard: Standard,

    /// Capture tiling in rows and columns
    #[arg(
        long,
        env = "TILES",
        default_value = "1 1",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub tiles: Vec<u8>,

    /// Number of capture buffers requested from the driver
    #[arg(long, env = "BUFFERS", default_value = "4")]
    pub buffers: u32,

    /// Longest wait for a frame before rechecking for stop, in milliseconds
    #[arg(long, env = "POLL_TIMEOUT", default_value = "100")]
    pub poll_timeout: u64,

    /// Frame rate hint passed to the display controller
    #[arg(long, env = "FRAME_RATE", default_value = "25")]
    pub frame_rate: u32,

    /// Capture channel shown at launch
    #[arg(long, env = "CHANNEL", default_value = "0")]
    pub channel: u32,

    /// Overlay position and size on the screen (x y width height)
    #[arg(
        long,
        env = "SHOW",
        default_value = "0 0 720 576",
        value_delimiter = ' ',
        num_args = 4
    )]
    pub show: Vec<u32>,

    /// Region of the captured frame to show (x y width height)
    #[arg(
        long,
        env = "CROP",
        default_value = "0 0 720 576",
        value_delimiter = ' ',
        num_args = 4
    )]
    pub crop: Vec<u32>,

    /// Wait for a start command instead of starting at launch
    #[arg(long, env = "IDLE")]
    pub idle: bool,

    /// Zenoh topic receiving controller commands
    #[arg(long, default_value = "rt/relay/control")]
    pub control_topic: String,

    /// Zenoh topic for relay status (JSON)
    #[arg(long, default_value = "rt/relay/status")]
    pub status_topic: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable Tokio async runtime console for debugging
    #[arg(long, env = "TOKIO_CONSOLE")]
    pub tokio_console: bool,

    /// Enable Tracy profiler for performance analysis
    #[arg(long, env = "TRACY")]
    pub tracy: bool,

    /// Zenoh participant mode (peer, client, or router)
    #[arg(long, env = "MODE", default_value = "peer")]
    mode: WhatAmI,

    /// Zenoh endpoints to connect to (can specify multiple)
    #[arg(long, env = "CONNECT")]
    connect: Vec<String>,

    /// Zenoh endpoints to listen on (can specify multiple)
    #[arg(long, env = "LISTEN")]
    listen: Vec<String>,

    /// Disable Zenoh multicast peer discovery
    #[arg(long, env = "NO_MULTICAST_SCOUTING")]
    no_multicast_scouting: bool,
}

fn rect(v: &[u32]) -> Rect {
    Rect::new(v[0], v[1], v[2], v[3])
}

impl Args {
    /// Channel shown at launch unless `--idle` is given.
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            channel: self.channel,
            show: rect(&self.show),
            crop: rect(&self.crop),
        }
    }
}

impl From<&Args> for DeviceConfig {
    fn from(args: &Args) -> Self {
        DeviceConfig {
            capture: args.capture.clone(),
            display: args.display.clone(),
            framebuffer: args.framebuffer.clone(),
            frame_rate: args.frame_rate,
        }
    }
}

impl From<&Args> for RelayOptions {
    fn from(args: &Args) -> Self {
        RelayOptions {
            capture: CaptureParams {
                standard: args.standard.into(),
                rows: args.tiles[0],
                columns: args.tiles[1],
                buffer_count: args.buffers,
            },
            poll_timeout: Duration::from_millis(args.poll_timeout),
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let mut config = Config::default();

        config
            .insert_json5("mode", &json!(args.mode).to_string())
            .unwrap();

        if !args.connect.is_empty() {
            config
                .insert_json5("connect/endpoints", &json!(args.connect).to_string())
                .unwrap();
        }

        if !args.listen.is_empty() {
            config
                .insert_json5("listen/endpoints", &json!(args.listen).to_string())
                .unwrap();
        }

        if args.no_multicast_scouting {
            config
                .insert_json5("scouting/multicast/enabled", &json!(false).to_string())
                .unwrap();
        }

        config
            .insert_json5("scouting/multicast/interface", &json!("lo").to_string())
            .unwrap();

        config
    }
}
