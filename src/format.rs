// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Pixel formats and the plane layout derived from them.

use crate::sys::{DispMode, DispPixelFormat, DispSeq};
use std::fmt;
use tracing::{info, warn};

/// Four character code identifying a V4L2 pixel format.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl From<u32> for FourCC {
    fn from(value: u32) -> Self {
        FourCC(value.to_le_bytes())
    }
}

impl From<FourCC> for u32 {
    fn from(value: FourCC) -> Self {
        u32::from_le_bytes(value.0)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &c in &self.0 {
            let c = if c.is_ascii_graphic() || c == b' ' {
                c as char
            } else {
                '.'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

/// YUV 4:2:2 planar
pub const YUV422P: FourCC = FourCC(*b"422P");

/// YUYV 4:2:2 packed
pub const YUYV: FourCC = FourCC(*b"YUYV");

/// YVYU 4:2:2 packed
pub const YVYU: FourCC = FourCC(*b"YVYU");

/// UYVY 4:2:2 packed
pub const UYVY: FourCC = FourCC(*b"UYVY");

/// VYUY 4:2:2 packed
pub const VYUY: FourCC = FourCC(*b"VYUY");

/// YUV 4:2:0 planar (I420)
pub const YUV420: FourCC = FourCC(*b"YU12");

/// NV16 4:2:2 semi-planar
pub const NV16: FourCC = FourCC(*b"NV16");

/// NV12 4:2:0 semi-planar
pub const NV12: FourCC = FourCC(*b"NV12");

/// Allwinner macroblock-tiled 4:2:0
pub const HM12: FourCC = FourCC(*b"HM12");

/// Geometry of a negotiated capture format.
///
/// The two plane offsets are the byte distance from a frame's base address
/// to its second and third plane. The overlay derives all three plane
/// addresses from one base address with them, so they are computed once when
/// the capture format is negotiated and never change for the session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PixelLayout {
    pub width: u32,
    pub height: u32,
    pub format: FourCC,
    pub offsets: [u32; 2],
    supported: bool,
}

impl PixelLayout {
    /// Derives the plane offsets for `format` at the given resolution.
    ///
    /// Formats missing from the table are reported and kept with zero
    /// offsets rather than rejected; the overlay then treats the frame as a
    /// single plane.
    pub fn new(width: u32, height: u32, format: FourCC) -> Self {
        let luma = width * height;
        let chroma = match format {
            YUV422P | YUYV | YVYU | UYVY | VYUY => Some(luma * 3 / 2),
            YUV420 => Some(luma * 5 / 4),
            NV16 | NV12 | HM12 => Some(luma),
            _ => None,
        };

        let layout = match chroma {
            Some(chroma) => Self {
                width,
                height,
                format,
                offsets: [luma, chroma],
                supported: true,
            },
            None => {
                warn!(%format, "capture format not in plane table, using zero plane offsets");
                Self {
                    width,
                    height,
                    format,
                    offsets: [0, 0],
                    supported: false,
                }
            }
        };
        info!(
            "capture {}x{} {} offset: {:#x}, {:#x}",
            width, height, format, layout.offsets[0], layout.offsets[1]
        );
        layout
    }

    /// Whether the format was found in the plane table.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Addresses of the three planes of the frame starting at `base`.
    pub fn plane_addresses(&self, base: u32) -> [u32; 3] {
        [
            base,
            base.wrapping_add(self.offsets[0]),
            base.wrapping_add(self.offsets[1]),
        ]
    }

    /// Overlay layer encoding matching this capture format.
    pub fn layer_format(&self) -> LayerFormat {
        LayerFormat::from(self.format)
    }
}

/// Pixel format, storage mode and component sequence programmed into the
/// overlay layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayerFormat {
    pub format: DispPixelFormat,
    pub mode: DispMode,
    pub seq: DispSeq,
}

impl From<FourCC> for LayerFormat {
    fn from(fourcc: FourCC) -> Self {
        let (format, mode, seq) = match fourcc {
            NV12 => (DispPixelFormat::Yuv420, DispMode::UvCombined, DispSeq::Uvuv),
            NV16 => (DispPixelFormat::Yuv422, DispMode::UvCombined, DispSeq::Uvuv),
            HM12 => (
                DispPixelFormat::Yuv420,
                DispMode::MbUvCombined,
                DispSeq::Uvuv,
            ),
            YUV420 => (DispPixelFormat::Yuv420, DispMode::Planar, DispSeq::Uvuv),
            YUV422P => (DispPixelFormat::Yuv422, DispMode::Planar, DispSeq::Uvuv),
            YUYV => (DispPixelFormat::Yuv422, DispMode::Interleaved, DispSeq::Yuyv),
            YVYU => (DispPixelFormat::Yuv422, DispMode::Interleaved, DispSeq::Yvyu),
            UYVY => (DispPixelFormat::Yuv422, DispMode::Interleaved, DispSeq::Uyvy),
            VYUY => (DispPixelFormat::Yuv422, DispMode::Interleaved, DispSeq::Vyuy),
            // the tvd decoder default
            _ => (DispPixelFormat::Yuv420, DispMode::UvCombined, DispSeq::Uvuv),
        };
        Self { format, mode, seq }
    }
}
