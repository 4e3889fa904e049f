// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Rectangle validation for the crop and show windows.
//!
//! The crop window selects a region of the captured frame and is clamped to
//! the negotiated capture size. The show window places the overlay on the
//! screen and is only validated: clamping it would change the aspect ratio
//! the controller asked for.

use crate::error::{Error, Result};
use std::fmt;
use tracing::debug;

/// Axis-aligned rectangle in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: u32,
    /// Y coordinate of top-left corner
    pub y: u32,
    /// Width of the rectangle in pixels
    pub width: u32,
    /// Height of the rectangle in pixels
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin.
    pub const fn sized(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge. Computed in 64 bits so that `x + width` cannot
    /// wrap for values received from the wire.
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})-{}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Active screen geometry as reported by the framebuffer device.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    /// Bytes per scanline
    pub line_length: u32,
    /// Framebuffer memory size in bytes
    pub size: u32,
}

impl ScreenInfo {
    pub const fn new(width: u32, height: u32, bits_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
            line_length: width * bits_per_pixel.div_ceil(8),
            size: width * height * bits_per_pixel.div_ceil(8),
        }
    }

    pub const fn bounds(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }
}

impl fmt::Display for ScreenInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{} {}bpp", self.width, self.height, self.bits_per_pixel)
    }
}

/// Intersects `request` with `bound`.
///
/// Returns the request unchanged when it already lies inside the bound and
/// fails with [`Error::EmptyIntersection`] when the two do not overlap.
pub fn clamp(request: Rect, bound: Rect) -> Result<Rect> {
    let left = request.x.max(bound.x);
    let top = request.y.max(bound.y);
    let right = request.right().min(bound.right());
    let bottom = request.bottom().min(bound.bottom());

    if u64::from(left) >= right || u64::from(top) >= bottom {
        return Err(Error::EmptyIntersection { request, bound });
    }

    // right and bottom are bounded by the u32 edges of `bound` here
    let clamped = Rect::new(
        left,
        top,
        (right - u64::from(left)) as u32,
        (bottom - u64::from(top)) as u32,
    );
    if clamped != request {
        debug!(%request, %clamped, "regulated crop");
    }
    Ok(clamped)
}

/// Checks that the show rectangle lies fully on the screen.
pub fn check_show_rect(show: Rect, screen: &ScreenInfo) -> Result<()> {
    let bound = screen.bounds();
    if show.is_empty() {
        return Err(Error::EmptyIntersection {
            request: show,
            bound,
        });
    }
    if !bound.contains(&show) {
        return Err(Error::OutOfScreenBounds {
            rect: show,
            screen: *screen,
        });
    }
    Ok(())
}
