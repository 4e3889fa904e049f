// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    buffer::BufferState,
    geometry::{Rect, ScreenInfo},
};
use std::io;
use thiserror::Error;

/// Errors reported by the relay pipeline.
///
/// Device and driver failures carry the underlying [`io::Error`] so the
/// errno reported by the kernel is preserved in logs.
#[derive(Debug, Error)]
pub enum Error {
    /// A device node could not be opened.
    #[error("cannot open {device}: {source}")]
    DeviceUnavailable {
        device: String,
        #[source]
        source: io::Error,
    },

    /// The capture device does not support the streaming I/O method.
    #[error("{device} is not capable of streaming")]
    NotStreamingCapable { device: String },

    /// The capture driver refused the requested format or could not report
    /// the negotiated one.
    #[error("capture format rejected: {0}")]
    FormatRejected(#[source] io::Error),

    /// The buffer pool could not be fully requested, mapped or queued.
    #[error("buffer {index} allocation failed: {source}")]
    BufferAllocationFailed {
        index: usize,
        #[source]
        source: io::Error,
    },

    /// The display driver did not grant an overlay layer.
    #[error("overlay layer request failed: {0}")]
    LayerRequestFailed(#[source] io::Error),

    /// The show rectangle does not fit on the screen.
    #[error("show rectangle {rect} out of screen {screen}")]
    OutOfScreenBounds { rect: Rect, screen: ScreenInfo },

    /// The requested rectangle does not overlap its bound.
    #[error("rectangle {request} does not intersect {bound}")]
    EmptyIntersection { request: Rect, bound: Rect },

    /// The channel index is not served by the capture device.
    #[error("invalid channel {channel}, {available} channels available")]
    InvalidChannel { channel: u32, available: u32 },

    /// A driver call failed while streaming.
    #[error("{op} failed: {source}")]
    StreamIo {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// A buffer was handed back which the relay does not hold.
    #[error("buffer {index} is {state:?}")]
    BufferOwnership { index: usize, state: BufferState },

    /// The driver reported a buffer index outside the pool.
    #[error("buffer {0} is not part of the pool")]
    UnknownBuffer(usize),

    /// The relay worker thread panicked.
    #[error("relay worker panicked")]
    WorkerPanicked,
}

impl Error {
    pub(crate) fn stream(op: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Error::StreamIo { op, source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
