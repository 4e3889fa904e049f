// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Capture buffer pool.
//!
//! Each buffer is owned either by the capture driver (queued, waiting to be
//! filled) or by the relay (dequeued, being presented). The pool tracks that
//! ownership per slot so a buffer is never handed to both at once.

use crate::error::{Error, Result};
use libc::{
    mmap, mmap64, munmap, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, MAP_SHARED, PROT_READ,
    PROT_WRITE,
};
use std::{
    ffi::c_void,
    io,
    os::fd::{AsRawFd, BorrowedFd},
    ptr::null_mut,
    slice::{from_raw_parts, from_raw_parts_mut},
};
use tracing::warn;

/// Memory mapping owned by the process, unmapped when dropped.
#[derive(Debug)]
pub struct MappedRegion {
    ptr: *mut u8,
    len: usize,
}

// The region is plain memory; access is serialised by the pool owner.
unsafe impl Send for MappedRegion {}

impl MappedRegion {
    /// Maps `len` bytes of the device behind `fd` at `offset`.
    ///
    /// Offsets are physical addresses on some capture drivers and may exceed
    /// `i32::MAX`, so the mapping always uses a 64-bit file offset.
    pub fn from_fd(fd: BorrowedFd<'_>, len: usize, offset: u32) -> io::Result<Self> {
        let ptr = unsafe {
            mmap64(
                null_mut(),
                len,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                fd.as_raw_fd(),
                libc::off64_t::from(offset),
            )
        };
        if ptr == MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            ptr: ptr.cast::<u8>(),
            len,
        })
    }

    /// Maps `len` bytes of anonymous memory, for drivers without a device
    /// node behind their buffers.
    pub fn anonymous(len: usize) -> io::Result<Self> {
        let ptr = unsafe {
            mmap(
                null_mut(),
                len,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            ptr: ptr.cast::<u8>(),
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        unsafe { from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        if unsafe { munmap(self.ptr.cast::<c_void>(), self.len) } != 0 {
            warn!("unmap failed: {}", io::Error::last_os_error());
        }
    }
}

/// Who currently owns a [`FrameBuffer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferState {
    /// Queued on the driver, which may write into it at any time.
    OnDriverQueue,
    /// Dequeued and being presented by the relay.
    HeldByRelay,
}

/// One slot of the capture buffer pool.
#[derive(Debug)]
pub struct FrameBuffer {
    index: usize,
    offset: u32,
    region: MappedRegion,
    state: BufferState,
}

impl FrameBuffer {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Offset of the buffer in the driver's mmap space.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn data(&self) -> &[u8] {
        self.region.as_slice()
    }
}

/// Fixed arena of capture buffers indexed by driver buffer index.
///
/// Slots are only ever appended while the pool is being built and are
/// released together when the pool is cleared; the arena never resizes while
/// streaming.
#[derive(Debug, Default)]
pub struct BufferPool {
    slots: Vec<FrameBuffer>,
}

impl BufferPool {
    pub fn with_capacity(count: usize) -> Self {
        Self {
            slots: Vec::with_capacity(count),
        }
    }

    /// Adds the next buffer, filled with neutral grey (0x80), owned by the
    /// relay until it is queued.
    pub fn push(&mut self, offset: u32, mut region: MappedRegion) -> usize {
        region.as_slice_mut().fill(0x80);
        let index = self.slots.len();
        self.slots.push(FrameBuffer {
            index,
            offset,
            region,
            state: BufferState::HeldByRelay,
        });
        index
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FrameBuffer> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameBuffer> {
        self.slots.iter()
    }

    /// Number of buffers in `state`.
    pub fn count(&self, state: BufferState) -> usize {
        self.slots.iter().filter(|b| b.state == state).count()
    }

    /// Records that the driver handed buffer `index` to the relay.
    pub fn take(&mut self, index: usize) -> Result<&FrameBuffer> {
        self.transition(index, BufferState::OnDriverQueue, BufferState::HeldByRelay)
    }

    /// Records that buffer `index` was returned to the driver queue.
    pub fn give(&mut self, index: usize) -> Result<&FrameBuffer> {
        self.transition(index, BufferState::HeldByRelay, BufferState::OnDriverQueue)
    }

    /// Records that the driver dropped its queue, as it does on stream off.
    pub fn reclaim(&mut self) {
        for slot in &mut self.slots {
            slot.state = BufferState::HeldByRelay;
        }
    }

    /// Unmaps every buffer.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    fn transition(
        &mut self,
        index: usize,
        from: BufferState,
        to: BufferState,
    ) -> Result<&FrameBuffer> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(Error::UnknownBuffer(index))?;
        if slot.state != from {
            return Err(Error::BufferOwnership {
                index,
                state: slot.state,
            });
        }
        slot.state = to;
        Ok(slot)
    }
}
