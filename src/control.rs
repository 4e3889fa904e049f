// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Wire format of the monitor server commands that drive the relay.
//!
//! Every message starts with an 8 byte little-endian header followed by
//! `size` payload bytes:
//!
//! | Offset | Type | Field                       |
//! |--------|------|-----------------------------|
//! | 0      | u16  | major command               |
//! | 2      | u8   | minor command 0             |
//! | 3      | u8   | minor command 1             |
//! | 4      | u32  | payload size                |
//!
//! A video start carries the channel (i32) followed by the show rectangle
//! and, optionally, the crop rectangle, each as four u32 (x, y, width,
//! height). Without a crop rectangle the whole captured frame is shown.

use crate::{controller::ChannelConfig, geometry::Rect};
use thiserror::Error;

pub const HEADER_LEN: usize = 8;

const MONCMD_VIDEO: u16 = 0;
const MONCMD_CANBUS: u16 = 1;
const MONCMD_EXIT: u16 = 0xffff;

const VIDEOCMD_START: u8 = 0;
const VIDEOCMD_PAUSE: u8 = 1;
const VIDEOCMD_RUN: u8 = 2;
const VIDEOCMD_STOP: u8 = 3;

const RECT_LEN: usize = 16;
/// channel + show rectangle
const START_LEN: usize = 4 + RECT_LEN;
/// channel + show rectangle + crop rectangle
const START_CROP_LEN: usize = 4 + 2 * RECT_LEN;

/// Crop selecting the whole frame; clamped to the capture size on start.
const FULL_FRAME: Rect = Rect::new(0, 0, u32::MAX, u32::MAX);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("message truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unsupported command group {0:#06x}")]
    UnsupportedMajor(u16),

    #[error("unknown video command {0}")]
    UnknownVideoCommand(u8),

    #[error("start payload of {0} bytes")]
    InvalidPayload(usize),

    #[error("negative channel {0}")]
    NegativeChannel(i32),
}

/// Command from the external controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start(ChannelConfig),
    Pause,
    Run,
    Stop,
    /// Shut the relay service down
    Exit,
}

impl Command {
    /// Decodes one message.
    pub fn decode(buf: &[u8]) -> Result<Self, ControlError> {
        if buf.len() < HEADER_LEN {
            return Err(ControlError::Truncated {
                expected: HEADER_LEN,
                actual: buf.len(),
            });
        }
        let major = u16::from_le_bytes([buf[0], buf[1]]);
        let minor0 = buf[2];
        let size = read_u32(buf, 4) as usize;

        let expected = HEADER_LEN.saturating_add(size);
        if buf.len() < expected {
            return Err(ControlError::Truncated {
                expected,
                actual: buf.len(),
            });
        }
        let payload = &buf[HEADER_LEN..expected];

        match major {
            MONCMD_VIDEO => match minor0 {
                VIDEOCMD_START => decode_start(payload).map(Command::Start),
                VIDEOCMD_PAUSE => Ok(Command::Pause),
                VIDEOCMD_RUN => Ok(Command::Run),
                VIDEOCMD_STOP => Ok(Command::Stop),
                other => Err(ControlError::UnknownVideoCommand(other)),
            },
            MONCMD_EXIT => Ok(Command::Exit),
            MONCMD_CANBUS => Err(ControlError::UnsupportedMajor(major)),
            other => Err(ControlError::UnsupportedMajor(other)),
        }
    }

    /// Encodes the command; a start always carries the crop rectangle.
    pub fn encode(&self) -> Vec<u8> {
        let (major, minor0, payload) = match self {
            Command::Start(config) => {
                let mut payload = Vec::with_capacity(START_CROP_LEN);
                payload.extend_from_slice(&(config.channel as i32).to_le_bytes());
                write_rect(&mut payload, &config.show);
                write_rect(&mut payload, &config.crop);
                (MONCMD_VIDEO, VIDEOCMD_START, payload)
            }
            Command::Pause => (MONCMD_VIDEO, VIDEOCMD_PAUSE, Vec::new()),
            Command::Run => (MONCMD_VIDEO, VIDEOCMD_RUN, Vec::new()),
            Command::Stop => (MONCMD_VIDEO, VIDEOCMD_STOP, Vec::new()),
            Command::Exit => (MONCMD_EXIT, 0, Vec::new()),
        };

        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.extend_from_slice(&major.to_le_bytes());
        buf.push(minor0);
        buf.push(0);
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&payload);
        buf
    }
}

fn decode_start(payload: &[u8]) -> Result<ChannelConfig, ControlError> {
    if payload.len() != START_LEN && payload.len() != START_CROP_LEN {
        return Err(ControlError::InvalidPayload(payload.len()));
    }
    let channel = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let channel = u32::try_from(channel).map_err(|_| ControlError::NegativeChannel(channel))?;
    let show = read_rect(payload, 4);
    let crop = if payload.len() == START_CROP_LEN {
        read_rect(payload, 4 + RECT_LEN)
    } else {
        FULL_FRAME
    };
    Ok(ChannelConfig {
        channel,
        show,
        crop,
    })
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_rect(buf: &[u8], at: usize) -> Rect {
    Rect::new(
        read_u32(buf, at),
        read_u32(buf, at + 4),
        read_u32(buf, at + 8),
        read_u32(buf, at + 12),
    )
}

fn write_rect(buf: &mut Vec<u8>, rect: &Rect) {
    for v in [rect.x, rect.y, rect.width, rect.height] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}
