// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use edgefirst_relay::{
    control::{Command, ControlError, HEADER_LEN},
    controller::ChannelConfig,
    geometry::Rect,
};

fn message(major: u16, minor0: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&major.to_le_bytes());
    buf.push(minor0);
    buf.push(0);
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn words(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn decodes_start_with_crop() {
    let payload = words(&[1, 0, 0, 640, 360, 8, 8, 704, 560]);
    let cmd = Command::decode(&message(0, 0, &payload)).unwrap();
    assert_eq!(
        cmd,
        Command::Start(ChannelConfig {
            channel: 1,
            show: Rect::new(0, 0, 640, 360),
            crop: Rect::new(8, 8, 704, 560),
        })
    );
}

#[test]
fn start_without_crop_shows_whole_frame() {
    let payload = words(&[0, 100, 100, 320, 240]);
    let Command::Start(config) = Command::decode(&message(0, 0, &payload)).unwrap() else {
        panic!("expected start");
    };
    assert_eq!(config.show, Rect::new(100, 100, 320, 240));
    assert_eq!(config.crop, Rect::new(0, 0, u32::MAX, u32::MAX));
}

#[test]
fn decodes_video_and_exit_commands() {
    assert_eq!(Command::decode(&message(0, 1, &[])), Ok(Command::Pause));
    assert_eq!(Command::decode(&message(0, 2, &[])), Ok(Command::Run));
    assert_eq!(Command::decode(&message(0, 3, &[])), Ok(Command::Stop));
    assert_eq!(Command::decode(&message(0xffff, 0, &[])), Ok(Command::Exit));
}

#[test]
fn rejects_malformed_messages() {
    assert_eq!(
        Command::decode(&[0, 0, 1]),
        Err(ControlError::Truncated {
            expected: HEADER_LEN,
            actual: 3
        })
    );

    let mut short = message(0, 0, &words(&[0, 0, 0, 720, 576]));
    short.truncate(20);
    assert_eq!(
        Command::decode(&short),
        Err(ControlError::Truncated {
            expected: 28,
            actual: 20
        })
    );

    assert_eq!(
        Command::decode(&message(1, 0, &[])),
        Err(ControlError::UnsupportedMajor(1))
    );
    assert_eq!(
        Command::decode(&message(7, 0, &[])),
        Err(ControlError::UnsupportedMajor(7))
    );
    assert_eq!(
        Command::decode(&message(0, 9, &[])),
        Err(ControlError::UnknownVideoCommand(9))
    );
    assert_eq!(
        Command::decode(&message(0, 0, &words(&[0, 0, 0]))),
        Err(ControlError::InvalidPayload(12))
    );

    let mut negative = words(&[0, 0, 0, 720, 576]);
    negative[..4].copy_from_slice(&(-1i32).to_le_bytes());
    assert_eq!(
        Command::decode(&message(0, 0, &negative)),
        Err(ControlError::NegativeChannel(-1))
    );
}

#[test]
fn trailing_bytes_are_ignored() {
    let mut buf = message(0, 2, &[]);
    buf.extend_from_slice(&[0xde, 0xad]);
    assert_eq!(Command::decode(&buf), Ok(Command::Run));
}

#[test]
fn encoded_start_decodes_to_itself() {
    let start = Command::Start(ChannelConfig {
        channel: 1,
        show: Rect::new(10, 20, 300, 200),
        crop: Rect::new(0, 0, 720, 576),
    });
    let buf = start.encode();
    assert_eq!(buf.len(), HEADER_LEN + 36);
    assert_eq!(&buf[..4], &[0, 0, 0, 0]);
    assert_eq!(Command::decode(&buf), Ok(start));
}
