// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Raw kernel interfaces: V4L2 capture, fbdev and the sunxi display
//! controller.
//!
//! Structure layouts follow `linux/videodev2.h`, `linux/fb.h` and the
//! Allwinner `sunxi_disp_ioctl.h` (display driver 1.x, A10/A20).

#![allow(non_camel_case_types)]

use libc::{c_int, c_ulong, timeval};
use nix::{ioctl_read, ioctl_read_bad, ioctl_readwrite, ioctl_write_ptr, ioctl_write_ptr_bad};

pub const V4L2_BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
pub const V4L2_BUF_TYPE_PRIVATE: u32 = 0x80;
pub const V4L2_MEMORY_MMAP: u32 = 1;
pub const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
pub const V4L2_CAP_STREAMING: u32 = 0x0400_0000;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct v4l2_capability {
    pub driver: [u8; 16],
    pub card: [u8; 32],
    pub bus_info: [u8; 32],
    pub version: u32,
    pub capabilities: u32,
    pub device_caps: u32,
    pub reserved: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct v4l2_pix_format {
    pub width: u32,
    pub height: u32,
    pub pixelformat: u32,
    pub field: u32,
    pub bytesperline: u32,
    pub sizeimage: u32,
    pub colorspace: u32,
    pub priv_: u32,
    pub flags: u32,
    pub ycbcr_enc: u32,
    pub quantization: u32,
    pub xfer_func: u32,
}

/// The kernel union also holds `v4l2_window`, which carries pointers, so
/// the union is pointer aligned.
#[repr(C)]
#[derive(Copy, Clone)]
pub union v4l2_format_union {
    pub pix: v4l2_pix_format,
    pub raw_data: [u8; 200],
    _align: [usize; 0],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct v4l2_format {
    pub type_: u32,
    pub fmt: v4l2_format_union,
}

impl v4l2_format {
    pub fn new(type_: u32) -> Self {
        Self {
            type_,
            fmt: v4l2_format_union { raw_data: [0; 200] },
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct v4l2_requestbuffers {
    pub count: u32,
    pub type_: u32,
    pub memory: u32,
    pub capabilities: u32,
    pub flags: u8,
    pub reserved: [u8; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct v4l2_timecode {
    pub type_: u32,
    pub flags: u32,
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub userbits: [u8; 4],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union v4l2_buffer_m {
    pub offset: u32,
    pub userptr: c_ulong,
    pub planes: *mut libc::c_void,
    pub fd: i32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct v4l2_buffer {
    pub index: u32,
    pub type_: u32,
    pub bytesused: u32,
    pub flags: u32,
    pub field: u32,
    pub timestamp: timeval,
    pub timecode: v4l2_timecode,
    pub sequence: u32,
    pub memory: u32,
    pub m: v4l2_buffer_m,
    pub length: u32,
    pub reserved2: u32,
    pub request_fd: i32,
}

impl v4l2_buffer {
    pub fn mmap(index: u32) -> Self {
        Self {
            index,
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            bytesused: 0,
            flags: 0,
            field: 0,
            timestamp: timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            timecode: v4l2_timecode::default(),
            sequence: 0,
            memory: V4L2_MEMORY_MMAP,
            m: v4l2_buffer_m { userptr: 0 },
            length: 0,
            reserved2: 0,
            request_fd: 0,
        }
    }

    pub fn offset(&self) -> u32 {
        // SAFETY: MMAP buffers always report the offset member.
        unsafe { self.m.offset }
    }
}

ioctl_read!(vidioc_querycap, b'V', 0, v4l2_capability);
ioctl_readwrite!(vidioc_g_fmt, b'V', 4, v4l2_format);
ioctl_readwrite!(vidioc_s_fmt, b'V', 5, v4l2_format);
ioctl_readwrite!(vidioc_reqbufs, b'V', 8, v4l2_requestbuffers);
ioctl_readwrite!(vidioc_querybuf, b'V', 9, v4l2_buffer);
ioctl_readwrite!(vidioc_qbuf, b'V', 15, v4l2_buffer);
ioctl_readwrite!(vidioc_dqbuf, b'V', 17, v4l2_buffer);
ioctl_write_ptr!(vidioc_streamon, b'V', 18, c_int);
ioctl_write_ptr!(vidioc_streamoff, b'V', 19, c_int);

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct fb_bitfield {
    pub offset: u32,
    pub length: u32,
    pub msb_right: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct fb_var_screeninfo {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    pub grayscale: u32,
    pub red: fb_bitfield,
    pub green: fb_bitfield,
    pub blue: fb_bitfield,
    pub transp: fb_bitfield,
    pub nonstd: u32,
    pub activate: u32,
    pub height: u32,
    pub width: u32,
    pub accel_flags: u32,
    pub pixclock: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub sync: u32,
    pub vmode: u32,
    pub rotate: u32,
    pub colorspace: u32,
    pub reserved: [u32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct fb_fix_screeninfo {
    pub id: [u8; 16],
    pub smem_start: c_ulong,
    pub smem_len: u32,
    pub type_: u32,
    pub type_aux: u32,
    pub visual: u32,
    pub xpanstep: u16,
    pub ypanstep: u16,
    pub ywrapstep: u16,
    pub line_length: u32,
    pub mmio_start: c_ulong,
    pub mmio_len: u32,
    pub accel: u32,
    pub capabilities: u16,
    pub reserved: [u16; 2],
}

const FBIOGET_VSCREENINFO: c_ulong = 0x4600;
const FBIOGET_FSCREENINFO: c_ulong = 0x4602;

ioctl_read_bad!(fbioget_vscreeninfo, FBIOGET_VSCREENINFO, fb_var_screeninfo);
ioctl_read_bad!(fbioget_fscreeninfo, FBIOGET_FSCREENINFO, fb_fix_screeninfo);

/// Layer pixel format (`__disp_pixel_fmt_t`).
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispPixelFormat {
    Yuv444 = 0x10,
    Yuv422 = 0x11,
    Yuv420 = 0x12,
    Yuv411 = 0x13,
}

/// Layer plane storage mode (`__disp_pixel_mod_t`).
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispMode {
    Planar = 0x0,
    Interleaved = 0x1,
    UvCombined = 0x2,
    MbPlanar = 0x4,
    MbUvCombined = 0x6,
}

/// Component order within a plane (`__disp_pixel_seq_t`).
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispSeq {
    Uyvy = 0x3,
    Yuyv = 0x4,
    Vyuy = 0x5,
    Yvyu = 0x6,
    Uvuv = 0x9,
    Vuvu = 0xa,
}

pub const DISP_LAYER_WORK_MODE_SCALER: u32 = 4;

/// The driver declares `__bool` as a byte.
pub type disp_bool = u8;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct disp_rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct disp_rectsz {
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct disp_fb {
    pub addr: [u32; 3],
    pub size: disp_rectsz,
    pub format: u32,
    pub seq: u32,
    pub mode: u32,
    pub br_swap: disp_bool,
    pub cs_mode: u32,
    pub b_trd_src: disp_bool,
    pub trd_mode: u32,
    pub trd_right_addr: [u32; 3],
    pub pre_multiply: disp_bool,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct disp_layer_info {
    pub mode: u32,
    pub b_from_screen: disp_bool,
    pub pipe: u8,
    pub prio: u8,
    pub alpha_en: disp_bool,
    pub alpha_val: u16,
    pub ck_enable: disp_bool,
    pub src_win: disp_rect,
    pub scn_win: disp_rect,
    pub fb: disp_fb,
    pub b_trd_out: disp_bool,
    pub out_trd_mode: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct disp_video_fb {
    pub id: i32,
    pub addr: [u32; 3],
    pub addr_right: [u32; 3],
    pub interlace: disp_bool,
    pub top_field_first: disp_bool,
    pub frame_rate: u32,
    pub flag_addr: u32,
    pub flag_stride: u32,
    pub maf_valid: disp_bool,
    pub pre_frame_valid: disp_bool,
}

const DISP_CMD_LAYER_REQUEST: c_ulong = 0x40;
const DISP_CMD_LAYER_RELEASE: c_ulong = 0x41;
const DISP_CMD_LAYER_OPEN: c_ulong = 0x42;
const DISP_CMD_LAYER_CLOSE: c_ulong = 0x43;
const DISP_CMD_LAYER_SET_PARA: c_ulong = 0x4a;
const DISP_CMD_LAYER_BOTTOM: c_ulong = 0x57;
const DISP_CMD_VIDEO_START: c_ulong = 0x100;
const DISP_CMD_VIDEO_STOP: c_ulong = 0x101;
const DISP_CMD_VIDEO_SET_FB: c_ulong = 0x102;
const DISP_CMD_LCD_ON: c_ulong = 0x140;

/// Every display command takes a pointer to four machine words:
/// screen, layer handle and up to two command specific values.
pub type disp_args = [c_ulong; 4];

ioctl_write_ptr_bad!(disp_layer_request, DISP_CMD_LAYER_REQUEST, disp_args);
ioctl_write_ptr_bad!(disp_layer_release, DISP_CMD_LAYER_RELEASE, disp_args);
ioctl_write_ptr_bad!(disp_layer_open, DISP_CMD_LAYER_OPEN, disp_args);
ioctl_write_ptr_bad!(disp_layer_close, DISP_CMD_LAYER_CLOSE, disp_args);
ioctl_write_ptr_bad!(disp_layer_set_para, DISP_CMD_LAYER_SET_PARA, disp_args);
ioctl_write_ptr_bad!(disp_layer_bottom, DISP_CMD_LAYER_BOTTOM, disp_args);
ioctl_write_ptr_bad!(disp_video_start, DISP_CMD_VIDEO_START, disp_args);
ioctl_write_ptr_bad!(disp_video_stop, DISP_CMD_VIDEO_STOP, disp_args);
ioctl_write_ptr_bad!(disp_video_set_fb, DISP_CMD_VIDEO_SET_FB, disp_args);
ioctl_write_ptr_bad!(disp_lcd_on, DISP_CMD_LCD_ON, disp_args);
