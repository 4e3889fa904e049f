// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Allwinner A10/A20 devices: the TV decoder capture driver, the sunxi
//! display controller and the framebuffer.
//!
//! # Addresses
//!
//! The overlay is pointed at capture buffers by their V4L2 mmap offset. On
//! these SoCs the capture driver reports the physical address of each
//! buffer as its offset, so the value can be handed to the display
//! controller unchanged. Other hardware needs an explicit translation
//! (for example exporting the buffer as a dma-buf and resolving its physical
//! address) before this driver pair can be reused.

use crate::{
    buffer::MappedRegion,
    capture::{CaptureDriver, CaptureParams, Dequeued, DriverBuffer},
    controller::Platform,
    display::{LayerConfig, OverlayDriver},
    error::{Error, Result},
    format::FourCC,
    geometry::ScreenInfo,
    sys::{self, disp_args, v4l2_buffer, v4l2_format, v4l2_format_union},
};
use libc::{c_int, c_ulong};
use std::{
    fs::{File, OpenOptions},
    io,
    os::fd::{AsFd, AsRawFd},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};

/// Device nodes and driver constants of the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// TV decoder capture device
    pub capture: PathBuf,
    /// Display controller device
    pub display: PathBuf,
    /// Framebuffer whose geometry bounds the show rectangle
    pub framebuffer: PathBuf,
    /// Frame rate hint passed with every presented frame
    pub frame_rate: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            capture: PathBuf::from("/dev/video1"),
            display: PathBuf::from("/dev/disp"),
            framebuffer: PathBuf::from("/dev/fb0"),
            frame_rate: 25,
        }
    }
}

fn open_device(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| Error::DeviceUnavailable {
            device: path.display().to_string(),
            source,
        })
}

fn c_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// V4L2 capture driver of the sunxi TV decoder.
#[derive(Debug)]
pub struct V4l2Capture {
    name: String,
    file: File,
}

impl V4l2Capture {
    pub fn open(path: &Path) -> Result<Self> {
        let file = open_device(path)?;
        debug!(device = %path.display(), "capture opened");
        Ok(Self {
            name: path.display().to_string(),
            file,
        })
    }

    fn fd(&self) -> c_int {
        self.file.as_raw_fd()
    }
}

impl CaptureDriver for V4l2Capture {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_stream(&mut self) -> io::Result<bool> {
        let mut caps = sys::v4l2_capability::default();
        unsafe { sys::vidioc_querycap(self.fd(), &mut caps) }?;
        info!(
            driver = %c_str(&caps.driver),
            card = %c_str(&caps.card),
            "capabilities {:#010x}",
            caps.capabilities
        );
        Ok(caps.capabilities & sys::V4L2_CAP_STREAMING != 0)
    }

    fn select_input(&mut self, channel: u32, params: &CaptureParams) -> io::Result<()> {
        let mut raw = [0u8; 200];
        raw[0] = 0; // interface: composite
        raw[1] = params.standard.system();
        raw[8] = params.rows;
        raw[9] = params.columns;
        // tile 0 shows the selected input, one-based; other tiles disabled
        raw[10] = (channel + 1) as u8;

        let mut fmt = v4l2_format::new(sys::V4L2_BUF_TYPE_PRIVATE);
        fmt.fmt = v4l2_format_union { raw_data: raw };
        unsafe { sys::vidioc_s_fmt(self.fd(), &mut fmt) }?;
        Ok(())
    }

    fn format(&mut self) -> io::Result<(u32, u32, FourCC)> {
        let mut fmt = v4l2_format::new(sys::V4L2_BUF_TYPE_VIDEO_CAPTURE);
        unsafe { sys::vidioc_g_fmt(self.fd(), &mut fmt) }?;
        // SAFETY: the driver fills the pix member for capture buffers.
        let pix = unsafe { fmt.fmt.pix };
        Ok((pix.width, pix.height, FourCC::from(pix.pixelformat)))
    }

    fn request_buffers(&mut self, count: u32) -> io::Result<u32> {
        let mut req = sys::v4l2_requestbuffers {
            count,
            type_: sys::V4L2_BUF_TYPE_VIDEO_CAPTURE,
            memory: sys::V4L2_MEMORY_MMAP,
            ..Default::default()
        };
        unsafe { sys::vidioc_reqbufs(self.fd(), &mut req) }?;
        Ok(req.count)
    }

    fn query_buffer(&mut self, index: u32) -> io::Result<DriverBuffer> {
        let mut buf = v4l2_buffer::mmap(index);
        unsafe { sys::vidioc_querybuf(self.fd(), &mut buf) }?;
        Ok(DriverBuffer {
            length: buf.length,
            offset: buf.offset(),
        })
    }

    fn map_buffer(&mut self, buffer: &DriverBuffer) -> io::Result<MappedRegion> {
        MappedRegion::from_fd(self.file.as_fd(), buffer.length as usize, buffer.offset)
    }

    fn queue(&mut self, index: u32) -> io::Result<()> {
        let mut buf = v4l2_buffer::mmap(index);
        unsafe { sys::vidioc_qbuf(self.fd(), &mut buf) }?;
        Ok(())
    }

    fn dequeue(&mut self, timeout: Duration) -> io::Result<Option<Dequeued>> {
        let mut pfd = libc::pollfd {
            fd: self.fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(c_int::MAX as u128) as c_int;
        match unsafe { libc::poll(&mut pfd, 1, millis) } {
            0 => return Ok(None),
            n if n < 0 => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    return Ok(None);
                }
                return Err(err);
            }
            _ => {}
        }

        let mut buf = v4l2_buffer::mmap(0);
        match unsafe { sys::vidioc_dqbuf(self.fd(), &mut buf) } {
            Ok(_) => Ok(Some(Dequeued {
                index: buf.index as usize,
                bytes_used: buf.bytesused,
                offset: buf.offset(),
            })),
            Err(nix::errno::Errno::EAGAIN) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn stream_on(&mut self) -> io::Result<()> {
        let ty = sys::V4L2_BUF_TYPE_VIDEO_CAPTURE as c_int;
        unsafe { sys::vidioc_streamon(self.fd(), &ty) }?;
        Ok(())
    }

    fn stream_off(&mut self) -> io::Result<()> {
        let ty = sys::V4L2_BUF_TYPE_VIDEO_CAPTURE as c_int;
        unsafe { sys::vidioc_streamoff(self.fd(), &ty) }?;
        Ok(())
    }
}

type DispCommand = unsafe fn(c_int, *const disp_args) -> nix::Result<c_int>;

/// Overlay layer on the sunxi display controller (`/dev/disp`).
#[derive(Debug)]
pub struct DispOverlay {
    name: String,
    file: File,
    screen: c_ulong,
    frame_rate: u32,
}

impl DispOverlay {
    pub fn open(path: &Path, frame_rate: u32) -> Result<Self> {
        let file = open_device(path)?;
        debug!(device = %path.display(), "display opened");
        Ok(Self {
            name: path.display().to_string(),
            file,
            screen: 0,
            frame_rate,
        })
    }

    fn command(&self, cmd: DispCommand, args: disp_args) -> io::Result<c_int> {
        Ok(unsafe { cmd(self.file.as_raw_fd(), &args) }?)
    }

    fn layer_command(&self, cmd: DispCommand, layer: u32) -> io::Result<()> {
        self.command(cmd, [self.screen, c_ulong::from(layer), 0, 0])?;
        Ok(())
    }
}

impl OverlayDriver for DispOverlay {
    fn name(&self) -> &str {
        &self.name
    }

    fn lcd_on(&mut self) -> io::Result<()> {
        self.command(sys::disp_lcd_on, [self.screen, 0, 0, 0])?;
        Ok(())
    }

    fn request_layer(&mut self) -> io::Result<u32> {
        let handle = self.command(
            sys::disp_layer_request,
            [
                self.screen,
                c_ulong::from(sys::DISP_LAYER_WORK_MODE_SCALER),
                0,
                0,
            ],
        )?;
        Ok(handle as u32)
    }

    fn set_layer(&mut self, layer: u32, config: &LayerConfig) -> io::Result<()> {
        let info = sys::disp_layer_info {
            mode: sys::DISP_LAYER_WORK_MODE_SCALER,
            pipe: 0,
            alpha_en: 1,
            alpha_val: u16::from(config.alpha),
            ck_enable: 0,
            src_win: sys::disp_rect {
                x: config.src_win.x as i32,
                y: config.src_win.y as i32,
                width: config.src_win.width,
                height: config.src_win.height,
            },
            scn_win: sys::disp_rect {
                x: config.scn_win.x as i32,
                y: config.scn_win.y as i32,
                width: config.scn_win.width,
                height: config.scn_win.height,
            },
            fb: sys::disp_fb {
                // plane addresses are supplied per frame
                addr: [0; 3],
                size: sys::disp_rectsz {
                    width: config.frame_width,
                    height: config.frame_height,
                },
                format: config.format.format as u32,
                seq: config.format.seq as u32,
                mode: config.format.mode as u32,
                br_swap: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        self.command(
            sys::disp_layer_set_para,
            [
                self.screen,
                c_ulong::from(layer),
                &info as *const sys::disp_layer_info as c_ulong,
                0,
            ],
        )?;
        Ok(())
    }

    fn open_layer(&mut self, layer: u32) -> io::Result<()> {
        self.layer_command(sys::disp_layer_open, layer)
    }

    fn lower_layer(&mut self, layer: u32) -> io::Result<()> {
        self.layer_command(sys::disp_layer_bottom, layer)
    }

    fn video_start(&mut self, layer: u32) -> io::Result<()> {
        self.layer_command(sys::disp_video_start, layer)
    }

    fn video_stop(&mut self, layer: u32) -> io::Result<()> {
        self.layer_command(sys::disp_video_stop, layer)
    }

    fn set_frame(&mut self, layer: u32, planes: [u32; 3]) -> io::Result<()> {
        let fb = sys::disp_video_fb {
            id: 0,
            addr: planes,
            interlace: 0,
            top_field_first: 0,
            frame_rate: self.frame_rate,
            ..Default::default()
        };
        self.command(
            sys::disp_video_set_fb,
            [
                self.screen,
                c_ulong::from(layer),
                &fb as *const sys::disp_video_fb as c_ulong,
                0,
            ],
        )?;
        Ok(())
    }

    fn close_layer(&mut self, layer: u32) -> io::Result<()> {
        self.layer_command(sys::disp_layer_close, layer)
    }

    fn release_layer(&mut self, layer: u32) -> io::Result<()> {
        self.layer_command(sys::disp_layer_release, layer)
    }
}

/// Reads the active screen geometry of a framebuffer device.
pub fn read_screen(path: &Path) -> Result<ScreenInfo> {
    let file = open_device(path)?;
    let fd = file.as_raw_fd();
    let unavailable = |source: nix::Error| Error::DeviceUnavailable {
        device: path.display().to_string(),
        source: source.into(),
    };

    let mut var = sys::fb_var_screeninfo::default();
    unsafe { sys::fbioget_vscreeninfo(fd, &mut var) }.map_err(unavailable)?;
    let mut fix = sys::fb_fix_screeninfo::default();
    unsafe { sys::fbioget_fscreeninfo(fd, &mut fix) }.map_err(unavailable)?;

    let screen = ScreenInfo {
        width: var.xres,
        height: var.yres,
        bits_per_pixel: var.red.length + var.green.length + var.blue.length + var.transp.length,
        line_length: fix.line_length,
        size: fix.smem_len,
    };
    debug!(
        "frame buffer: {}({})x{}, {}bpp, {:#x} bytes",
        screen.width, screen.line_length, screen.height, screen.bits_per_pixel, screen.size
    );
    Ok(screen)
}

/// The A10/A20 board: TV decoder in, display controller out.
#[derive(Clone, Debug, Default)]
pub struct Sunxi {
    config: DeviceConfig,
}

impl Sunxi {
    pub fn new(config: DeviceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }
}

impl Platform for Sunxi {
    type Capture = V4l2Capture;
    type Overlay = DispOverlay;

    fn read_screen(&self) -> Result<ScreenInfo> {
        read_screen(&self.config.framebuffer)
    }

    fn open_capture(&self) -> Result<V4l2Capture> {
        V4l2Capture::open(&self.config.capture)
    }

    fn open_overlay(&self) -> Result<DispOverlay> {
        DispOverlay::open(&self.config.display, self.config.frame_rate)
    }
}
