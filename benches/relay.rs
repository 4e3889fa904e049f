use criterion::{criterion_group, criterion_main, Criterion};
use edgefirst_relay::{
    buffer::MappedRegion,
    capture::{CaptureDriver, CaptureParams, CaptureSession, Dequeued, DriverBuffer},
    control::Command,
    controller::ChannelConfig,
    display::{LayerConfig, OverlayDriver, OverlaySession},
    format::{self, FourCC, PixelLayout},
    geometry::{clamp, Rect, ScreenInfo},
};
use std::{collections::VecDeque, hint::black_box, io, time::Duration};

/// Driver whose buffers are always ready.
struct NullCapture {
    format: FourCC,
    queued: VecDeque<u32>,
}

impl CaptureDriver for NullCapture {
    fn name(&self) -> &str {
        "null"
    }

    fn can_stream(&mut self) -> io::Result<bool> {
        Ok(true)
    }

    fn select_input(&mut self, _: u32, _: &CaptureParams) -> io::Result<()> {
        Ok(())
    }

    fn format(&mut self) -> io::Result<(u32, u32, FourCC)> {
        Ok((720, 576, self.format))
    }

    fn request_buffers(&mut self, count: u32) -> io::Result<u32> {
        Ok(count)
    }

    fn query_buffer(&mut self, index: u32) -> io::Result<DriverBuffer> {
        Ok(DriverBuffer {
            length: 4096,
            offset: index * 4096,
        })
    }

    fn map_buffer(&mut self, buffer: &DriverBuffer) -> io::Result<MappedRegion> {
        MappedRegion::anonymous(buffer.length as usize)
    }

    fn queue(&mut self, index: u32) -> io::Result<()> {
        self.queued.push_back(index);
        Ok(())
    }

    fn dequeue(&mut self, _: Duration) -> io::Result<Option<Dequeued>> {
        Ok(self.queued.pop_front().map(|index| Dequeued {
            index: index as usize,
            bytes_used: 4096,
            offset: index * 4096,
        }))
    }

    fn stream_on(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn stream_off(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct NullOverlay;

impl OverlayDriver for NullOverlay {
    fn name(&self) -> &str {
        "null"
    }

    fn lcd_on(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn request_layer(&mut self) -> io::Result<u32> {
        Ok(1)
    }

    fn set_layer(&mut self, _: u32, _: &LayerConfig) -> io::Result<()> {
        Ok(())
    }

    fn open_layer(&mut self, _: u32) -> io::Result<()> {
        Ok(())
    }

    fn lower_layer(&mut self, _: u32) -> io::Result<()> {
        Ok(())
    }

    fn video_start(&mut self, _: u32) -> io::Result<()> {
        Ok(())
    }

    fn video_stop(&mut self, _: u32) -> io::Result<()> {
        Ok(())
    }

    fn set_frame(&mut self, _: u32, planes: [u32; 3]) -> io::Result<()> {
        black_box(planes);
        Ok(())
    }

    fn close_layer(&mut self, _: u32) -> io::Result<()> {
        Ok(())
    }

    fn release_layer(&mut self, _: u32) -> io::Result<()> {
        Ok(())
    }
}

pub fn benchmark_cycle(c: &mut Criterion) {
    let fmts = [format::NV12, format::YUV420, format::YUYV];
    let mut group = c.benchmark_group("cycle");

    for fmt in fmts {
        let driver = NullCapture {
            format: fmt,
            queued: VecDeque::new(),
        };
        let mut capture = CaptureSession::open(driver, 0, &CaptureParams::default()).unwrap();
        let layout = *capture.layout();
        let mut overlay = OverlaySession::open(
            NullOverlay,
            ScreenInfo::new(1280, 720, 32),
            layout,
            Rect::sized(720, 576),
            Rect::sized(1280, 720),
        )
        .unwrap();
        capture.start_streaming().unwrap();
        overlay.start().unwrap();

        group.bench_function(fmt.to_string(), |b| {
            b.iter(|| {
                let frame = capture.dequeue(Duration::ZERO).unwrap().unwrap();
                overlay.present(frame.offset).unwrap();
                capture.requeue(frame.index).unwrap();
            })
        });
    }
}

pub fn benchmark_control(c: &mut Criterion) {
    let start = Command::Start(ChannelConfig {
        channel: 1,
        show: Rect::new(0, 0, 640, 360),
        crop: Rect::new(8, 8, 704, 560),
    })
    .encode();

    c.bench_function("decode/start", |b| {
        b.iter(|| Command::decode(black_box(&start)))
    });
    c.bench_function("clamp", |b| {
        b.iter(|| clamp(black_box(Rect::new(600, 500, 400, 400)), Rect::sized(720, 576)))
    });
    c.bench_function("layout", |b| {
        b.iter(|| PixelLayout::new(black_box(720), black_box(576), format::NV16))
    });
}

criterion_group!(benches, benchmark_cycle, benchmark_control);
criterion_main!(benches);
