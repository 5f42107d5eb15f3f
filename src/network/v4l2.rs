//! v4l2loopback output for Linux
//!
//! Negotiates a packed BGR24 output format and frame rate on the loopback
//! node, then streams frames through mmap output buffers.

#![cfg(target_os = "linux")]

use image::RgbaImage;
use v4l::buffer::Type;
use v4l::io::traits::OutputStream;
use v4l::prelude::*;
use v4l::video::output::Parameters;
use v4l::video::Output;
use v4l::{Format, FourCC};

use super::{rgba_to_bgr24, SinkError, VideoSink};

/// Packed 24-bit BGR
pub const BGR24: &[u8; 4] = b"BGR3";

const BUFFER_COUNT: u32 = 4;

struct OpenDevice {
    /// Keeps the node open for the stream's handle
    _device: Device,
    stream: MmapStream<'static>,
    format: Format,
}

pub struct V4l2LoopbackSink {
    device: String,
    width: u32,
    height: u32,
    fps: u32,
    open: Option<OpenDevice>,
    /// Conversion buffer reused across frames
    buffer: Vec<u8>,
}

impl V4l2LoopbackSink {
    pub fn new(device: impl Into<String>, width: u32, height: u32, fps: u32) -> Self {
        Self {
            device: device.into(),
            width,
            height,
            fps: fps.max(1),
            open: None,
            buffer: Vec::new(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Format the driver accepted, once started
    pub fn format(&self) -> Option<&Format> {
        self.open.as_ref().map(|open| &open.format)
    }

    fn configure(&self, device: &Device) -> Result<Format, SinkError> {
        let config_error = |source| SinkError::Configure {
            device: self.device.clone(),
            source,
        };

        let requested = Format::new(self.width, self.height, FourCC::new(BGR24));
        let actual = Output::set_format(device, &requested).map_err(config_error)?;
        verify_format(&self.device, &requested, &actual)?;

        let params = Output::set_params(device, &Parameters::with_fps(self.fps)).map_err(config_error)?;
        log::debug!(
            "v4l2loopback: {} negotiated {}x{} {} interval {}",
            self.device,
            actual.width,
            actual.height,
            actual.fourcc,
            params.interval
        );
        Ok(actual)
    }
}

/// Reject a driver-adjusted format; frames are written at the requested layout
fn verify_format(device: &str, requested: &Format, actual: &Format) -> Result<(), SinkError> {
    if actual.width == requested.width
        && actual.height == requested.height
        && actual.fourcc == requested.fourcc
    {
        return Ok(());
    }
    Err(SinkError::FormatRejected {
        device: device.to_string(),
        requested: format!("{}x{} {}", requested.width, requested.height, requested.fourcc),
        actual: format!("{}x{} {}", actual.width, actual.height, actual.fourcc),
    })
}

impl VideoSink for V4l2LoopbackSink {
    fn start(&mut self) -> Result<(), SinkError> {
        if self.open.is_some() {
            return Ok(());
        }
        let device = Device::with_path(&self.device).map_err(|source| SinkError::Open {
            device: self.device.clone(),
            source,
        })?;
        let format = self.configure(&device)?;
        let stream = MmapStream::with_buffers(&device, Type::VideoOutput, BUFFER_COUNT).map_err(
            |source| SinkError::Configure {
                device: self.device.clone(),
                source,
            },
        )?;

        log::info!(
            "v4l2loopback: opened {} ({}x{} {} @ {} fps)",
            self.device,
            format.width,
            format.height,
            format.fourcc,
            self.fps
        );
        self.open = Some(OpenDevice {
            _device: device,
            stream,
            format,
        });
        Ok(())
    }

    fn send(&mut self, frame: &RgbaImage) -> Result<(), SinkError> {
        let Some(open) = self.open.as_mut() else {
            return Err(SinkError::NotStarted);
        };
        if frame.dimensions() != (open.format.width, open.format.height) {
            return Err(SinkError::FrameSize {
                expected: (open.format.width, open.format.height),
                actual: frame.dimensions(),
            });
        }
        rgba_to_bgr24(frame, &mut self.buffer);

        // The buffer handed out here is queued on the following call
        let (out, meta) = OutputStream::next(&mut open.stream)?;
        let len = self.buffer.len().min(out.len());
        out[..len].copy_from_slice(&self.buffer[..len]);
        meta.bytesused = len as u32;
        meta.field = 0;
        Ok(())
    }

    fn stop(&mut self) {
        if self.open.take().is_some() {
            log::info!("v4l2loopback: closed {}", self.device);
        }
    }

    fn is_active(&self) -> bool {
        self.open.is_some()
    }

    fn technology_name(&self) -> &'static str {
        "v4l2loopback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_fails_to_open() {
        let mut sink = V4l2LoopbackSink::new("/nonexistent/video99", 64, 48, 30);
        assert!(matches!(sink.start(), Err(SinkError::Open { .. })));
        assert!(!sink.is_active());
    }

    #[test]
    fn test_regular_file_is_not_a_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, b"").unwrap();

        let mut sink = V4l2LoopbackSink::new(path.to_string_lossy(), 64, 48, 30);
        assert!(matches!(sink.start(), Err(SinkError::Configure { .. })));
        assert!(!sink.is_active());
        assert!(sink.format().is_none());
        assert!(matches!(
            sink.send(&RgbaImage::new(64, 48)),
            Err(SinkError::NotStarted)
        ));
        assert!(std::fs::read(&path).unwrap().is_empty());
    }

    #[test]
    fn test_adjusted_format_is_rejected() {
        let requested = Format::new(1280, 720, FourCC::new(BGR24));

        let same = Format::new(1280, 720, FourCC::new(BGR24));
        assert!(verify_format("/dev/video10", &requested, &same).is_ok());

        let smaller = Format::new(640, 480, FourCC::new(BGR24));
        let err = verify_format("/dev/video10", &requested, &smaller).unwrap_err();
        assert!(matches!(err, SinkError::FormatRejected { .. }));
        assert!(err.to_string().contains("640x480"));

        let yuyv = Format::new(1280, 720, FourCC::new(b"YUYV"));
        assert!(matches!(
            verify_format("/dev/video10", &requested, &yuyv),
            Err(SinkError::FormatRejected { .. })
        ));
    }
}
