//! Virtual camera output
//!
//! Composited frames are handed to a `VideoSink`. `VirtualCamera` wraps a
//! sink with the configured output size and frame rate:
//! - v4l2loopback device node (Linux)
//! - in-memory capture (tests, headless runs)

#[cfg(target_os = "linux")]
pub mod v4l2;

#[cfg(target_os = "linux")]
pub use v4l2::V4l2LoopbackSink;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::config::Settings;

/// Virtual camera errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("virtual camera output is not supported on this platform")]
    Unsupported,
    #[error("no virtual camera device configured")]
    NoDevice,
    #[error("failed to open {device}: {source}")]
    Open {
        device: String,
        source: std::io::Error,
    },
    #[error("failed to configure {device}: {source}")]
    Configure {
        device: String,
        source: std::io::Error,
    },
    #[error("{device} negotiated {actual}, expected {requested}")]
    FormatRejected {
        device: String,
        requested: String,
        actual: String,
    },
    #[error("frame is {actual:?}, output expects {expected:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("virtual camera not started")]
    NotStarted,
    #[error("frame write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Destination for composited frames
pub trait VideoSink: Send {
    /// Open the output; calling again while active is a no-op
    fn start(&mut self) -> Result<(), SinkError>;

    /// Publish one frame. Frames already match the configured size.
    fn send(&mut self, frame: &RgbaImage) -> Result<(), SinkError>;

    /// Close the output and release resources
    fn stop(&mut self);

    fn is_active(&self) -> bool;

    /// Short name for UI display
    fn technology_name(&self) -> &'static str;
}

impl<S: VideoSink + ?Sized> VideoSink for Box<S> {
    fn start(&mut self) -> Result<(), SinkError> {
        (**self).start()
    }

    fn send(&mut self, frame: &RgbaImage) -> Result<(), SinkError> {
        (**self).send(frame)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn technology_name(&self) -> &'static str {
        (**self).technology_name()
    }
}

/// Pack an RGBA frame into BGR24, reusing `out`
pub fn rgba_to_bgr24(frame: &RgbaImage, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(frame.as_raw().len() / 4 * 3);
    for px in frame.as_raw().chunks_exact(4) {
        out.extend_from_slice(&[px[2], px[1], px[0]]);
    }
}

/// Fixed-format virtual camera
pub struct VirtualCamera<S: VideoSink> {
    sink: S,
    name: String,
    width: u32,
    height: u32,
    fps: u32,
    frames_sent: u64,
}

impl<S: VideoSink> VirtualCamera<S> {
    pub fn new(sink: S, name: impl Into<String>, width: u32, height: u32, fps: u32) -> Self {
        Self {
            sink,
            name: name.into(),
            width: width.max(1),
            height: height.max(1),
            fps: fps.max(1),
            frames_sent: 0,
        }
    }

    /// Start the underlying sink
    pub fn start(&mut self) -> Result<(), SinkError> {
        self.sink.start()?;
        log::info!(
            "Virtual camera '{}' started via {} ({}x{} @ {} fps)",
            self.name,
            self.sink.technology_name(),
            self.width,
            self.height,
            self.fps
        );
        Ok(())
    }

    /// Send a frame, resizing it to the configured size if needed
    ///
    /// Failures are logged and reported as `false`; the next call tries again.
    pub fn send_frame(&mut self, frame: &RgbaImage) -> bool {
        let result = if frame.dimensions() == (self.width, self.height) {
            self.sink.send(frame)
        } else {
            let resized = imageops::resize(frame, self.width, self.height, FilterType::Triangle);
            self.sink.send(&resized)
        };

        match result {
            Ok(()) => {
                self.frames_sent += 1;
                true
            }
            Err(e) => {
                log::warn!("Virtual camera send failed: {}", e);
                false
            }
        }
    }

    pub fn stop(&mut self) {
        if self.sink.is_active() {
            self.sink.stop();
            log::info!("Virtual camera '{}' stopped after {} frames", self.name, self.frames_sent);
        }
    }

    pub fn is_active(&self) -> bool {
        self.sink.is_active()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn technology_name(&self) -> &'static str {
        self.sink.technology_name()
    }
}

impl<S: VideoSink> Drop for VirtualCamera<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build the sink for this platform from settings
#[cfg(target_os = "linux")]
pub fn platform_sink(settings: &Settings) -> Result<Box<dyn VideoSink>, SinkError> {
    let device = settings
        .virtual_camera_device
        .as_deref()
        .ok_or(SinkError::NoDevice)?;
    Ok(Box::new(V4l2LoopbackSink::new(
        device,
        settings.camera_width,
        settings.camera_height,
        settings.camera_fps,
    )))
}

#[cfg(not(target_os = "linux"))]
pub fn platform_sink(_settings: &Settings) -> Result<Box<dyn VideoSink>, SinkError> {
    Err(SinkError::Unsupported)
}

/// Keeps sent frames in memory
#[derive(Default)]
pub struct MemorySink {
    active: bool,
    frames: Vec<RgbaImage>,
    /// Keep at most this many frames (oldest dropped first); 0 keeps all
    capacity: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&RgbaImage> {
        self.frames.last()
    }
}

impl VideoSink for MemorySink {
    fn start(&mut self) -> Result<(), SinkError> {
        self.active = true;
        Ok(())
    }

    fn send(&mut self, frame: &RgbaImage) -> Result<(), SinkError> {
        if !self.active {
            return Err(SinkError::NotStarted);
        }
        if self.capacity > 0 && self.frames.len() == self.capacity {
            self.frames.remove(0);
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn technology_name(&self) -> &'static str {
        "Memory"
    }
}
