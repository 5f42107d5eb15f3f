//! Camera capture module
//!
//! Synchronous webcam capture using the nokhwa crate. Frames are read on the
//! calling thread; a read blocks until the device delivers the next frame.

use std::time::Instant;

use image::RgbaImage;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;

/// Capture errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },
    #[error("failed to start camera stream: {0}")]
    Stream(String),
    #[error("camera is not open")]
    Closed,
    #[error("failed to read frame: {0}")]
    Read(String),
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

/// Camera frame data
#[derive(Clone)]
pub struct CameraFrame {
    pub image: RgbaImage,
    /// Frame number
    pub frame_number: u64,
    /// Frame timestamp
    pub timestamp: Instant,
}

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    /// Camera index
    pub index: u32,
    /// Camera name
    pub name: String,
}

/// Camera capture interface
pub struct CameraCapture {
    camera: Option<Camera>,
    index: u32,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl CameraCapture {
    /// List available cameras
    pub fn list_cameras() -> Vec<CameraInfo> {
        match nokhwa::query(ApiBackend::Auto) {
            Ok(camera_list) => camera_list
                .iter()
                .enumerate()
                .map(|(idx, info)| CameraInfo {
                    index: idx as u32,
                    name: info.human_name().to_string(),
                })
                .collect(),
            Err(e) => {
                log::warn!("Failed to enumerate cameras: {:?}", e);
                Vec::new()
            }
        }
    }

    /// Open a camera and start streaming
    ///
    /// Asks for the format closest to `width` x `height` @ `fps`, then falls
    /// back to the highest resolution and finally to whatever the device offers.
    pub fn open(index: u32, width: u32, height: u32, fps: u32) -> Result<Self, CaptureError> {
        let camera_index = CameraIndex::Index(index);

        let closest = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(
            CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, fps),
        ));

        let mut camera = match Camera::new(camera_index.clone(), closest) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Failed to open camera with closest format: {:?}", e);

                let highest = RequestedFormat::new::<RgbAFormat>(
                    RequestedFormatType::HighestResolution(Resolution::new(width, height)),
                );

                match Camera::new(camera_index.clone(), highest) {
                    Ok(c) => c,
                    Err(e2) => {
                        log::warn!("Failed with HighestResolution: {:?}", e2);

                        let any = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::None);
                        Camera::new(camera_index, any).map_err(|e3| CaptureError::Open {
                            index,
                            reason: e3.to_string(),
                        })?
                    }
                }
            }
        };

        camera
            .open_stream()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        let resolution = camera.resolution();
        log::info!(
            "Camera opened: {} ({}x{} @ {} fps)",
            camera.info().human_name(),
            resolution.width(),
            resolution.height(),
            camera.frame_rate()
        );

        Ok(Self {
            camera: Some(camera),
            index,
            width: resolution.width(),
            height: resolution.height(),
            frame_count: 0,
        })
    }

    /// Block until the next frame arrives and decode it to RGBA
    pub fn read_frame(&mut self) -> Result<CameraFrame, CaptureError> {
        let camera = self.camera.as_mut().ok_or(CaptureError::Closed)?;

        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::Read(e.to_string()))?;
        let resolution = buffer.resolution();
        let decoded = buffer
            .decode_image::<RgbAFormat>()
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        let image = RgbaImage::from_raw(resolution.width(), resolution.height(), decoded.into_raw())
            .ok_or_else(|| CaptureError::Decode("frame size does not match resolution".to_string()))?;

        let frame_number = self.frame_count;
        self.frame_count += 1;

        Ok(CameraFrame {
            image,
            frame_number,
            timestamp: Instant::now(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.camera.is_some()
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Negotiated camera resolution
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Stop capturing
    pub fn stop(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("Failed to stop camera stream: {:?}", e);
            }
            log::info!("Camera {} closed after {} frames", self.index, self.frame_count);
        }
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
