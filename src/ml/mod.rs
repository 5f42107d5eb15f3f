//! Hand landmark detection
//!
//! Defines the landmark types consumed by the gesture classifier and the
//! `HandLandmarker` boundary. The bundled provider runs a MediaPipe-compatible
//! hand landmark model through ONNX Runtime.

mod onnx;

pub use onnx::OnnxHandLandmarker;

use image::RgbaImage;

/// Landmark indices (21-point hand model convention)
#[allow(dead_code)]
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;

    /// Number of landmarks per hand
    pub const COUNT: usize = 21;
}

/// Skeleton edges between landmarks, used for the debug overlay
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (17, 18), (18, 19), (19, 20),
    (0, 17),
];

/// Hand landmark (normalized image coordinates, y grows downward)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl HandLandmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Planar distance to another landmark
    pub fn distance_2d(&self, other: &HandLandmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Detected hand
#[derive(Clone, Debug)]
pub struct Hand {
    /// 21 landmarks
    pub landmarks: [HandLandmark; landmarks::COUNT],
    /// Presence score reported by the model
    pub confidence: f32,
    /// Is right hand
    pub is_right: bool,
}

impl Default for Hand {
    fn default() -> Self {
        Self {
            landmarks: [HandLandmark::default(); landmarks::COUNT],
            confidence: 0.0,
            is_right: false,
        }
    }
}

impl Hand {
    /// Landmark by index
    pub fn point(&self, index: usize) -> &HandLandmark {
        &self.landmarks[index]
    }

    /// Mean x of all landmarks, used to order hands left to right
    pub fn center_x(&self) -> f32 {
        self.landmarks.iter().map(|l| l.x).sum::<f32>() / landmarks::COUNT as f32
    }
}

/// Hand landmark inference errors
#[derive(Debug, thiserror::Error)]
pub enum MlError {
    #[error("models directory not found; create a 'models' directory containing {0}")]
    ModelDirNotFound(&'static str),
    #[error("model not found: {0}")]
    ModelNotFound(std::path::PathBuf),
    #[error("failed to initialize ONNX Runtime: {0}")]
    Runtime(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    Output(String),
}

/// Source of hand landmarks for a frame
///
/// Detection thresholds are fixed when the provider is constructed.
pub trait HandLandmarker {
    /// Detect zero or more hands in an RGBA frame
    fn detect(&mut self, frame: &RgbaImage) -> Result<Vec<Hand>, MlError>;

    /// Release model resources
    fn close(&mut self) {}
}

/// Landmarker that never reports a hand
///
/// Used when no model is available so the rest of the pipeline keeps running.
#[derive(Debug, Default)]
pub struct NoHands;

impl HandLandmarker for NoHands {
    fn detect(&mut self, _frame: &RgbaImage) -> Result<Vec<Hand>, MlError> {
        Ok(Vec::new())
    }
}
