//! ONNX Runtime hand landmark provider
//!
//! Runs a MediaPipe-compatible `hand_landmark.onnx` (224x224 NHWC RGB input,
//! 63 landmark values + presence + handedness outputs) from the PINTO Model Zoo.
//! The model expects a hand-sized crop, so the frame is evaluated whole and
//! split into left/right halves to pick up two hands.

use std::path::PathBuf;

use image::RgbaImage;
use ndarray::Array4;

use super::{landmarks, Hand, HandLandmark, HandLandmarker, MlError};

const MODEL_FILE: &str = "hand_landmark.onnx";
const INPUT_SIZE: u32 = 224;

/// Normalized horizontal crop of the frame fed to the model
#[derive(Clone, Copy, Debug)]
struct Region {
    x: f32,
    width: f32,
}

const FULL_FRAME: Region = Region { x: 0.0, width: 1.0 };
const LEFT_HALF: Region = Region { x: 0.0, width: 0.5 };
const RIGHT_HALF: Region = Region { x: 0.5, width: 0.5 };

/// Hand landmarker backed by ONNX Runtime
pub struct OnnxHandLandmarker {
    session: Option<ort::session::Session>,
    /// Minimum presence score for a hand to be reported
    min_detection_confidence: f32,
}

impl OnnxHandLandmarker {
    /// Load the landmark model from the models directory
    pub fn new(min_detection_confidence: f32) -> Result<Self, MlError> {
        let model_dir = Self::find_model_dir()?;
        log::info!("Model directory: {:?}", model_dir);

        let model_path = model_dir.join(MODEL_FILE);
        if !model_path.exists() {
            return Err(MlError::ModelNotFound(model_path));
        }

        let session = ort::session::Session::builder()
            .map_err(|e| MlError::Runtime(format!("failed to create session builder: {}", e)))?
            .with_intra_threads(2)
            .map_err(|e| MlError::Runtime(format!("failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| MlError::Runtime(format!("failed to load hand model: {}", e)))?;

        log::info!(
            "Loaded hand landmark model from {:?} (min_detection_confidence={})",
            model_path,
            min_detection_confidence
        );

        Ok(Self {
            session: Some(session),
            min_detection_confidence,
        })
    }

    /// Find the models directory
    fn find_model_dir() -> Result<PathBuf, MlError> {
        // Relative to the executable, then up to three parents (cargo target dirs)
        if let Ok(exe_path) = std::env::current_exe() {
            let mut dir = exe_path.parent().map(|p| p.to_path_buf());
            for _ in 0..4 {
                let Some(current) = dir else { break };
                let model_dir = current.join("models");
                if model_dir.exists() {
                    return Ok(model_dir);
                }
                dir = current.parent().map(|p| p.to_path_buf());
            }
        }

        if let Ok(cwd) = std::env::current_dir() {
            let model_dir = cwd.join("models");
            if model_dir.exists() {
                return Ok(model_dir);
            }
        }

        let crate_models = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models");
        if crate_models.exists() {
            return Ok(crate_models);
        }

        Err(MlError::ModelDirNotFound(MODEL_FILE))
    }

    /// Resize a horizontal crop of the frame to the model input, HWC float [0, 1]
    fn preprocess_region_nhwc(frame: &RgbaImage, region: Region) -> Vec<f32> {
        let size = INPUT_SIZE;
        let mut output = vec![0.0f32; (size * size * 3) as usize];

        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return output;
        }

        let src_x0 = region.x * width as f32;
        let x_ratio = region.width * width as f32 / size as f32;
        let y_ratio = height as f32 / size as f32;
        let data = frame.as_raw();

        for y in 0..size {
            for x in 0..size {
                let src_x = ((src_x0 + x as f32 * x_ratio) as u32).min(width - 1);
                let src_y = ((y as f32 * y_ratio) as u32).min(height - 1);
                let src_idx = ((src_y * width + src_x) * 4) as usize;

                let out_idx = ((y * size + x) * 3) as usize;
                output[out_idx] = data[src_idx] as f32 / 255.0;
                output[out_idx + 1] = data[src_idx + 1] as f32 / 255.0;
                output[out_idx + 2] = data[src_idx + 2] as f32 / 255.0;
            }
        }

        output
    }

    /// Run the model on one region; returns a hand above the threshold, if any
    fn run_region(&mut self, frame: &RgbaImage, region: Region) -> Result<Option<Hand>, MlError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };

        let input = Self::preprocess_region_nhwc(frame, region);
        let input_array =
            Array4::from_shape_vec((1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3), input)
                .map_err(|e| MlError::Inference(format!("failed to create input array: {}", e)))?;

        let input_tensor = ort::value::Tensor::from_array(input_array)
            .map_err(|e| MlError::Inference(format!("failed to create tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| MlError::Inference(e.to_string()))?;

        let mut tensors: Vec<Vec<f32>> = Vec::new();
        for (_name, value) in outputs.iter() {
            let (_shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| MlError::Output(format!("failed to extract output: {}", e)))?;
            tensors.push(data.to_vec());
        }

        let hand = decode_outputs(&tensors, region)?;
        Ok(hand.filter(|h| h.confidence >= self.min_detection_confidence))
    }
}

/// Turn raw model outputs into a hand in full-frame coordinates
fn decode_outputs(tensors: &[Vec<f32>], region: Region) -> Result<Option<Hand>, MlError> {
    let coords = tensors
        .iter()
        .find(|t| t.len() == landmarks::COUNT * 3)
        .ok_or_else(|| MlError::Output("no 63-value landmark tensor".to_string()))?;

    let mut scalars = tensors.iter().filter(|t| t.len() == 1).map(|t| t[0]);
    let presence = scalars.next().map(probability).unwrap_or(0.0);
    let handedness = scalars.next().map(probability).unwrap_or(0.0);

    let mut hand = Hand {
        confidence: presence,
        is_right: handedness > 0.5,
        ..Hand::default()
    };

    let size = INPUT_SIZE as f32;
    for (i, lm) in hand.landmarks.iter_mut().enumerate() {
        let x = coords[i * 3] / size;
        let y = coords[i * 3 + 1] / size;
        let z = coords[i * 3 + 2] / size;
        *lm = HandLandmark {
            x: region.x + x * region.width,
            y,
            z,
        };
    }

    Ok(Some(hand))
}

/// Map a score to [0, 1], treating out-of-range values as logits
fn probability(value: f32) -> f32 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        1.0 / (1.0 + (-value).exp())
    }
}

impl HandLandmarker for OnnxHandLandmarker {
    fn detect(&mut self, frame: &RgbaImage) -> Result<Vec<Hand>, MlError> {
        let left = self.run_region(frame, LEFT_HALF)?;
        let right = self.run_region(frame, RIGHT_HALF)?;

        if let (Some(left), Some(right)) = (left, right) {
            let mut hands = vec![left, right];
            hands.sort_by(|a, b| a.center_x().total_cmp(&b.center_x()));
            return Ok(hands);
        }

        Ok(self.run_region(frame, FULL_FRAME)?.into_iter().collect())
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            log::info!("Hand landmark model released");
        }
    }
}

impl Drop for OnnxHandLandmarker {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmark_tensor(x_px: f32, y_px: f32) -> Vec<f32> {
        (0..landmarks::COUNT).flat_map(|_| [x_px, y_px, 0.0]).collect()
    }

    #[test]
    fn test_probability_passthrough_and_sigmoid() {
        assert_eq!(probability(0.75), 0.75);
        assert!((probability(0.0) - 0.0).abs() < f32::EPSILON);
        assert!(probability(5.0) > 0.99);
        assert!(probability(-5.0) < 0.01);
    }

    #[test]
    fn test_decode_maps_region_to_frame() {
        let tensors = vec![landmark_tensor(112.0, 56.0), vec![0.9], vec![0.8]];
        let hand = decode_outputs(&tensors, RIGHT_HALF).unwrap().unwrap();

        // Center of the right half
        assert!((hand.landmarks[0].x - 0.75).abs() < 1e-5);
        assert!((hand.landmarks[0].y - 0.25).abs() < 1e-5);
        assert!((hand.confidence - 0.9).abs() < 1e-6);
        assert!(hand.is_right);
    }

    #[test]
    fn test_decode_requires_landmarks() {
        let tensors = vec![vec![0.9]];
        assert!(matches!(
            decode_outputs(&tensors, FULL_FRAME),
            Err(MlError::Output(_))
        ));
    }

    #[test]
    fn test_preprocess_size_and_range() {
        let frame = RgbaImage::from_pixel(64, 48, image::Rgba([255, 0, 128, 255]));
        let input = OnnxHandLandmarker::preprocess_region_nhwc(&frame, LEFT_HALF);
        assert_eq!(input.len(), (INPUT_SIZE * INPUT_SIZE * 3) as usize);
        assert!((input[0] - 1.0).abs() < 1e-6);
        assert_eq!(input[1], 0.0);
        assert!((input[2] - 128.0 / 255.0).abs() < 1e-6);
    }
}
