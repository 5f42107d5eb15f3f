//! Laser beams
//!
//! Red-dominant beams grow outward from points near the frame centre. All
//! beams share one opacity, so crossings do not double up.

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::draw::{self, Color, Overlay};

pub const BEAM_COUNT: usize = 5;
const BEAM_WIDTH: f32 = 3.0;
const MAX_ALPHA: f32 = 0.6;

#[derive(Clone, Debug)]
struct Beam {
    x: f32,
    y: f32,
    angle: f32,
    /// Fraction of the frame diagonal at full extension
    length: f32,
    color: Color,
}

impl Beam {
    fn random(rng: &mut StdRng) -> Self {
        Self {
            x: rng.random_range(0.3..0.7),
            y: rng.random_range(0.4..0.6),
            angle: rng.random_range(0.0..360.0),
            length: rng.random_range(0.3..0.6),
            color: [255, rng.random_range(0..=255), rng.random_range(0..=255)],
        }
    }

    /// Pixel endpoints at `progress` in a `width` x `height` frame
    fn endpoints(&self, progress: f32, width: u32, height: u32) -> ((f32, f32), (f32, f32)) {
        let (w, h) = (width as f32, height as f32);
        let diagonal = (w * w + h * h).sqrt();
        let start = ((self.x * w).trunc(), (self.y * h).trunc());
        let reach = self.length * diagonal * progress;
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let end = ((start.0 + reach * cos).trunc(), (start.1 + reach * sin).trunc());
        (start, end)
    }
}

/// Constant 0.6 for the first half, then linear fade to zero
pub fn opacity(progress: f32) -> f32 {
    if progress < 0.5 {
        MAX_ALPHA
    } else {
        (MAX_ALPHA * (1.0 - (progress - 0.5) / 0.5)).max(0.0)
    }
}

#[derive(Clone, Debug)]
pub struct LasersEffect {
    beams: Vec<Beam>,
}

impl LasersEffect {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let beams = (0..BEAM_COUNT).map(|_| Beam::random(&mut rng)).collect();
        Self { beams }
    }

    pub fn beam_count(&self) -> usize {
        self.beams.len()
    }

    pub fn cleanup(&mut self) {
        self.beams.clear();
    }

    pub fn render(&self, frame: &mut RgbaImage, progress: f32) {
        let alpha = opacity(progress);
        if alpha <= 0.0 || self.beams.is_empty() {
            return;
        }

        let (width, height) = frame.dimensions();
        let mut overlay = Overlay::new(width, height);
        for beam in &self.beams {
            let (start, end) = beam.endpoints(progress, width, height);
            draw::thick_line(&mut overlay, start, end, BEAM_WIDTH, beam.color);
        }
        overlay.composite(frame, alpha);
    }
}
