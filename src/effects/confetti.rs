//! Confetti burst
//!
//! Coloured pieces thrown upward from the middle of the frame, falling back
//! under gravity while they spin.

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::draw::{self, Blend, Color};
use super::fade_out_tail;

pub const PARTICLE_COUNT: usize = 100;
/// Downward acceleration in frame heights per second squared
pub const GRAVITY: f32 = 0.5;
/// Seconds the physics is evaluated over for progress 0..1
pub const NOMINAL_DURATION: f32 = 3.0;

const COLORS: [Color; 6] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [255, 255, 0],
    [255, 0, 255],
    [0, 255, 255],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Rect,
    Circle,
    Star,
}

const SHAPES: [Shape; 3] = [Shape::Rect, Shape::Circle, Shape::Star];

#[derive(Clone, Debug)]
struct Piece {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    rotation: f32,
    rotation_speed: f32,
    color: Color,
    size: u32,
    shape: Shape,
}

impl Piece {
    fn random(rng: &mut StdRng) -> Self {
        Self {
            x: rng.random_range(0.2..0.8),
            y: rng.random_range(0.3..0.5),
            vx: rng.random_range(-0.5..0.5),
            vy: rng.random_range(-1.0..-0.3),
            rotation: rng.random_range(0.0..360.0),
            rotation_speed: rng.random_range(-10.0..10.0),
            color: COLORS[rng.random_range(0..COLORS.len())],
            size: rng.random_range(5..=15),
            shape: SHAPES[rng.random_range(0..SHAPES.len())],
        }
    }

    /// Normalized position `t` seconds after launch
    fn position(&self, t: f32) -> (f32, f32) {
        let x = self.x + self.vx * t;
        let y = self.y + self.vy * t + 0.5 * GRAVITY * t * t;
        (x, y)
    }
}

#[derive(Clone, Debug)]
pub struct ConfettiEffect {
    pieces: Vec<Piece>,
}

impl ConfettiEffect {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let pieces = (0..PARTICLE_COUNT).map(|_| Piece::random(&mut rng)).collect();
        Self { pieces }
    }

    pub fn particle_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn cleanup(&mut self) {
        self.pieces.clear();
    }

    pub fn render(&self, frame: &mut RgbaImage, progress: f32) {
        let alpha = fade_out_tail(progress);
        if alpha <= 0.0 {
            return;
        }

        let (width, height) = frame.dimensions();
        let t = progress * NOMINAL_DURATION;
        let mut canvas = Blend::new(frame, alpha);

        for piece in &self.pieces {
            let (x, y) = piece.position(t);
            let px = (x * width as f32) as i64;
            let py = (y * height as f32) as i64;
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                continue;
            }

            let (cx, cy) = (px as f32, py as f32);
            let rotation = piece.rotation + piece.rotation_speed * progress * 360.0;
            let size = piece.size as f32;

            match piece.shape {
                Shape::Rect => {
                    let h = (piece.size / 2) as f32;
                    let corners = draw::rotated_rect(cx, cy, size, h, rotation);
                    draw::fill_polygon(&mut canvas, &corners, piece.color);
                }
                Shape::Circle => {
                    draw::fill_circle(&mut canvas, cx, cy, (piece.size / 2) as f32, piece.color);
                }
                Shape::Star => {
                    let points = draw::star_points(cx, cy, size, size / 2.0, rotation);
                    draw::fill_polygon(&mut canvas, &points, piece.color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::grey_frame;

    #[test]
    fn test_sampling_ranges() {
        let effect = ConfettiEffect::new(11);
        assert_eq!(effect.particle_count(), PARTICLE_COUNT);
        for p in &effect.pieces {
            assert!((0.2..0.8).contains(&p.x));
            assert!((0.3..0.5).contains(&p.y));
            assert!((-0.5..0.5).contains(&p.vx));
            assert!((-1.0..-0.3).contains(&p.vy));
            assert!((5..=15).contains(&p.size));
            assert!(COLORS.contains(&p.color));
        }
    }

    #[test]
    fn test_pieces_rise_then_fall() {
        let effect = ConfettiEffect::new(5);
        let piece = &effect.pieces[0];
        let (_, y0) = piece.position(0.0);
        let (_, y_early) = piece.position(0.2);
        assert!(y_early < y0, "piece should move up first");

        // Apex at t = -vy / g; after twice that it is back below the start
        let apex = -piece.vy / GRAVITY;
        let (_, y_late) = piece.position(apex * 2.0 + 0.1);
        assert!(y_late > y0);
    }

    #[test]
    fn test_visible_at_start() {
        let effect = ConfettiEffect::new(9);
        let mut frame = grey_frame();
        effect.render(&mut frame, 0.0);
        assert_ne!(frame, grey_frame());
    }

    #[test]
    fn test_fully_faded_at_end() {
        let effect = ConfettiEffect::new(9);
        let mut frame = grey_frame();
        effect.render(&mut frame, 1.0);
        assert_eq!(frame, grey_frame());
    }

    #[test]
    fn test_cleanup_renders_nothing() {
        let mut effect = ConfettiEffect::new(9);
        effect.cleanup();
        let mut frame = grey_frame();
        effect.render(&mut frame, 0.3);
        assert_eq!(frame, grey_frame());
    }
}
