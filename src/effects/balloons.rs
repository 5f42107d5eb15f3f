//! Rising balloons
//!
//! Opaque balloons on short strings float up from the bottom of the frame and
//! disappear once they pass the top.

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::draw::{self, Blend, Color};

pub const PARTICLE_COUNT: usize = 10;
const STRING_COLOR: Color = [150, 150, 150];
const STRING_LENGTH: f32 = 20.0;
const STRING_WIDTH: f32 = 2.0;

#[derive(Clone, Debug)]
struct Balloon {
    x: f32,
    y: f32,
    size: u32,
    speed: f32,
    color: Color,
}

impl Balloon {
    fn random(rng: &mut StdRng) -> Self {
        Self {
            x: rng.random_range(0.1..0.9),
            y: rng.random_range(0.7..1.0),
            size: rng.random_range(30..=60),
            speed: rng.random_range(0.2..0.5),
            color: [
                rng.random_range(100..=255),
                rng.random_range(100..=255),
                rng.random_range(100..=255),
            ],
        }
    }

    /// Normalized vertical position, `None` once above the frame
    fn height_at(&self, progress: f32) -> Option<f32> {
        let y = self.y - self.speed * progress;
        (y >= 0.0).then_some(y)
    }
}

#[derive(Clone, Debug)]
pub struct BalloonsEffect {
    balloons: Vec<Balloon>,
}

impl BalloonsEffect {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let balloons = (0..PARTICLE_COUNT).map(|_| Balloon::random(&mut rng)).collect();
        Self { balloons }
    }

    pub fn particle_count(&self) -> usize {
        self.balloons.len()
    }

    pub fn cleanup(&mut self) {
        self.balloons.clear();
    }

    pub fn render(&self, frame: &mut RgbaImage, progress: f32) {
        let (width, height) = frame.dimensions();
        let mut canvas = Blend::new(frame, 1.0);

        for balloon in &self.balloons {
            let Some(y) = balloon.height_at(progress) else {
                continue;
            };
            let px = (balloon.x * width as f32).trunc();
            let py = (y * height as f32).trunc();
            let size = balloon.size as f32;

            draw::fill_circle(&mut canvas, px, py, size, balloon.color);
            draw::thick_line(
                &mut canvas,
                (px, py + size),
                (px, py + size + STRING_LENGTH),
                STRING_WIDTH,
                STRING_COLOR,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::grey_frame;

    #[test]
    fn test_balloons_start_low_and_rise() {
        let effect = BalloonsEffect::new(6);
        assert_eq!(effect.particle_count(), PARTICLE_COUNT);
        for b in &effect.balloons {
            assert!((0.7..1.0).contains(&b.y));
            let start = b.height_at(0.0).unwrap();
            let later = b.height_at(0.5).unwrap();
            assert!(later < start);
        }
    }

    #[test]
    fn test_balloons_leave_the_top() {
        let balloon = Balloon {
            x: 0.5,
            y: 0.3,
            size: 40,
            speed: 0.4,
            color: [200, 100, 100],
        };
        assert!(balloon.height_at(0.5).is_some());
        assert!(balloon.height_at(1.0).is_none());
    }

    #[test]
    fn test_balloon_is_opaque_with_string() {
        let effect = BalloonsEffect {
            balloons: vec![Balloon {
                x: 0.5,
                y: 0.5,
                size: 30,
                speed: 0.2,
                color: [200, 120, 110],
            }],
        };
        let mut frame = grey_frame();
        effect.render(&mut frame, 0.0);

        assert_eq!(&frame.get_pixel(160, 120).0[..3], &[200, 120, 110]);
        // String hangs below the balloon
        assert_eq!(&frame.get_pixel(160, 120 + 30 + 10).0[..3], &STRING_COLOR);
    }

    #[test]
    fn test_visible_at_end() {
        let effect = BalloonsEffect::new(1);
        let mut frame = grey_frame();
        // Slowest balloon starts at 0.7 and moves at most 0.5, so some remain
        effect.render(&mut frame, 1.0);
        assert_ne!(frame, grey_frame());
    }
}
