//! Floating hearts
//!
//! Pink-to-purple hearts drift upward with a slight sideways sway, wrapping
//! from the top of the frame back to the bottom.

use std::f32::consts::{PI, TAU};

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::draw::{self, Blend, Color};
use super::fade_in_out;

pub const PARTICLE_COUNT: usize = 20;
/// Horizontal sway amplitude, in frame widths
const SWAY: f32 = 0.05;

#[derive(Clone, Debug)]
struct Heart {
    x: f32,
    y: f32,
    size: u32,
    speed: f32,
    phase: f32,
    color: Color,
}

impl Heart {
    fn random(rng: &mut StdRng) -> Self {
        Self {
            x: rng.random::<f32>(),
            y: rng.random::<f32>(),
            size: rng.random_range(20..=60),
            speed: rng.random_range(0.3..0.8),
            phase: rng.random_range(0.0..TAU),
            color: [
                rng.random_range(150..=255),
                rng.random_range(50..=150),
                rng.random_range(200..=255),
            ],
        }
    }

    /// Normalized (x, height above bottom) at `progress`
    fn position(&self, progress: f32) -> (f32, f32) {
        let mut rise = self.y + self.speed * progress;
        if rise > 1.0 {
            rise -= 1.0;
        }
        let x = self.x + SWAY * (self.phase + progress * 2.0 * TAU).sin();
        (x, rise)
    }
}

/// Heart curve sampled every 10 degrees, scaled to `size` and centred on (cx, cy)
pub fn heart_outline(cx: f32, cy: f32, size: f32) -> Vec<(f32, f32)> {
    let scale = size / 20.0;
    (0..36)
        .map(|i| {
            let t = i as f32 * 10.0 * PI / 180.0;
            let x = 16.0 * t.sin().powi(3);
            let y = -(13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos());
            (cx + x * scale, cy + y * scale)
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct HeartsEffect {
    hearts: Vec<Heart>,
}

impl HeartsEffect {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let hearts = (0..PARTICLE_COUNT).map(|_| Heart::random(&mut rng)).collect();
        Self { hearts }
    }

    pub fn particle_count(&self) -> usize {
        self.hearts.len()
    }

    pub fn cleanup(&mut self) {
        self.hearts.clear();
    }

    pub fn render(&self, frame: &mut RgbaImage, progress: f32) {
        let alpha = fade_in_out(progress);
        if alpha <= 0.0 {
            return;
        }

        let (width, height) = frame.dimensions();
        let mut canvas = Blend::new(frame, alpha);

        for heart in &self.hearts {
            let (x, rise) = heart.position(progress);
            let px = (x * width as f32) as i64;
            let py = ((1.0 - rise) * height as f32) as i64;
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                continue;
            }
            let outline = heart_outline(px as f32, py as f32, heart.size as f32);
            draw::fill_polygon(&mut canvas, &outline, heart.color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::grey_frame;

    #[test]
    fn test_colors_in_pink_purple_range() {
        let effect = HeartsEffect::new(4);
        assert_eq!(effect.particle_count(), PARTICLE_COUNT);
        for h in &effect.hearts {
            assert!(h.color[0] >= 150);
            assert!((50..=150).contains(&h.color[1]));
            assert!(h.color[2] >= 200);
            assert!((20..=60).contains(&h.size));
        }
    }

    #[test]
    fn test_rise_wraps_into_unit_range() {
        let effect = HeartsEffect::new(8);
        for h in &effect.hearts {
            for step in 0..=10 {
                let (_, rise) = h.position(step as f32 / 10.0);
                assert!((0.0..=1.0).contains(&rise), "rise {}", rise);
            }
        }
    }

    #[test]
    fn test_outline_shape() {
        let outline = heart_outline(100.0, 100.0, 20.0);
        assert_eq!(outline.len(), 36);
        // t = 0 is the notch between the lobes: x centred, y = -(13 - 5 - 2 - 1) = -5
        assert!((outline[0].0 - 100.0).abs() < 1e-4);
        assert!((outline[0].1 - 95.0).abs() < 1e-4);
        // t = 180 is the bottom tip: y = -(-13 - 5 + 2 - 1) = 17
        assert!((outline[18].1 - 117.0).abs() < 1e-3);
    }

    fn single_heart(x: f32) -> HeartsEffect {
        HeartsEffect {
            hearts: vec![Heart {
                x,
                y: 0.5,
                size: 60,
                speed: 0.3,
                phase: 0.0,
                color: [255, 100, 220],
            }],
        }
    }

    #[test]
    fn test_off_frame_centre_is_skipped() {
        // At progress 0.5 the sway term is sin(2 * TAU), so x stays put
        let mut inside = grey_frame();
        single_heart(0.98).render(&mut inside, 0.5);
        assert_ne!(inside, grey_frame());

        let mut outside = grey_frame();
        single_heart(1.02).render(&mut outside, 0.5);
        assert_eq!(outside, grey_frame());
    }

    #[test]
    fn test_fades_in() {
        let effect = HeartsEffect::new(2);
        let mut start = grey_frame();
        effect.render(&mut start, 0.0);
        assert_eq!(start, grey_frame());

        let mut middle = grey_frame();
        effect.render(&mut middle, 0.5);
        assert_ne!(middle, grey_frame());
    }
}
