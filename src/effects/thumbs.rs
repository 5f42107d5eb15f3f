//! Thumbs up/down badge
//!
//! A round badge at the frame centre that grows from half to full size while
//! fading out.

use image::RgbaImage;

use super::draw::{self, Color, Overlay};

/// Badge radius at full scale, in pixels
pub const BASE_RADIUS: f32 = 100.0;

const UP_COLOR: Color = [0, 255, 0];
const DOWN_COLOR: Color = [255, 0, 0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbDirection {
    Up,
    Down,
}

#[derive(Clone, Debug)]
pub struct ThumbsEffect {
    direction: ThumbDirection,
}

impl ThumbsEffect {
    pub fn new(direction: ThumbDirection) -> Self {
        Self { direction }
    }

    pub fn direction(&self) -> ThumbDirection {
        self.direction
    }

    /// 0.5 at start, 1.0 at end
    pub fn scale(progress: f32) -> f32 {
        0.5 + progress * 0.5
    }

    /// 1.0 at start, 0.0 at end
    pub fn opacity(progress: f32) -> f32 {
        1.0 - progress
    }

    pub fn color(&self) -> Color {
        match self.direction {
            ThumbDirection::Up => UP_COLOR,
            ThumbDirection::Down => DOWN_COLOR,
        }
    }

    pub fn render(&self, frame: &mut RgbaImage, progress: f32) {
        let alpha = Self::opacity(progress);
        if alpha <= 0.0 {
            return;
        }

        let (width, height) = frame.dimensions();
        let cx = (width / 2) as f32;
        let cy = (height / 2) as f32;
        let radius = (BASE_RADIUS * Self::scale(progress)).floor();

        let mut overlay = Overlay::new(width, height);
        draw::fill_circle(&mut overlay, cx, cy, radius, self.color());
        self.draw_arrow(&mut overlay, cx, cy, radius);
        overlay.composite(frame, alpha);
    }

    /// White arrow glyph pointing in the badge direction
    fn draw_arrow(&self, overlay: &mut Overlay, cx: f32, cy: f32, radius: f32) {
        let sign = match self.direction {
            ThumbDirection::Up => -1.0,
            ThumbDirection::Down => 1.0,
        };
        let head = [
            (cx, cy + sign * 0.6 * radius),
            (cx - 0.4 * radius, cy + sign * 0.05 * radius),
            (cx + 0.4 * radius, cy + sign * 0.05 * radius),
        ];
        draw::fill_polygon(overlay, &head, draw::WHITE);

        let stem_top = cy + sign * 0.1 * radius;
        let stem_bottom = cy - sign * 0.5 * radius;
        draw::thick_line(overlay, (cx, stem_top), (cx, stem_bottom), 0.3 * radius, draw::WHITE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::grey_frame;

    #[test]
    fn test_scale_and_opacity() {
        assert_eq!(ThumbsEffect::scale(0.0), 0.5);
        assert_eq!(ThumbsEffect::scale(0.5), 0.75);
        assert_eq!(ThumbsEffect::scale(1.0), 1.0);
        assert_eq!(ThumbsEffect::opacity(0.0), 1.0);
        assert_eq!(ThumbsEffect::opacity(0.25), 0.75);
        assert_eq!(ThumbsEffect::opacity(1.0), 0.0);
    }

    #[test]
    fn test_badge_colors() {
        let mut up = grey_frame();
        ThumbsEffect::new(ThumbDirection::Up).render(&mut up, 0.0);
        // Badge body left of the glyph
        let body = up.get_pixel(160 - 40, 120).0;
        assert_eq!(&body[..3], &[0, 255, 0]);

        let mut down = grey_frame();
        ThumbsEffect::new(ThumbDirection::Down).render(&mut down, 0.0);
        let body = down.get_pixel(160 - 40, 120).0;
        assert_eq!(&body[..3], &[255, 0, 0]);
    }

    #[test]
    fn test_glyph_is_white_and_directional() {
        let mut up = grey_frame();
        ThumbsEffect::new(ThumbDirection::Up).render(&mut up, 0.0);
        // Arrow head sits above centre for up
        assert_eq!(&up.get_pixel(160, 120 - 15).0[..3], &[255, 255, 255]);

        let mut down = grey_frame();
        ThumbsEffect::new(ThumbDirection::Down).render(&mut down, 0.0);
        assert_eq!(&down.get_pixel(160, 120 + 15).0[..3], &[255, 255, 255]);
    }

    #[test]
    fn test_badge_radius_grows() {
        let effect = ThumbsEffect::new(ThumbDirection::Up);
        // 60px right of centre: outside at start (r=50), inside near the end (r~95)
        let mut early = grey_frame();
        effect.render(&mut early, 0.0);
        assert_eq!(early.get_pixel(160 + 60, 120), grey_frame().get_pixel(160 + 60, 120));

        let mut late = grey_frame();
        effect.render(&mut late, 0.9);
        assert_ne!(late.get_pixel(160 + 60, 120), grey_frame().get_pixel(160 + 60, 120));
    }

    #[test]
    fn test_invisible_at_end() {
        let mut frame = grey_frame();
        ThumbsEffect::new(ThumbDirection::Down).render(&mut frame, 1.0);
        assert_eq!(frame, grey_frame());
    }
}
