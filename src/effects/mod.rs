//! Effects module
//!
//! Procedural animated reactions drawn on top of camera frames. Each effect
//! lays out its particles once from a seeded generator at construction; after
//! that, output depends only on the progress fraction passed to `render`.
//!
//! | Gesture        | Effect              |
//! |----------------|---------------------|
//! | thumbs_up      | Thumbs (up badge)   |
//! | thumbs_down    | Thumbs (down badge) |
//! | two_thumbs_up  | Confetti            |
//! | peace_sign     | Balloons            |
//! | heart_hands    | Hearts              |
//! | raised_fist    | Lasers              |

pub mod balloons;
pub mod confetti;
pub mod debug_overlay;
pub mod draw;
pub mod hearts;
pub mod lasers;
pub mod thumbs;

use image::RgbaImage;

use crate::gesture::Gesture;

pub use balloons::BalloonsEffect;
pub use confetti::ConfettiEffect;
pub use hearts::HeartsEffect;
pub use lasers::LasersEffect;
pub use thumbs::{ThumbDirection, ThumbsEffect};

/// Ramp in over [0, 0.2), hold, ramp out over (0.8, 1]
pub fn fade_in_out(progress: f32) -> f32 {
    if progress < 0.2 {
        progress / 0.2
    } else {
        fade_out_tail(progress)
    }
}

/// Full opacity until 0.8, then linear fade to zero at 1.0
pub fn fade_out_tail(progress: f32) -> f32 {
    if progress > 0.8 {
        ((1.0 - progress) / 0.2).max(0.0)
    } else {
        1.0
    }
}

/// One renderer per gesture
#[derive(Debug, Clone)]
pub enum Effect {
    Thumbs(ThumbsEffect),
    Confetti(ConfettiEffect),
    Hearts(HeartsEffect),
    Balloons(BalloonsEffect),
    Lasers(LasersEffect),
}

impl Effect {
    /// Build the renderer that plays for a gesture
    pub fn for_gesture(gesture: Gesture, seed: u64) -> Self {
        match gesture {
            Gesture::ThumbsUp => Effect::Thumbs(ThumbsEffect::new(ThumbDirection::Up)),
            Gesture::ThumbsDown => Effect::Thumbs(ThumbsEffect::new(ThumbDirection::Down)),
            Gesture::TwoThumbsUp => Effect::Confetti(ConfettiEffect::new(seed)),
            Gesture::PeaceSign => Effect::Balloons(BalloonsEffect::new(seed)),
            Gesture::HeartHands => Effect::Hearts(HeartsEffect::new(seed)),
            Gesture::RaisedFist => Effect::Lasers(LasersEffect::new(seed)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Effect::Thumbs(_) => "thumbs",
            Effect::Confetti(_) => "confetti",
            Effect::Hearts(_) => "hearts",
            Effect::Balloons(_) => "balloons",
            Effect::Lasers(_) => "lasers",
        }
    }

    /// Draw the effect onto `frame` at `progress` (clamped to [0, 1])
    pub fn render(&self, frame: &mut RgbaImage, progress: f32) {
        let progress = progress.clamp(0.0, 1.0);
        match self {
            Effect::Thumbs(e) => e.render(frame, progress),
            Effect::Confetti(e) => e.render(frame, progress),
            Effect::Hearts(e) => e.render(frame, progress),
            Effect::Balloons(e) => e.render(frame, progress),
            Effect::Lasers(e) => e.render(frame, progress),
        }
    }

    /// Number of particles (badges count as one)
    pub fn particle_count(&self) -> usize {
        match self {
            Effect::Thumbs(_) => 1,
            Effect::Confetti(e) => e.particle_count(),
            Effect::Hearts(e) => e.particle_count(),
            Effect::Balloons(e) => e.particle_count(),
            Effect::Lasers(e) => e.beam_count(),
        }
    }

    /// Drop particle storage
    pub fn cleanup(&mut self) {
        match self {
            Effect::Thumbs(_) => {}
            Effect::Confetti(e) => e.cleanup(),
            Effect::Hearts(e) => e.cleanup(),
            Effect::Balloons(e) => e.cleanup(),
            Effect::Lasers(e) => e.cleanup(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgba;

    pub(crate) fn grey_frame() -> RgbaImage {
        RgbaImage::from_pixel(320, 240, Rgba([40, 40, 40, 255]))
    }

    #[test]
    fn test_fade_laws() {
        assert_eq!(fade_in_out(0.0), 0.0);
        assert!((fade_in_out(0.1) - 0.5).abs() < 1e-6);
        assert_eq!(fade_in_out(0.2), 1.0);
        assert_eq!(fade_in_out(0.5), 1.0);
        assert_eq!(fade_in_out(0.8), 1.0);
        assert!((fade_in_out(0.9) - 0.5).abs() < 1e-5);
        assert_eq!(fade_in_out(1.0), 0.0);

        assert_eq!(fade_out_tail(0.0), 1.0);
        assert_eq!(fade_out_tail(0.8), 1.0);
        assert!((fade_out_tail(0.9) - 0.5).abs() < 1e-5);
        assert_eq!(fade_out_tail(1.0), 0.0);
    }

    #[test]
    fn test_mapping_covers_every_gesture() {
        let names: Vec<&str> = Gesture::ALL
            .iter()
            .map(|g| Effect::for_gesture(*g, 7).name())
            .collect();
        assert_eq!(
            names,
            vec!["thumbs", "thumbs", "confetti", "balloons", "hearts", "lasers"]
        );
    }

    #[test]
    fn test_render_is_pure_given_seed() {
        for gesture in Gesture::ALL {
            let effect = Effect::for_gesture(gesture, 42);
            let mut a = grey_frame();
            let mut b = grey_frame();
            effect.render(&mut a, 0.4);
            effect.render(&mut b, 0.4);
            assert_eq!(a, b, "{} not deterministic", gesture);

            let same_seed = Effect::for_gesture(gesture, 42);
            let mut c = grey_frame();
            same_seed.render(&mut c, 0.4);
            assert_eq!(a, c, "{} layout differs for equal seeds", gesture);
        }
    }

    #[test]
    fn test_every_effect_draws_mid_animation() {
        for gesture in Gesture::ALL {
            let effect = Effect::for_gesture(gesture, 3);
            let mut frame = grey_frame();
            effect.render(&mut frame, 0.4);
            assert_ne!(frame, grey_frame(), "{} drew nothing", gesture);
        }
    }

    #[test]
    fn test_progress_is_clamped() {
        let effect = Effect::for_gesture(Gesture::HeartHands, 1);
        let mut over = grey_frame();
        let mut one = grey_frame();
        effect.render(&mut over, 1.7);
        effect.render(&mut one, 1.0);
        assert_eq!(over, one);
    }

    #[test]
    fn test_cleanup_drops_particles() {
        let mut effect = Effect::for_gesture(Gesture::TwoThumbsUp, 1);
        assert_eq!(effect.particle_count(), 100);
        effect.cleanup();
        assert_eq!(effect.particle_count(), 0);
    }
}
