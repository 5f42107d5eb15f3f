//! Animation engine
//!
//! Tracks which gesture effects are playing and draws them each frame. At most
//! one instance per gesture is active; triggering a gesture that is already
//! playing leaves its start time untouched.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::effects::Effect;
use crate::gesture::Gesture;

/// Default effect length
pub const DEFAULT_DURATION: Duration = Duration::from_secs(3);

/// A playing effect
#[derive(Clone, Copy, Debug)]
pub struct ActiveEffect {
    pub gesture: Gesture,
    pub start: Instant,
    pub duration: Duration,
}

impl ActiveEffect {
    /// Fraction of the duration elapsed at `now`, clamped to [0, 1]
    pub fn progress_at(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= self.duration
    }
}

pub struct AnimationEngine {
    /// One renderer per gesture, indexed by `Gesture::index`
    effects: Vec<Effect>,
    active: HashMap<Gesture, ActiveEffect>,
    default_duration: Duration,
}

impl AnimationEngine {
    /// Create the engine; `seed` fixes every effect's particle layout
    pub fn new(default_duration: Duration, seed: u64) -> Self {
        let effects = Gesture::ALL
            .iter()
            .enumerate()
            .map(|(i, g)| Effect::for_gesture(*g, seed.wrapping_add(i as u64)))
            .collect();

        log::debug!("Animation engine ready ({} effects)", Gesture::ALL.len());

        Self {
            effects,
            active: HashMap::new(),
            default_duration,
        }
    }

    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    pub fn set_default_duration(&mut self, duration: Duration) {
        self.default_duration = duration;
    }

    /// Start an effect now with the default duration
    pub fn trigger(&mut self, gesture: Gesture) -> bool {
        self.trigger_at(gesture, Instant::now(), None)
    }

    /// Start an effect at `now`; returns false if it is already playing
    pub fn trigger_at(&mut self, gesture: Gesture, now: Instant, duration: Option<Duration>) -> bool {
        if self.active.contains_key(&gesture) {
            return false;
        }
        let duration = duration.unwrap_or(self.default_duration);
        self.active.insert(
            gesture,
            ActiveEffect {
                gesture,
                start: now,
                duration,
            },
        );
        log::info!("Triggered {} effect for {:.1}s", gesture, duration.as_secs_f32());
        true
    }

    /// Start an effect by gesture name; unknown names are logged and ignored
    pub fn trigger_by_name(&mut self, name: &str) -> bool {
        match name.parse::<Gesture>() {
            Ok(gesture) => self.trigger(gesture),
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    /// Draw active effects onto the frame at the current time
    pub fn render(&mut self, frame: &mut RgbaImage) {
        self.render_at(frame, Instant::now());
    }

    /// Draw every active effect at `now`, then retire the ones that have expired
    ///
    /// An expired effect is still drawn once at progress 1.0 before removal.
    pub fn render_at(&mut self, frame: &mut RgbaImage, now: Instant) {
        if self.active.is_empty() {
            return;
        }

        for gesture in Gesture::ALL {
            if let Some(active) = self.active.get(&gesture) {
                let progress = active.progress_at(now);
                self.effects[gesture.index()].render(frame, progress);
            }
        }

        self.active.retain(|gesture, active| {
            let keep = !active.is_expired_at(now);
            if !keep {
                log::debug!("{} effect finished", gesture);
            }
            keep
        });
    }

    /// Progress of an active effect at the current time
    pub fn progress(&self, gesture: Gesture) -> Option<f32> {
        self.progress_at(gesture, Instant::now())
    }

    pub fn progress_at(&self, gesture: Gesture, now: Instant) -> Option<f32> {
        self.active.get(&gesture).map(|a| a.progress_at(now))
    }

    pub fn is_active(&self, gesture: Gesture) -> bool {
        self.active.contains_key(&gesture)
    }

    /// Active gestures in canonical order
    pub fn active_gestures(&self) -> Vec<Gesture> {
        Gesture::ALL
            .iter()
            .copied()
            .filter(|g| self.active.contains_key(g))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Stop every effect immediately
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Stop everything and drop particle storage
    pub fn cleanup(&mut self) {
        self.clear();
        for effect in self.effects.iter_mut() {
            effect.cleanup();
        }
        log::info!("Animation engine cleaned up");
    }
}

impl Default for AnimationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION, rand::random())
    }
}
