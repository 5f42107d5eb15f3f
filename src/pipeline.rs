//! Per-frame processing
//!
//! Detect hands, classify, trigger enabled effects and composite them onto
//! the frame. Detection failures are logged and treated as "no hands"; nothing
//! in this path stops the frame loop.

use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::animation::AnimationEngine;
use crate::config::{EnabledGestures, Settings};
use crate::effects::debug_overlay;
use crate::gesture::{Gesture, GestureDetection, GestureDetector};
use crate::ml::HandLandmarker;

pub struct ReactionPipeline {
    landmarker: Box<dyn HandLandmarker>,
    detector: GestureDetector,
    engine: AnimationEngine,
    show_debug_overlay: bool,
    hands_in_last_frame: usize,
}

impl ReactionPipeline {
    pub fn new(landmarker: Box<dyn HandLandmarker>, settings: &Settings, seed: u64) -> Self {
        Self {
            landmarker,
            detector: GestureDetector::new(settings.gesture_confidence),
            engine: AnimationEngine::new(effect_duration(settings), seed),
            show_debug_overlay: settings.show_debug_overlay,
            hands_in_last_frame: 0,
        }
    }

    /// Run one frame through the pipeline at the current time
    pub fn process_frame(&mut self, frame: &RgbaImage, settings: &Settings) -> RgbaImage {
        self.process_frame_at(frame, &settings.enabled_gestures, Instant::now())
    }

    /// Run one frame through the pipeline at `now`
    pub fn process_frame_at(
        &mut self,
        frame: &RgbaImage,
        enabled: &EnabledGestures,
        now: Instant,
    ) -> RgbaImage {
        let hands = match self.landmarker.detect(frame) {
            Ok(hands) => hands,
            Err(e) => {
                log::warn!("Hand detection failed: {}", e);
                Vec::new()
            }
        };
        self.hands_in_last_frame = hands.len();

        if let Some(gesture) = self.detector.detect(&hands) {
            self.start_if_enabled(gesture, enabled, now);
        }

        let mut output = frame.clone();
        if self.show_debug_overlay {
            debug_overlay::draw_landmarks(&mut output, &hands);
        }
        self.engine.render_at(&mut output, now);
        output
    }

    /// Accept a detection by threshold, gate it on the enabled flags and trigger
    ///
    /// Returns true if a new effect started.
    pub fn handle_detection(
        &mut self,
        detection: GestureDetection,
        enabled: &EnabledGestures,
        now: Instant,
    ) -> bool {
        match self.detector.observe(detection) {
            Some(gesture) => self.start_if_enabled(gesture, enabled, now),
            None => false,
        }
    }

    fn start_if_enabled(&mut self, gesture: Gesture, enabled: &EnabledGestures, now: Instant) -> bool {
        if !enabled.get(gesture) {
            log::trace!("{} detected but disabled", gesture);
            return false;
        }
        let started = self.engine.trigger_at(gesture, now, None);
        if started {
            log::info!(
                "Gesture detected: {} (confidence {:.2})",
                gesture,
                self.detector.last_detection().confidence
            );
        }
        started
    }

    /// Start an effect on request, bypassing detection but not the enabled flags
    pub fn trigger_manual(&mut self, gesture: Gesture, enabled: &EnabledGestures, now: Instant) -> bool {
        if !enabled.get(gesture) {
            log::info!("{} is disabled; not triggering", gesture);
            return false;
        }
        self.engine.trigger_at(gesture, now, None)
    }

    /// Pick up threshold, duration and overlay changes
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.detector.set_confidence_threshold(settings.gesture_confidence);
        self.engine.set_default_duration(effect_duration(settings));
        self.show_debug_overlay = settings.show_debug_overlay;
    }

    pub fn set_show_debug_overlay(&mut self, show: bool) {
        self.show_debug_overlay = show;
    }

    pub fn last_detection(&self) -> GestureDetection {
        self.detector.last_detection()
    }

    pub fn last_gesture(&self) -> Option<Gesture> {
        self.detector.last_gesture()
    }

    pub fn hands_in_last_frame(&self) -> usize {
        self.hands_in_last_frame
    }

    pub fn engine(&self) -> &AnimationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AnimationEngine {
        &mut self.engine
    }

    /// Release the model and effect storage
    pub fn cleanup(&mut self) {
        self.landmarker.close();
        self.engine.cleanup();
    }
}

fn effect_duration(settings: &Settings) -> Duration {
    Duration::try_from_secs_f32(settings.effect_duration).unwrap_or(crate::animation::DEFAULT_DURATION)
}
