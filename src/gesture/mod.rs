//! Gesture classification
//!
//! Maps the hands detected in a frame to one gesture label using fixed
//! geometric rules over the landmarks. Every frame is classified on its own;
//! there is no smoothing across frames.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ml::landmarks::*;
use crate::ml::Hand;

/// Confidence reported for single-hand thumbs gestures
pub const THUMBS_CONFIDENCE: f32 = 0.9;
/// Confidence reported for peace sign and raised fist
pub const POSE_CONFIDENCE: f32 = 0.85;
/// Confidence reported for two thumbs up
pub const TWO_THUMBS_CONFIDENCE: f32 = 0.95;
/// Confidence reported for heart hands
pub const HEART_HANDS_CONFIDENCE: f32 = 0.9;
/// Thumb tips must be strictly closer than this (normalized units) for heart hands
pub const HEART_HANDS_MAX_DISTANCE: f32 = 0.15;

/// Recognised gestures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    ThumbsUp,
    ThumbsDown,
    TwoThumbsUp,
    PeaceSign,
    HeartHands,
    RaisedFist,
}

impl Gesture {
    /// All gestures, in display order
    pub const ALL: [Gesture; 6] = [
        Gesture::ThumbsUp,
        Gesture::ThumbsDown,
        Gesture::TwoThumbsUp,
        Gesture::PeaceSign,
        Gesture::HeartHands,
        Gesture::RaisedFist,
    ];

    /// Stable snake_case identifier used in settings and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::ThumbsUp => "thumbs_up",
            Gesture::ThumbsDown => "thumbs_down",
            Gesture::TwoThumbsUp => "two_thumbs_up",
            Gesture::PeaceSign => "peace_sign",
            Gesture::HeartHands => "heart_hands",
            Gesture::RaisedFist => "raised_fist",
        }
    }

    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Gesture::ThumbsUp => "👍 Thumbs Up",
            Gesture::ThumbsDown => "👎 Thumbs Down",
            Gesture::TwoThumbsUp => "👍👍 Two Thumbs Up",
            Gesture::PeaceSign => "✌ Peace Sign",
            Gesture::HeartHands => "💗 Heart Hands",
            Gesture::RaisedFist => "✊ Raised Fist",
        }
    }

    /// Position in `Gesture::ALL`
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unrecognised gesture name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gesture: {0}")]
pub struct UnknownGesture(pub String);

impl FromStr for Gesture {
    type Err = UnknownGesture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gesture::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGesture(s.to_string()))
    }
}

/// Classifier output for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureDetection {
    pub gesture: Option<Gesture>,
    pub confidence: f32,
}

impl GestureDetection {
    pub fn new(gesture: Gesture, confidence: f32) -> Self {
        Self {
            gesture: Some(gesture),
            confidence,
        }
    }

    /// No gesture, zero confidence
    pub fn none() -> Self {
        Self {
            gesture: None,
            confidence: 0.0,
        }
    }

    /// The gesture, if one was found with at least `threshold` confidence
    pub fn accepted(&self, threshold: f32) -> Option<Gesture> {
        self.gesture.filter(|_| self.confidence >= threshold)
    }

    pub fn is_accepted(&self, threshold: f32) -> bool {
        self.accepted(threshold).is_some()
    }
}

impl Default for GestureDetection {
    fn default() -> Self {
        Self::none()
    }
}

/// Classify the hands found in one frame
pub fn classify(hands: &[Hand]) -> GestureDetection {
    match hands {
        [] => GestureDetection::none(),
        [hand] => classify_single(hand),
        [first, second] => classify_pair(first, second),
        _ => GestureDetection::none(),
    }
}

fn classify_single(hand: &Hand) -> GestureDetection {
    if is_thumbs_up(hand) {
        GestureDetection::new(Gesture::ThumbsUp, THUMBS_CONFIDENCE)
    } else if is_thumbs_down(hand) {
        GestureDetection::new(Gesture::ThumbsDown, THUMBS_CONFIDENCE)
    } else if is_peace_sign(hand) {
        GestureDetection::new(Gesture::PeaceSign, POSE_CONFIDENCE)
    } else if is_raised_fist(hand) {
        GestureDetection::new(Gesture::RaisedFist, POSE_CONFIDENCE)
    } else {
        GestureDetection::none()
    }
}

fn classify_pair(first: &Hand, second: &Hand) -> GestureDetection {
    if is_thumbs_up(first) && is_thumbs_up(second) {
        GestureDetection::new(Gesture::TwoThumbsUp, TWO_THUMBS_CONFIDENCE)
    } else if is_heart_hands(first, second) {
        GestureDetection::new(Gesture::HeartHands, HEART_HANDS_CONFIDENCE)
    } else {
        GestureDetection::none()
    }
}

/// Tip above joint in image space
fn extended(hand: &Hand, tip: usize, joint: usize) -> bool {
    hand.point(tip).y < hand.point(joint).y
}

/// Tip below joint in image space
fn folded(hand: &Hand, tip: usize, joint: usize) -> bool {
    hand.point(tip).y > hand.point(joint).y
}

pub fn is_thumbs_up(hand: &Hand) -> bool {
    extended(hand, THUMB_TIP, THUMB_IP) && folded(hand, INDEX_TIP, INDEX_MCP)
}

pub fn is_thumbs_down(hand: &Hand) -> bool {
    folded(hand, THUMB_TIP, THUMB_IP) && folded(hand, INDEX_TIP, INDEX_MCP)
}

pub fn is_peace_sign(hand: &Hand) -> bool {
    extended(hand, INDEX_TIP, INDEX_PIP)
        && extended(hand, MIDDLE_TIP, MIDDLE_PIP)
        && folded(hand, RING_TIP, RING_PIP)
}

pub fn is_raised_fist(hand: &Hand) -> bool {
    [
        (INDEX_TIP, INDEX_PIP),
        (MIDDLE_TIP, MIDDLE_PIP),
        (RING_TIP, RING_PIP),
        (PINKY_TIP, PINKY_PIP),
    ]
    .iter()
    .all(|&(tip, pip)| folded(hand, tip, pip))
}

pub fn is_heart_hands(first: &Hand, second: &Hand) -> bool {
    first.point(THUMB_TIP).distance_2d(second.point(THUMB_TIP)) < HEART_HANDS_MAX_DISTANCE
}

/// Classifier plus acceptance threshold, remembering the last result
#[derive(Debug, Clone)]
pub struct GestureDetector {
    confidence_threshold: f32,
    last_detection: GestureDetection,
    last_gesture: Option<Gesture>,
}

impl GestureDetector {
    pub fn new(confidence_threshold: f32) -> Self {
        log::info!("GestureDetector initialized (threshold={})", confidence_threshold);
        Self {
            confidence_threshold,
            last_detection: GestureDetection::none(),
            last_gesture: None,
        }
    }

    /// Classify and return the gesture if it clears the threshold
    ///
    /// A frame without hands clears the last accepted gesture.
    pub fn detect(&mut self, hands: &[Hand]) -> Option<Gesture> {
        if hands.is_empty() {
            self.last_gesture = None;
        }
        self.observe(classify(hands))
    }

    /// Record an externally produced detection and apply the threshold
    pub fn observe(&mut self, detection: GestureDetection) -> Option<Gesture> {
        self.last_detection = detection;
        let accepted = detection.accepted(self.confidence_threshold);
        if accepted.is_some() {
            self.last_gesture = accepted;
        }
        accepted
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn set_confidence_threshold(&mut self, threshold: f32) {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
    }

    /// Most recent classifier output, accepted or not
    pub fn last_detection(&self) -> GestureDetection {
        self.last_detection
    }

    /// Most recent accepted gesture; cleared when a frame has no hands
    pub fn last_gesture(&self) -> Option<Gesture> {
        self.last_gesture
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ml::HandLandmark;

    /// Open hand, fingers up, thumb sideways (matches nothing)
    pub(crate) fn neutral_hand() -> Hand {
        let mut hand = Hand::default();
        for lm in hand.landmarks.iter_mut() {
            *lm = HandLandmark::new(0.5, 0.5);
        }
        // Fingers extended: tips above every joint
        for (tip, pip, mcp) in [
            (INDEX_TIP, INDEX_PIP, INDEX_MCP),
            (MIDDLE_TIP, MIDDLE_PIP, MIDDLE_MCP),
            (RING_TIP, RING_PIP, RING_MCP),
            (PINKY_TIP, PINKY_PIP, PINKY_MCP),
        ] {
            hand.landmarks[mcp].y = 0.6;
            hand.landmarks[pip].y = 0.5;
            hand.landmarks[tip].y = 0.3;
        }
        hand.landmarks[THUMB_IP].y = 0.55;
        hand.landmarks[THUMB_TIP].y = 0.55;
        hand
    }

    pub(crate) fn thumbs_up_hand() -> Hand {
        let mut hand = neutral_hand();
        hand.landmarks[THUMB_TIP].y = 0.3;
        hand.landmarks[THUMB_IP].y = 0.4;
        hand.landmarks[INDEX_TIP].y = 0.7;
        hand.landmarks[INDEX_MCP].y = 0.6;
        hand
    }

    fn thumbs_down_hand() -> Hand {
        let mut hand = thumbs_up_hand();
        hand.landmarks[THUMB_TIP].y = 0.8;
        hand.landmarks[THUMB_IP].y = 0.7;
        hand
    }

    fn peace_hand() -> Hand {
        let mut hand = neutral_hand();
        hand.landmarks[RING_TIP].y = 0.7;
        hand
    }

    fn fist_hand() -> Hand {
        let mut hand = neutral_hand();
        for (tip, pip) in [
            (INDEX_TIP, INDEX_PIP),
            (MIDDLE_TIP, MIDDLE_PIP),
            (RING_TIP, RING_PIP),
            (PINKY_TIP, PINKY_PIP),
        ] {
            hand.landmarks[tip].y = hand.landmarks[pip].y + 0.05;
        }
        // Keep the index tip above its knuckle so thumbs predicates fail
        hand.landmarks[INDEX_MCP].y = 0.6;
        hand
    }

    fn with_thumb_tip(mut hand: Hand, x: f32, y: f32) -> Hand {
        hand.landmarks[THUMB_TIP].x = x;
        hand.landmarks[THUMB_TIP].y = y;
        hand
    }

    #[test]
    fn test_no_hands() {
        assert_eq!(classify(&[]), GestureDetection::none());
        let mut detector = GestureDetector::new(0.0);
        assert_eq!(detector.detect(&[]), None);
    }

    #[test]
    fn test_single_hand_gestures() {
        assert_eq!(classify(&[thumbs_up_hand()]), GestureDetection::new(Gesture::ThumbsUp, 0.9));
        assert_eq!(classify(&[thumbs_down_hand()]), GestureDetection::new(Gesture::ThumbsDown, 0.9));
        assert_eq!(classify(&[peace_hand()]), GestureDetection::new(Gesture::PeaceSign, 0.85));
        assert_eq!(classify(&[fist_hand()]), GestureDetection::new(Gesture::RaisedFist, 0.85));
        assert_eq!(classify(&[neutral_hand()]), GestureDetection::none());
    }

    #[test]
    fn test_thumbs_take_priority_over_fist() {
        // A thumbs-up hand also has folded fingers
        let mut hand = fist_hand();
        hand.landmarks[THUMB_TIP].y = 0.2;
        hand.landmarks[THUMB_IP].y = 0.3;
        hand.landmarks[INDEX_TIP].y = 0.7;
        assert!(is_raised_fist(&hand));
        assert_eq!(classify(&[hand]).gesture, Some(Gesture::ThumbsUp));
    }

    #[test]
    fn test_two_thumbs_up() {
        let detection = classify(&[thumbs_up_hand(), thumbs_up_hand()]);
        assert_eq!(detection, GestureDetection::new(Gesture::TwoThumbsUp, 0.95));
    }

    #[test]
    fn test_heart_hands_boundary_is_exclusive() {
        let left = with_thumb_tip(neutral_hand(), 0.40, 0.5);

        let close = with_thumb_tip(neutral_hand(), 0.50, 0.5);
        assert_eq!(
            classify(&[left.clone(), close]),
            GestureDetection::new(Gesture::HeartHands, 0.9)
        );

        // Exactly at the threshold does not match
        let a = with_thumb_tip(neutral_hand(), 0.0, 0.5);
        let b = with_thumb_tip(neutral_hand(), HEART_HANDS_MAX_DISTANCE, 0.5);
        assert_eq!(
            a.point(THUMB_TIP).distance_2d(b.point(THUMB_TIP)),
            HEART_HANDS_MAX_DISTANCE
        );
        assert!(!is_heart_hands(&a, &b));
        assert_eq!(classify(&[a, b]).gesture, None);

        let far = with_thumb_tip(neutral_hand(), 0.70, 0.5);
        assert_eq!(classify(&[left, far]), GestureDetection::none());
    }

    #[test]
    fn test_more_than_two_hands() {
        let hands = vec![thumbs_up_hand(), thumbs_up_hand(), thumbs_up_hand()];
        assert_eq!(classify(&hands), GestureDetection::none());
    }

    #[test]
    fn test_threshold_acceptance() {
        let strong = GestureDetection::new(Gesture::TwoThumbsUp, 0.95);
        let weak = GestureDetection::new(Gesture::TwoThumbsUp, 0.5);
        assert_eq!(strong.accepted(0.8), Some(Gesture::TwoThumbsUp));
        assert_eq!(weak.accepted(0.8), None);
        assert!(GestureDetection::new(Gesture::PeaceSign, 0.8).is_accepted(0.8));
    }

    #[test]
    fn test_detector_remembers_last() {
        let mut detector = GestureDetector::new(0.8);
        assert_eq!(detector.detect(&[thumbs_up_hand()]), Some(Gesture::ThumbsUp));
        assert_eq!(detector.last_gesture(), Some(Gesture::ThumbsUp));
        assert_eq!(detector.last_detection().confidence, 0.9);

        detector.set_confidence_threshold(0.95);
        assert_eq!(detector.detect(&[thumbs_up_hand()]), None);
        assert_eq!(detector.last_detection().gesture, Some(Gesture::ThumbsUp));

        assert_eq!(detector.detect(&[]), None);
        assert_eq!(detector.last_gesture(), None);
    }

    #[test]
    fn test_unmatched_hands_keep_last_gesture() {
        let mut detector = GestureDetector::new(0.8);
        detector.detect(&[thumbs_up_hand()]);

        assert_eq!(detector.detect(&[neutral_hand()]), None);
        assert_eq!(detector.last_detection(), GestureDetection::none());
        assert_eq!(detector.last_gesture(), Some(Gesture::ThumbsUp));

        detector.detect(&[]);
        assert_eq!(detector.last_gesture(), None);
    }

    #[test]
    fn test_gesture_names_round_trip() {
        for gesture in Gesture::ALL {
            assert_eq!(gesture.as_str().parse::<Gesture>(), Ok(gesture));
            assert_eq!(Gesture::ALL[gesture.index()], gesture);
        }
        assert_eq!(
            "wave".parse::<Gesture>(),
            Err(UnknownGesture("wave".to_string()))
        );
    }
}
