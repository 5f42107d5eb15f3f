//! Hand skeleton overlay for debugging detection

use image::RgbaImage;

use super::draw::{self, Blend, Color};
use crate::ml::{Hand, HAND_CONNECTIONS};

const BONE_COLOR: Color = [0, 255, 0];
const JOINT_COLOR: Color = [255, 0, 0];
const BONE_WIDTH: f32 = 2.0;
const JOINT_RADIUS: f32 = 3.0;

/// Draw landmark skeletons for every hand onto the frame
pub fn draw_landmarks(frame: &mut RgbaImage, hands: &[Hand]) {
    let (width, height) = frame.dimensions();
    let to_px = |x: f32, y: f32| ((x * width as f32).trunc(), (y * height as f32).trunc());
    let mut canvas = Blend::new(frame, 1.0);

    for hand in hands {
        for &(a, b) in HAND_CONNECTIONS.iter() {
            let from = hand.point(a);
            let to = hand.point(b);
            draw::thick_line(
                &mut canvas,
                to_px(from.x, from.y),
                to_px(to.x, to.y),
                BONE_WIDTH,
                BONE_COLOR,
            );
        }
        for lm in hand.landmarks.iter() {
            let (x, y) = to_px(lm.x, lm.y);
            draw::fill_circle(&mut canvas, x, y, JOINT_RADIUS, JOINT_COLOR);
        }
    }
}
