//! Camera Reactions - gesture-triggered effects for video calls
//!
//! Captures webcam input, recognises a small set of hand gestures from
//! hand landmarks, plays a matching animated effect on top of the feed and
//! republishes the composited frames through a virtual camera device.

pub mod animation;
pub mod app;
pub mod camera;
pub mod config;
pub mod effects;
pub mod gesture;
pub mod ml;
pub mod network;
pub mod pipeline;
pub mod telemetry;

pub use app::App;
