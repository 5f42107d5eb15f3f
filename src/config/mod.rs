//! Persistent application settings
//!
//! A flat JSON object of named options. Every successful mutation rewrites
//! the whole file. Unknown keys in the file are ignored and missing keys fall
//! back to their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::gesture::Gesture;

/// Environment variable overriding the settings file location
pub const CONFIG_ENV_VAR: &str = "CAMERA_REACTIONS_CONFIG";

const CONFIG_DIR_NAME: &str = "CameraReactions";
const CONFIG_FILE_NAME: &str = "config.json";

/// Per-gesture enable flags, stored as a nested object keyed by gesture name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledGestures {
    pub thumbs_up: bool,
    pub thumbs_down: bool,
    pub two_thumbs_up: bool,
    pub peace_sign: bool,
    pub heart_hands: bool,
    pub raised_fist: bool,
}

impl Default for EnabledGestures {
    fn default() -> Self {
        Self {
            thumbs_up: true,
            thumbs_down: true,
            two_thumbs_up: true,
            peace_sign: true,
            heart_hands: true,
            raised_fist: true,
        }
    }
}

impl EnabledGestures {
    pub fn get(&self, gesture: Gesture) -> bool {
        match gesture {
            Gesture::ThumbsUp => self.thumbs_up,
            Gesture::ThumbsDown => self.thumbs_down,
            Gesture::TwoThumbsUp => self.two_thumbs_up,
            Gesture::PeaceSign => self.peace_sign,
            Gesture::HeartHands => self.heart_hands,
            Gesture::RaisedFist => self.raised_fist,
        }
    }

    pub fn set(&mut self, gesture: Gesture, enabled: bool) {
        let flag = match gesture {
            Gesture::ThumbsUp => &mut self.thumbs_up,
            Gesture::ThumbsDown => &mut self.thumbs_down,
            Gesture::TwoThumbsUp => &mut self.two_thumbs_up,
            Gesture::PeaceSign => &mut self.peace_sign,
            Gesture::HeartHands => &mut self.heart_hands,
            Gesture::RaisedFist => &mut self.raised_fist,
        };
        *flag = enabled;
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Capture and output width in pixels
    pub camera_width: u32,
    /// Capture and output height in pixels
    pub camera_height: u32,
    pub camera_fps: u32,
    /// Index of the capture device
    pub camera_index: u32,
    /// Minimum classifier confidence for a gesture to trigger
    pub gesture_confidence: f32,
    /// Effect length in seconds
    pub effect_duration: f32,
    pub enabled_gestures: EnabledGestures,
    pub virtual_camera_name: String,
    /// v4l2loopback device node the output is written to
    pub virtual_camera_device: Option<String>,
    pub show_debug_overlay: bool,
    /// Prefer a high-performance GPU adapter
    pub enable_gpu: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_width: 1280,
            camera_height: 720,
            camera_fps: 30,
            camera_index: 0,
            gesture_confidence: 0.8,
            effect_duration: 3.0,
            enabled_gestures: EnabledGestures::default(),
            virtual_camera_name: "Camera Reactions Virtual Camera".to_string(),
            virtual_camera_device: default_virtual_camera_device(),
            show_debug_overlay: false,
            enable_gpu: true,
            log_level: "INFO".to_string(),
        }
    }
}

fn default_virtual_camera_device() -> Option<String> {
    if cfg!(target_os = "linux") {
        Some("/dev/video10".to_string())
    } else {
        None
    }
}

impl Settings {
    /// Pull out-of-range values back into range
    pub fn sanitize(&mut self) {
        self.camera_width = self.camera_width.max(1);
        self.camera_height = self.camera_height.max(1);
        self.camera_fps = self.camera_fps.clamp(1, 240);
        self.gesture_confidence = self.gesture_confidence.clamp(0.0, 1.0);
        if !self.effect_duration.is_finite() || self.effect_duration <= 0.0 {
            self.effect_duration = Settings::default().effect_duration;
        }
    }

    /// Parse settings from JSON text
    pub fn from_json(contents: &str) -> Result<Self, SettingsError> {
        let mut settings: Self = serde_json::from_str(contents)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Settings-related errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown setting: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {source}")]
    InvalidValue {
        key: String,
        source: serde_json::Error,
    },
}

/// Settings bound to the file they persist to
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Settings file location: env override, platform config dir, or the working directory
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .map(|mut p| {
                p.push(CONFIG_DIR_NAME);
                p.push(CONFIG_FILE_NAME);
                p
            })
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Load from `path`, writing defaults when the file does not exist
    ///
    /// Read or parse failures are logged and leave the defaults in place.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let (store, error) = Self::load_with_error(path);
        match error {
            Some(e) => log::warn!("Settings {:?}: {}; using defaults", store.path, e),
            None => log::info!("Loaded settings from {:?}", store.path),
        }
        store
    }

    /// Like [`SettingsStore::load`], but hands the failure back instead of logging it
    ///
    /// Used before the logger exists. The store always holds usable settings.
    pub fn load_with_error(path: impl Into<PathBuf>) -> (Self, Option<SettingsError>) {
        let path = path.into();

        if !path.exists() {
            let store = Self {
                path,
                settings: Settings::default(),
            };
            let error = store.save().err();
            return (store, error);
        }

        let (settings, error) = match fs::read_to_string(&path)
            .map_err(SettingsError::from)
            .and_then(|contents| Settings::from_json(&contents))
        {
            Ok(settings) => (settings, None),
            Err(e) => (Settings::default(), Some(e)),
        };

        (Self { path, settings }, error)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Look up one setting by key
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(&self.settings) {
            Ok(Value::Object(mut map)) => map.remove(key),
            _ => None,
        }
    }

    /// Replace one setting by key and persist
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut map: Map<String, Value> = match serde_json::to_value(&self.settings)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if !map.contains_key(key) {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }
        map.insert(key.to_string(), value);

        let mut updated: Settings = serde_json::from_value(Value::Object(map)).map_err(|source| {
            SettingsError::InvalidValue {
                key: key.to_string(),
                source,
            }
        })?;
        updated.sanitize();

        self.settings = updated;
        self.persist();
        Ok(())
    }

    pub fn is_gesture_enabled(&self, gesture: Gesture) -> bool {
        self.settings.enabled_gestures.get(gesture)
    }

    pub fn enable_gesture(&mut self, gesture: Gesture, enabled: bool) {
        self.settings.enabled_gestures.set(gesture, enabled);
        log::info!("{} {}", gesture, if enabled { "enabled" } else { "disabled" });
        self.persist();
    }

    /// Apply a closure to the settings and persist
    pub fn update(&mut self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings);
        self.settings.sanitize();
        self.persist();
    }

    pub fn reset_to_defaults(&mut self) {
        self.settings = Settings::default();
        log::info!("Settings reset to defaults");
        self.persist();
    }

    /// Write the full snapshot to disk
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, self.settings.to_json()?)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            log::warn!("Failed to save settings to {:?}: {}", self.path, e);
        }
    }
}
