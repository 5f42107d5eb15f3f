//! Camera Reactions - Main Entry Point
//!
//! Overlays gesture-triggered animated reactions on a webcam feed and
//! republishes the result as a virtual camera.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use camera_reactions::config::SettingsStore;
use camera_reactions::telemetry::{init_logging, LogConfig};
use camera_reactions::App;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

const WINDOW_TITLE: &str = "Camera Reactions";
const DEFAULT_WIDTH: u32 = 1100;
const DEFAULT_HEIGHT: u32 = 700;

/// Application state machine
enum AppState {
    /// Initial state before window is created
    Uninitialized,
    /// Window and graphics context are ready
    Running { window: Arc<Window>, app: App },
}

/// Main application handler implementing winit's ApplicationHandler trait
struct CameraReactionsApp {
    state: AppState,
    /// Settings handed to `App` once the window exists
    settings: Option<SettingsStore>,
    next_redraw_at: Instant,
    /// Set when start-up failed
    failed: bool,
}

impl CameraReactionsApp {
    fn new(settings: SettingsStore) -> Self {
        Self {
            state: AppState::Uninitialized,
            settings: Some(settings),
            next_redraw_at: Instant::now(),
            failed: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, message: &str) {
        log::error!("{}", message);
        rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Error)
            .set_title("Camera Reactions")
            .set_description(message)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
        self.failed = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for CameraReactionsApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, AppState::Uninitialized) {
            return;
        }
        let Some(settings) = self.settings.take() else {
            return;
        };

        log::info!("Creating window...");
        let window_attributes = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, &format!("Failed to create window: {}", e));
                return;
            }
        };

        log::info!("Initializing graphics, camera and virtual camera...");
        match pollster::block_on(App::new(window.clone(), settings)) {
            Ok(app) => {
                log::info!("Camera Reactions ready!");
                log::info!("Press ESC to exit, F11 for fullscreen, Space to start/stop, C to clear effects");
                self.state = AppState::Running { window, app };
            }
            Err(e) => {
                self.fail(event_loop, &format!("Failed to initialize application:\n{:#}", e));
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let AppState::Running { window, app } = &mut self.state else {
            return;
        };

        // Let egui handle the event first
        let egui_consumed = app.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                app.shutdown();
                event_loop.exit();
            }

            // Keyboard shortcuts (only if egui doesn't want the key)
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } if !egui_consumed => match key_code {
                KeyCode::Escape => {
                    log::info!("Escape pressed, exiting...");
                    app.shutdown();
                    event_loop.exit();
                }
                KeyCode::F11 => {
                    if window.fullscreen().is_some() {
                        window.set_fullscreen(None);
                        log::info!("Exiting fullscreen");
                    } else {
                        window.set_fullscreen(Some(winit::window::Fullscreen::Borderless(None)));
                        log::info!("Entering fullscreen");
                    }
                }
                KeyCode::Space => app.toggle_running(),
                KeyCode::KeyC => app.clear_effects(),
                _ => {}
            },

            WindowEvent::Resized(physical_size) => {
                app.resize(physical_size);
            }

            WindowEvent::RedrawRequested => {
                app.update();

                match app.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                        log::warn!("Surface lost, reconfiguring...");
                        app.resize(app.size());
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory!");
                        app.shutdown();
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Surface error: {:?}", e);
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Running { window, app } = &mut self.state else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        // Drive redraws at the camera frame rate
        let frame_duration = Duration::from_nanos(1_000_000_000u64 / app.target_fps() as u64);
        let now = Instant::now();

        if now >= self.next_redraw_at {
            window.request_redraw();
            self.next_redraw_at += frame_duration;

            // Reset if too far behind
            if now > self.next_redraw_at + frame_duration * 2 {
                self.next_redraw_at = now + frame_duration;
            }
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_redraw_at));
    }
}

fn main() -> ExitCode {
    // The log level lives in the settings file, so errors wait for the logger
    let (settings, settings_error) = SettingsStore::load_with_error(SettingsStore::default_path());

    let _log_guard = match init_logging(&LogConfig::from_settings(settings.settings())) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    log::info!("Camera Reactions v{}", env!("CARGO_PKG_VERSION"));
    match settings_error {
        Some(e) => log::warn!("Settings file {:?}: {}; using defaults", settings.path(), e),
        None => log::info!("Settings file: {:?}", settings.path()),
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = CameraReactionsApp::new(settings);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
        return ExitCode::FAILURE;
    }

    if app.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
