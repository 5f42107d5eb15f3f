//! Application state holding the wgpu graphics context
//!
//! Owns the window surface, the egui integration and the per-frame chain:
//! camera read, gesture pipeline, virtual camera, preview.

use std::sync::Arc;
use std::time::Instant;

use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::Window;

use anyhow::{anyhow, Context, Result};

use crate::camera::{CameraCapture, CameraInfo};
use crate::config::SettingsStore;
use crate::gesture::Gesture;
use crate::ml::OnnxHandLandmarker;
use crate::network::{self, VideoSink, VirtualCamera};
use crate::pipeline::ReactionPipeline;

/// Minimum presence score for the hand landmark model
const MIN_DETECTION_CONFIDENCE: f32 = 0.7;

/// UI actions collected while egui runs, applied afterwards
#[derive(Default)]
struct UiActions {
    toggle_running: bool,
    select_camera: Option<u32>,
    gesture_toggles: Vec<(Gesture, bool)>,
    debug_overlay: Option<bool>,
    confidence: Option<f32>,
    duration: Option<f32>,
    trigger: Option<Gesture>,
    clear_effects: bool,
}

/// Main application state
pub struct App {
    /// Reference to the window
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Current window size in physical pixels
    size: PhysicalSize<u32>,

    // egui integration
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    preview: Option<egui::TextureHandle>,

    settings: SettingsStore,
    camera: CameraCapture,
    available_cameras: Vec<CameraInfo>,
    pipeline: ReactionPipeline,
    virtual_camera: VirtualCamera<Box<dyn VideoSink>>,
    /// Frame processing enabled (start/stop toggle)
    running: bool,
    /// Last non-fatal problem shown in the status line
    status_message: Option<String>,

    // Frame timing
    frame_count: u64,
    fps: f64,
    last_fps_update: Instant,
    frames_since_update: u64,
    missed_reads: u64,
}

impl App {
    /// Create the graphics context and open the camera, model and virtual camera
    ///
    /// Any error here is fatal to the application.
    pub async fn new(window: Arc<Window>, settings: SettingsStore) -> Result<Self> {
        let size = window.inner_size();
        let prefs = settings.settings().clone();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create window surface")?;

        let power_preference = if prefs.enable_gpu {
            wgpu::PowerPreference::HighPerformance
        } else {
            wgpu::PowerPreference::LowPower
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("failed to find a suitable GPU adapter"))?;

        log::info!("Using GPU: {}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Camera Reactions Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;

        log::info!("Surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let egui_ctx = egui::Context::default();
        let mut style = (*egui_ctx.style()).clone();
        style.visuals.window_shadow = egui::epaint::Shadow::NONE;
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        // Frame chain
        let landmarker = OnnxHandLandmarker::new(MIN_DETECTION_CONFIDENCE)
            .context("failed to load the hand landmark model")?;
        let pipeline = ReactionPipeline::new(Box::new(landmarker), &prefs, rand::random());

        let camera = CameraCapture::open(
            prefs.camera_index,
            prefs.camera_width,
            prefs.camera_height,
            prefs.camera_fps,
        )
        .with_context(|| format!("failed to open camera {}", prefs.camera_index))?;

        let sink = network::platform_sink(&prefs).context("no virtual camera output available")?;
        let mut virtual_camera = VirtualCamera::new(
            sink,
            prefs.virtual_camera_name.clone(),
            prefs.camera_width,
            prefs.camera_height,
            prefs.camera_fps,
        );
        virtual_camera
            .start()
            .context("failed to start the virtual camera")?;

        let available_cameras = CameraCapture::list_cameras();

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            egui_ctx,
            egui_state,
            egui_renderer,
            preview: None,
            settings,
            camera,
            available_cameras,
            pipeline,
            virtual_camera,
            running: true,
            status_message: None,
            frame_count: 0,
            fps: 0.0,
            last_fps_update: Instant::now(),
            frames_since_update: 0,
            missed_reads: 0,
        })
    }

    /// Handle a window event, returning true if egui consumed it
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(&self.window, event);
        response.consumed
    }

    /// Resize the surface
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Frame rate the redraw loop is driven at
    pub fn target_fps(&self) -> u32 {
        self.settings.settings().camera_fps.max(1)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pause or resume frame processing
    pub fn toggle_running(&mut self) {
        self.running = !self.running;
        log::info!("Camera {}", if self.running { "started" } else { "stopped" });
    }

    /// Stop every playing effect
    pub fn clear_effects(&mut self) {
        self.pipeline.engine_mut().clear();
        log::info!("Effects cleared");
    }

    /// Switch capture device; the current camera stays open if the new one fails
    pub fn select_camera(&mut self, index: u32) {
        if index == self.camera.index() && self.camera.is_open() {
            return;
        }
        let prefs = self.settings.settings().clone();
        match CameraCapture::open(index, prefs.camera_width, prefs.camera_height, prefs.camera_fps) {
            Ok(camera) => {
                self.camera = camera;
                self.settings.update(|s| s.camera_index = index);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to switch camera: {}", e);
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Read one frame, run it through the pipeline, publish and preview it
    ///
    /// A missed read skips this tick.
    pub fn update(&mut self) {
        if !self.running {
            return;
        }

        let frame = match self.camera.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.missed_reads += 1;
                log::debug!("Camera read skipped: {}", e);
                return;
            }
        };

        let output = self.pipeline.process_frame(&frame.image, self.settings.settings());
        self.virtual_camera.send_frame(&output);
        self.update_preview(&output);
    }

    fn update_preview(&mut self, frame: &image::RgbaImage) {
        let size = [frame.width() as usize, frame.height() as usize];
        let image = egui::ColorImage::from_rgba_unmultiplied(size, frame.as_raw());
        match &mut self.preview {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.preview = Some(self.egui_ctx.load_texture(
                    "camera-preview",
                    image,
                    egui::TextureOptions::LINEAR,
                ));
            }
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        self.render_ui(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.update_fps();
        Ok(())
    }

    fn render_ui(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let raw_input = self.egui_state.take_egui_input(&self.window);

        // Snapshot state so the UI closure does not borrow self
        let prefs = self.settings.settings().clone();
        let running = self.running;
        let fps = self.fps;
        let cameras = self.available_cameras.clone();
        let current_camera = self.camera.index();
        let detection = self.pipeline.last_detection();
        let last_gesture = self.pipeline.last_gesture();
        let hands = self.pipeline.hands_in_last_frame();
        let active = self.pipeline.engine().active_gestures();
        let sink_name = self.virtual_camera.technology_name();
        let sink_active = self.virtual_camera.is_active();
        let frames_sent = self.virtual_camera.frames_sent();
        let missed_reads = self.missed_reads;
        let status_message = self.status_message.clone();
        let preview = self.preview.as_ref().map(|t| (t.id(), t.size_vec2()));

        let mut actions = UiActions::default();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(format!("FPS: {:.1}", fps));
                    ui.separator();
                    ui.label(format!("Hands: {}", hands));
                    ui.separator();
                    match last_gesture {
                        Some(g) => ui.label(format!("Gesture: {} ({:.2})", g.display_name(), detection.confidence)),
                        None => ui.label("Gesture: none"),
                    };
                    ui.separator();
                    let names: Vec<&str> = active.iter().map(|g| g.as_str()).collect();
                    ui.label(format!("Active: {}", if names.is_empty() { "-".to_string() } else { names.join(", ") }));
                    ui.separator();
                    ui.label(format!(
                        "{}: {} ({} frames)",
                        sink_name,
                        if sink_active { "on" } else { "off" },
                        frames_sent
                    ));
                    if missed_reads > 0 {
                        ui.separator();
                        ui.label(format!("Missed reads: {}", missed_reads));
                    }
                    if let Some(message) = &status_message {
                        ui.separator();
                        ui.colored_label(egui::Color32::LIGHT_RED, message);
                    }
                });
            });

            egui::SidePanel::left("controls").show(ctx, |ui| {
                ui.heading("Camera");
                ui.separator();

                let selected_name = cameras
                    .iter()
                    .find(|c| c.index == current_camera)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| format!("Camera {}", current_camera));
                egui::ComboBox::from_label("Device")
                    .selected_text(selected_name)
                    .show_ui(ui, |ui| {
                        for camera in &cameras {
                            if ui
                                .selectable_label(camera.index == current_camera, &camera.name)
                                .clicked()
                            {
                                actions.select_camera = Some(camera.index);
                            }
                        }
                    });

                if ui.button(if running { "Stop" } else { "Start" }).clicked() {
                    actions.toggle_running = true;
                }

                ui.add_space(8.0);
                ui.heading("Enabled Gestures");
                ui.separator();
                for gesture in Gesture::ALL {
                    let mut enabled = prefs.enabled_gestures.get(gesture);
                    if ui.checkbox(&mut enabled, gesture.display_name()).changed() {
                        actions.gesture_toggles.push((gesture, enabled));
                    }
                }

                ui.add_space(8.0);
                ui.heading("Detection");
                ui.separator();
                let mut confidence = prefs.gesture_confidence;
                if ui
                    .add(egui::Slider::new(&mut confidence, 0.5..=1.0).text("Confidence"))
                    .changed()
                {
                    actions.confidence = Some(confidence);
                }
                let mut duration = prefs.effect_duration;
                if ui
                    .add(egui::Slider::new(&mut duration, 1.0..=10.0).text("Duration (s)"))
                    .changed()
                {
                    actions.duration = Some(duration);
                }
                let mut debug_overlay = prefs.show_debug_overlay;
                if ui.checkbox(&mut debug_overlay, "Show hand landmarks").changed() {
                    actions.debug_overlay = Some(debug_overlay);
                }

                ui.add_space(8.0);
                ui.collapsing("Test effects", |ui| {
                    for gesture in Gesture::ALL {
                        let enabled = prefs.enabled_gestures.get(gesture);
                        if ui
                            .add_enabled(enabled, egui::Button::new(gesture.display_name()))
                            .clicked()
                        {
                            actions.trigger = Some(gesture);
                        }
                    }
                    if ui.button("Clear").clicked() {
                        actions.clear_effects = true;
                    }
                });
            });

            egui::CentralPanel::default()
                .frame(egui::Frame::NONE.fill(egui::Color32::BLACK))
                .show(ctx, |ui| match preview {
                    Some((id, size)) => {
                        let available = ui.available_size();
                        let scale = (available.x / size.x).min(available.y / size.y);
                        ui.centered_and_justified(|ui| {
                            ui.add(egui::Image::new((id, size * scale)));
                        });
                    }
                    None => {
                        ui.centered_and_justified(|ui| {
                            ui.label(if running { "Waiting for camera..." } else { "Stopped" });
                        });
                    }
                });
        });

        self.apply_ui_actions(actions);

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            self.egui_renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    fn apply_ui_actions(&mut self, actions: UiActions) {
        if actions.toggle_running {
            self.toggle_running();
        }
        if let Some(index) = actions.select_camera {
            self.select_camera(index);
        }
        for (gesture, enabled) in actions.gesture_toggles {
            self.settings.enable_gesture(gesture, enabled);
        }

        let settings_changed =
            actions.debug_overlay.is_some() || actions.confidence.is_some() || actions.duration.is_some();
        if settings_changed {
            self.settings.update(|s| {
                if let Some(show) = actions.debug_overlay {
                    s.show_debug_overlay = show;
                }
                if let Some(confidence) = actions.confidence {
                    s.gesture_confidence = confidence;
                }
                if let Some(duration) = actions.duration {
                    s.effect_duration = duration;
                }
            });
            self.pipeline.apply_settings(self.settings.settings());
        }

        if let Some(gesture) = actions.trigger {
            let enabled = &self.settings.settings().enabled_gestures;
            self.pipeline.trigger_manual(gesture, enabled, Instant::now());
        }
        if actions.clear_effects {
            self.clear_effects();
        }
    }

    fn update_fps(&mut self) {
        self.frame_count += 1;
        self.frames_since_update += 1;

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_fps_update).as_secs_f64();
        if elapsed >= 1.0 {
            self.fps = self.frames_since_update as f64 / elapsed;
            self.frames_since_update = 0;
            self.last_fps_update = now;
        }
    }

    /// Release the camera, model and virtual camera
    pub fn shutdown(&mut self) {
        log::info!("Shutting down after {} frames", self.frame_count);
        self.camera.stop();
        self.virtual_camera.stop();
        self.pipeline.cleanup();
    }
}
