use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use heightfield_common::{TerrainParams, ViewerConfig};
use heightfield_heightmap::{Heightmap, HeightmapKind};
use heightfield_input::{Action, InputState};
use heightfield_mesh::TerrainMesh;
use heightfield_render_wgpu::{FlyCamera, TerrainRenderer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{
    DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent,
};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Size of the heightmap generated when no image is given.
const FALLBACK_SIZE: u32 = 512;

#[derive(Parser)]
#[command(name = "heightfield-viewer", about = "Fly through a heightmap terrain")]
struct Cli {
    /// Grayscale heightmap image. A generated heightmap is used when omitted.
    heightmap: Option<PathBuf>,

    /// Viewer config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Elevation per unit of pixel intensity (overrides config)
    #[arg(long)]
    scale: Option<f32>,

    /// Elevation offset added after scaling (overrides config)
    #[arg(long, allow_hyphen_values = true)]
    shift: Option<f32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn key_action(key: KeyCode) -> Option<Action> {
    let action = match key {
        KeyCode::KeyW => Action::MoveForward,
        KeyCode::KeyS => Action::MoveBackward,
        KeyCode::KeyA => Action::MoveLeft,
        KeyCode::KeyD => Action::MoveRight,
        KeyCode::Space => Action::MoveUp,
        KeyCode::ControlLeft | KeyCode::ControlRight => Action::MoveDown,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Action::Boost,
        KeyCode::KeyF => Action::ToggleWireframe,
        KeyCode::F1 => Action::ToggleOverlay,
        KeyCode::KeyR => Action::ResetCamera,
        KeyCode::Escape => Action::Quit,
        _ => return None,
    };
    Some(action)
}

fn is_release(event: &WindowEvent) -> bool {
    match event {
        WindowEvent::KeyboardInput { event, .. } => event.state == ElementState::Released,
        WindowEvent::MouseInput { state, .. } => *state == ElementState::Released,
        _ => false,
    }
}

/// Application state.
struct AppState {
    heightmap: Heightmap,
    params: TerrainParams,
    mesh: TerrainMesh,
    upload_pending: bool,
    camera: FlyCamera,
    home_camera: FlyCamera,
    input: InputState,
    keys_held: HashSet<KeyCode>,
    mouse_captured: bool,
    wireframe: bool,
    wireframe_supported: bool,
    show_overlay: bool,
    quit_requested: bool,
    last_frame: Instant,
    frame_time: f32,
}

impl AppState {
    fn new(heightmap: Heightmap, config: &ViewerConfig) -> Self {
        let params = config.terrain;
        let mesh = TerrainMesh::build(&heightmap, &params);

        let mut camera = FlyCamera::from_config(&config.camera);
        if config.camera.position.is_none() {
            camera.frame_bounds(&mesh.bounds());
        }

        Self {
            heightmap,
            params,
            mesh,
            upload_pending: true,
            home_camera: camera.clone(),
            camera,
            input: InputState::new(),
            keys_held: HashSet::new(),
            mouse_captured: false,
            wireframe: false,
            wireframe_supported: false,
            show_overlay: true,
            quit_requested: false,
            last_frame: Instant::now(),
            frame_time: 0.0,
        }
    }

    fn update(&mut self, dt: f32) {
        self.camera.apply_movement(&self.input.movement(), dt);
        // Exponential moving average for a readable overlay value
        self.frame_time = self.frame_time * 0.95 + dt * 0.05;
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        let Some(action) = key_action(key) else {
            return;
        };

        if !pressed {
            self.keys_held.remove(&key);
            // Still held through another key bound to the same action
            if !self.keys_held.iter().any(|&k| key_action(k) == Some(action)) {
                self.input.release(action);
            }
            return;
        }
        self.keys_held.insert(key);
        if !self.input.press(action) || action.is_continuous() {
            return;
        }

        match action {
            Action::ToggleWireframe => {
                if self.wireframe_supported {
                    self.wireframe = !self.wireframe;
                    tracing::debug!("wireframe: {}", self.wireframe);
                } else {
                    tracing::warn!("wireframe not supported by this adapter");
                }
            }
            Action::ToggleOverlay => {
                self.show_overlay = !self.show_overlay;
            }
            Action::ResetCamera => {
                let aspect = self.camera.aspect;
                self.camera = self.home_camera.clone();
                self.camera.aspect = aspect;
                tracing::debug!("camera reset");
            }
            Action::Quit => {
                self.quit_requested = true;
            }
            _ => {}
        }
    }

    fn set_mouse_look(&mut self, captured: bool) {
        self.mouse_captured = captured;
    }

    /// Drop every held key and the mouse capture.
    fn release_all(&mut self) {
        self.input.clear();
        self.keys_held.clear();
        self.mouse_captured = false;
    }

    fn rebuild_mesh(&mut self) {
        self.mesh = TerrainMesh::build(&self.heightmap, &self.params);
        self.upload_pending = true;
        tracing::info!(
            "rebuilt terrain with scale={} shift={}",
            self.params.scale,
            self.params.shift
        );
    }

    /// The mesh, if it changed since the last call.
    fn take_pending_upload(&mut self) -> Option<&TerrainMesh> {
        if std::mem::take(&mut self.upload_pending) {
            Some(&self.mesh)
        } else {
            None
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        if !self.show_overlay {
            return;
        }

        let mut rebuild = false;
        egui::Window::new("Terrain")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Heightmap: {}x{} ({} ch)",
                    self.heightmap.width(),
                    self.heightmap.height(),
                    self.heightmap.channels()
                ));
                ui.label(format!("Vertices: {}", self.mesh.vertex_count()));
                ui.label(format!(
                    "Strips: {}  Triangles: {}",
                    self.mesh.strip_count(),
                    self.mesh.triangle_count()
                ));
                let (lo, hi) = self.mesh.height_range();
                ui.label(format!("Elevation: {lo:.1} .. {hi:.1}"));
                ui.separator();

                let p = self.camera.position;
                ui.label(format!("Camera: ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z));
                ui.label(format!(
                    "Frame: {:.2} ms ({:.0} fps)",
                    self.frame_time * 1000.0,
                    1.0 / self.frame_time.max(1e-4)
                ));
                ui.separator();

                ui.add(egui::Slider::new(&mut self.params.scale, 0.0..=2.0).text("scale"));
                ui.add(egui::Slider::new(&mut self.params.shift, -256.0..=256.0).text("shift"));
                if ui.button("Rebuild mesh").clicked() {
                    rebuild = true;
                }
                ui.add_enabled(
                    self.wireframe_supported,
                    egui::Checkbox::new(&mut self.wireframe, "Wireframe (F)"),
                );

                ui.separator();
                ui.small("RMB: Look | WASD: Move | Space/Ctrl: Up/Down | Shift: Fast");
                ui.small("Scroll: Zoom | R: Reset | F1: Overlay | Esc: Quit");
            });

        if rebuild {
            self.rebuild_mesh();
        }
    }
}

/// Window and GPU resources, created once the event loop is running.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: TerrainRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(
        event_loop: &ActiveEventLoop,
        viewer: &ViewerConfig,
        egui_ctx: &EguiContext,
    ) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(viewer.window.title.clone())
            .with_inner_size(PhysicalSize::new(viewer.window.width, viewer.window.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter")?;

        let wireframe = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if wireframe {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("heightfield_device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if viewer.window.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer =
            TerrainRenderer::new(&device, surface_format, config.width, config.height, wireframe)?;

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend on {}",
            adapter.get_info().backend.to_str(),
            adapter.get_info().name
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.renderer
            .resize(&self.device, self.config.width, self.config.height);
    }
}

struct GpuApp {
    state: AppState,
    viewer_config: ViewerConfig,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(state: AppState, viewer_config: ViewerConfig) -> Self {
        Self {
            state,
            viewer_config,
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.state.last_frame).as_secs_f32().min(0.1);
        self.state.last_frame = now;
        self.state.update(dt);

        let Some(gpu) = &mut self.gpu else {
            return;
        };

        if let Some(mesh) = self.state.take_pending_upload() {
            gpu.renderer.upload(&gpu.device, mesh);
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.renderer.render(
            &gpu.device,
            &gpu.queue,
            &view,
            &self.state.camera,
            self.state.wireframe,
        );

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });

        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        match Gpu::new(event_loop, &self.viewer_config, &self.egui_ctx) {
            Ok(gpu) => {
                self.state.wireframe_supported = gpu.renderer.supports_wireframe();
                self.state
                    .camera
                    .set_aspect(gpu.config.width, gpu.config.height);
                self.state.upload_pending = true;
                self.gpu = Some(gpu);
            }
            Err(e) => {
                tracing::error!("failed to initialize GPU: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            // egui may swallow presses, never releases
            if response.consumed && !is_release(&event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                    self.state
                        .camera
                        .set_aspect(gpu.config.width, gpu.config.height);
                }
            }
            WindowEvent::Focused(false) => {
                self.state.release_all();
                if let Some(gpu) = &self.gpu {
                    gpu.window.set_cursor_visible(true);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                self.state
                    .handle_key(key, key_state == ElementState::Pressed);
                if self.state.quit_requested {
                    event_loop.exit();
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state: btn_state,
                ..
            } => {
                self.state
                    .set_mouse_look(btn_state == ElementState::Pressed);
                if let Some(gpu) = &self.gpu {
                    gpu.window.set_cursor_visible(!self.state.mouse_captured);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 20.0,
                };
                self.state.camera.zoom(lines * 2.0);
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.state.mouse_captured {
                self.state.camera.rotate(delta.0 as f32, delta.1 as f32);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("heightfield-viewer starting");

    let mut config = ViewerConfig::load_or_default(cli.config.as_deref())?;
    if let Some(scale) = cli.scale {
        config.terrain.scale = scale;
    }
    if let Some(shift) = cli.shift {
        config.terrain.shift = shift;
    }
    config.validate()?;

    let heightmap = match &cli.heightmap {
        Some(path) => Heightmap::load(path)
            .with_context(|| format!("loading heightmap {}", path.display()))?,
        None => {
            tracing::info!("no heightmap given, generating {FALLBACK_SIZE}x{FALLBACK_SIZE} ridges");
            Heightmap::generate(FALLBACK_SIZE, FALLBACK_SIZE, 42, HeightmapKind::Ridges)?
        }
    };

    let state = AppState::new(heightmap, &config);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(state, config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
