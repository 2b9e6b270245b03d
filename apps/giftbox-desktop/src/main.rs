mod ui;

use anyhow::Result;
use clap::Parser;
use egui::Context as EguiContext;
use giftbox_input::Action;
use giftbox_kernel::Clock;
use giftbox_render_wgpu::{GpuContext, WgpuFrame, WgpuRenderer};
use giftbox_runtime::{AppConfig, AppState, WindowConfig, tick};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "giftbox-desktop", about = "Giftbox desktop scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// glTF/GLB model drawn in place of the primary box
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Image mapped onto the primary box
    #[arg(long)]
    box_texture: Option<PathBuf>,

    /// Image mapped onto the floor
    #[arg(long)]
    floor_texture: Option<PathBuf>,
}

/// Window and GPU resources, created once the event loop resumes.
struct Gpu {
    window: Arc<Window>,
    context: GpuContext,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: AppState,
    window_config: WindowConfig,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    /// Debug panel button presses, applied before the next frame.
    ui_actions: Vec<Action>,
    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
}

fn apply(state: &mut AppState, action: Action) {
    if let Err(e) = state.handle_action(action) {
        tracing::error!("action {action:?} failed: {e}");
    }
}

impl GpuApp {
    fn new(state: AppState, window_config: WindowConfig) -> Self {
        Self {
            state,
            window_config,
            gpu: None,
            egui_ctx: EguiContext::default(),
            ui_actions: Vec::new(),
            dragging: false,
            cursor: None,
        }
    }

    fn create_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title(self.window_config.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.window_config.width,
                self.window_config.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs)?);
        let size = window.inner_size();

        let context = GpuContext::new(window.clone(), size.width, size.height)?;
        let renderer = WgpuRenderer::new(
            &context.device,
            &context.queue,
            context.format(),
            size.width,
            size.height,
        );

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(&context.device, context.format(), None, 1, false);

        Ok(Gpu {
            window,
            context,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn redraw(&mut self) {
        for action in std::mem::take(&mut self.ui_actions) {
            apply(&mut self.state, action);
        }

        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let output = match gpu.context.acquire() {
            Ok(Some(texture)) => texture,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("{e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut frame = WgpuFrame {
            renderer: &mut gpu.renderer,
            device: &gpu.context.device,
            queue: &gpu.context.queue,
            view: &view,
        };
        let (report, stats) = tick(&mut self.state, &mut frame);
        tracing::trace!(
            substeps = report.substeps,
            draw_calls = stats.draw_calls,
            "scene drawn"
        );

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let state = &self.state;
        let actions = &mut self.ui_actions;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui::draw_debug_panel(ctx, state, actions);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let (width, height) = gpu.context.size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let device = &gpu.context.device;
        let queue = &gpu.context.queue;
        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        gpu.egui_renderer.update_buffers(
            device,
            queue,
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
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        match self.create_gpu(event_loop) {
            Ok(gpu) => {
                let size = gpu.window.inner_size();
                self.gpu = Some(gpu);
                apply(
                    &mut self.state,
                    Action::Resize {
                        width: size.width,
                        height: size.height,
                    },
                );
            }
            Err(e) => {
                tracing::error!("failed to initialize graphics: {e:#}");
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
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        if gpu.egui_winit.on_window_event(&gpu.window, &event).consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.context.resize(new_size.width, new_size.height);
                apply(
                    &mut self.state,
                    Action::Resize {
                        width: new_size.width,
                        height: new_size.height,
                    },
                );
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Err(e) = self.state.handle_key(&format!("{key:?}")) {
                    tracing::error!("key {key:?} failed: {e}");
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: button_state,
                ..
            } => {
                self.dragging = button_state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (true, Some(last)) = (self.dragging, self.cursor) {
                    self.state
                        .camera
                        .rotate((position.x - last.x) as f32, (position.y - last.y) as f32);
                }
                self.cursor = Some(position);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y * 0.1,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 * 0.002,
                };
                self.state.camera.zoom(amount);
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(gpu) = &self.gpu {
                    gpu.window.request_redraw();
                }
            }
            _ => {}
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

    tracing::info!("giftbox-desktop starting");

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if cli.model.is_some() {
        config.model = cli.model;
    }
    if cli.box_texture.is_some() {
        config.textures.box_map = cli.box_texture;
    }
    if cli.floor_texture.is_some() {
        config.textures.floor_map = cli.floor_texture;
    }
    let state = AppState::new(&config, Clock::wall())?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(state, config.window.clone());
    event_loop.run_app(&mut app)?;

    Ok(())
}
