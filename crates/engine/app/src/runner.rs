//! Application runner for OpenGL applications
//!
//! Window creation, OpenGL context setup and the event loop.

use anyhow::{anyhow, Context as _};
use glam::Vec2;
use glow::{Context, HasContext};
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasWindowHandle;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

#[cfg(target_os = "linux")]
use winit::platform::x11::EventLoopBuilderExtX11;

use crate::{App, EguiIntegration, FrameContext, InputState};

/// Run a fixed number of frames, save the last one and exit
#[derive(Debug, Clone)]
pub struct DebugMode {
    pub frames: u64,
    pub output_path: PathBuf,
}

impl DebugMode {
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            output_path: PathBuf::from("output/frame_last.png"),
        }
    }
}

/// Configuration for the application window
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub gl_major: u8,
    pub gl_minor: u8,
    pub debug_mode: Option<DebugMode>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Application".to_string(),
            width: 800,
            height: 600,
            gl_major: 4,
            gl_minor: 3,
            debug_mode: None,
        }
    }
}

impl AppConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable debug mode with the specified number of frames
    pub fn with_debug_mode(mut self, frames: u64) -> Self {
        self.debug_mode = Some(DebugMode::new(frames));
        self
    }
}

/// Window, context and surface, created on the first `resumed`
struct GlWindow {
    window: Window,
    gl_context: glutin::context::PossiblyCurrentContext,
    gl_surface: glutin::surface::Surface<WindowSurface>,
    gl: Arc<Context>,
    egui: EguiIntegration,
}

/// Runtime state for an application
pub struct AppRuntime<A: App> {
    config: AppConfig,
    app: A,
    gl_window: Option<GlWindow>,

    // Timing
    start_time: Instant,
    last_update: Instant,
    frame_count: u64,

    // Input state (accumulated between frames)
    input_state: InputState,
    last_mouse_pos: Option<Vec2>,

    initialized: bool,
    /// First fatal error; ends the event loop and is returned from `run_app`
    error: Option<anyhow::Error>,
}

impl<A: App> AppRuntime<A> {
    pub fn new(app: A, config: AppConfig) -> Self {
        Self {
            config,
            app,
            gl_window: None,
            start_time: Instant::now(),
            last_update: Instant::now(),
            frame_count: 0,
            input_state: InputState::default(),
            last_mouse_pos: None,
            initialized: false,
            error: None,
        }
    }

    pub fn window(&self) -> Option<&Window> {
        self.gl_window.as_ref().map(|w| &w.window)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    fn create_gl_window(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<GlWindow> {
        let window_attributes = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.width,
                self.config.height,
            ));

        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_transparency(false);

        let display_builder = DisplayBuilder::new().with_window_attributes(Some(window_attributes));

        let (window, gl_config) = display_builder
            .build(event_loop, template, |configs| {
                configs
                    .reduce(|accum, config| {
                        if config.num_samples() > accum.num_samples() {
                            config
                        } else {
                            accum
                        }
                    })
                    .expect("glutin offers at least one config")
            })
            .map_err(|e| anyhow!("Failed to build display: {e}"))?;

        let window = window.context("No window was created")?;
        let window_handle = window
            .window_handle()
            .context("Window has no handle")?
            .as_raw();
        let gl_display = gl_config.display();

        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(
                self.config.gl_major,
                self.config.gl_minor,
            ))))
            .build(Some(window_handle));

        let gl_context = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .with_context(|| {
                format!(
                    "Failed to create an OpenGL {}.{} core context",
                    self.config.gl_major, self.config.gl_minor
                )
            })?;

        let size = window.inner_size();
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            window_handle,
            NonZeroU32::new(size.width.max(1)).context("zero width")?,
            NonZeroU32::new(size.height.max(1)).context("zero height")?,
        );

        let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs) }
            .context("Failed to create window surface")?;
        let gl_context = gl_context
            .make_current(&gl_surface)
            .context("Failed to make GL context current")?;

        let gl = Arc::new(unsafe {
            Context::from_loader_function_cstr(|s| gl_display.get_proc_address(s))
        });
        tracing::info!("OpenGL context created");

        let egui = unsafe { EguiIntegration::new(&window, Arc::clone(&gl))? };

        Ok(GlWindow {
            window,
            gl_context,
            gl_surface,
            gl,
            egui,
        })
    }
}

/// Read the default framebuffer and save it, flipped to top-down rows
fn capture_frame(gl: &Context, width: u32, height: u32, path: &Path) -> anyhow::Result<()> {
    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    unsafe {
        gl.read_pixels(
            0,
            0,
            width as i32,
            height as i32,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelPackData::Slice(Some(&mut pixels)),
        );
    }

    let img = image::RgbaImage::from_raw(width, height, flip_rows(&pixels, width as usize * 4))
        .context("Failed to create image buffer")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    img.save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(())
}

/// Reverse the row order of a tightly packed pixel buffer
///
/// OpenGL reads back with the origin at bottom-left, images want top-left.
fn flip_rows(pixels: &[u8], row_len: usize) -> Vec<u8> {
    if row_len == 0 {
        return Vec::new();
    }
    pixels.chunks_exact(row_len).rev().flatten().copied().collect()
}

impl<A: App> ApplicationHandler for AppRuntime<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gl_window.is_some() {
            return;
        }

        tracing::info!("Initializing window and GL context");
        let gl_window = match self.create_gl_window(event_loop) {
            Ok(w) => w,
            Err(e) => return self.fail(event_loop, e),
        };

        if !self.initialized {
            let size = gl_window.window.inner_size();
            let ctx = FrameContext {
                gl: &gl_window.gl,
                window: &gl_window.window,
                delta_time: 0.0,
                elapsed: 0.0,
                frame: 0,
                size: (size.width, size.height),
            };
            if let Err(e) = self.app.init(&ctx) {
                self.gl_window = Some(gl_window);
                return self.fail(event_loop, e.context("App initialization failed"));
            }
            self.initialized = true;
            tracing::info!("App initialized");
        }

        self.gl_window = Some(gl_window);
        self.start_time = Instant::now();
        self.last_update = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Always update mouse button state so it cannot get stuck when egui
        // consumes the release
        if let WindowEvent::MouseInput { state, button, .. } = &event {
            let pressed = *state == ElementState::Pressed;
            match button {
                MouseButton::Left => self.input_state.mouse_buttons.left = pressed,
                MouseButton::Right => self.input_state.mouse_buttons.right = pressed,
                MouseButton::Middle => self.input_state.mouse_buttons.middle = pressed,
                _ => {}
            }
        }

        let Some(gl_window) = self.gl_window.as_mut() else {
            return;
        };

        // Let egui handle events first
        if gl_window.egui.on_window_event(&gl_window.window, &event) {
            return;
        }

        match &event {
            WindowEvent::CursorMoved { position, .. } => {
                let new_pos = Vec2::new(position.x as f32, position.y as f32);
                if let Some(last_pos) = self.last_mouse_pos {
                    if !gl_window.egui.wants_pointer() {
                        self.input_state.mouse_delta += new_pos - last_pos;
                    }
                }
                self.last_mouse_pos = Some(new_pos);
                self.input_state.mouse_pos = Some(new_pos);
            }
            WindowEvent::CursorLeft { .. } => {
                self.input_state.mouse_pos = None;
                self.last_mouse_pos = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    winit::event::MouseScrollDelta::PixelDelta(pos) => {
                        Vec2::new(pos.x as f32, pos.y as f32) / 10.0
                    }
                };
                self.input_state.scroll_delta += scroll;
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.input_state.key_down(keycode),
                        ElementState::Released => self.input_state.key_up(keycode),
                    }
                }
            }
            _ => {}
        }

        if self.app.on_event(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested");
                let size = gl_window.window.inner_size();
                let ctx = FrameContext {
                    gl: &gl_window.gl,
                    window: &gl_window.window,
                    delta_time: 0.0,
                    elapsed: self.start_time.elapsed().as_secs_f32(),
                    frame: self.frame_count,
                    size: (size.width, size.height),
                };
                self.app.shutdown(&ctx);
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let (Some(width), Some(height)) =
                    (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                {
                    gl_window
                        .gl_surface
                        .resize(&gl_window.gl_context, width, height);
                }
                gl_window.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let delta_time = (now - self.last_update).as_secs_f32();
                self.last_update = now;
                let elapsed = self.start_time.elapsed().as_secs_f32();
                let size = gl_window.window.inner_size();
                if size.width == 0 || size.height == 0 {
                    // Minimised
                    return;
                }

                let ctx = FrameContext {
                    gl: &gl_window.gl,
                    window: &gl_window.window,
                    delta_time,
                    elapsed,
                    frame: self.frame_count,
                    size: (size.width, size.height),
                };

                self.app.update(&ctx, &self.input_state);
                self.input_state.end_frame();

                if self.app.should_exit() {
                    tracing::info!("App requested exit");
                    self.app.shutdown(&ctx);
                    event_loop.exit();
                    return;
                }

                if let Err(e) = self.app.render(&ctx) {
                    self.app.shutdown(&ctx);
                    tracing::error!("{e:#}");
                    self.error.get_or_insert(e.context("Frame failed"));
                    event_loop.exit();
                    return;
                }

                unsafe {
                    gl_window.gl.disable(glow::DEPTH_TEST);
                    gl_window.gl.enable(glow::BLEND);
                    gl_window
                        .gl
                        .blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
                }
                let app = &mut self.app;
                gl_window
                    .egui
                    .run(&gl_window.window, [size.width, size.height], |egui_ctx| {
                        app.ui(&ctx, egui_ctx);
                    });
                unsafe {
                    gl_window.gl.disable(glow::BLEND);
                }

                self.frame_count += 1;

                if let Some(debug_mode) = &self.config.debug_mode {
                    if self.frame_count >= debug_mode.frames {
                        tracing::info!(
                            "Frame {}/{}: capturing screenshot and exiting",
                            self.frame_count,
                            debug_mode.frames
                        );
                        match capture_frame(
                            &gl_window.gl,
                            size.width,
                            size.height,
                            &debug_mode.output_path,
                        ) {
                            Ok(()) => tracing::info!(
                                "Screenshot saved to {}",
                                debug_mode.output_path.display()
                            ),
                            Err(e) => tracing::error!("Failed to capture frame: {e:#}"),
                        }
                        self.app.shutdown(&ctx);
                        event_loop.exit();
                        return;
                    }
                    tracing::debug!("Frame {}/{}", self.frame_count, debug_mode.frames);
                }

                if let Err(e) = gl_window.gl_surface.swap_buffers(&gl_window.gl_context) {
                    tracing::warn!("swap_buffers failed: {e}");
                }
                gl_window.window.request_redraw();
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window() {
            window.request_redraw();
        }
    }
}

/// Run an application with the given configuration
///
/// Returns the first fatal error raised during initialization or rendering.
pub fn run_app<A: App + 'static>(app: A, config: AppConfig) -> anyhow::Result<()> {
    let event_loop = create_event_loop()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runtime = AppRuntime::new(app, config);
    event_loop
        .run_app(&mut runtime)
        .context("Event loop error")?;

    match runtime.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Create an event loop (X11 on Linux)
pub fn create_event_loop() -> anyhow::Result<EventLoop<()>> {
    #[cfg(target_os = "linux")]
    let event_loop = {
        let mut builder = EventLoop::builder();
        builder.with_x11();
        builder.build()
    };

    #[cfg(not(target_os = "linux"))]
    let event_loop = EventLoop::new();

    event_loop.context("Failed to create event loop")
}
