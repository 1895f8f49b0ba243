//! Application framework for native OpenGL viewers
//!
//! - [`App`] trait: the lifecycle hooks an application implements
//! - [`FrameContext`] / [`InputState`]: per-frame information handed to it
//! - [`cli::CommonArgs`]: shared command line flags
//!
//! With the `runtime` feature enabled, additional utilities are available:
//! - [`run_app`]: window creation, GL context setup and the event loop
//! - [`EguiIntegration`]: egui UI rendering integration

use glow::Context;
use winit::event::WindowEvent;
use winit::window::Window;

pub mod cli;
mod input;

pub use input::{InputState, MouseButtons};

// Runtime module (requires runtime feature)
#[cfg(feature = "runtime")]
mod egui_integration;
#[cfg(feature = "runtime")]
mod runner;

#[cfg(feature = "runtime")]
pub use egui_integration::EguiIntegration;
#[cfg(feature = "runtime")]
pub use runner::{create_event_loop, run_app, AppConfig, AppRuntime, DebugMode};

// Re-export egui when runtime feature is enabled
#[cfg(feature = "runtime")]
pub use egui;

/// Frame context passed to every [`App`] hook
///
/// Carries the graphics context, window and timing so apps do not store them.
pub struct FrameContext<'a> {
    pub gl: &'a Context,
    /// Window reference (for DPI, size, etc.)
    pub window: &'a Window,
    /// Time since last frame in seconds
    pub delta_time: f32,
    /// Total elapsed time since app start in seconds
    pub elapsed: f32,
    /// Current frame number
    pub frame: u64,
    /// Framebuffer size in pixels (width, height)
    pub size: (u32, u32),
}

impl FrameContext<'_> {
    #[inline]
    pub fn width(&self) -> u32 {
        self.size.0
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.1
    }
}

/// Application lifecycle
///
/// 1. `init()` once the GL context is current
/// 2. `update()`, `render()` and `ui()` every frame
/// 3. `shutdown()` before the context is destroyed
pub trait App {
    /// Create GL resources. An error aborts startup and is returned from
    /// `run_app`.
    fn init(&mut self, ctx: &FrameContext) -> anyhow::Result<()>;

    /// Release GL resources
    fn shutdown(&mut self, ctx: &FrameContext);

    /// Window event not consumed by egui. Return true to consume it.
    fn on_event(&mut self, _event: &WindowEvent) -> bool {
        false
    }

    /// Per-frame logic, called before rendering
    fn update(&mut self, ctx: &FrameContext, input: &InputState);

    /// Draw into the default framebuffer. A failed frame stops the app.
    fn render(&mut self, ctx: &FrameContext) -> anyhow::Result<()>;

    /// Build the egui UI for this frame (optional)
    #[cfg(feature = "runtime")]
    fn ui(&mut self, _ctx: &FrameContext, _egui: &egui::Context) {}

    /// Checked after every update; true ends the event loop
    fn should_exit(&self) -> bool {
        false
    }
}
