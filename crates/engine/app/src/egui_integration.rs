//! Egui integration for the GL runner
//!
//! Wraps egui_glow and egui_winit so the runner only has to forward events
//! and call [`EguiIntegration::run`] once per frame.

use egui::Context as EguiContext;
use egui_glow::Painter;
use egui_winit::State as EguiState;
use glow::Context;
use std::sync::Arc;
use winit::window::Window;

pub struct EguiIntegration {
    /// Egui context for running UI logic
    pub ctx: EguiContext,
    state: EguiState,
    painter: Painter,
}

impl EguiIntegration {
    /// # Safety
    /// The GL context must be current when this is called.
    pub unsafe fn new(window: &Window, gl: Arc<Context>) -> anyhow::Result<Self> {
        let ctx = EguiContext::default();
        let state = EguiState::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            None,
            None,
            None,
        );
        let painter = Painter::new(gl, "", None, false)
            .map_err(|e| anyhow::anyhow!("Failed to create egui painter: {e}"))?;

        Ok(Self {
            ctx,
            state,
            painter,
        })
    }

    pub fn context(&self) -> &EguiContext {
        &self.ctx
    }

    /// Returns true if egui wants exclusive use of this event
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// True while egui owns the pointer (dragging a slider, hovering a panel)
    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input() || self.ctx.is_pointer_over_area()
    }

    /// Run `run_ui` and paint the result on top of the current framebuffer
    pub fn run(&mut self, window: &Window, size: [u32; 2], run_ui: impl FnMut(&EguiContext)) {
        let raw_input = self.state.take_egui_input(window);
        let full_output = self.ctx.run(raw_input, run_ui);

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let clipped_primitives = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        self.painter.paint_and_update_textures(
            size,
            full_output.pixels_per_point,
            &clipped_primitives,
            &full_output.textures_delta,
        );
    }
}

impl Drop for EguiIntegration {
    fn drop(&mut self) {
        self.painter.destroy();
    }
}
