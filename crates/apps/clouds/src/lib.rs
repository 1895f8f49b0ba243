//! Interactive volumetric cloud viewer
//!
//! Orbit a small scene under a procedural cloud layer and tune the march,
//! generation window and lights live.

pub mod ui;

use app::{App, FrameContext, InputState};
use glam::Vec3;
use renderer::{
    Camera, DeferredRenderer, FrameInfo, OrbitController, Renderer, RendererConfig, SceneState,
    SoftwareRenderer,
};
use std::collections::VecDeque;
use std::path::Path;
use winit::keyboard::KeyCode;

/// Point the camera orbits around; the demo sphere
pub const ORBIT_TARGET: Vec3 = Vec3::new(0.0, -5.0, 0.0);
const START_POSITION: Vec3 = Vec3::new(0.0, 4.0, 30.0);

/// The demo scene viewed from the start position
pub fn demo_scene(config: &RendererConfig) -> SceneState {
    let mut scene = SceneState::demo(config.volume, config.generation);
    scene.camera = Camera::look_at(START_POSITION, ORBIT_TARGET, Vec3::Y);
    scene
}

/// Frame times over a sliding one-second window
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    samples: VecDeque<f32>,
    total: f32,
}

impl FpsCounter {
    const WINDOW_SECONDS: f32 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, delta_time: f32) {
        if !(delta_time > 0.0 && delta_time.is_finite()) {
            return;
        }
        self.samples.push_back(delta_time);
        self.total += delta_time;
        while self.total > Self::WINDOW_SECONDS && self.samples.len() > 1 {
            if let Some(old) = self.samples.pop_front() {
                self.total -= old;
            }
        }
    }

    pub fn fps(&self) -> f32 {
        if self.total > 0.0 {
            self.samples.len() as f32 / self.total
        } else {
            0.0
        }
    }

    /// Average frame time in milliseconds
    pub fn frame_ms(&self) -> f32 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.total / self.samples.len() as f32 * 1000.0
        }
    }
}

pub struct CloudsApp {
    scene: SceneState,
    renderer: DeferredRenderer,
    orbit: OrbitController,
    fps: FpsCounter,
    panel: ui::PanelState,
    exit_requested: bool,
}

impl CloudsApp {
    pub fn new(config: RendererConfig) -> Self {
        let scene = demo_scene(&config);
        let panel = ui::PanelState::new(config.density.shape);
        Self {
            scene,
            renderer: DeferredRenderer::new(config),
            orbit: OrbitController::with_target(ORBIT_TARGET),
            fps: FpsCounter::new(),
            panel,
            exit_requested: false,
        }
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn renderer(&self) -> &DeferredRenderer {
        &self.renderer
    }

    /// Keyboard shortcuts and orbit controls
    pub fn handle_input(&mut self, input: &InputState) {
        if input.was_key_pressed(KeyCode::KeyW) {
            self.renderer.set_wireframe(true);
        }
        if input.was_key_pressed(KeyCode::KeyF) {
            self.renderer.set_wireframe(false);
        }
        if input.any_key_pressed(&[KeyCode::Escape, KeyCode::KeyQ]) {
            tracing::info!("Quit requested");
            self.exit_requested = true;
        }

        if input.mouse_buttons.left && input.mouse_delta != glam::Vec2::ZERO {
            self.orbit
                .drag(input.mouse_delta.x, input.mouse_delta.y, &mut self.scene.camera);
        }
        if input.scroll_delta.y != 0.0 {
            self.orbit.zoom(input.scroll_delta.y, &mut self.scene.camera);
        }
    }
}

impl App for CloudsApp {
    fn init(&mut self, ctx: &FrameContext) -> anyhow::Result<()> {
        self.scene.camera.set_viewport(ctx.width(), ctx.height());
        self.renderer.init_gl(ctx.gl, &self.scene)?;
        Ok(())
    }

    fn shutdown(&mut self, ctx: &FrameContext) {
        self.renderer.destroy_gl(ctx.gl);
    }

    fn update(&mut self, ctx: &FrameContext, input: &InputState) {
        self.fps.tick(ctx.delta_time);
        self.handle_input(input);
    }

    fn render(&mut self, ctx: &FrameContext) -> anyhow::Result<()> {
        let frame = FrameInfo::new(ctx.frame, ctx.elapsed, ctx.width(), ctx.height());
        self.renderer
            .render_to_framebuffer(ctx.gl, &mut self.scene, frame)?;
        Ok(())
    }

    fn ui(&mut self, _ctx: &FrameContext, egui: &egui::Context) {
        ui::side_panel(
            egui,
            &mut self.scene,
            &mut self.renderer,
            &self.fps,
            &mut self.panel,
        );
    }

    fn should_exit(&self) -> bool {
        self.exit_requested
    }
}

/// Render one frame of the demo scene on the CPU and write it to `path`
pub fn render_software(
    config: &RendererConfig,
    width: u32,
    height: u32,
    path: &Path,
) -> anyhow::Result<()> {
    let mut renderer = SoftwareRenderer::new(config)?;
    let mut scene = demo_scene(config);

    renderer.render(&mut scene, FrameInfo::new(0, 0.0, width, height))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    renderer.save_to_file(path)?;

    let stats = renderer.stats();
    tracing::info!(
        "Software frame {}x{} in {:.1} ms (density {:.1} ms)",
        width,
        height,
        stats.frame_ms,
        stats.regeneration_ms
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_counter_steady_rate() {
        let mut fps = FpsCounter::new();
        for _ in 0..120 {
            fps.tick(1.0 / 60.0);
        }
        assert!((fps.fps() - 60.0).abs() < 0.5);
        assert!((fps.frame_ms() - 16.666).abs() < 0.1);
    }

    #[test]
    fn test_fps_counter_ignores_bad_deltas() {
        let mut fps = FpsCounter::new();
        fps.tick(0.0);
        fps.tick(-1.0);
        fps.tick(f32::NAN);
        assert_eq!(fps.fps(), 0.0);
        assert_eq!(fps.frame_ms(), 0.0);
    }

    #[test]
    fn test_fps_counter_forgets_old_frames() {
        let mut fps = FpsCounter::new();
        // One slow frame followed by a second of fast ones
        fps.tick(0.5);
        for _ in 0..100 {
            fps.tick(0.01);
        }
        assert!((fps.fps() - 100.0).abs() < 1.0);
    }

    fn press(key: KeyCode) -> InputState {
        let mut input = InputState::new();
        input.keys.insert(key);
        input.pressed.insert(key);
        input
    }

    #[test]
    fn test_wireframe_keys() {
        let mut app = CloudsApp::new(RendererConfig::default());
        assert!(!app.renderer().wireframe());

        app.handle_input(&press(KeyCode::KeyW));
        assert!(app.renderer().wireframe());

        app.handle_input(&press(KeyCode::KeyF));
        assert!(!app.renderer().wireframe());
    }

    #[test]
    fn test_quit_keys() {
        for key in [KeyCode::Escape, KeyCode::KeyQ] {
            let mut app = CloudsApp::new(RendererConfig::default());
            assert!(!app.should_exit());
            app.handle_input(&press(key));
            assert!(app.should_exit());
        }
    }

    #[test]
    fn test_drag_orbits_only_with_left_button() {
        let mut app = CloudsApp::new(RendererConfig::default());
        let start = app.scene().camera.position;

        let mut input = InputState::new();
        input.mouse_delta = glam::Vec2::new(40.0, 0.0);
        app.handle_input(&input);
        assert_eq!(app.scene().camera.position, start);

        input.mouse_buttons.left = true;
        app.handle_input(&input);
        let moved = app.scene().camera.position;
        assert_ne!(moved, start);
        // Orbiting keeps the distance to the target
        let before = (start - ORBIT_TARGET).length();
        assert!(((moved - ORBIT_TARGET).length() - before).abs() < 1e-3);
    }

    #[test]
    fn test_scroll_zooms_in() {
        let mut app = CloudsApp::new(RendererConfig::default());
        let before = (app.scene().camera.position - ORBIT_TARGET).length();

        let mut input = InputState::new();
        input.scroll_delta = glam::Vec2::new(0.0, 2.0);
        app.handle_input(&input);
        let after = (app.scene().camera.position - ORBIT_TARGET).length();
        assert!((before - after - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_sample_config_parses() {
        let config = RendererConfig::from_ron(include_str!("../clouds.ron")).unwrap();
        assert_eq!(config.density.resolution.xz, 128);
        assert_eq!(config.regeneration.cadence_frames, Some(5));
        assert_eq!(config.volume.num_steps, 64);
    }

    #[test]
    fn test_software_render_writes_png() {
        let mut config = RendererConfig::default();
        config.density.resolution = renderer::GridResolution::new(16, 8).unwrap();
        let path = std::env::temp_dir().join(format!("clouds_cli_{}.png", std::process::id()));

        render_software(&config, 32, 24, &path).unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }
}
