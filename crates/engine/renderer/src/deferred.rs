//! Deferred GL renderer: compute-generated clouds over rasterised geometry

use crate::config::RendererConfig;
use crate::density::CloudShape;
use crate::error::{Error, Result};
use crate::gl::{GlDensityField, GlGBuffer, GlGeometryPass, GlLightingPass, GlMeshCache};
use crate::renderer::{FrameInfo, RenderStats, Renderer};
use crate::scene::SceneState;
use crate::schedule::FrameScheduler;
use glam::Vec3;
use glow::{Context, HasContext};
use std::time::Instant;

/// GL objects, alive between `init_gl` and `destroy_gl`
struct GlState {
    density: GlDensityField,
    gbuffer: GlGBuffer,
    geometry: GlGeometryPass,
    lighting: GlLightingPass,
    meshes: GlMeshCache,
}

pub struct DeferredRenderer {
    config: RendererConfig,
    scheduler: FrameScheduler,
    sky_color: Vec3,
    wireframe: bool,
    gl_state: Option<GlState>,
    stats: RenderStats,
}

impl DeferredRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            scheduler: FrameScheduler::new(config.regeneration),
            sky_color: config.sky_color(),
            config,
            wireframe: false,
            gl_state: None,
            stats: RenderStats::default(),
        }
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    /// Draw the geometry pass as lines
    pub fn set_wireframe(&mut self, wireframe: bool) {
        if self.wireframe != wireframe {
            tracing::info!(wireframe, "Geometry fill mode changed");
        }
        self.wireframe = wireframe;
    }

    pub fn shape(&self) -> &CloudShape {
        &self.config.density.shape
    }

    /// Replace the noise parameters; takes effect at the next regeneration
    pub fn set_shape(&mut self, shape: CloudShape) {
        self.config.density.shape = shape;
        if let Some(state) = self.gl_state.as_mut() {
            state.density.set_shape(shape);
        }
    }
}

impl Renderer for DeferredRenderer {
    fn name(&self) -> &str {
        "Deferred"
    }

    fn supports_gl(&self) -> bool {
        true
    }

    fn stats(&self) -> RenderStats {
        self.stats
    }

    fn init_gl(&mut self, gl: &Context, scene: &SceneState) -> Result<()> {
        if self.gl_state.is_some() {
            return Ok(());
        }

        let (width, height) = (1, 1);
        unsafe {
            let version = gl.version();
            tracing::info!(
                "GL {}.{} ({})",
                version.major,
                version.minor,
                version.vendor_info
            );

            let density = GlDensityField::new(
                gl,
                self.config.density.resolution,
                self.config.density.shape,
            )?;
            let gbuffer = GlGBuffer::new(gl, width, height)?;
            let geometry = GlGeometryPass::new(gl)?;
            let lighting = GlLightingPass::new(gl)?;
            let mut meshes = GlMeshCache::default();
            meshes.sync(gl, scene.meshes())?;

            self.gl_state = Some(GlState {
                density,
                gbuffer,
                geometry,
                lighting,
                meshes,
            });
        }

        tracing::info!("Deferred renderer initialized");
        Ok(())
    }

    fn destroy_gl(&mut self, gl: &Context) {
        if let Some(mut state) = self.gl_state.take() {
            unsafe {
                state.density.destroy(gl);
                state.gbuffer.destroy(gl);
                state.geometry.destroy(gl);
                state.lighting.destroy(gl);
                state.meshes.destroy(gl);
            }
            tracing::info!("Deferred renderer destroyed");
        }
    }

    fn render_to_framebuffer(
        &mut self,
        gl: &Context,
        scene: &mut SceneState,
        frame: FrameInfo,
    ) -> Result<()> {
        let Some(state) = self.gl_state.as_mut() else {
            return Err(Error::gl(
                "deferred renderer",
                "render_to_framebuffer called before init_gl",
            ));
        };
        let start = Instant::now();
        scene.camera.set_viewport(frame.width, frame.height);

        unsafe {
            state.gbuffer.resize(gl, frame.width, frame.height)?;
            state.meshes.sync(gl, scene.meshes())?;

            if let Some(request) = self.scheduler.begin_frame(scene, frame.index, frame.time) {
                let regen_start = Instant::now();
                state.density.regenerate(gl, &request);
                self.stats.regeneration_ms = regen_start.elapsed().as_secs_f32() * 1000.0;
                self.stats.regenerations = self.scheduler.regenerations();
                self.stats.last_reason = self.scheduler.last_reason();
            }

            state
                .geometry
                .render(gl, &state.gbuffer, scene, &state.meshes, self.wireframe);
            state.lighting.render(
                gl,
                &state.gbuffer,
                &state.density,
                scene,
                self.sky_color,
                (frame.width.max(1), frame.height.max(1)),
            );
        }

        self.stats.frames += 1;
        self.stats.frame_ms = start.elapsed().as_secs_f32() * 1000.0;
        Ok(())
    }
}
