//! CPU implementation of the full pipeline

use crate::compositor::{CompositeOutput, Compositor};
use crate::config::RendererConfig;
use crate::density::DensityField;
use crate::error::Result;
use crate::gbuffer::{GBuffer, GeometryPass};
use crate::renderer::{FrameInfo, RenderStats, Renderer};
use crate::scene::SceneState;
use crate::schedule::FrameScheduler;
use image::RgbImage;
use std::time::Instant;

/// Renders frames without a GL context
///
/// Same pipeline as the deferred renderer: scheduler, density regeneration,
/// geometry pass into a [`GBuffer`], then the ray-march compositor.
pub struct SoftwareRenderer {
    field: DensityField,
    scheduler: FrameScheduler,
    gbuffer: GBuffer,
    geometry: GeometryPass,
    compositor: Compositor,
    output: Option<CompositeOutput>,
    image: Option<RgbImage>,
    stats: RenderStats,
}

impl SoftwareRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        Ok(Self {
            field: DensityField::new(config.density.resolution, config.density.shape)?,
            scheduler: FrameScheduler::new(config.regeneration),
            gbuffer: GBuffer::new(1, 1),
            geometry: GeometryPass,
            compositor: Compositor::new(config.sky_color()),
            output: None,
            image: None,
            stats: RenderStats::default(),
        })
    }

    pub fn field(&self) -> &DensityField {
        &self.field
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    /// Linear colour and transmittance of the last frame
    pub fn output(&self) -> Option<&CompositeOutput> {
        self.output.as_ref()
    }
}

impl Renderer for SoftwareRenderer {
    fn name(&self) -> &str {
        "Software"
    }

    fn supports_image_output(&self) -> bool {
        true
    }

    fn stats(&self) -> RenderStats {
        self.stats
    }

    fn render(&mut self, scene: &mut SceneState, frame: FrameInfo) -> Result<()> {
        let start = Instant::now();
        scene.camera.set_viewport(frame.width, frame.height);

        if let Some(request) = self.scheduler.begin_frame(scene, frame.index, frame.time) {
            let regen_start = Instant::now();
            self.field.apply(&request);
            self.stats.regeneration_ms = regen_start.elapsed().as_secs_f32() * 1000.0;
            self.stats.regenerations = self.scheduler.regenerations();
            self.stats.last_reason = self.scheduler.last_reason();
        }

        self.gbuffer.resize(frame.width.max(1), frame.height.max(1));
        self.geometry.render(&mut self.gbuffer, scene);

        let output = self.compositor.composite(&self.gbuffer, scene, &self.field);
        self.image = Some(output.to_image());
        self.output = Some(output);

        self.stats.frames += 1;
        self.stats.frame_ms = start.elapsed().as_secs_f32() * 1000.0;
        tracing::debug!(
            frame = frame.index,
            ms = self.stats.frame_ms,
            "Software frame rendered"
        );
        Ok(())
    }

    fn image_buffer(&self) -> Option<&RgbImage> {
        self.image.as_ref()
    }
}
