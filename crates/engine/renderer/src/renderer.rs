//! Renderer trait shared by the CPU and GL implementations

use crate::error::{Error, Result};
use crate::scene::SceneState;
use crate::schedule::RegenerationReason;
use image::RgbImage;
use std::path::Path;

/// Per-frame inputs that are not part of the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Monotonic frame counter, starting at 0
    pub index: u64,
    /// Seconds since start
    pub time: f32,
    pub width: u32,
    pub height: u32,
}

impl FrameInfo {
    pub fn new(index: u64, time: f32, width: u32, height: u32) -> Self {
        Self {
            index,
            time,
            width,
            height,
        }
    }
}

/// Counters shown in the performance panel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub frames: u64,
    pub regenerations: u64,
    pub last_reason: Option<RegenerationReason>,
    /// Wall time of the most recent density regeneration. GL renderers only
    /// measure the CPU side of the compute dispatch; the GPU work runs
    /// asynchronously.
    pub regeneration_ms: f32,
    /// Wall time of the most recent frame, excluding presentation
    pub frame_ms: f32,
}

/// Common renderer interface
///
/// # Capability Queries
///
/// Use `supports_gl()` and `supports_image_output()` to check renderer capabilities.
///
/// # Software Renderers
///
/// Render into an internal image buffer via `render()`, read it with
/// `image_buffer()` and write it out with `save_to_file()`.
///
/// # GL Renderers
///
/// - Call `init_gl()` once with a current context
/// - Call `render_to_framebuffer()` each frame with the target framebuffer bound
/// - Call `destroy_gl()` before the context goes away
///
/// Unsupported operations return [`Error::Unsupported`].
pub trait Renderer {
    /// Name shown in logs and the performance panel
    fn name(&self) -> &str;

    fn supports_gl(&self) -> bool {
        false
    }

    fn stats(&self) -> RenderStats {
        RenderStats::default()
    }

    fn supports_image_output(&self) -> bool {
        false
    }

    /// Render one frame into the internal image buffer
    fn render(&mut self, scene: &mut SceneState, frame: FrameInfo) -> Result<()> {
        let _ = (scene, frame);
        Err(Error::unsupported(self.name(), "image rendering"))
    }

    // GL lifecycle methods

    /// Create shaders, buffers and textures
    fn init_gl(&mut self, gl: &glow::Context, scene: &SceneState) -> Result<()> {
        let _ = (gl, scene);
        Err(Error::unsupported(self.name(), "GL rendering"))
    }

    /// Release GL resources. Safe to call more than once.
    fn destroy_gl(&mut self, gl: &glow::Context) {
        let _ = gl;
    }

    /// Render into the currently bound framebuffer
    fn render_to_framebuffer(
        &mut self,
        gl: &glow::Context,
        scene: &mut SceneState,
        frame: FrameInfo,
    ) -> Result<()> {
        let _ = (gl, scene, frame);
        Err(Error::unsupported(self.name(), "framebuffer rendering"))
    }

    // Image output

    fn image_buffer(&self) -> Option<&RgbImage> {
        None
    }

    /// Write the internal image buffer, format chosen by extension
    fn save_to_file(&self, path: &Path) -> Result<()> {
        match self.image_buffer() {
            Some(buffer) => {
                buffer.save(path)?;
                tracing::info!("Saved {}", path.display());
                Ok(())
            }
            None => Err(Error::unsupported(self.name(), "image buffer")),
        }
    }
}

