//! Fullscreen pass: surface shading, cloud march and composite

use crate::error::{Error, Result};
use crate::gl::{GlDensityField, GlGBuffer, GlUniforms};
use crate::scene::SceneState;
use crate::shader_utils::create_program;
use crate::uniforms::UniformSink;
use glam::Vec3;
use glow::*;

const LIGHTING_VERTEX_SHADER: &str = include_str!("../shaders/lighting.vert");
const LIGHTING_FRAGMENT_SHADER: &str = include_str!("../shaders/lighting.frag");

/// Texture unit the density volume is bound to; 0..=2 hold the G-buffer
pub const DENSITY_TEXTURE_UNIT: u32 = 3;

pub struct GlLightingPass {
    program: Program,
    vao: VertexArray,
}

impl GlLightingPass {
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn new(gl: &Context) -> Result<Self> {
        unsafe {
            let program = create_program(gl, LIGHTING_VERTEX_SHADER, LIGHTING_FRAGMENT_SHADER)?;
            // The fullscreen triangle is generated from gl_VertexID, but core
            // profiles still require a bound VAO to draw
            let vao = gl
                .create_vertex_array()
                .map_err(|e| Error::gl("lighting VAO", e))?;
            tracing::info!("Lighting pass shaders compiled");
            Ok(Self { program, vao })
        }
    }

    /// Draw into the currently bound framebuffer
    ///
    /// # Safety
    /// Requires an active GL context with the target framebuffer bound.
    pub unsafe fn render(
        &self,
        gl: &Context,
        gbuffer: &GlGBuffer,
        density: &GlDensityField,
        scene: &SceneState,
        sky_color: Vec3,
        viewport: (u32, u32),
    ) {
        unsafe {
            gl.viewport(0, 0, viewport.0 as i32, viewport.1 as i32);
            gl.disable(DEPTH_TEST);
            gl.disable(CULL_FACE);

            gl.use_program(Some(self.program));
            let mut uniforms = GlUniforms::new(gl, self.program);

            gbuffer.bind_textures(gl);
            uniforms.set("gPosition", 0_i32);
            uniforms.set("gNormal", 1_i32);
            uniforms.set("gAlbedo", 2_i32);
            density.bind_for_sampling(gl, DENSITY_TEXTURE_UNIT, &mut uniforms);

            scene.write_light_uniforms(&mut uniforms);
            scene.write_camera_uniforms(&mut uniforms);
            scene.volume().write_uniforms(&mut uniforms);
            scene.generation().write_uniforms(&mut uniforms);
            uniforms.set("u_invProjViewMat", scene.camera.view_projection().inverse());
            uniforms.set("u_skyColor", sky_color);

            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(TRIANGLES, 0, 3);
            gl.bind_vertex_array(None);

            gl.use_program(None);
            gl.active_texture(TEXTURE0);
        }
    }

    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn destroy(&self, gl: &Context) {
        unsafe {
            gl.delete_program(self.program);
            gl.delete_vertex_array(self.vao);
        }
    }
}
