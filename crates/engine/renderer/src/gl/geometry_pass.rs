//! Rasterises scene objects into the G-buffer

use crate::error::Result;
use crate::gl::{GlGBuffer, GlMeshCache, GlUniforms};
use crate::scene::SceneState;
use crate::shader_utils::create_program;
use crate::uniforms::UniformSink;
use glow::*;

const GEOMETRY_VERTEX_SHADER: &str = include_str!("../shaders/geometry.vert");
const GEOMETRY_FRAGMENT_SHADER: &str = include_str!("../shaders/geometry.frag");

pub struct GlGeometryPass {
    program: Program,
}

impl GlGeometryPass {
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn new(gl: &Context) -> Result<Self> {
        let program =
            unsafe { create_program(gl, GEOMETRY_VERTEX_SHADER, GEOMETRY_FRAGMENT_SHADER)? };
        tracing::info!("Geometry pass shaders compiled");
        Ok(Self { program })
    }

    /// Clear the G-buffer and draw every object that has an uploaded mesh.
    /// Objects whose mesh is missing from `meshes` are skipped.
    ///
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn render(
        &self,
        gl: &Context,
        gbuffer: &GlGBuffer,
        scene: &SceneState,
        meshes: &GlMeshCache,
        wireframe: bool,
    ) {
        unsafe {
            gbuffer.begin(gl);

            gl.enable(DEPTH_TEST);
            gl.depth_func(LESS);
            gl.disable(CULL_FACE);
            gl.disable(BLEND);
            gl.polygon_mode(FRONT_AND_BACK, if wireframe { LINE } else { FILL });

            gl.use_program(Some(self.program));
            let mut uniforms = GlUniforms::new(gl, self.program);
            scene.write_camera_uniforms(&mut uniforms);

            for object in scene.objects() {
                let Some(mesh) = meshes.get(object.mesh) else {
                    tracing::warn!(mesh = object.mesh.index(), "Mesh not uploaded, skipping");
                    continue;
                };
                uniforms.set("u_modelMat", object.model);
                uniforms.set("u_transposeInverseModelMat", object.normal_matrix());
                uniforms.set("u_albedo", object.albedo);
                mesh.draw(gl);
            }

            gl.use_program(None);
            gl.polygon_mode(FRONT_AND_BACK, FILL);
            gbuffer.end(gl);
        }
    }

    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn destroy(&self, gl: &Context) {
        unsafe { gl.delete_program(self.program) };
    }
}
