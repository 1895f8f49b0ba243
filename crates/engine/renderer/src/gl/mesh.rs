//! GPU-resident meshes

use crate::error::{Error, Result};
use crate::mesh::MeshData;
use crate::scene::{MeshId, MeshRegistry};
use glow::*;

/// Interleaved `position, normal` stride in floats
const VERTEX_STRIDE: i32 = 6;

/// Vertex array with its buffers
pub struct GlMesh {
    pub vao: VertexArray,
    pub vbo: Buffer,
    pub ebo: Buffer,
    pub index_count: i32,
}

impl GlMesh {
    /// Upload `mesh` (positions at location 0, normals at location 1)
    ///
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn upload(gl: &Context, mesh: &MeshData) -> Result<Self> {
        unsafe {
            let vertices = mesh.interleaved();
            let stride = VERTEX_STRIDE * std::mem::size_of::<f32>() as i32;

            let vao = gl
                .create_vertex_array()
                .map_err(|e| Error::gl("VAO", e))?;
            gl.bind_vertex_array(Some(vao));

            let vbo = gl.create_buffer().map_err(|e| Error::gl("VBO", e))?;
            gl.bind_buffer(ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(ARRAY_BUFFER, bytemuck::cast_slice(&vertices), STATIC_DRAW);

            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, FLOAT, false, stride, 0);

            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(
                1,
                3,
                FLOAT,
                false,
                stride,
                3 * std::mem::size_of::<f32>() as i32,
            );

            let ebo = gl.create_buffer().map_err(|e| Error::gl("EBO", e))?;
            gl.bind_buffer(ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(
                ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.indices),
                STATIC_DRAW,
            );

            gl.bind_vertex_array(None);

            Ok(Self {
                vao,
                vbo,
                ebo,
                index_count: mesh.indices.len() as i32,
            })
        }
    }

    /// # Safety
    /// Requires an active GL context and a bound program.
    pub unsafe fn draw(&self, gl: &Context) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_elements(TRIANGLES, self.index_count, UNSIGNED_INT, 0);
            gl.bind_vertex_array(None);
        }
    }

    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn destroy(&self, gl: &Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
            gl.delete_buffer(self.ebo);
        }
    }
}

/// GPU copies of a [`MeshRegistry`], indexed by [`MeshId`]
#[derive(Default)]
pub struct GlMeshCache {
    meshes: Vec<GlMesh>,
}

impl GlMeshCache {
    /// Upload any registry entries not yet on the GPU
    ///
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn sync(&mut self, gl: &Context, registry: &MeshRegistry) -> Result<()> {
        for (_, mesh) in registry.iter().skip(self.meshes.len()) {
            let uploaded = unsafe { GlMesh::upload(gl, mesh)? };
            tracing::debug!(
                vertices = mesh.vertex_count(),
                triangles = mesh.triangle_count(),
                "Uploaded mesh"
            );
            self.meshes.push(uploaded);
        }
        Ok(())
    }

    pub fn get(&self, id: MeshId) -> Option<&GlMesh> {
        self.meshes.get(id.index())
    }

    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn destroy(&mut self, gl: &Context) {
        for mesh in self.meshes.drain(..) {
            unsafe { mesh.destroy(gl) };
        }
    }
}
