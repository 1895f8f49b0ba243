//! [`UniformSink`] backed by a linked GL program

use crate::uniforms::{UniformSink, UniformValue};
use glow::{Context, HasContext, Program};

/// Writes uniforms to the currently bound `program`, looking locations up by name.
/// Names the linker optimised away are silently skipped.
pub struct GlUniforms<'a> {
    gl: &'a Context,
    program: Program,
}

impl<'a> GlUniforms<'a> {
    /// # Safety
    /// `program` must be in use (`gl.use_program`) for as long as the sink is written to.
    pub unsafe fn new(gl: &'a Context, program: Program) -> Self {
        Self { gl, program }
    }
}

impl UniformSink for GlUniforms<'_> {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        unsafe {
            let Some(loc) = self.gl.get_uniform_location(self.program, name) else {
                return;
            };
            let loc = Some(&loc);
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(loc, v),
                UniformValue::UInt(v) => self.gl.uniform_1_u32(loc, v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(loc, v),
                UniformValue::IVec3(v) => self.gl.uniform_3_i32(loc, v.x, v.y, v.z),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(loc, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(loc, v.x, v.y, v.z, v.w),
                UniformValue::Mat4(m) => {
                    self.gl
                        .uniform_matrix_4_f32_slice(loc, false, &m.to_cols_array())
                }
            }
        }
    }
}
