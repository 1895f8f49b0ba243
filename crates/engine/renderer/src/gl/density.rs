//! Density field generated by a compute shader into an R32F 3D texture

use crate::density::{CloudShape, GridResolution};
use crate::error::{Error, Result};
use crate::gl::GlUniforms;
use crate::schedule::DensityRequest;
use crate::shader_utils::create_compute_program;
use crate::uniforms::UniformSink;
use glam::Vec3;
use glow::*;

const DENSITY_COMPUTE_SHADER: &str = include_str!("../shaders/density.comp");

/// GPU counterpart of [`crate::density::DensityField`]
pub struct GlDensityField {
    resolution: GridResolution,
    shape: CloudShape,
    program: Program,
    texture: Texture,
    target_size: Vec3,
    target_offset: Vec3,
    generation_time: f32,
}

impl GlDensityField {
    /// Compile the kernel and allocate immutable 3D storage
    ///
    /// # Safety
    /// Requires an active GL 4.3+ context.
    pub unsafe fn new(gl: &Context, resolution: GridResolution, shape: CloudShape) -> Result<Self> {
        resolution.validate()?;

        unsafe {
            let program = create_compute_program(gl, DENSITY_COMPUTE_SHADER)?;
            tracing::info!("Density compute shader compiled");

            let texture = gl
                .create_texture()
                .map_err(|e| Error::gl("density texture", e))?;
            let dims = resolution.dims();
            gl.bind_texture(TEXTURE_3D, Some(texture));
            gl.tex_storage_3d(
                TEXTURE_3D,
                1,
                R32F,
                dims.x as i32,
                dims.y as i32,
                dims.z as i32,
            );
            gl.tex_parameter_i32(TEXTURE_3D, TEXTURE_MIN_FILTER, LINEAR as i32);
            gl.tex_parameter_i32(TEXTURE_3D, TEXTURE_MAG_FILTER, LINEAR as i32);
            gl.tex_parameter_i32(TEXTURE_3D, TEXTURE_WRAP_S, CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(TEXTURE_3D, TEXTURE_WRAP_T, CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(TEXTURE_3D, TEXTURE_WRAP_R, CLAMP_TO_EDGE as i32);
            gl.bind_texture(TEXTURE_3D, None);

            tracing::info!(
                "Density texture allocated ({}x{}x{} R32F)",
                dims.x,
                dims.y,
                dims.z
            );

            Ok(Self {
                resolution,
                shape,
                program,
                texture,
                target_size: Vec3::ZERO,
                target_offset: Vec3::ZERO,
                generation_time: 0.0,
            })
        }
    }

    pub fn resolution(&self) -> GridResolution {
        self.resolution
    }

    pub fn set_shape(&mut self, shape: CloudShape) {
        self.shape = shape;
    }

    pub fn target_size(&self) -> Vec3 {
        self.target_size
    }

    pub fn target_offset(&self) -> Vec3 {
        self.target_offset
    }

    pub fn generation_time(&self) -> f32 {
        self.generation_time
    }

    /// Dispatch the kernel over the whole grid and fence it from later sampling
    ///
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn regenerate(&mut self, gl: &Context, request: &DensityRequest) {
        unsafe {
            gl.use_program(Some(self.program));
            gl.bind_image_texture(0, Some(self.texture), 0, true, 0, WRITE_ONLY, R32F);

            let mut uniforms = GlUniforms::new(gl, self.program);
            uniforms.set("u_resolution", self.resolution.dims().as_ivec3());
            uniforms.set("u_seed", self.shape.seed);
            uniforms.set("u_targetSize", request.target_size);
            uniforms.set("u_targetOffset", request.target_offset);
            uniforms.set("u_time", request.time);
            uniforms.set("u_frequency", self.shape.frequency);
            uniforms.set("u_octaves", self.shape.octaves.clamp(1, 8) as i32);
            uniforms.set("u_lacunarity", self.shape.lacunarity);
            uniforms.set("u_persistence", self.shape.persistence);
            uniforms.set("u_coverage", self.shape.coverage);
            uniforms.set("u_wind", self.shape.wind);

            let groups = self.resolution.work_groups();
            gl.dispatch_compute(groups.x, groups.y, groups.z);

            // Image writes must land before the lighting pass samples the texture
            gl.memory_barrier(SHADER_IMAGE_ACCESS_BARRIER_BIT | TEXTURE_FETCH_BARRIER_BIT);

            gl.bind_image_texture(0, None, 0, true, 0, WRITE_ONLY, R32F);
            gl.use_program(None);
        }

        self.target_size = request.target_size;
        self.target_offset = request.target_offset;
        self.generation_time = request.time;
    }

    /// Bind the density texture to `unit` and export the window it covers
    ///
    /// # Safety
    /// Requires an active GL context and the sampling program in use.
    pub unsafe fn bind_for_sampling(&self, gl: &Context, unit: u32, sink: &mut impl UniformSink) {
        unsafe {
            gl.active_texture(TEXTURE0 + unit);
            gl.bind_texture(TEXTURE_3D, Some(self.texture));
        }
        sink.set("u_density", unit as i32);
        sink.set("u_fieldResolution", self.resolution.dims().as_ivec3());
        sink.set("u_fieldSize", self.target_size);
        sink.set("u_fieldOffset", self.target_offset);
    }

    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn destroy(&self, gl: &Context) {
        unsafe {
            gl.delete_program(self.program);
            gl.delete_texture(self.texture);
        }
    }
}
