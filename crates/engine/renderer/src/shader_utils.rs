//! Shader compilation helpers for the GL passes

use crate::error::{Error, Result};
use glow::*;

fn stage_name(shader_type: u32) -> &'static str {
    match shader_type {
        VERTEX_SHADER => "vertex",
        FRAGMENT_SHADER => "fragment",
        COMPUTE_SHADER => "compute",
        _ => "unknown",
    }
}

/// Compile a shader from source code
///
/// # Safety
/// Requires an active OpenGL context
pub unsafe fn compile_shader(gl: &Context, shader_type: u32, source: &str) -> Result<Shader> {
    unsafe {
        let shader = gl
            .create_shader(shader_type)
            .map_err(|e| Error::gl("shader", e))?;

        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(Error::ShaderCompile {
                stage: stage_name(shader_type),
                log,
            });
        }

        Ok(shader)
    }
}

/// Link already compiled stages, deleting them afterwards
unsafe fn link_program(gl: &Context, shaders: &[Shader]) -> Result<Program> {
    unsafe {
        let program = gl.create_program().map_err(|e| Error::gl("program", e))?;

        for &shader in shaders {
            gl.attach_shader(program, shader);
        }
        gl.link_program(program);

        for &shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(Error::ProgramLink(log));
        }

        Ok(program)
    }
}

/// Create and link a shader program from vertex and fragment shader sources
///
/// # Safety
/// Requires an active OpenGL context
pub unsafe fn create_program(gl: &Context, vertex_src: &str, fragment_src: &str) -> Result<Program> {
    unsafe {
        let vertex_shader = compile_shader(gl, VERTEX_SHADER, vertex_src)?;
        let fragment_shader = match compile_shader(gl, FRAGMENT_SHADER, fragment_src) {
            Ok(shader) => shader,
            Err(e) => {
                gl.delete_shader(vertex_shader);
                return Err(e);
            }
        };
        link_program(gl, &[vertex_shader, fragment_shader])
    }
}

/// Create a compute shader program from source
///
/// # Safety
/// Requires an active OpenGL context with compute shader support (GL 4.3+)
pub unsafe fn create_compute_program(gl: &Context, compute_src: &str) -> Result<Program> {
    unsafe {
        let compute_shader = compile_shader(gl, COMPUTE_SHADER, compute_src)?;
        link_program(gl, &[compute_shader])
    }
}
