//! Multi-render-target framebuffer holding the deferred inputs
//!
//! | attachment | texture unit | format  | contents                         |
//! |------------|--------------|---------|----------------------------------|
//! | colour 0   | 0            | RGBA32F | world position, `w` = coverage   |
//! | colour 1   | 1            | RGBA16F | world normal                     |
//! | colour 2   | 2            | RGBA16F | albedo                           |
//! | depth      | -            | D24     | depth test only                  |

use crate::error::{Error, Result};
use glow::*;

pub struct GlGBuffer {
    framebuffer: Framebuffer,
    position: Texture,
    normal: Texture,
    albedo: Texture,
    depth: Renderbuffer,
    width: u32,
    height: u32,
}

impl GlGBuffer {
    /// Allocate all targets. An incomplete framebuffer is an error.
    ///
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn new(gl: &Context, width: u32, height: u32) -> Result<Self> {
        unsafe {
            let framebuffer = gl
                .create_framebuffer()
                .map_err(|e| Error::gl("G-buffer framebuffer", e))?;
            let position = gl
                .create_texture()
                .map_err(|e| Error::gl("G-buffer position texture", e))?;
            let normal = gl
                .create_texture()
                .map_err(|e| Error::gl("G-buffer normal texture", e))?;
            let albedo = gl
                .create_texture()
                .map_err(|e| Error::gl("G-buffer albedo texture", e))?;
            let depth = gl
                .create_renderbuffer()
                .map_err(|e| Error::gl("G-buffer depth renderbuffer", e))?;

            let gbuffer = Self {
                framebuffer,
                position,
                normal,
                albedo,
                depth,
                width: width.max(1),
                height: height.max(1),
            };
            if let Err(e) = gbuffer.allocate(gl) {
                gbuffer.destroy(gl);
                return Err(e);
            }
            Ok(gbuffer)
        }
    }

    unsafe fn allocate_target(&self, gl: &Context, texture: Texture, internal_format: u32) {
        unsafe {
            gl.bind_texture(TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                TEXTURE_2D,
                0,
                internal_format as i32,
                self.width as i32,
                self.height as i32,
                0,
                RGBA,
                FLOAT,
                PixelUnpackData::Slice(None::<&[u8]>),
            );
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_MIN_FILTER, NEAREST as i32);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_MAG_FILTER, NEAREST as i32);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_WRAP_S, CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_WRAP_T, CLAMP_TO_EDGE as i32);
        }
    }

    unsafe fn allocate(&self, gl: &Context) -> Result<()> {
        unsafe {
            self.allocate_target(gl, self.position, RGBA32F);
            self.allocate_target(gl, self.normal, RGBA16F);
            self.allocate_target(gl, self.albedo, RGBA16F);

            gl.bind_renderbuffer(RENDERBUFFER, Some(self.depth));
            gl.renderbuffer_storage(
                RENDERBUFFER,
                DEPTH_COMPONENT24,
                self.width as i32,
                self.height as i32,
            );

            gl.bind_framebuffer(FRAMEBUFFER, Some(self.framebuffer));
            for (i, texture) in [self.position, self.normal, self.albedo].into_iter().enumerate() {
                gl.framebuffer_texture_2d(
                    FRAMEBUFFER,
                    COLOR_ATTACHMENT0 + i as u32,
                    TEXTURE_2D,
                    Some(texture),
                    0,
                );
            }
            gl.draw_buffers(&[COLOR_ATTACHMENT0, COLOR_ATTACHMENT1, COLOR_ATTACHMENT2]);
            gl.framebuffer_renderbuffer(
                FRAMEBUFFER,
                DEPTH_ATTACHMENT,
                RENDERBUFFER,
                Some(self.depth),
            );

            let status = gl.check_framebuffer_status(FRAMEBUFFER);

            gl.bind_framebuffer(FRAMEBUFFER, None);
            gl.bind_texture(TEXTURE_2D, None);
            gl.bind_renderbuffer(RENDERBUFFER, None);

            if status != FRAMEBUFFER_COMPLETE {
                return Err(Error::IncompleteFramebuffer(status));
            }
            Ok(())
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reallocate the targets for a new viewport size
    ///
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn resize(&mut self, gl: &Context, width: u32, height: u32) -> Result<()> {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        self.width = width;
        self.height = height;
        tracing::debug!(width, height, "Resizing G-buffer");
        unsafe { self.allocate(gl) }
    }

    /// Bind for writing and clear every target
    ///
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn begin(&self, gl: &Context) {
        unsafe {
            gl.bind_framebuffer(FRAMEBUFFER, Some(self.framebuffer));
            gl.viewport(0, 0, self.width as i32, self.height as i32);
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear(COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT);
        }
    }

    /// Restore the default framebuffer
    ///
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn end(&self, gl: &Context) {
        unsafe {
            gl.bind_framebuffer(FRAMEBUFFER, None);
        }
    }

    /// Bind position / normal / albedo to texture units 0 / 1 / 2
    ///
    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn bind_textures(&self, gl: &Context) {
        unsafe {
            for (unit, texture) in [self.position, self.normal, self.albedo].into_iter().enumerate() {
                gl.active_texture(TEXTURE0 + unit as u32);
                gl.bind_texture(TEXTURE_2D, Some(texture));
            }
        }
    }

    /// # Safety
    /// Requires an active GL context.
    pub unsafe fn destroy(&self, gl: &Context) {
        unsafe {
            gl.delete_framebuffer(self.framebuffer);
            gl.delete_texture(self.position);
            gl.delete_texture(self.normal);
            gl.delete_texture(self.albedo);
            gl.delete_renderbuffer(self.depth);
        }
    }
}
