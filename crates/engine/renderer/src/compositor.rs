//! Software ray-march compositor
//!
//! Reads the [`GBuffer`], shades opaque geometry, marches every pixel's
//! camera ray through the density field and composites clouds on top.
//! Rows are distributed over the rayon pool.

use crate::density::DensitySampler;
use crate::gbuffer::{GBuffer, GTexel, ndc_ray_direction, pixel_ndc};
use crate::march::{Aabb, MarchResult, Ray, composite, march_ray};
use crate::scene::{Light, SceneState};
use glam::Vec3;
use image::{ImageBuffer, Rgb, RgbImage};
use rayon::prelude::*;

/// Default sky colour behind the clouds
pub const SKY_COLOR: Vec3 = Vec3::new(0.45, 0.6, 0.8);

/// Display gamma applied at output
pub const GAMMA: f32 = 2.2;

/// Lambert shading of one G-buffer sample
pub fn shade_surface(texel: &GTexel, lights: &[Light]) -> Vec3 {
    let mut lit = Vec3::ZERO;
    for light in lights {
        match light.incidence(texel.position) {
            None => lit += light.radiance(),
            Some((to_light, _, falloff)) => {
                let diffuse = texel.normal.dot(to_light).max(0.0);
                lit += light.radiance() * falloff * diffuse;
            }
        }
    }
    texel.albedo * lit
}

/// Linear colour and transmittance per pixel
#[derive(Debug, Clone)]
pub struct CompositeOutput {
    pub width: u32,
    pub height: u32,
    pub color: Vec<Vec3>,
    pub transmittance: Vec<f32>,
}

impl CompositeOutput {
    pub fn color_at(&self, x: u32, y: u32) -> Vec3 {
        self.color[y as usize * self.width as usize + x as usize]
    }

    /// Gamma-corrected 8-bit image
    pub fn to_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let c = self.color_at(x, y).max(Vec3::ZERO).powf(1.0 / GAMMA);
            Rgb([
                (c.x.clamp(0.0, 1.0) * 255.0) as u8,
                (c.y.clamp(0.0, 1.0) * 255.0) as u8,
                (c.z.clamp(0.0, 1.0) * 255.0) as u8,
            ])
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    pub sky_color: Vec3,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            sky_color: SKY_COLOR,
        }
    }
}

impl Compositor {
    pub fn new(sky_color: Vec3) -> Self {
        Self { sky_color }
    }

    /// March a single pixel; returns the composited colour and the march
    #[allow(clippy::too_many_arguments)]
    fn shade_pixel(
        &self,
        gbuffer: &GBuffer,
        scene: &SceneState,
        field: &impl DensitySampler,
        domain: &Aabb,
        inv_view_proj: &glam::Mat4,
        x: u32,
        y: u32,
    ) -> (Vec3, MarchResult) {
        let lights = scene.lights().as_slice();
        let origin = scene.camera.position;
        let ndc = pixel_ndc(x, y, gbuffer.width(), gbuffer.height());
        let ray = Ray::new(origin, ndc_ray_direction(inv_view_proj, ndc));

        let (background, max_t) = match gbuffer.texel(x, y) {
            Some(texel) => (
                shade_surface(&texel, lights),
                (texel.position - origin).length(),
            ),
            None => (self.sky_color, f32::INFINITY),
        };

        let result = march_ray(field, &ray, domain, max_t, lights, scene.volume());
        (composite(background, &result), result)
    }

    /// Composite the whole frame
    pub fn composite(
        &self,
        gbuffer: &GBuffer,
        scene: &SceneState,
        field: &impl DensitySampler,
    ) -> CompositeOutput {
        let (width, height) = (gbuffer.width(), gbuffer.height());
        let inv_view_proj = scene.camera.view_projection().inverse();
        let generation = scene.generation();
        let domain = Aabb::from_center_size(generation.domain_center, generation.sanitized_size());

        let rows: Vec<Vec<(Vec3, f32)>> = (0..height)
            .into_par_iter()
            .map(|y| {
                (0..width)
                    .map(|x| {
                        let (color, march) = self.shade_pixel(
                            gbuffer,
                            scene,
                            field,
                            &domain,
                            &inv_view_proj,
                            x,
                            y,
                        );
                        (color, march.transmittance)
                    })
                    .collect()
            })
            .collect();

        let (color, transmittance): (Vec<Vec3>, Vec<f32>) = rows.into_iter().flatten().unzip();
        CompositeOutput {
            width,
            height,
            color,
            transmittance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::LightKind;

    fn texel(normal: Vec3) -> GTexel {
        GTexel {
            position: Vec3::ZERO,
            normal,
            albedo: Vec3::ONE,
            depth: 0.0,
        }
    }

    #[test]
    fn test_shade_surface_lambert() {
        let lights = [Light::directional(Vec3::Y, Vec3::ONE, 1.0)];
        assert!((shade_surface(&texel(Vec3::Y), &lights) - Vec3::ONE).length() < 1e-6);
        assert_eq!(shade_surface(&texel(Vec3::NEG_Y), &lights), Vec3::ZERO);
    }

    #[test]
    fn test_shade_surface_ambient_ignores_normal() {
        let lights = [Light::ambient(Vec3::splat(0.5), 1.0)];
        assert_eq!(lights[0].kind, LightKind::Ambient);
        assert_eq!(shade_surface(&texel(Vec3::NEG_Y), &lights), Vec3::splat(0.5));
    }

    #[test]
    fn test_no_lights_is_black() {
        assert_eq!(shade_surface(&texel(Vec3::Y), &[]), Vec3::ZERO);
    }
}
