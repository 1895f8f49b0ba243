//! Volumetric ray-march integrator
//!
//! Pure functions shared by the software compositor and mirrored by
//! `shaders/lighting.frag`. A march walks a camera ray through the cloud
//! domain accumulating transmittance `T` and in-scattered radiance:
//!
//! ```text
//! T        *= exp(-cloud_absorption * density * step)
//! radiance += scattered * density * T * step
//! final     = background * T + radiance
//! ```

use crate::density::DensitySampler;
use crate::scene::{Light, VolumeParams};
use glam::{Vec3, Vec4};
use std::f32::consts::PI;

/// March stops once transmittance falls below this
pub const MIN_TRANSMITTANCE: f32 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or(Vec3::NEG_Z),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.max(Vec3::ZERO) * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn is_degenerate(&self) -> bool {
        self.max.cmple(self.min).any()
    }

    /// Slab test. Returns `(t_enter, t_exit)` with `t_enter` clamped to 0 when
    /// the origin is inside, `None` when the ray misses or the box is behind.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        if self.is_degenerate() {
            return None;
        }

        let inv_dir = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv_dir;
        let t1 = (self.max - ray.origin) * inv_dir;

        // NaN from 0 * inf (origin on a slab plane, axis-parallel ray) must not win
        let t_small = t0.min(t1);
        let t_large = t0.max(t1);
        let t_near = t_small.x.max(t_small.y).max(t_small.z);
        let t_far = t_large.x.min(t_large.y).min(t_large.z);

        if !(t_near <= t_far) || t_far < 0.0 {
            return None;
        }
        Some((t_near.max(0.0), t_far))
    }
}

/// Henyey-Greenstein phase function, normalised over the sphere
pub fn henyey_greenstein(cos_theta: f32, g: f32) -> f32 {
    let g2 = g * g;
    let denom = (1.0 + g2 - 2.0 * g * cos_theta).max(1e-6);
    (1.0 - g2) / (4.0 * PI * denom * denom.sqrt())
}

/// Two-lobe phase function.
///
/// `phase_params.x` weights the forward lobe (asymmetry `g`) against a
/// backward lobe with asymmetry `-phase_params.y`; `z` adds an isotropic base
/// and `w` scales the blended lobes.
pub fn phase(cos_theta: f32, g: f32, phase_params: Vec4) -> f32 {
    let forward = henyey_greenstein(cos_theta, g);
    let backward = henyey_greenstein(cos_theta, -phase_params.y);
    let blend = forward * phase_params.x + backward * (1.0 - phase_params.x);
    phase_params.z + blend * phase_params.w
}

/// Scaled, non-negative density at `p`
fn density_at(field: &impl DensitySampler, p: Vec3, multiplier: f32) -> f32 {
    let d = field.density(p);
    if d.is_finite() { d.max(0.0) * multiplier } else { 0.0 }
}

/// Transmittance from `p` towards a light along `dir`, marching at most
/// `max_distance`. Expects sanitized parameters.
pub fn light_transmittance(
    field: &impl DensitySampler,
    p: Vec3,
    dir: Vec3,
    max_distance: f32,
    params: &VolumeParams,
) -> f32 {
    if params.num_light_steps <= 0 || params.light_step_size <= 0.0 {
        return 1.0;
    }

    let mut optical_depth = 0.0;
    let mut t = 0.0;
    for _ in 0..params.num_light_steps {
        let step = params.light_step_size.min(max_distance - t);
        if step <= 0.0 {
            break;
        }
        let d = density_at(field, p + dir * (t + step * 0.5), params.density_multiplier);
        optical_depth += params.light_absorption * d * step;
        t += step;
    }
    (-optical_depth).exp()
}

/// Light arriving at `p` and scattered towards the camera (before density
/// and transmittance weighting)
pub fn in_scattered_light(
    field: &impl DensitySampler,
    p: Vec3,
    ray_dir: Vec3,
    lights: &[Light],
    params: &VolumeParams,
) -> Vec3 {
    let mut scattered = Vec3::ZERO;
    for light in lights {
        match light.incidence(p) {
            None => scattered += light.radiance(),
            Some((to_light, distance, falloff)) => {
                let shadow = light_transmittance(field, p, to_light, distance, params);
                let cos_theta = ray_dir.dot(to_light);
                let ph = phase(cos_theta, params.scattering_g, params.phase_params);
                scattered += light.radiance() * falloff * shadow * ph;
            }
        }
    }
    scattered
}

/// Result of marching one ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchResult {
    pub transmittance: f32,
    pub radiance: Vec3,
    pub steps: u32,
}

impl MarchResult {
    pub const EMPTY: MarchResult = MarchResult {
        transmittance: 1.0,
        radiance: Vec3::ZERO,
        steps: 0,
    };
}

/// March `ray` through `domain`, stopping at `max_t` (opaque geometry) if closer
pub fn march_ray(
    field: &impl DensitySampler,
    ray: &Ray,
    domain: &Aabb,
    max_t: f32,
    lights: &[Light],
    params: &VolumeParams,
) -> MarchResult {
    march_ray_with(field, ray, domain, max_t, lights, params, |_| {})
}

/// [`march_ray`] reporting the transmittance after every step
pub fn march_ray_with(
    field: &impl DensitySampler,
    ray: &Ray,
    domain: &Aabb,
    max_t: f32,
    lights: &[Light],
    params: &VolumeParams,
    mut on_step: impl FnMut(f32),
) -> MarchResult {
    let params = params.sanitized();
    if params.num_steps <= 0 || params.step_size <= 0.0 {
        return MarchResult::EMPTY;
    }
    let Some((t_enter, t_exit)) = domain.intersect(ray) else {
        return MarchResult::EMPTY;
    };
    let t_exit = t_exit.min(max_t);

    let mut result = MarchResult::EMPTY;
    let mut t = t_enter;
    for _ in 0..params.num_steps {
        let step = params.step_size.min(t_exit - t);
        if step <= 0.0 {
            break;
        }
        let p = ray.at(t + step * 0.5);
        let density = density_at(field, p, params.density_multiplier);

        if density > 0.0 {
            let scattered = in_scattered_light(field, p, ray.direction, lights, &params);
            result.radiance += scattered * density * result.transmittance * step;
            result.transmittance *= (-params.cloud_absorption * density * step).exp();
        }

        t += step;
        result.steps += 1;
        on_step(result.transmittance);

        if result.transmittance < MIN_TRANSMITTANCE {
            break;
        }
    }
    result
}

/// `background * T + radiance`
pub fn composite(background: Vec3, result: &MarchResult) -> Vec3 {
    background * result.transmittance + result.radiance
}
