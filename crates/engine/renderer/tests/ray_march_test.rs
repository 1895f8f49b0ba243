//! Ray-march integration: transmittance, Beer-Lambert attenuation, light
//! falloff and the degenerate parameter settings

use glam::{UVec3, Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::march::{in_scattered_light, march_ray, march_ray_with};
use renderer::{
    Aabb, DensityField, DensitySampler, FrameInfo, GridResolution, Light, Ray, Renderer,
    RendererConfig, SceneState, SoftwareRenderer, VolumeParams,
};

/// Random values (some negative) on a coarse lattice
struct LatticeNoise {
    values: Vec<f32>,
    dim: u32,
}

impl LatticeNoise {
    fn new(seed: u64, dim: u32) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..dim * dim * dim)
            .map(|_| rng.random_range(-0.5..3.0))
            .collect();
        Self { values, dim }
    }
}

impl DensitySampler for LatticeNoise {
    fn density(&self, world: Vec3) -> f32 {
        let cell = (world.floor().as_ivec3().rem_euclid(glam::IVec3::splat(self.dim as i32)))
            .as_uvec3();
        let UVec3 { x, y, z } = cell;
        self.values[(x + self.dim * (y + self.dim * z)) as usize]
    }
}

/// Unit-length path through a unit box centred at the origin
fn unit_path() -> (Ray, Aabb) {
    (
        Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z),
        Aabb::from_center_size(Vec3::ZERO, Vec3::ONE),
    )
}

fn unit_density() -> DensityField {
    DensityField::uniform(
        GridResolution::new(8, 8).unwrap(),
        Vec3::splat(2.0),
        Vec3::ZERO,
        1.0,
    )
    .unwrap()
}

#[test]
fn test_zero_steps_leaves_every_pixel_clear() {
    let config = RendererConfig {
        volume: VolumeParams {
            num_steps: 0,
            ..VolumeParams::default()
        },
        ..RendererConfig::default()
    };
    let mut renderer = SoftwareRenderer::new(&config).unwrap();
    let mut scene = SceneState::demo(config.volume, config.generation);

    renderer
        .render(&mut scene, FrameInfo::new(0, 0.0, 32, 24))
        .unwrap();

    let output = renderer.output().expect("composite output");
    assert_eq!(output.transmittance.len(), 32 * 24);
    assert!(output.transmittance.iter().all(|t| *t == 1.0));
}

#[test]
fn test_transmittance_never_increases() {
    let mut rng = StdRng::seed_from_u64(99);
    let domain = Aabb::from_center_size(Vec3::splat(4.0), Vec3::splat(8.0));
    let lights = [Light::default(), Light::ambient(Vec3::ONE, 0.3)];

    for seed in 0..20 {
        let field = LatticeNoise::new(seed, 8);
        let params = VolumeParams {
            num_steps: rng.random_range(1..100),
            step_size: rng.random_range(0.05..0.5),
            cloud_absorption: rng.random_range(0.0..2.0),
            density_multiplier: rng.random_range(0.0..4.0),
            ..VolumeParams::default()
        };
        let origin = Vec3::new(
            rng.random_range(-4.0..12.0),
            rng.random_range(-4.0..12.0),
            -6.0,
        );
        let ray = Ray::new(origin, Vec3::splat(4.0) - origin);

        let mut previous = 1.0f32;
        let result = march_ray_with(
            &field,
            &ray,
            &domain,
            f32::INFINITY,
            &lights,
            &params,
            |t| {
                assert!(t <= previous, "transmittance rose from {previous} to {t}");
                assert!((0.0..=1.0).contains(&t));
                previous = t;
            },
        );
        assert_eq!(result.transmittance, previous);
    }
}

#[test]
fn test_uniform_slab_follows_beer_lambert() {
    let field = unit_density();
    let (ray, domain) = unit_path();
    let lights = [Light::ambient(Vec3::ONE, 1.0)];
    // absorption 1.0 * multiplier 1.5 over a unit path
    let expected = (-1.5f32).exp();

    for step_size in [0.25, 0.1, 0.05, 0.01] {
        let params = VolumeParams {
            num_steps: 500,
            step_size,
            ..VolumeParams::default()
        };
        let result = march_ray(&field, &ray, &domain, f32::INFINITY, &lights, &params);
        assert!(
            (result.transmittance - expected).abs() < 1e-3,
            "step {step_size}: got {}, expected {expected}",
            result.transmittance
        );
    }
}

#[test]
fn test_step_count_limits_path_length() {
    let field = unit_density();
    let (ray, domain) = unit_path();
    let params = VolumeParams {
        num_steps: 10,
        step_size: 0.05,
        ..VolumeParams::default()
    };

    // Only half the slab is covered
    let result = march_ray(&field, &ray, &domain, f32::INFINITY, &[], &params);
    assert!((result.transmittance - (-0.75f32).exp()).abs() < 1e-4);
    assert_eq!(result.steps, 10);
}

#[test]
fn test_geometry_cuts_the_march() {
    let field = unit_density();
    let (ray, domain) = unit_path();
    let params = VolumeParams {
        num_steps: 500,
        step_size: 0.01,
        ..VolumeParams::default()
    };

    // Surface a quarter of the way into the slab
    let result = march_ray(&field, &ray, &domain, 4.75, &[], &params);
    assert!((result.transmittance - (-0.375f32).exp()).abs() < 1e-3);
}

#[test]
fn test_no_lights_means_no_radiance() {
    let field = unit_density();
    let (ray, domain) = unit_path();
    let params = VolumeParams {
        num_steps: 200,
        step_size: 0.01,
        ..VolumeParams::default()
    };

    let result = march_ray(&field, &ray, &domain, f32::INFINITY, &[], &params);
    assert_eq!(result.radiance, Vec3::ZERO);
    assert!(result.transmittance < 1.0);
}

#[test]
fn test_more_light_steps_darken_the_cloud() {
    let field = unit_density();
    let (ray, domain) = unit_path();
    let sun = [Light::directional(Vec3::Y, Vec3::ONE, 1.0)];

    let radiance = |num_light_steps| {
        let params = VolumeParams {
            num_steps: 200,
            step_size: 0.01,
            num_light_steps,
            light_step_size: 0.05,
            ..VolumeParams::default()
        };
        march_ray(&field, &ray, &domain, f32::INFINITY, &sun, &params)
            .radiance
            .x
    };

    let unshadowed = radiance(0);
    let shadowed = radiance(10);
    assert!(unshadowed > 0.0);
    assert!(shadowed < unshadowed);
}

#[test]
fn test_ray_missing_domain_is_untouched() {
    let field = unit_density();
    let ray = Ray::new(Vec3::new(5.0, 5.0, -5.0), Vec3::Z);
    let domain = Aabb::from_center_size(Vec3::ZERO, Vec3::ONE);

    let result = march_ray(
        &field,
        &ray,
        &domain,
        f32::INFINITY,
        &[Light::default()],
        &VolumeParams::default(),
    );
    assert_eq!(result.transmittance, 1.0);
    assert_eq!(result.steps, 0);
}

/// Same density everywhere, no grid bounds
struct Uniform(f32);

impl DensitySampler for Uniform {
    fn density(&self, _world: Vec3) -> f32 {
        self.0
    }
}

/// Isotropic phase and no self-shadowing, so only the light falloff varies
fn falloff_only() -> VolumeParams {
    VolumeParams {
        num_steps: 64,
        step_size: 0.005,
        cloud_absorption: 0.0,
        light_absorption: 0.0,
        density_multiplier: 1.0,
        scattering_g: 0.0,
        phase_params: Vec4::new(1.0, 0.0, 0.0, 1.0),
        ..VolumeParams::default()
    }
}

/// Wide, thin slab crossed along +Z at height `x`
fn thin_slab(x: f32) -> (Ray, Aabb) {
    (
        Ray::new(Vec3::new(x, 0.0, -5.0), Vec3::Z),
        Aabb::from_center_size(Vec3::ZERO, Vec3::new(20.0, 20.0, 0.02)),
    )
}

#[test]
fn test_point_light_radiance_falls_off_with_distance_squared() {
    let field = Uniform(1.0);
    let (ray, domain) = thin_slab(0.0);
    let params = falloff_only();

    let radiance_at = |d: f32| {
        let lamp = [Light::point(Vec3::new(d, 0.0, 0.0), Vec3::ONE, 50.0)];
        march_ray(&field, &ray, &domain, f32::INFINITY, &lamp, &params)
            .radiance
            .x
    };

    let (d1, d2) = (2.0, 4.0);
    let near = radiance_at(d1);
    let far = radiance_at(d2);
    assert!(near > 0.0 && far > 0.0);

    let expected = (d2 * d2) / (d1 * d1);
    assert!(
        ((near / far) - expected).abs() < expected * 1e-3,
        "ratio {} expected {}",
        near / far,
        expected
    );
}

#[test]
fn test_point_light_falloff_is_floored_near_the_light() {
    let field = Uniform(1.0);
    let params = falloff_only();
    let p = Vec3::ZERO;

    let scattered = |offset: f32| {
        let lamp = [Light::point(p + Vec3::new(offset, 0.0, 0.0), Vec3::ONE, 1.0)];
        in_scattered_light(&field, p, Vec3::Z, &lamp, &params).x
    };

    // Both closer than sqrt(1e-4) = 0.01, so both use the floored distance
    let touching = scattered(0.001);
    let close = scattered(0.005);
    assert!(touching.is_finite());
    assert!((touching - close).abs() < touching * 1e-4);

    let isotropic = 1.0 / (4.0 * std::f32::consts::PI);
    assert!((touching - 1e4 * isotropic).abs() < 1.0);
}

#[test]
fn test_directional_light_radiance_ignores_distance() {
    let field = Uniform(1.0);
    let params = VolumeParams {
        num_steps: 64,
        step_size: 0.005,
        ..VolumeParams::default()
    };
    let sun_dir = Vec3::new(1.0, 1.0, 0.0);

    let radiance = |x: f32, scale: f32| {
        let (ray, domain) = thin_slab(x);
        let sun = [Light::directional(sun_dir * scale, Vec3::ONE, 2.0)];
        march_ray(&field, &ray, &domain, f32::INFINITY, &sun, &params)
            .radiance
            .x
    };

    let base = radiance(0.0, 1.0);
    assert!(base > 0.0);
    // Moving the sample column or rescaling the direction vector changes nothing
    assert!((radiance(5.0, 1.0) - base).abs() < base * 1e-5);
    assert!((radiance(0.0, 4.0) - base).abs() < base * 1e-5);
}
