//! Scene state consumed by the geometry and compositing passes
//!
//! [`SceneState`] owns everything a frame reads: camera, lights, scene
//! objects and the volumetric / generation parameters. The UI mutates it
//! through the methods here; the passes only borrow it.

use crate::camera::Camera;
use crate::error::Result;
use crate::mesh::MeshData;
use crate::uniforms::UniformSink;
use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Upper bound on simultaneously active lights (matches the shader array)
pub const MAX_LIGHTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightKind {
    /// Flat contribution, no direction
    Ambient,
    /// Positional light with inverse-square falloff
    Point,
    /// Light at infinity; `position` holds the direction towards the light
    #[default]
    Directional,
}

impl LightKind {
    pub const ALL: [LightKind; 3] = [LightKind::Ambient, LightKind::Point, LightKind::Directional];

    /// Integer tag uploaded as `u_lights[i].type`
    pub fn shader_id(self) -> i32 {
        match self {
            LightKind::Ambient => 0,
            LightKind::Point => 1,
            LightKind::Directional => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LightKind::Ambient => "Ambient",
            LightKind::Point => "Point",
            LightKind::Directional => "Directional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    /// Point light position, or direction towards a directional light
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self::directional(Vec3::new(0.5, 1.0, 0.5), Vec3::ONE, 1.0)
    }
}

impl Light {
    pub fn ambient(color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            position: Vec3::ZERO,
            color,
            intensity,
        }
    }

    pub fn point(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            color,
            intensity,
        }
    }

    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            position: direction,
            color,
            intensity,
        }
    }

    /// Radiance arriving at `p` before any occlusion
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity.max(0.0)
    }

    /// Unit direction from `p` towards the light, the distance to it, and the
    /// falloff factor. `None` for ambient lights.
    pub fn incidence(&self, p: Vec3) -> Option<(Vec3, f32, f32)> {
        match self.kind {
            LightKind::Ambient => None,
            LightKind::Directional => {
                let dir = self.position.normalize_or(Vec3::Y);
                Some((dir, f32::INFINITY, 1.0))
            }
            LightKind::Point => {
                let to_light = self.position - p;
                let dist_sq = to_light.length_squared();
                Some((
                    to_light.normalize_or(Vec3::Y),
                    dist_sq.sqrt(),
                    1.0 / dist_sq.max(POINT_LIGHT_MIN_DIST_SQ),
                ))
            }
        }
    }
}

/// Floor on squared distance to a point light
pub const POINT_LIGHT_MIN_DIST_SQ: f32 = 1e-4;

/// Bounded, ordered light collection with append / pop semantics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightList {
    lights: Vec<Light>,
}

impl LightList {
    pub fn new() -> Self {
        Self {
            lights: Vec::with_capacity(MAX_LIGHTS),
        }
    }

    /// Append a light; returns `false` (and leaves the list unchanged) when full
    pub fn push(&mut self, light: Light) -> bool {
        if self.is_full() {
            return false;
        }
        self.lights.push(light);
        true
    }

    /// Remove and return the most recently added light
    pub fn pop(&mut self) -> Option<Light> {
        self.lights.pop()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lights.len() >= MAX_LIGHTS
    }

    pub fn as_slice(&self) -> &[Light] {
        &self.lights
    }

    pub fn as_mut_slice(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Light> {
        self.lights.iter()
    }
}

impl<'a> IntoIterator for &'a LightList {
    type Item = &'a Light;
    type IntoIter = std::slice::Iter<'a, Light>;

    fn into_iter(self) -> Self::IntoIter {
        self.lights.iter()
    }
}

/// Ray-march integration parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeParams {
    /// Primary march sample count
    pub num_steps: i32,
    /// Light sub-march sample count
    pub num_light_steps: i32,
    /// Primary step length in world units
    pub step_size: f32,
    /// Light step length in world units
    pub light_step_size: f32,
    pub cloud_absorption: f32,
    pub light_absorption: f32,
    pub density_multiplier: f32,
    /// Henyey-Greenstein asymmetry of the forward lobe
    pub scattering_g: f32,
    /// `x` forward-lobe weight, `y` backward-lobe asymmetry, `z` isotropic base, `w` lobe scale
    pub phase_params: Vec4,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            num_steps: 30,
            num_light_steps: 10,
            step_size: 0.01,
            light_step_size: 0.01,
            cloud_absorption: 1.0,
            light_absorption: 0.3,
            density_multiplier: 1.5,
            scattering_g: 0.5,
            phase_params: Vec4::new(0.74, 0.1, 0.1, 1.0),
        }
    }
}

impl VolumeParams {
    /// Copy with every field forced into a numerically safe range.
    ///
    /// Negative counts become zero; non-finite or negative coefficients
    /// become zero; step sizes keep their sign so a non-positive value can
    /// disable its march.
    pub fn sanitized(&self) -> Self {
        fn finite_non_negative(v: f32) -> f32 {
            if v.is_finite() { v.max(0.0) } else { 0.0 }
        }
        fn finite_or_zero(v: f32) -> f32 {
            if v.is_finite() { v } else { 0.0 }
        }

        Self {
            num_steps: self.num_steps.max(0),
            num_light_steps: self.num_light_steps.max(0),
            step_size: finite_or_zero(self.step_size),
            light_step_size: finite_or_zero(self.light_step_size),
            cloud_absorption: finite_non_negative(self.cloud_absorption),
            light_absorption: finite_non_negative(self.light_absorption),
            density_multiplier: finite_non_negative(self.density_multiplier),
            // |g| = 1 makes the HG denominator vanish
            scattering_g: finite_or_zero(self.scattering_g).clamp(-0.999, 0.999),
            phase_params: Vec4::new(
                finite_or_zero(self.phase_params.x).clamp(0.0, 1.0),
                finite_or_zero(self.phase_params.y).clamp(-0.999, 0.999),
                finite_non_negative(self.phase_params.z),
                finite_non_negative(self.phase_params.w),
            ),
        }
    }

    pub fn write_uniforms(&self, sink: &mut impl UniformSink) {
        let p = self.sanitized();
        sink.set("MAX_STEPS", p.num_steps);
        sink.set("MAX_LIGHT_STEPS", p.num_light_steps);
        sink.set("u_stepSize", p.step_size);
        sink.set("u_lightStepSize", p.light_step_size);
        sink.set("u_cloudAbsorption", p.cloud_absorption);
        sink.set("u_lightAbsorption", p.light_absorption);
        sink.set("u_densityMultiplier", p.density_multiplier);
        sink.set("u_scatteringG", p.scattering_g);
        sink.set("u_phaseParams", p.phase_params);
    }
}

/// World-space window the density field is generated over
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub domain_center: Vec3,
    pub domain_size: Vec3,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            domain_center: Vec3::new(0.0, 30.0, 0.0),
            domain_size: Vec3::new(150.0, 10.0, 150.0),
        }
    }
}

impl GenerationParams {
    /// Domain size with negative or non-finite extents collapsed to zero
    pub fn sanitized_size(&self) -> Vec3 {
        let s = self.domain_size;
        Vec3::new(
            if s.x.is_finite() { s.x.max(0.0) } else { 0.0 },
            if s.y.is_finite() { s.y.max(0.0) } else { 0.0 },
            if s.z.is_finite() { s.z.max(0.0) } else { 0.0 },
        )
    }

    pub fn write_uniforms(&self, sink: &mut impl UniformSink) {
        sink.set("u_domainCenter", self.domain_center);
        sink.set("u_domainSize", self.sanitized_size());
    }
}

/// Handle into [`MeshRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(usize);

impl MeshId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena of mesh data; objects reference entries by [`MeshId`]
#[derive(Debug, Default, Clone)]
pub struct MeshRegistry {
    meshes: Vec<MeshData>,
}

impl MeshRegistry {
    /// Store without checking; [`SceneState::add_mesh`] validates first
    pub(crate) fn insert(&mut self, mesh: MeshData) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn get(&self, id: MeshId) -> Option<&MeshData> {
        self.meshes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshId, &MeshData)> {
        self.meshes.iter().enumerate().map(|(i, m)| (MeshId(i), m))
    }
}

/// Opaque object drawn by the geometry pass
#[derive(Debug, Clone, Copy)]
pub struct SceneObject {
    pub mesh: MeshId,
    pub model: Mat4,
    pub albedo: Vec3,
}

impl SceneObject {
    /// Normal matrix (transpose of the inverse model matrix)
    pub fn normal_matrix(&self) -> Mat4 {
        self.model.inverse().transpose()
    }
}

/// Everything a frame reads
#[derive(Debug, Clone)]
pub struct SceneState {
    pub camera: Camera,
    lights: LightList,
    volume: VolumeParams,
    generation: GenerationParams,
    meshes: MeshRegistry,
    objects: Vec<SceneObject>,
    window_changed: bool,
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new(VolumeParams::default(), GenerationParams::default())
    }
}

impl SceneState {
    /// Empty scene: default camera, no lights, no objects
    pub fn new(volume: VolumeParams, generation: GenerationParams) -> Self {
        Self {
            camera: Camera::default(),
            lights: LightList::new(),
            volume,
            generation,
            meshes: MeshRegistry::default(),
            objects: Vec::new(),
            window_changed: false,
        }
    }

    /// The demo scene: a sphere above a large ground plane lit by one
    /// directional light
    pub fn demo(volume: VolumeParams, generation: GenerationParams) -> Self {
        let mut scene = Self::new(volume, generation);

        let sphere = scene.meshes.insert(MeshData::sphere(16));
        let plane = scene.meshes.insert(MeshData::subdivided_plane(2));

        scene.add_object(SceneObject {
            mesh: sphere,
            model: Mat4::from_translation(Vec3::new(0.0, -5.0, 0.0)),
            albedo: Vec3::new(0.8, 0.3, 0.25),
        });
        scene.add_object(SceneObject {
            mesh: plane,
            model: Mat4::from_scale(Vec3::new(40.0, 10.0, 40.0))
                * Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
            albedo: Vec3::new(0.45, 0.5, 0.4),
        });

        scene.add_light(Light::default());
        scene
    }

    // Lights

    pub fn add_light(&mut self, light: Light) -> bool {
        let added = self.lights.push(light);
        if !added {
            tracing::warn!("Light list full ({} lights), ignoring add", MAX_LIGHTS);
        }
        added
    }

    pub fn remove_light(&mut self) -> Option<Light> {
        self.lights.pop()
    }

    pub fn lights(&self) -> &LightList {
        &self.lights
    }

    /// Edit existing lights in place; the count cannot change through this
    pub fn lights_mut(&mut self) -> &mut [Light] {
        self.lights.as_mut_slice()
    }

    // Volume parameters

    pub fn volume(&self) -> &VolumeParams {
        &self.volume
    }

    pub fn volume_mut(&mut self) -> &mut VolumeParams {
        &mut self.volume
    }

    // Generation window

    pub fn generation(&self) -> &GenerationParams {
        &self.generation
    }

    /// Edit the generation window. Raises the window-changed signal when the
    /// window actually moved or resized.
    pub fn update_generation(&mut self, edit: impl FnOnce(&mut GenerationParams)) {
        let before = self.generation;
        edit(&mut self.generation);
        if self.generation != before {
            self.window_changed = true;
        }
    }

    pub fn set_domain(&mut self, center: Vec3, size: Vec3) {
        self.update_generation(|g| {
            g.domain_center = center;
            g.domain_size = size;
        });
    }

    /// Returns and clears the window-changed signal
    pub fn take_window_changed(&mut self) -> bool {
        std::mem::take(&mut self.window_changed)
    }

    pub fn window_changed(&self) -> bool {
        self.window_changed
    }

    // Objects

    /// Register a mesh for objects to reference. Meshes with missing
    /// normals, partial triangles or out-of-range indices are rejected.
    pub fn add_mesh(&mut self, mesh: MeshData) -> Result<MeshId> {
        mesh.validate()?;
        Ok(self.meshes.insert(mesh))
    }

    /// Adds an object; objects referencing unknown meshes are skipped by the passes
    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn meshes(&self) -> &MeshRegistry {
        &self.meshes
    }

    /// Export the light array as `u_lights[i].*` plus `u_numLights`
    pub fn write_light_uniforms(&self, sink: &mut impl UniformSink) {
        for (i, light) in self.lights.iter().enumerate() {
            sink.set(&format!("u_lights[{i}].type"), light.kind.shader_id());
            sink.set(&format!("u_lights[{i}].position"), light.position);
            sink.set(&format!("u_lights[{i}].color"), light.color);
            sink.set(&format!("u_lights[{i}].intensity"), light.intensity);
        }
        sink.set("u_numLights", self.lights.len() as i32);
    }

    /// Camera matrices and position shared by both passes
    pub fn write_camera_uniforms(&self, sink: &mut impl UniformSink) {
        let view = self.camera.view_matrix();
        let proj = self.camera.projection_matrix();
        sink.set("u_viewMat", view);
        sink.set("u_projMat", proj);
        sink.set("u_proj_viewMat", proj * view);
        sink.set("u_cameraPosition", self.camera.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_list_rejects_eleventh() {
        let mut list = LightList::new();
        for _ in 0..MAX_LIGHTS {
            assert!(list.push(Light::default()));
        }
        assert!(list.is_full());
        assert!(!list.push(Light::ambient(Vec3::ONE, 1.0)));
        assert_eq!(list.len(), MAX_LIGHTS);
        assert!(list.iter().all(|l| l.kind == LightKind::Directional));
    }

    #[test]
    fn test_pop_empty_is_none() {
        let mut list = LightList::new();
        assert!(list.pop().is_none());
    }

    #[test]
    fn test_update_generation_raises_signal_only_on_change() {
        let mut scene = SceneState::default();
        scene.update_generation(|_| {});
        assert!(!scene.take_window_changed());

        scene.update_generation(|g| g.domain_center.x += 1.0);
        assert!(scene.take_window_changed());
        // Cleared after take
        assert!(!scene.take_window_changed());
    }

    #[test]
    fn test_volume_edit_does_not_raise_signal() {
        let mut scene = SceneState::default();
        scene.volume_mut().num_steps = 100;
        assert!(!scene.window_changed());
        assert_eq!(scene.volume().num_steps, 100);
    }

    #[test]
    fn test_sanitized_clamps_bad_values() {
        let params = VolumeParams {
            num_steps: -5,
            num_light_steps: -1,
            cloud_absorption: -2.0,
            density_multiplier: f32::NAN,
            scattering_g: 1.0,
            ..Default::default()
        };
        let p = params.sanitized();
        assert_eq!(p.num_steps, 0);
        assert_eq!(p.num_light_steps, 0);
        assert_eq!(p.cloud_absorption, 0.0);
        assert_eq!(p.density_multiplier, 0.0);
        assert!(p.scattering_g < 1.0);
    }

    #[test]
    fn test_point_light_falloff() {
        let light = Light::point(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE, 1.0);
        let (dir, dist, falloff) = light.incidence(Vec3::ZERO).unwrap();
        assert!((dir - Vec3::Y).length() < 1e-6);
        assert!((dist - 2.0).abs() < 1e-6);
        assert!((falloff - 0.25).abs() < 1e-6);

        // Coincident point does not blow up
        let (_, _, falloff) = light.incidence(light.position).unwrap();
        assert!(falloff.is_finite());
    }

    #[test]
    fn test_point_light_direction_stays_unit_inside_floor() {
        let light = Light::point(Vec3::new(0.003, 0.0, 0.0), Vec3::ONE, 1.0);
        let (dir, dist, falloff) = light.incidence(Vec3::ZERO).unwrap();
        assert!((dir - Vec3::X).length() < 1e-5);
        assert!((dist - 0.003).abs() < 1e-6);
        assert!((falloff - 1.0 / POINT_LIGHT_MIN_DIST_SQ).abs() < 1.0);
    }

    #[test]
    fn test_demo_scene_contents() {
        let scene = SceneState::demo(VolumeParams::default(), GenerationParams::default());
        assert_eq!(scene.objects().len(), 2);
        assert_eq!(scene.meshes().len(), 2);
        assert_eq!(scene.lights().len(), 1);
        assert!(scene.objects().iter().all(|o| scene.meshes().get(o.mesh).is_some()));
    }
}
