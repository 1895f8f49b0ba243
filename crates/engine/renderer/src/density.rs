//! Procedural cloud density field
//!
//! A 3D scalar grid of `xz × y × xz` cells covering a world-space window.
//! Cell `(i, j, k)` holds the density at
//! `target_offset + ((i, j, k) / resolution - 0.5) * target_size`.
//!
//! The CPU path fills the grid slab-by-slab on the rayon pool and swaps the
//! finished buffer in whole, so samplers never see a partially written grid.
//! [`crate::gl::GlDensityField`] runs the same kernel as a compute shader.

use crate::error::{Error, Result};
use crate::schedule::DensityRequest;
use glam::{UVec3, Vec3};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Edge length of a compute work group / CPU block
pub const BLOCK_SIZE: u32 = 8;

/// Grid dimensions; the grid is square in XZ with its own vertical count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridResolution {
    pub xz: u32,
    pub y: u32,
}

impl Default for GridResolution {
    fn default() -> Self {
        Self { xz: 64, y: 16 }
    }
}

impl GridResolution {
    pub fn new(xz: u32, y: u32) -> Result<Self> {
        let res = Self { xz, y };
        res.validate()?;
        Ok(res)
    }

    pub fn validate(&self) -> Result<()> {
        let ok = |v: u32| v > 0 && v % BLOCK_SIZE == 0;
        if ok(self.xz) && ok(self.y) {
            Ok(())
        } else {
            Err(Error::InvalidResolution {
                xz: self.xz,
                y: self.y,
                block: BLOCK_SIZE,
            })
        }
    }

    /// `(x, y, z)` cell counts
    pub fn dims(&self) -> UVec3 {
        UVec3::new(self.xz, self.y, self.xz)
    }

    pub fn cell_count(&self) -> usize {
        self.xz as usize * self.y as usize * self.xz as usize
    }

    /// Work groups per axis for an 8x8x8 local size
    pub fn work_groups(&self) -> UVec3 {
        self.dims() / BLOCK_SIZE
    }
}

/// Parameters of the procedural density function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudShape {
    pub seed: u32,
    /// Base noise frequency in cycles per world unit
    pub frequency: f32,
    pub octaves: usize,
    pub lacunarity: f32,
    pub persistence: f32,
    /// 0 = clear sky, 1 = overcast
    pub coverage: f32,
    /// World units per second the noise scrolls
    pub wind: Vec3,
}

impl Default for CloudShape {
    fn default() -> Self {
        Self {
            seed: 7,
            frequency: 0.03,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            coverage: 0.5,
            wind: Vec3::new(2.0, 0.0, 1.0),
        }
    }
}

impl CloudShape {
    fn build_noise(&self) -> Fbm<Perlin> {
        Fbm::<Perlin>::new(self.seed)
            .set_octaves(self.octaves.clamp(1, 8))
            .set_frequency(1.0)
            .set_lacunarity(f64::from(self.lacunarity))
            .set_persistence(f64::from(self.persistence))
    }
}

/// Vertical fade so clouds thin out towards the bottom and top of the window
pub fn height_profile(h: f32) -> f32 {
    fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
        let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }
    smoothstep(0.0, 0.2, h) * (1.0 - smoothstep(0.7, 1.0, h))
}

/// Anything the ray marcher can sample density from
pub trait DensitySampler: Sync {
    /// Raw density at a world position (before the density multiplier)
    fn density(&self, world: Vec3) -> f32;
}

/// CPU-resident density grid
pub struct DensityField {
    resolution: GridResolution,
    shape: CloudShape,
    noise: Fbm<Perlin>,
    cells: Vec<f32>,
    target_size: Vec3,
    target_offset: Vec3,
    generation_time: f32,
}

impl DensityField {
    /// Allocate an empty field; every sample reads 0 until the first regeneration
    pub fn new(resolution: GridResolution, shape: CloudShape) -> Result<Self> {
        resolution.validate()?;
        Ok(Self {
            resolution,
            shape,
            noise: shape.build_noise(),
            cells: vec![0.0; resolution.cell_count()],
            target_size: Vec3::ZERO,
            target_offset: Vec3::ZERO,
            generation_time: 0.0,
        })
    }

    /// Field holding `value` in every cell over the given window
    pub fn uniform(
        resolution: GridResolution,
        target_size: Vec3,
        target_offset: Vec3,
        value: f32,
    ) -> Result<Self> {
        let mut field = Self::new(resolution, CloudShape::default())?;
        field.cells.fill(value);
        field.target_size = target_size;
        field.target_offset = target_offset;
        Ok(field)
    }

    pub fn resolution(&self) -> GridResolution {
        self.resolution
    }

    pub fn shape(&self) -> &CloudShape {
        &self.shape
    }

    /// Replace the procedural parameters; takes effect on the next regeneration
    pub fn set_shape(&mut self, shape: CloudShape) {
        self.shape = shape;
        self.noise = shape.build_noise();
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

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn contains(&self, world: Vec3) -> bool {
        self.local_coords(world).is_some()
    }

    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let r = self.resolution;
        x as usize + r.xz as usize * (y as usize + r.y as usize * z as usize)
    }

    /// Stored value of one cell
    pub fn cell(&self, x: u32, y: u32, z: u32) -> f32 {
        self.cells[self.index(x, y, z)]
    }

    /// World position a cell maps to
    pub fn cell_position(&self, cell: UVec3) -> Vec3 {
        cell_world_position(cell, self.resolution, self.target_size, self.target_offset)
    }

    /// Recompute every cell for the given window and time.
    ///
    /// Deterministic in `(target_size, target_offset, time)` and the shape.
    pub fn regenerate(&mut self, target_size: Vec3, target_offset: Vec3, time: f32) {
        let res = self.resolution;
        let slab = res.xz as usize * res.y as usize;
        let shape = self.shape;
        let noise = &self.noise;

        let mut next = vec![0.0f32; res.cell_count()];
        next.par_chunks_mut(slab).enumerate().for_each(|(z, slab)| {
            for y in 0..res.y {
                for x in 0..res.xz {
                    let world = cell_world_position(
                        UVec3::new(x, y, z as u32),
                        res,
                        target_size,
                        target_offset,
                    );
                    let h = y as f32 / res.y as f32;
                    slab[(x + res.xz * y) as usize] =
                        evaluate_density(noise, &shape, world, h, time);
                }
            }
        });

        // Swap in the finished grid together with its window
        self.cells = next;
        self.target_size = target_size;
        self.target_offset = target_offset;
        self.generation_time = time;
    }

    pub fn apply(&mut self, request: &DensityRequest) {
        self.regenerate(request.target_size, request.target_offset, request.time);
    }

    /// Continuous grid coordinates of `world`, `None` outside the covered region
    fn local_coords(&self, world: Vec3) -> Option<Vec3> {
        let size = self.target_size;
        if size.x <= 0.0 || size.y <= 0.0 || size.z <= 0.0 {
            return None;
        }
        let uvw = (world - self.target_offset) / size + 0.5;
        if uvw.cmplt(Vec3::ZERO).any() || uvw.cmpgt(Vec3::ONE).any() {
            return None;
        }
        Some(uvw * self.resolution.dims().as_vec3())
    }

    /// Trilinearly interpolated density; 0 outside the covered region
    pub fn sample(&self, world: Vec3) -> f32 {
        let Some(g) = self.local_coords(world) else {
            return 0.0;
        };
        let max = self.resolution.dims().as_vec3() - Vec3::ONE;
        let g = g.clamp(Vec3::ZERO, max);
        let base = g.floor();
        let f = g - base;
        let b = base.as_uvec3();
        let next = (b + UVec3::ONE).min(self.resolution.dims() - UVec3::ONE);

        let c = |x: u32, y: u32, z: u32| self.cell(x, y, z);
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        let x00 = lerp(c(b.x, b.y, b.z), c(next.x, b.y, b.z), f.x);
        let x10 = lerp(c(b.x, next.y, b.z), c(next.x, next.y, b.z), f.x);
        let x01 = lerp(c(b.x, b.y, next.z), c(next.x, b.y, next.z), f.x);
        let x11 = lerp(c(b.x, next.y, next.z), c(next.x, next.y, next.z), f.x);
        let y0 = lerp(x00, x10, f.y);
        let y1 = lerp(x01, x11, f.y);
        lerp(y0, y1, f.z)
    }
}

impl DensitySampler for DensityField {
    fn density(&self, world: Vec3) -> f32 {
        self.sample(world)
    }
}

impl std::fmt::Debug for DensityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DensityField")
            .field("resolution", &self.resolution)
            .field("shape", &self.shape)
            .field("target_size", &self.target_size)
            .field("target_offset", &self.target_offset)
            .field("generation_time", &self.generation_time)
            .finish_non_exhaustive()
    }
}

fn cell_world_position(
    cell: UVec3,
    resolution: GridResolution,
    target_size: Vec3,
    target_offset: Vec3,
) -> Vec3 {
    target_offset + (cell.as_vec3() / resolution.dims().as_vec3() - 0.5) * target_size
}

/// The density kernel; `h` is the normalised height inside the window
fn evaluate_density(
    noise: &Fbm<Perlin>,
    shape: &CloudShape,
    world: Vec3,
    h: f32,
    time: f32,
) -> f32 {
    let p = (world + shape.wind * time) * shape.frequency;
    let n = noise.get([f64::from(p.x), f64::from(p.y), f64::from(p.z)]) as f32;
    let n01 = ((n + 1.0) * 0.5).clamp(0.0, 1.0);

    let coverage = shape.coverage.clamp(0.0, 1.0);
    if coverage <= 0.0 {
        return 0.0;
    }
    let d = (n01 - (1.0 - coverage)) / coverage;
    (d * height_profile(h)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_must_be_block_multiple() {
        assert!(GridResolution::new(64, 16).is_ok());
        assert!(GridResolution::new(60, 16).is_err());
        assert!(GridResolution::new(64, 0).is_err());
        assert!(DensityField::new(GridResolution { xz: 12, y: 8 }, CloudShape::default()).is_err());
    }

    #[test]
    fn test_work_groups() {
        let res = GridResolution::new(64, 16).unwrap();
        assert_eq!(res.work_groups(), UVec3::new(8, 2, 8));
        assert_eq!(res.cell_count(), 64 * 16 * 64);
    }

    #[test]
    fn test_height_profile_fades_at_edges() {
        assert_eq!(height_profile(0.0), 0.0);
        assert_eq!(height_profile(1.0), 0.0);
        assert_eq!(height_profile(0.5), 1.0);
    }

    #[test]
    fn test_empty_field_samples_zero() {
        let field = DensityField::new(GridResolution::new(8, 8).unwrap(), CloudShape::default())
            .unwrap();
        assert_eq!(field.sample(Vec3::ZERO), 0.0);
        assert!(!field.contains(Vec3::ZERO));
    }

    #[test]
    fn test_cell_mapping_matches_window() {
        let mut field =
            DensityField::new(GridResolution::new(8, 8).unwrap(), CloudShape::default()).unwrap();
        field.regenerate(Vec3::splat(16.0), Vec3::new(100.0, 0.0, 0.0), 0.0);
        assert_eq!(field.cell_position(UVec3::ZERO), Vec3::new(92.0, -8.0, -8.0));
        assert_eq!(field.cell_position(UVec3::new(4, 4, 4)), Vec3::new(100.0, 0.0, 0.0));
    }

    #[test]
    fn test_sample_reproduces_cell_values() {
        let mut field =
            DensityField::new(GridResolution::new(8, 8).unwrap(), CloudShape::default()).unwrap();
        field.regenerate(Vec3::splat(80.0), Vec3::ZERO, 0.0);
        let p = field.cell_position(UVec3::new(3, 2, 5));
        assert!((field.sample(p) - field.cell(3, 2, 5)).abs() < 1e-5);
    }
}
