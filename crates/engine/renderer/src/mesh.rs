//! Primitive mesh generation
//!
//! Meshes are plain vertex/index arrays in object space. The GL backend
//! uploads them with [`crate::gl::GlMesh`], the software rasteriser reads them
//! directly.

use crate::error::{Error, Result};
use glam::Vec3;
use std::f32::consts::PI;

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// UV sphere of radius 1 with `resolution` rings and segments (minimum 3)
    pub fn sphere(resolution: u32) -> Self {
        let res = resolution.max(3);
        let mut mesh = Self::default();

        for ring in 0..=res {
            let theta = PI * ring as f32 / res as f32;
            for segment in 0..=res {
                let phi = 2.0 * PI * segment as f32 / res as f32;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                mesh.positions.push(n);
                mesh.normals.push(n);
            }
        }

        let stride = res + 1;
        for ring in 0..res {
            for segment in 0..res {
                let a = ring * stride + segment;
                let b = a + stride;
                mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }

        mesh
    }

    /// Square in the XZ plane spanning `[-1, 1]`, facing +Y, split into
    /// `resolution` x `resolution` quads (minimum 1)
    pub fn subdivided_plane(resolution: u32) -> Self {
        let res = resolution.max(1);
        let mut mesh = Self::default();

        for row in 0..=res {
            let z = -1.0 + 2.0 * row as f32 / res as f32;
            for col in 0..=res {
                let x = -1.0 + 2.0 * col as f32 / res as f32;
                mesh.positions.push(Vec3::new(x, 0.0, z));
                mesh.normals.push(Vec3::Y);
            }
        }

        let stride = res + 1;
        for row in 0..res {
            for col in 0..res {
                let a = row * stride + col;
                let b = a + stride;
                // Counter-clockwise seen from +Y
                mesh.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        mesh
    }

    /// Single-quad plane
    pub fn plane() -> Self {
        Self::subdivided_plane(1)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check that every vertex has a normal and every index a vertex
    pub fn validate(&self) -> Result<()> {
        if self.normals.len() != self.positions.len() {
            return Err(Error::InvalidMesh(format!(
                "{} positions but {} normals",
                self.positions.len(),
                self.normals.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "{} indices do not form whole triangles",
                self.indices.len()
            )));
        }
        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.positions.len())
        {
            return Err(Error::InvalidMesh(format!(
                "index {index} out of range for {} vertices",
                self.positions.len()
            )));
        }
        Ok(())
    }

    /// Interleaved `position, normal` vertex data for GPU upload
    pub fn interleaved(&self) -> Vec<f32> {
        self.positions
            .iter()
            .zip(&self.normals)
            .flat_map(|(p, n)| [p.x, p.y, p.z, n.x, n.y, n.z])
            .collect()
    }

    /// Iterate triangles as vertex index triples
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }
}
