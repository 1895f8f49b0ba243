//! CPU geometry buffer and the software geometry pass
//!
//! Rows are stored top to bottom (image order). Pixel `(x, y)` covers NDC
//! `x = (x + 0.5) / w * 2 - 1`, `y = 1 - (y + 0.5) / h * 2`.

use crate::scene::SceneState;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// One G-buffer sample with geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GTexel {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    /// NDC depth in `[-1, 1]`
    pub depth: f32,
}

#[derive(Debug, Clone)]
pub struct GBuffer {
    width: u32,
    height: u32,
    position: Vec<Vec3>,
    normal: Vec<Vec3>,
    albedo: Vec<Vec3>,
    depth: Vec<f32>,
}

impl GBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            position: vec![Vec3::ZERO; n],
            normal: vec![Vec3::ZERO; n],
            albedo: vec![Vec3::ZERO; n],
            depth: vec![f32::INFINITY; n],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reallocate if the size changed; returns whether it did
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == self.width && height == self.height {
            return false;
        }
        *self = Self::new(width, height);
        true
    }

    pub fn clear(&mut self) {
        self.position.fill(Vec3::ZERO);
        self.normal.fill(Vec3::ZERO);
        self.albedo.fill(Vec3::ZERO);
        self.depth.fill(f32::INFINITY);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Geometry written at `(x, y)`, `None` for background
    pub fn texel(&self, x: u32, y: u32) -> Option<GTexel> {
        let i = self.index(x, y);
        let depth = self.depth[i];
        depth.is_finite().then(|| GTexel {
            position: self.position[i],
            normal: self.normal[i],
            albedo: self.albedo[i],
            depth,
        })
    }

    pub fn covered_pixels(&self) -> usize {
        self.depth.iter().filter(|d| d.is_finite()).count()
    }

    fn write(&mut self, x: u32, y: u32, texel: GTexel) {
        let i = self.index(x, y);
        if texel.depth < self.depth[i] {
            self.position[i] = texel.position;
            self.normal[i] = texel.normal;
            self.albedo[i] = texel.albedo;
            self.depth[i] = texel.depth;
        }
    }
}

/// Clip-space vertex with the attributes the pass interpolates
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vec4,
    world: Vec3,
    normal: Vec3,
}

impl ClipVertex {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            clip: self.clip.lerp(other.clip, t),
            world: self.world.lerp(other.world, t),
            normal: self.normal.lerp(other.normal, t),
        }
    }

    /// Signed distance to the near plane (`z >= -w`)
    fn near_distance(&self) -> f32 {
        self.clip.z + self.clip.w
    }
}

/// Software rasteriser writing world position, normal, albedo and depth
#[derive(Debug, Default, Clone, Copy)]
pub struct GeometryPass;

impl GeometryPass {
    /// Clear `gbuffer` and draw every scene object into it
    pub fn render(&self, gbuffer: &mut GBuffer, scene: &SceneState) {
        gbuffer.clear();
        if gbuffer.width == 0 || gbuffer.height == 0 {
            return;
        }
        let view_proj = scene.camera.view_projection();

        for object in scene.objects() {
            let Some(mesh) = scene.meshes().get(object.mesh) else {
                tracing::warn!(mesh = object.mesh.index(), "Object references unknown mesh");
                continue;
            };
            let normal_matrix = object.normal_matrix();
            let vertices: Vec<ClipVertex> = mesh
                .positions
                .iter()
                .zip(&mesh.normals)
                .map(|(p, n)| {
                    let world = object.model.transform_point3(*p);
                    ClipVertex {
                        clip: view_proj * world.extend(1.0),
                        world,
                        normal: normal_matrix.transform_vector3(*n).normalize_or_zero(),
                    }
                })
                .collect();

            for [a, b, c] in mesh.triangles() {
                let polygon = clip_near(&[vertices[a], vertices[b], vertices[c]]);
                for i in 1..polygon.len().saturating_sub(1) {
                    rasterize(
                        gbuffer,
                        [polygon[0], polygon[i], polygon[i + 1]],
                        object.albedo,
                    );
                }
            }
        }
    }
}

/// Sutherland-Hodgman against the near plane; 0, 3 or 4 vertices
fn clip_near(tri: &[ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let cur = tri[i];
        let next = tri[(i + 1) % 3];
        let (dc, dn) = (cur.near_distance(), next.near_distance());
        if dc >= 0.0 {
            out.push(cur);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            out.push(cur.lerp(&next, dc / (dc - dn)));
        }
    }
    out
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn rasterize(gbuffer: &mut GBuffer, tri: [ClipVertex; 3], albedo: Vec3) {
    let (w, h) = (gbuffer.width as f32, gbuffer.height as f32);

    let mut screen = [Vec2::ZERO; 3];
    let mut depth = [0.0f32; 3];
    let mut inv_w = [0.0f32; 3];
    for (i, v) in tri.iter().enumerate() {
        if v.clip.w <= 1e-6 {
            return;
        }
        let ndc = v.clip.truncate() / v.clip.w;
        screen[i] = Vec2::new((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h);
        depth[i] = ndc.z;
        inv_w[i] = 1.0 / v.clip.w;
    }

    let area = edge(screen[0], screen[1], screen[2]);
    if area.abs() < 1e-9 {
        return;
    }

    let min = screen[0].min(screen[1]).min(screen[2]).max(Vec2::ZERO);
    let max = screen[0].max(screen[1]).max(screen[2]).min(Vec2::new(w, h));
    if min.x >= max.x || min.y >= max.y {
        return;
    }

    let (x0, y0) = (min.x.floor() as u32, min.y.floor() as u32);
    let (x1, y1) = (
        (max.x.ceil() as u32).min(gbuffer.width),
        (max.y.ceil() as u32).min(gbuffer.height),
    );

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let b0 = edge(screen[1], screen[2], p) / area;
            let b1 = edge(screen[2], screen[0], p) / area;
            let b2 = edge(screen[0], screen[1], p) / area;
            if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                continue;
            }

            let z = b0 * depth[0] + b1 * depth[1] + b2 * depth[2];
            if !(-1.0..=1.0).contains(&z) {
                continue;
            }

            // Perspective-correct weights
            let pw = [b0 * inv_w[0], b1 * inv_w[1], b2 * inv_w[2]];
            let sum = pw[0] + pw[1] + pw[2];
            let interp = |f: fn(&ClipVertex) -> Vec3| {
                (f(&tri[0]) * pw[0] + f(&tri[1]) * pw[1] + f(&tri[2]) * pw[2]) / sum
            };

            gbuffer.write(
                x,
                y,
                GTexel {
                    position: interp(|v| v.world),
                    normal: interp(|v| v.normal).normalize_or_zero(),
                    albedo,
                    depth: z,
                },
            );
        }
    }
}

/// NDC of the centre of pixel `(x, y)`
pub fn pixel_ndc(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32 * 2.0 - 1.0,
        1.0 - (y as f32 + 0.5) / height as f32 * 2.0,
    )
}

/// World-space direction of the camera ray through an NDC point
pub fn ndc_ray_direction(inv_view_proj: &Mat4, ndc: Vec2) -> Vec3 {
    let near = inv_view_proj.project_point3(ndc.extend(-1.0));
    let far = inv_view_proj.project_point3(ndc.extend(1.0));
    (far - near).normalize_or(Vec3::NEG_Z)
}
