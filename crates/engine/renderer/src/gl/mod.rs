//! OpenGL backend for the deferred renderer
//!
//! Everything here needs a current GL 4.3 context. The CPU modules in the
//! crate root describe the same passes without one.

pub mod density;
pub mod gbuffer;
pub mod geometry_pass;
pub mod lighting_pass;
pub mod mesh;
pub mod uniforms;

pub use density::GlDensityField;
pub use gbuffer::GlGBuffer;
pub use geometry_pass::GlGeometryPass;
pub use lighting_pass::{DENSITY_TEXTURE_UNIT, GlLightingPass};
pub use mesh::{GlMesh, GlMeshCache};
pub use uniforms::GlUniforms;
