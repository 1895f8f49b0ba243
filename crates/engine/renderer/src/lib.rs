//! Volumetric cloud renderer
//!
//! Renders a procedural cloud layer over opaque geometry with a deferred
//! pipeline:
//! - **density**: procedural density grid regenerated over a moving window
//! - **gbuffer**: geometry pass producing world position, normal and albedo
//! - **march** / **compositor**: per-pixel ray march through the density
//!   grid with single scattering, composited over the shaded surfaces
//! - **schedule**: decides which frames regenerate the density grid
//!
//! # Architecture
//!
//! The crate-root modules are context free and run on the CPU. [`gl`] holds
//! the OpenGL counterparts of the same passes. Both are driven through the
//! [`Renderer`] trait by [`SoftwareRenderer`] and [`DeferredRenderer`].

// Core modules
pub mod camera;
pub mod config;
pub mod error;
pub mod mesh;
pub mod scene;
pub mod schedule;
pub mod uniforms;

// Passes
pub mod compositor;
pub mod density;
pub mod gbuffer;
pub mod march;

// Renderer implementations
pub mod deferred;
pub mod gl;
pub mod renderer;
pub mod shader_utils;
pub mod software;

pub use camera::{Camera, DEFAULT_VFOV, OrbitController, OrbitControllerConfig};
pub use compositor::{CompositeOutput, Compositor, SKY_COLOR};
pub use config::{DensityConfig, RendererConfig};
pub use deferred::DeferredRenderer;
pub use density::{CloudShape, DensityField, DensitySampler, GridResolution};
pub use error::{Error, Result};
pub use gbuffer::{GBuffer, GeometryPass};
pub use march::{Aabb, MarchResult, Ray};
pub use mesh::MeshData;
pub use renderer::{FrameInfo, RenderStats, Renderer};
pub use scene::{
    GenerationParams, Light, LightKind, LightList, MAX_LIGHTS, MeshId, SceneObject, SceneState,
    VolumeParams,
};
pub use schedule::{DensityRequest, FrameScheduler, RegenerationPolicy, RegenerationReason};
pub use software::SoftwareRenderer;
pub use uniforms::{UniformRecorder, UniformSink, UniformValue};
