//! Named-uniform sink
//!
//! Scene and volume parameters are exported to shaders by name. The core
//! never touches GL program state directly; it writes into a [`UniformSink`],
//! which the GL backend implements on a linked program and tests implement
//! with [`UniformRecorder`].

use glam::{IVec3, Mat4, Vec3, Vec4};
use std::collections::BTreeMap;

/// Value types the passes upload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    UInt(u32),
    Float(f32),
    IVec3(IVec3),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<IVec3> for UniformValue {
    fn from(v: IVec3) -> Self {
        Self::IVec3(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        Self::Mat4(v)
    }
}

/// Destination for named uniform values
pub trait UniformSink {
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Convenience wrapper accepting anything convertible to [`UniformValue`]
    fn set(&mut self, name: &str, value: impl Into<UniformValue>)
    where
        Self: Sized,
    {
        self.set_uniform(name, value.into());
    }
}

/// Records every uniform written to it, last write wins
#[derive(Debug, Default, Clone)]
pub struct UniformRecorder {
    values: BTreeMap<String, UniformValue>,
}

impl UniformRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.get(name).copied()
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            UniformValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.get(name)? {
            UniformValue::Vec3(v) => Some(v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl UniformSink for UniformRecorder {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.values.insert(name.to_string(), value);
    }
}
