//! Perspective camera and orbit controller
//!
//! # Coordinate System
//!
//! Uses OpenGL convention:
//! - +X is right
//! - +Y is up
//! - -Z is forward (into the screen)
//!
//! Projection follows GL clip conventions (depth in `[-1, 1]`).

use glam::{Mat3, Mat4, Quat, Vec3};

/// Default vertical field of view: 90 degrees
pub const DEFAULT_VFOV: f32 = 90.0 * std::f32::consts::PI / 180.0;

pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 200.0;

/// Camera used by both the geometry and the compositing pass
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Camera rotation (orientation) as quaternion
    pub rotation: Quat,
    /// Vertical field of view in radians
    pub vfov: f32,
    /// Near clip plane distance
    pub near: f32,
    /// Far clip plane distance
    pub far: f32,
    /// Viewport width / height
    pub aspect: f32,
    /// Point the camera was last aimed at, if any
    pub target_position: Option<Vec3>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y)
    }
}

impl Camera {
    /// Create camera with position looking at target
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let mut camera = Self {
            position,
            rotation: Quat::IDENTITY,
            vfov: DEFAULT_VFOV,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            aspect: 1.0,
            target_position: None,
        };
        camera.aim(target, up);
        camera
    }

    fn aim(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize_or(Vec3::NEG_Z);
        let mut right = forward.cross(up);
        if right.length_squared() < 1e-8 {
            // Looking straight along `up`
            right = forward.cross(Vec3::Z);
        }
        let right = right.normalize();
        let cam_up = right.cross(forward);

        // In camera space: right=+X, up=+Y, forward=-Z
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, cam_up, -forward));
        self.target_position = Some(target);
    }

    /// Update the aspect ratio from a viewport size; zero-sized viewports are ignored
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// World-to-view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    /// View-to-clip transform
    pub fn projection_matrix(&self) -> Mat4 {
        let near = self.near.max(1e-4);
        let far = self.far.max(near + 1e-3);
        Mat4::perspective_rh_gl(self.vfov.clamp(1e-3, 3.1), self.aspect.max(1e-3), near, far)
    }

    /// `projection * view`
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Orbit camera around a target point
    /// yaw_delta: rotation around world Y-axis (horizontal mouse movement)
    /// pitch_delta: rotation around the camera's right axis (vertical mouse movement)
    pub fn orbit(&mut self, target: Vec3, yaw_delta: f32, pitch_delta: f32) {
        let mut offset = self.position - target;
        let distance = offset.length();
        if distance < 1e-6 {
            return;
        }

        // Pitch first, around the current right axis
        if pitch_delta.abs() > 0.0001 {
            let forward = -offset / distance;
            let right = forward.cross(Vec3::Y);

            if right.length_squared() > 0.0001 {
                offset = Quat::from_axis_angle(right.normalize(), pitch_delta) * offset;

                // Keep away from the poles
                const MAX_ANGLE: f32 = 85.0 * std::f32::consts::PI / 180.0;
                let xz_length = (offset.x * offset.x + offset.z * offset.z).sqrt();
                let elevation = offset.y.atan2(xz_length);
                if elevation.abs() > MAX_ANGLE && xz_length > 1e-6 {
                    let clamped = elevation.clamp(-MAX_ANGLE, MAX_ANGLE);
                    let xz_ratio = distance * clamped.cos() / xz_length;
                    offset = Vec3::new(
                        offset.x * xz_ratio,
                        distance * clamped.sin(),
                        offset.z * xz_ratio,
                    );
                }
            }
        }

        // Yaw around world Y
        if yaw_delta.abs() > 0.0001 {
            offset = Quat::from_axis_angle(Vec3::Y, yaw_delta) * offset;
        }

        self.position = target + offset.normalize() * distance;
        self.aim(target, Vec3::Y);
    }
}

/// Configuration for orbit camera controller
#[derive(Debug, Clone)]
pub struct OrbitControllerConfig {
    /// Mouse sensitivity for orbit rotation (radians per pixel)
    pub mouse_sensitivity: f32,
    /// Zoom sensitivity (units per scroll unit)
    pub zoom_sensitivity: f32,
    /// Minimum zoom distance from target
    pub min_distance: f32,
    /// Maximum zoom distance from target
    pub max_distance: f32,
}

impl Default for OrbitControllerConfig {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 0.005,
            zoom_sensitivity: 0.5,
            min_distance: 0.5,
            max_distance: 150.0,
        }
    }
}

/// Orbit camera controller
///
/// Mouse drag orbits around `target`, scroll moves towards / away from it.
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub target: Vec3,
    pub config: OrbitControllerConfig,
}

impl OrbitController {
    pub fn new(target: Vec3, config: OrbitControllerConfig) -> Self {
        Self { target, config }
    }

    pub fn with_target(target: Vec3) -> Self {
        Self::new(target, OrbitControllerConfig::default())
    }

    /// Apply a mouse drag given in pixels
    pub fn drag(&self, delta_x: f32, delta_y: f32, camera: &mut Camera) {
        let yaw_delta = -delta_x * self.config.mouse_sensitivity;
        let pitch_delta = -delta_y * self.config.mouse_sensitivity;
        self.rotate(yaw_delta, pitch_delta, camera);
    }

    /// Apply rotation directly, in radians
    pub fn rotate(&self, yaw_delta: f32, pitch_delta: f32, camera: &mut Camera) {
        camera.orbit(self.target, yaw_delta, pitch_delta);
    }

    /// Zoom amount (positive = closer, negative = farther)
    pub fn zoom(&self, scroll_delta: f32, camera: &mut Camera) {
        let to_target = self.target - camera.position;
        let distance = to_target.length();
        if distance < 1e-6 {
            return;
        }
        let new_distance = (distance - scroll_delta * self.config.zoom_sensitivity)
            .clamp(self.config.min_distance, self.config.max_distance);
        camera.position = self.target - to_target * (new_distance / distance);
    }

    pub fn distance(&self, camera: &Camera) -> f32 {
        (camera.position - self.target).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_default() {
        let camera = Camera::default();
        assert!((camera.vfov - DEFAULT_VFOV).abs() < 0.001);
        assert_eq!(camera.near, DEFAULT_NEAR);
        assert_eq!(camera.far, DEFAULT_FAR);
        assert!(camera.forward().z < -0.99);
    }

    #[test]
    fn test_view_matrix_moves_camera_to_origin() {
        let camera = Camera::look_at(Vec3::new(1.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
        let eye = camera.view_matrix().transform_point3(camera.position);
        assert!(eye.length() < 1e-5);

        // The target lies straight ahead on -Z
        let target = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(target.x.abs() < 1e-4 && target.y.abs() < 1e-4);
        assert!(target.z < 0.0);
    }

    #[test]
    fn test_projection_maps_near_and_far() {
        let camera = Camera::default();
        let proj = camera.projection_matrix();
        let near = proj.project_point3(Vec3::new(0.0, 0.0, -camera.near));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, -camera.far));
        assert!((near.z + 1.0).abs() < 1e-4);
        assert!((far.z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_set_viewport_ignores_zero_size() {
        let mut camera = Camera::default();
        camera.set_viewport(800, 400);
        assert_eq!(camera.aspect, 2.0);
        camera.set_viewport(0, 400);
        assert_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn test_orbit_controller_keeps_distance() {
        let mut camera = Camera::look_at(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, Vec3::Y);
        let controller = OrbitController::with_target(Vec3::ZERO);
        let initial_pos = camera.position;

        controller.rotate(0.1, 0.2, &mut camera);

        assert!((camera.position - initial_pos).length() > 0.01);
        assert!((camera.position.length() - 5.0).abs() < 0.01);
        // Still aimed at the target
        assert!(camera.forward().dot(-camera.position.normalize()) > 0.999);
    }

    #[test]
    fn test_orbit_pitch_is_clamped() {
        let mut camera = Camera::look_at(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, Vec3::Y);
        let controller = OrbitController::with_target(Vec3::ZERO);
        for _ in 0..20 {
            controller.rotate(0.0, 0.5, &mut camera);
        }
        let elevation = camera.position.y.atan2(camera.position.x.hypot(camera.position.z));
        assert!(elevation.abs() <= 85.5_f32.to_radians());
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
        let controller = OrbitController::with_target(Vec3::ZERO);

        controller.zoom(100.0, &mut camera);
        assert!((controller.distance(&camera) - 0.5).abs() < 1e-4);

        controller.zoom(-1000.0, &mut camera);
        assert!((controller.distance(&camera) - 150.0).abs() < 1e-3);
    }
}
