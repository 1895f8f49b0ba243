//! Uniform export of scene, volume and generation state

use glam::{Vec3, Vec4};
use renderer::{
    GenerationParams, Light, LightKind, SceneState, UniformRecorder, UniformValue, VolumeParams,
};

#[test]
fn test_volume_uniform_names_and_values() {
    let mut recorder = UniformRecorder::new();
    VolumeParams::default().write_uniforms(&mut recorder);

    assert_eq!(recorder.int("MAX_STEPS"), Some(30));
    assert_eq!(recorder.int("MAX_LIGHT_STEPS"), Some(10));
    assert_eq!(recorder.float("u_stepSize"), Some(0.01));
    assert_eq!(recorder.float("u_lightStepSize"), Some(0.01));
    assert_eq!(recorder.float("u_cloudAbsorption"), Some(1.0));
    assert_eq!(recorder.float("u_lightAbsorption"), Some(0.3));
    assert_eq!(recorder.float("u_densityMultiplier"), Some(1.5));
    assert_eq!(recorder.float("u_scatteringG"), Some(0.5));
    assert_eq!(
        recorder.get("u_phaseParams"),
        Some(UniformValue::Vec4(Vec4::new(0.74, 0.1, 0.1, 1.0)))
    );
    assert_eq!(recorder.len(), 9);
}

#[test]
fn test_out_of_range_volume_values_are_clamped_on_export() {
    let params = VolumeParams {
        num_steps: -4,
        num_light_steps: -1,
        cloud_absorption: -2.0,
        light_absorption: f32::NAN,
        scattering_g: 3.0,
        phase_params: Vec4::new(2.0, -5.0, -1.0, f32::INFINITY),
        ..VolumeParams::default()
    };
    let mut recorder = UniformRecorder::new();
    params.write_uniforms(&mut recorder);

    assert_eq!(recorder.int("MAX_STEPS"), Some(0));
    assert_eq!(recorder.int("MAX_LIGHT_STEPS"), Some(0));
    assert_eq!(recorder.float("u_cloudAbsorption"), Some(0.0));
    assert_eq!(recorder.float("u_lightAbsorption"), Some(0.0));
    assert!(recorder.float("u_scatteringG").unwrap() < 1.0);
    let Some(UniformValue::Vec4(pp)) = recorder.get("u_phaseParams") else {
        panic!("phase params exported as vec4");
    };
    assert_eq!(pp.x, 1.0);
    assert!(pp.y > -1.0);
    assert_eq!(pp.z, 0.0);
    assert_eq!(pp.w, 0.0);
}

#[test]
fn test_light_array_export() {
    let mut scene = SceneState::default();
    scene.add_light(Light::ambient(Vec3::splat(0.2), 0.5));
    scene.add_light(Light::point(Vec3::new(1.0, 2.0, 3.0), Vec3::X, 4.0));

    let mut recorder = UniformRecorder::new();
    scene.write_light_uniforms(&mut recorder);

    assert_eq!(recorder.int("u_numLights"), Some(2));
    assert_eq!(
        recorder.int("u_lights[0].type"),
        Some(LightKind::Ambient.shader_id())
    );
    assert_eq!(recorder.int("u_lights[1].type"), Some(1));
    assert_eq!(
        recorder.vec3("u_lights[1].position"),
        Some(Vec3::new(1.0, 2.0, 3.0))
    );
    assert_eq!(recorder.vec3("u_lights[1].color"), Some(Vec3::X));
    assert_eq!(recorder.float("u_lights[1].intensity"), Some(4.0));
    assert!(recorder.get("u_lights[2].type").is_none());
}

#[test]
fn test_empty_light_list_exports_count_only() {
    let scene = SceneState::default();
    let mut recorder = UniformRecorder::new();
    scene.write_light_uniforms(&mut recorder);

    assert_eq!(recorder.names().collect::<Vec<_>>(), vec!["u_numLights"]);
    assert_eq!(recorder.int("u_numLights"), Some(0));
}

#[test]
fn test_generation_window_export() {
    let generation = GenerationParams {
        domain_center: Vec3::new(5.0, 40.0, -5.0),
        domain_size: Vec3::new(80.0, -3.0, 80.0),
    };
    let mut recorder = UniformRecorder::new();
    generation.write_uniforms(&mut recorder);

    assert_eq!(
        recorder.vec3("u_domainCenter"),
        Some(Vec3::new(5.0, 40.0, -5.0))
    );
    // Negative extents collapse to an empty box
    assert_eq!(
        recorder.vec3("u_domainSize"),
        Some(Vec3::new(80.0, 0.0, 80.0))
    );
}

#[test]
fn test_camera_export_is_consistent() {
    let scene = SceneState::default();
    let mut recorder = UniformRecorder::new();
    scene.write_camera_uniforms(&mut recorder);

    let (Some(UniformValue::Mat4(view)), Some(UniformValue::Mat4(proj))) =
        (recorder.get("u_viewMat"), recorder.get("u_projMat"))
    else {
        panic!("camera matrices exported");
    };
    assert_eq!(
        recorder.get("u_proj_viewMat"),
        Some(UniformValue::Mat4(proj * view))
    );
    assert_eq!(recorder.vec3("u_cameraPosition"), Some(scene.camera.position));
}
