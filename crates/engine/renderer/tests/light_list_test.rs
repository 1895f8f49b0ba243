//! Light list capacity and ordering

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::{Light, LightKind, MAX_LIGHTS, SceneState};

#[test]
fn test_add_then_remove_leaves_difference() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..50 {
        let mut scene = SceneState::default();
        let added = rng.random_range(0..=MAX_LIGHTS);
        let removed = rng.random_range(0..=added);

        for i in 0..added {
            assert!(scene.add_light(Light::point(Vec3::splat(i as f32), Vec3::ONE, 1.0)));
        }
        for _ in 0..removed {
            assert!(scene.remove_light().is_some());
        }

        assert_eq!(scene.lights().len(), added - removed);
    }
}

#[test]
fn test_add_beyond_capacity_is_ignored() {
    let mut scene = SceneState::default();
    for _ in 0..MAX_LIGHTS {
        assert!(scene.add_light(Light::default()));
    }

    assert!(!scene.add_light(Light::ambient(Vec3::ONE, 0.5)));
    assert_eq!(scene.lights().len(), MAX_LIGHTS);
    assert!(
        scene
            .lights()
            .iter()
            .all(|light| light.kind == LightKind::Directional)
    );
}

#[test]
fn test_remove_from_empty_returns_none() {
    let mut scene = SceneState::default();
    assert!(scene.remove_light().is_none());
    assert!(scene.lights().is_empty());
}

#[test]
fn test_remove_takes_most_recent() {
    let mut scene = SceneState::default();
    scene.add_light(Light::ambient(Vec3::ONE, 0.2));
    scene.add_light(Light::point(Vec3::new(1.0, 2.0, 3.0), Vec3::X, 4.0));

    let removed = scene.remove_light().expect("one light to remove");
    assert_eq!(removed.kind, LightKind::Point);
    assert_eq!(scene.lights().as_slice()[0].kind, LightKind::Ambient);
}

#[test]
fn test_demo_scene_has_one_directional_light() {
    let scene = SceneState::demo(Default::default(), Default::default());
    assert_eq!(scene.lights().len(), 1);
    assert_eq!(scene.lights().as_slice()[0].kind, LightKind::Directional);
    assert_eq!(scene.objects().len(), 2);
}
