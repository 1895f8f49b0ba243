//! Side panel with the live controls

use crate::FpsCounter;
use glam::Vec3;
use renderer::{
    CloudShape, DeferredRenderer, Light, LightKind, RegenerationReason, Renderer, SceneState,
    VolumeParams, MAX_LIGHTS,
};

/// Widget state that lives across frames
#[derive(Debug, Clone)]
pub struct PanelState {
    /// Edited copy of the noise parameters, pushed to the renderer on change
    pub shape: CloudShape,
    pub new_light_kind: LightKind,
    /// Cadence remembered while the cadence trigger is switched off
    pub cadence_frames: u32,
}

impl PanelState {
    pub fn new(shape: CloudShape) -> Self {
        Self {
            shape,
            new_light_kind: LightKind::Point,
            cadence_frames: 5,
        }
    }
}

/// A light of `kind` placed somewhere visible above the demo scene
pub fn default_light(kind: LightKind) -> Light {
    match kind {
        LightKind::Ambient => Light::ambient(Vec3::ONE, 0.2),
        LightKind::Point => Light::point(Vec3::new(0.0, 20.0, 0.0), Vec3::ONE, 400.0),
        LightKind::Directional => Light::default(),
    }
}

pub fn reason_label(reason: Option<RegenerationReason>) -> &'static str {
    match reason {
        None => "never",
        Some(RegenerationReason::Initial) => "initial",
        Some(RegenerationReason::Cadence) => "cadence",
        Some(RegenerationReason::WindowChanged) => "window changed",
        Some(RegenerationReason::Forced) => "forced",
    }
}

/// Label for the regeneration timing readout of `renderer`
pub fn regeneration_timing_label(renderer: &impl Renderer) -> &'static str {
    if renderer.supports_gl() {
        "Density dispatch"
    } else {
        "Density pass"
    }
}

pub fn side_panel(
    ctx: &egui::Context,
    scene: &mut SceneState,
    renderer: &mut DeferredRenderer,
    fps: &FpsCounter,
    panel: &mut PanelState,
) {
    egui::SidePanel::left("cloud_controls")
        .default_width(260.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Clouds");
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::CollapsingHeader::new("Volume")
                    .default_open(true)
                    .show(ui, |ui| volume_controls(ui, scene.volume_mut()));

                egui::CollapsingHeader::new("Generation")
                    .default_open(true)
                    .show(ui, |ui| generation_controls(ui, scene, renderer, panel));

                egui::CollapsingHeader::new("Lights")
                    .default_open(false)
                    .show(ui, |ui| light_controls(ui, scene, panel));

                egui::CollapsingHeader::new("Performance")
                    .default_open(true)
                    .show(ui, |ui| {
                        let stats = renderer.stats();
                        ui.label(format!("FPS: {:.1}", fps.fps()));
                        ui.label(format!("Frame time: {:.2} ms", fps.frame_ms()));
                        ui.label(format!("Render time: {:.2} ms", stats.frame_ms));
                        ui.label(format!("Regenerations: {}", stats.regenerations));
                        ui.label(format!("Last: {}", reason_label(stats.last_reason)));
                        ui.label(format!(
                            "{}: {:.2} ms",
                            regeneration_timing_label(&*renderer),
                            stats.regeneration_ms
                        ));

                        let mut wireframe = renderer.wireframe();
                        if ui.checkbox(&mut wireframe, "Wireframe (W / F)").changed() {
                            renderer.set_wireframe(wireframe);
                        }
                    });

                ui.separator();
                ui.label("Left drag: orbit");
                ui.label("Wheel: zoom");
                ui.label("Esc / Q: quit");
            });
        });
}

fn volume_controls(ui: &mut egui::Ui, volume: &mut VolumeParams) {
    ui.add(egui::Slider::new(&mut volume.num_steps, 0..=200).text("Steps"));
    ui.add(egui::Slider::new(&mut volume.num_light_steps, 0..=100).text("Light steps"));
    ui.add(
        egui::Slider::new(&mut volume.step_size, 0.01..=0.5)
            .logarithmic(true)
            .text("Step size"),
    );
    ui.add(
        egui::Slider::new(&mut volume.light_step_size, 0.01..=0.5)
            .logarithmic(true)
            .text("Light step size"),
    );
    ui.add(egui::Slider::new(&mut volume.cloud_absorption, 0.0..=2.0).text("Cloud absorption"));
    ui.add(egui::Slider::new(&mut volume.light_absorption, 0.0..=2.0).text("Light absorption"));
    ui.add(egui::Slider::new(&mut volume.density_multiplier, 0.0..=4.0).text("Density"));
    ui.add(egui::Slider::new(&mut volume.scattering_g, -1.0..=1.0).text("Scattering g"));

    ui.label("Phase");
    let phase = &mut volume.phase_params;
    ui.add(egui::Slider::new(&mut phase.x, 0.0..=1.0).text("Forward weight"));
    ui.add(egui::Slider::new(&mut phase.y, 0.0..=1.0).text("Back g"));
    ui.add(egui::Slider::new(&mut phase.z, 0.0..=1.0).text("Base"));
    ui.add(egui::Slider::new(&mut phase.w, 0.0..=1.0).text("Scale"));
}

fn generation_controls(
    ui: &mut egui::Ui,
    scene: &mut SceneState,
    renderer: &mut DeferredRenderer,
    panel: &mut PanelState,
) {
    let mut center = scene.generation().domain_center;
    let mut size = scene.generation().domain_size;
    let mut window_edited = vec3_drag(ui, "Center", &mut center, -100.0..=100.0);
    window_edited |= vec3_drag(ui, "Size", &mut size, 0.0..=300.0);
    if window_edited {
        scene.set_domain(center, size);
    }

    ui.add_space(4.0);
    let mut shape_edited = false;
    ui.horizontal(|ui| {
        ui.label("Seed");
        shape_edited |= ui.add(egui::DragValue::new(&mut panel.shape.seed)).changed();
    });
    shape_edited |= ui
        .add(egui::Slider::new(&mut panel.shape.coverage, 0.0..=1.0).text("Coverage"))
        .changed();
    shape_edited |= ui
        .add(
            egui::Slider::new(&mut panel.shape.frequency, 0.001..=0.2)
                .logarithmic(true)
                .text("Frequency"),
        )
        .changed();
    shape_edited |= ui
        .add(egui::Slider::new(&mut panel.shape.octaves, 1..=8).text("Octaves"))
        .changed();
    if shape_edited {
        renderer.set_shape(panel.shape);
        renderer.scheduler_mut().request_regeneration();
    }

    ui.add_space(4.0);
    let policy = &mut renderer.scheduler_mut().policy;
    let mut cadence_on = policy.cadence_frames.is_some();
    if let Some(n) = policy.cadence_frames {
        panel.cadence_frames = n.max(1);
    }
    ui.horizontal(|ui| {
        ui.checkbox(&mut cadence_on, "Every");
        ui.add_enabled(
            cadence_on,
            egui::DragValue::new(&mut panel.cadence_frames).range(1..=120),
        );
        ui.label("frames");
    });
    policy.cadence_frames = cadence_on.then_some(panel.cadence_frames);
    ui.checkbox(&mut policy.on_window_change, "On window change");
    ui.checkbox(&mut policy.animate, "Animate");

    if ui.button("Regenerate").clicked() {
        renderer.scheduler_mut().request_regeneration();
    }
}

fn light_controls(ui: &mut egui::Ui, scene: &mut SceneState, panel: &mut PanelState) {
    ui.label(format!("{} / {}", scene.lights().len(), MAX_LIGHTS));

    ui.horizontal(|ui| {
        egui::ComboBox::from_id_salt("new_light_kind")
            .selected_text(panel.new_light_kind.label())
            .show_ui(ui, |ui| {
                for kind in LightKind::ALL {
                    ui.selectable_value(&mut panel.new_light_kind, kind, kind.label());
                }
            });
        let full = scene.lights().is_full();
        if ui.add_enabled(!full, egui::Button::new("Add")).clicked() {
            scene.add_light(default_light(panel.new_light_kind));
        }
        let empty = scene.lights().is_empty();
        if ui.add_enabled(!empty, egui::Button::new("Remove")).clicked() {
            scene.remove_light();
        }
    });

    for (i, light) in scene.lights_mut().iter_mut().enumerate() {
        ui.push_id(i, |ui| {
            ui.separator();
            egui::ComboBox::from_id_salt("kind")
                .selected_text(format!("#{i} {}", light.kind.label()))
                .show_ui(ui, |ui| {
                    for kind in LightKind::ALL {
                        ui.selectable_value(&mut light.kind, kind, kind.label());
                    }
                });
            if light.kind != LightKind::Ambient {
                let label = if light.kind == LightKind::Directional {
                    "Direction"
                } else {
                    "Position"
                };
                vec3_drag(ui, label, &mut light.position, -200.0..=200.0);
            }
            ui.horizontal(|ui| {
                let mut color = light.color.to_array();
                if ui.color_edit_button_rgb(&mut color).changed() {
                    light.color = Vec3::from_array(color);
                }
                ui.add(
                    egui::DragValue::new(&mut light.intensity)
                        .speed(0.1)
                        .range(0.0..=f32::MAX)
                        .prefix("I: "),
                );
            });
        });
    }
}

fn vec3_drag(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut Vec3,
    range: std::ops::RangeInclusive<f32>,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        for axis in [&mut value.x, &mut value.y, &mut value.z] {
            changed |= ui
                .add(egui::DragValue::new(axis).speed(0.5).range(range.clone()))
                .changed();
        }
    });
    changed
}
