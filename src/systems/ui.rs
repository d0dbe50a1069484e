use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;
use bevy_egui::egui;

use crate::resources::{BodySet, LABEL_OFFSET, ResetSimulation, SOLAR_SYSTEM, ViewState};
use crate::simulation::{IntegrationOrder, Rgb, Simulator, project_to_screen};

fn egui_color(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

pub fn format_distance(light_years: f64) -> String {
    format!("{light_years:.8} light years")
}

pub fn ui_controls(
    mut contexts: EguiContexts,
    mut view: ResMut<ViewState>,
    mut simulator: ResMut<Simulator>,
    mut reset: ResMut<ResetSimulation>,
    diagnostics: Res<DiagnosticsStore>,
    mut frames_rendered: Local<usize>,
) {
    if *frames_rendered < 5 {
        *frames_rendered += 1;
        return;
    }

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|fps| fps.smoothed())
        .unwrap_or_default();

    if let Ok(ctx) = contexts.ctx_mut() {
        egui::Window::new("Solar System")
            .default_pos(egui::pos2(15.0, 15.0))
            .max_size([320.0, 560.0])
            .vscroll(true)
            .show(ctx, |ui| {
                ui.label(format!("FPS: {}", fps as u32));
                ui.label(format!(
                    "{:.1} days per tick, G = {:e}",
                    simulator.dt() / 86_400.0,
                    simulator.g()
                ));

                ui.separator();
                ui.heading("Controls");
                ui.label("Press X or ESC to exit");
                ui.label("Press D to turn on/off distance");
                ui.label("Press S to turn on/off drawing orbit lines");
                ui.label("Use mouse or arrow keys to move around");
                ui.label("Press C to center");
                ui.label("Press Space to pause/unpause");
                ui.label("Use scroll-wheel to zoom");

                ui.separator();
                ui.checkbox(&mut view.paused, "Paused");
                ui.checkbox(&mut view.show_distance, "Show Distance");
                ui.checkbox(&mut view.draw_lines, "Draw Orbit Lines");

                let mut order = simulator.order();
                ui.horizontal(|ui| {
                    ui.label("Update order:");
                    ui.radio_value(&mut order, IntegrationOrder::Sequential, "Sequential");
                    ui.radio_value(&mut order, IntegrationOrder::Simultaneous, "Simultaneous");
                });
                if order != simulator.order() {
                    simulator.set_order(order);
                    info!("integration order set to {order:?}");
                }

                if ui.button("Reset Simulation").clicked() {
                    reset.pending = true;
                }

                ui.separator();
                ui.heading("Bodies");
                for seed in SOLAR_SYSTEM.iter().rev() {
                    ui.colored_label(egui_color(seed.color), format!("- {}", seed.name));
                }
            });
    }
}

/// Labels every non-anchor body with its distance to the anchor in light years.
pub fn distance_labels(
    mut contexts: EguiContexts,
    windows: Query<&Window, With<PrimaryWindow>>,
    simulator: Res<Simulator>,
    bodies: Res<BodySet>,
    view: Res<ViewState>,
) {
    if !view.show_distance {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };
    let half = window.size() / 2.0;

    for (index, body) in bodies.iter().enumerate() {
        if body.is_anchor() {
            continue;
        }
        let screen = project_to_screen(body.position, simulator.scale(), half, view.pan);
        egui::Area::new(egui::Id::new(("distance_label", index)))
            .fixed_pos(egui::pos2(screen.x, screen.y - LABEL_OFFSET))
            .pivot(egui::Align2::CENTER_CENTER)
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(format_distance(body.distance_to_anchor_light_years()))
                        .color(egui::Color32::WHITE),
                );
            });
    }
}
