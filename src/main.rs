mod components;
mod resources;
mod simulation;
mod systems;

use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy::window::{MonitorSelection, WindowMode, WindowResolution};
use bevy_egui::{EguiPlugin, EguiPrimaryContextPass};

use crate::resources::{BACKGROUND, BodySet, ResetSimulation, SimConfig, TICK_RATE_HZ, ViewState};
use crate::simulation::Simulator;
use crate::systems::*;

fn main() {
    let config = SimConfig::default();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Solar System Simulation".into(),
                resolution: WindowResolution::new(1600, 900),
                mode: WindowMode::BorderlessFullscreen(MonitorSelection::Primary),
                ..default()
            }),
            ..default()
        }))
        .add_plugins((EguiPlugin::default(), FrameTimeDiagnosticsPlugin::default()))
        .insert_resource(ClearColor(BACKGROUND))
        .insert_resource(Simulator::new(&config))
        .insert_resource(BodySet::solar_system(&config))
        .insert_resource(config)
        .init_resource::<ViewState>()
        .init_resource::<ResetSimulation>()
        .add_systems(EguiPrimaryContextPass, (ui_controls, distance_labels))
        .add_systems(Startup, setup_scene)
        .add_systems(
            Update,
            (
                apply_reset_request,
                (
                    keyboard_controls,
                    pan_controls,
                    zoom_controls,
                    sync_body_transforms,
                    draw_trails,
                )
                    .chain()
                    .after(apply_reset_request),
            ),
        )
        .add_systems(FixedUpdate, step_simulation)
        .insert_resource(Time::<Fixed>::from_hz(TICK_RATE_HZ))
        .run();
}
