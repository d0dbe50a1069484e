use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::MessageReader;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::input::EguiWantsInput;

use crate::components::BodyIndex;
use crate::resources::*;
use crate::simulation::{Simulator, project_to_screen, screen_to_world};

/// Spawns one circle per body record, linked back to it by index.
pub fn spawn_body_entities(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<ColorMaterial>,
    bodies: &BodySet,
) {
    let mesh_handle = meshes.add(Circle::new(1.0));

    for (index, (body, seed)) in bodies.iter().zip(SOLAR_SYSTEM.iter()).enumerate() {
        let mat = materials.add(ColorMaterial::from(Color::from(body.color())));

        commands.spawn((
            Name::new(seed.name),
            Mesh2d(mesh_handle.clone()),
            MeshMaterial2d(mat),
            Transform::from_scale(Vec3::splat(body.radius() as f32)),
            BodyIndex(index),
        ));
    }
}

/// Sets up the camera and a rendered entity for each seeded body.
pub fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    bodies: Res<BodySet>,
    simulator: Res<Simulator>,
) {
    commands.spawn(Camera2d);
    spawn_body_entities(&mut commands, &mut meshes, &mut materials, &bodies);
    info!(
        "seeded {} bodies ({:e} kg total), dt = {} s, order = {:?}",
        bodies.len(),
        bodies.iter().map(|body| body.mass()).sum::<f64>(),
        simulator.dt(),
        simulator.order()
    );
}

/// Advances the physics by one tick unless paused. A degenerate configuration
/// pauses the simulation instead of integrating undefined forces.
pub fn step_simulation(
    simulator: Res<Simulator>,
    mut bodies: ResMut<BodySet>,
    mut view: ResMut<ViewState>,
) {
    if view.paused {
        return;
    }

    if let Err(err) = simulator.step_all(&mut bodies.0) {
        error!("simulation paused: {err}");
        view.paused = true;
    }
}

/// Handles the discrete key toggles: exit, pause, labels, trails and centering.
pub fn keyboard_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut exit: MessageWriter<AppExit>,
    mut view: ResMut<ViewState>,
    simulator: Res<Simulator>,
    bodies: Res<BodySet>,
) {
    if keyboard.any_just_pressed([KeyCode::Escape, KeyCode::KeyX]) {
        exit.write(AppExit::Success);
        return;
    }
    if keyboard.just_pressed(KeyCode::Space) {
        view.paused = !view.paused;
        info!("paused: {}", view.paused);
    }
    if keyboard.just_pressed(KeyCode::KeyD) {
        view.show_distance = !view.show_distance;
    }
    if keyboard.just_pressed(KeyCode::KeyS) {
        view.draw_lines = !view.draw_lines;
    }
    if keyboard.just_pressed(KeyCode::KeyC)
        && let Some(anchor) = bodies.anchor()
    {
        view.center_on(anchor.position, simulator.scale());
    }
}

/// Pan offset for this frame from held arrow keys and a cursor resting on a
/// window edge.
pub fn pan_delta(keyboard: &ButtonInput<KeyCode>, cursor: Option<Vec2>, window_size: Vec2) -> Vec2 {
    let at_left = cursor.is_some_and(|c| c.x < 1.0);
    let at_right = cursor.is_some_and(|c| c.x >= window_size.x - 1.0);
    let at_top = cursor.is_some_and(|c| c.y < 1.0);
    let at_bottom = cursor.is_some_and(|c| c.y >= window_size.y - 1.0);

    let mut delta = Vec2::ZERO;
    if keyboard.pressed(KeyCode::ArrowLeft) || at_left {
        delta.x += PAN_STEP;
    }
    if keyboard.pressed(KeyCode::ArrowRight) || at_right {
        delta.x -= PAN_STEP;
    }
    if keyboard.pressed(KeyCode::ArrowUp) || at_top {
        delta.y += PAN_STEP;
    }
    if keyboard.pressed(KeyCode::ArrowDown) || at_bottom {
        delta.y -= PAN_STEP;
    }
    delta
}

/// Applies the pan at the same on-screen speed whatever the frame rate.
pub fn pan_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
    mut view: ResMut<ViewState>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let delta = pan_delta(&keyboard, window.cursor_position(), window.size());
    if delta != Vec2::ZERO {
        view.pan += delta * time.delta_secs() * PAN_REFERENCE_FPS;
    }
}

/// Signed number of zoom steps for one scroll message. Line scrolls are one
/// step per notch; pixel scrolls accumulate in `pending_pixels` until they
/// add up to a step.
pub fn scroll_steps(unit: MouseScrollUnit, y: f32, pending_pixels: &mut f32) -> i32 {
    match unit {
        MouseScrollUnit::Line => {
            if y > 0.0 {
                1
            } else if y < 0.0 {
                -1
            } else {
                0
            }
        }
        MouseScrollUnit::Pixel => {
            *pending_pixels += y;
            let steps = (*pending_pixels / PIXELS_PER_ZOOM_STEP).trunc();
            *pending_pixels -= steps * PIXELS_PER_ZOOM_STEP;
            steps as i32
        }
    }
}

pub fn zoom_factor(steps: i32) -> f64 {
    if steps >= 0 {
        ZOOM_IN_FACTOR.powi(steps)
    } else {
        ZOOM_OUT_FACTOR.powi(-steps)
    }
}

/// Zooms the simulator scale on scroll unless the UI has the pointer.
pub fn zoom_controls(
    mut mouse_wheel: MessageReader<MouseWheel>,
    mut simulator: ResMut<Simulator>,
    mut bodies: ResMut<BodySet>,
    egui_input: Res<EguiWantsInput>,
    mut pending_pixels: Local<f32>,
) {
    if egui_input.wants_any_pointer_input() {
        mouse_wheel.clear();
        *pending_pixels = 0.0;
        return;
    }

    for event in mouse_wheel.read() {
        let steps = scroll_steps(event.unit, event.y, &mut pending_pixels);
        if steps == 0 {
            continue;
        }
        simulator.rescale(zoom_factor(steps), &mut bodies.0);
        debug!("scale now {:e} px/m", simulator.scale());
    }
}

/// Moves each body's circle to its projected position and display radius.
pub fn sync_body_transforms(
    windows: Query<&Window, With<PrimaryWindow>>,
    simulator: Res<Simulator>,
    bodies: Res<BodySet>,
    view: Res<ViewState>,
    mut query: Query<(&BodyIndex, &mut Transform)>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let half = window.size() / 2.0;

    for (index, mut transform) in query.iter_mut() {
        let Some(body) = bodies.get(**index) else {
            continue;
        };
        let screen = project_to_screen(body.position, simulator.scale(), half, view.pan);
        transform.translation = screen_to_world(screen, half).extend(**index as f32 * 0.01);
        transform.scale = Vec3::splat(body.radius() as f32);
    }
}

/// Draws each body's trail in its own color when line drawing is enabled.
pub fn draw_trails(
    mut gizmos: Gizmos,
    windows: Query<&Window, With<PrimaryWindow>>,
    simulator: Res<Simulator>,
    bodies: Res<BodySet>,
    view: Res<ViewState>,
) {
    if !view.draw_lines {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let half = window.size() / 2.0;
    let scale = simulator.scale();

    for body in bodies.iter() {
        if body.trail().len() <= 2 {
            continue;
        }
        gizmos.linestrip_2d(
            body.trail()
                .iter()
                .map(|point| screen_to_world(project_to_screen(*point, scale, half, view.pan), half)),
            Color::from(body.color()),
        );
    }
}

/// Responds to a pending reset: restores the seeded bodies, scale and view.
pub fn apply_reset_request(
    mut reset: ResMut<ResetSimulation>,
    config: Res<SimConfig>,
    mut simulator: ResMut<Simulator>,
    mut bodies: ResMut<BodySet>,
    mut view: ResMut<ViewState>,
) {
    if !reset.pending {
        return;
    }
    reset.pending = false;

    let order = simulator.order();
    *simulator = Simulator::new(&config);
    simulator.set_order(order);
    *bodies = BodySet::solar_system(&config);
    *view = ViewState::default();
    info!("simulation reset");
}
