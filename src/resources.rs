use bevy::math::DVec2;
use bevy::prelude::*;

use crate::simulation::{Body, IntegrationOrder, Rgb};

/// Physical and display parameters the simulator is built from.
#[derive(Resource, Clone, Debug)]
pub struct SimConfig {
    pub g: f64,
    pub dt: f64,
    pub initial_scale: f64,
    pub au: f64,
    pub integration_order: IntegrationOrder,
    pub max_trail_len: Option<usize>,
}

// --- Simulation Defaults ---
/// Astronomical unit in meters.
pub const AU: f64 = 149.6e6 * 1000.0;
/// Gravitational constant.
pub const DEFAULT_G: f64 = 6.67428e-11;
/// Simulated seconds per tick (two days).
pub const DEFAULT_DT: f64 = 60.0 * 60.0 * 24.0 * 2.0;
/// Initial display units per meter: one AU spans 200 pixels.
pub const DEFAULT_SCALE: f64 = 200.0 / AU;
/// Trail entries kept per body; more than one Neptune orbit at two days per tick.
pub const DEFAULT_MAX_TRAIL_LEN: usize = 50_000;
/// Physics ticks per second.
pub const TICK_RATE_HZ: f64 = 60.0;
pub const LIGHT_YEARS_PER_METER: f64 = 1.057e-16;

// --- View Defaults ---
/// Pixels panned per reference frame while an arrow key is held or the cursor
/// sits on an edge.
pub const PAN_STEP: f32 = 10.0;
/// Frame rate at which one `PAN_STEP` is applied per frame.
pub const PAN_REFERENCE_FPS: f32 = 60.0;
/// Trackpad pixels that add up to one zoom step.
pub const PIXELS_PER_ZOOM_STEP: f32 = 50.0;
pub const ZOOM_IN_FACTOR: f64 = 1.25;
pub const ZOOM_OUT_FACTOR: f64 = 0.75;
/// Vertical offset of a distance label above its body, in pixels.
pub const LABEL_OFFSET: f32 = 20.0;
pub const BACKGROUND: Color = Color::srgb(36.0 / 255.0, 36.0 / 255.0, 36.0 / 255.0);

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            g: DEFAULT_G,
            dt: DEFAULT_DT,
            initial_scale: DEFAULT_SCALE,
            au: AU,
            integration_order: IntegrationOrder::default(),
            max_trail_len: Some(DEFAULT_MAX_TRAIL_LEN),
        }
    }
}

/// Initial conditions for one body of the solar system.
pub struct BodySeed {
    pub name: &'static str,
    pub color: Rgb,
    /// Distance from the Sun along -x, in AU.
    pub distance_au: f64,
    /// Orbital speed along +y, in km/s.
    pub speed_km_s: f64,
    pub mass: f64,
    /// Display radius in gigameters at the initial scale.
    pub radius_gm: f64,
    pub anchor: bool,
}

// Masses and speeds from https://nssdc.gsfc.nasa.gov/planetary/factsheet/
// Order matters for sequential integration.
pub const SOLAR_SYSTEM: [BodySeed; 9] = [
    BodySeed {
        name: "Neptune",
        color: Rgb(63, 84, 186),
        distance_au: 30.178,
        speed_km_s: 5.43,
        mass: 1.024e26,
        radius_gm: 12.0,
        anchor: false,
    },
    BodySeed {
        name: "Uranus",
        color: Rgb(209, 231, 231),
        distance_au: 19.165,
        speed_km_s: 6.80,
        mass: 8.681e25,
        radius_gm: 14.0,
        anchor: false,
    },
    BodySeed {
        name: "Saturn",
        color: Rgb(191, 189, 175),
        distance_au: 9.573,
        speed_km_s: 9.68,
        mass: 5.683e26,
        radius_gm: 18.0,
        anchor: false,
    },
    BodySeed {
        name: "Jupiter",
        color: Rgb(216, 202, 157),
        distance_au: 5.204,
        speed_km_s: 13.06,
        mass: 1.898e27,
        radius_gm: 20.0,
        anchor: false,
    },
    BodySeed {
        name: "Mars",
        color: Rgb(193, 68, 14),
        distance_au: 1.524,
        speed_km_s: 24.077,
        mass: 6.39e23,
        radius_gm: 5.0,
        anchor: false,
    },
    BodySeed {
        name: "Earth",
        color: Rgb(107, 147, 214),
        distance_au: 1.0,
        speed_km_s: 29.783,
        mass: 5.9722e24,
        radius_gm: 10.0,
        anchor: false,
    },
    BodySeed {
        name: "Venus",
        color: Rgb(227, 158, 28),
        distance_au: 0.723,
        speed_km_s: 35.02,
        mass: 4.8685e24,
        radius_gm: 9.0,
        anchor: false,
    },
    BodySeed {
        name: "Mercury",
        color: Rgb(173, 168, 165),
        distance_au: 0.387,
        speed_km_s: 47.4,
        mass: 3.30e23,
        radius_gm: 5.0,
        anchor: false,
    },
    BodySeed {
        name: "Sun",
        color: Rgb(252, 150, 1),
        distance_au: 0.0,
        speed_km_s: 0.0,
        mass: 1.98892e30,
        radius_gm: 30.0,
        anchor: true,
    },
];

impl BodySeed {
    pub fn to_body(&self, config: &SimConfig) -> Body {
        let body = Body::new(
            DVec2::new(-self.distance_au * config.au, 0.0),
            DVec2::new(0.0, self.speed_km_s * 1000.0),
            self.mass,
            self.radius_gm * config.initial_scale * 1e9,
            self.color,
        );
        if self.anchor { body.into_anchor() } else { body }
    }
}

/// Every simulated body, addressed by index.
#[derive(Resource, Deref, DerefMut, Default)]
pub struct BodySet(pub Vec<Body>);

impl BodySet {
    pub fn solar_system(config: &SimConfig) -> Self {
        Self(SOLAR_SYSTEM.iter().map(|seed| seed.to_body(config)).collect())
    }

    pub fn anchor(&self) -> Option<&Body> {
        self.0.iter().find(|body| body.is_anchor())
    }
}

/// User-facing toggles and the pan offset of the view, in screen pixels.
#[derive(Resource)]
pub struct ViewState {
    pub paused: bool,
    pub show_distance: bool,
    pub draw_lines: bool,
    pub pan: Vec2,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            paused: false,
            show_distance: false,
            draw_lines: true,
            pan: Vec2::ZERO,
        }
    }
}

impl ViewState {
    /// Pans so that `position` projects onto the centre of the window.
    pub fn center_on(&mut self, position: DVec2, scale: f64) {
        self.pan = (-position * scale).as_vec2();
    }
}

/// Marker resource to request a simulation reset from the UI.
#[derive(Resource, Default)]
pub struct ResetSimulation {
    pub pending: bool,
}
