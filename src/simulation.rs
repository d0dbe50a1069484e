use std::collections::VecDeque;
use std::fmt;

use bevy::math::DVec2;
use bevy::prelude::*;

use crate::resources::{LIGHT_YEARS_PER_METER, SimConfig};

/// 8-bit sRGB color of a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::srgb_u8(rgb.0, rgb.1, rgb.2)
    }
}

/// A gravitating body. Position and velocity are in meters and meters per
/// second; `radius` is already in display units.
#[derive(Clone, Debug)]
pub struct Body {
    pub position: DVec2,
    pub velocity: DVec2,
    mass: f64,
    radius: f64,
    color: Rgb,
    is_anchor: bool,
    distance_to_anchor: f64,
    trail: VecDeque<DVec2>,
}

impl Body {
    pub fn new(position: DVec2, velocity: DVec2, mass: f64, radius: f64, color: Rgb) -> Self {
        Self {
            position,
            velocity,
            mass,
            radius,
            color,
            is_anchor: false,
            distance_to_anchor: 0.0,
            trail: VecDeque::new(),
        }
    }

    /// Marks this body as the one other bodies report their distance to.
    pub fn into_anchor(mut self) -> Self {
        self.is_anchor = true;
        self
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn is_anchor(&self) -> bool {
        self.is_anchor
    }

    /// Distance in meters to the anchor as of the last force computation.
    pub fn distance_to_anchor(&self) -> f64 {
        self.distance_to_anchor
    }

    pub fn distance_to_anchor_light_years(&self) -> f64 {
        meters_to_light_years(self.distance_to_anchor)
    }

    /// Past positions in physical coordinates, oldest first.
    pub fn trail(&self) -> &VecDeque<DVec2> {
        &self.trail
    }

    /// Scales the display radius. Physical state is untouched.
    pub fn rescale(&mut self, factor: f64) {
        self.radius *= factor;
    }

    fn record_position(&mut self, max_len: Option<usize>) {
        self.trail.push_back(self.position);
        if let Some(max_len) = max_len {
            while self.trail.len() > max_len {
                self.trail.pop_front();
            }
        }
    }
}

/// Order in which bodies are advanced within one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegrationOrder {
    /// Each body is fully advanced before the next one's forces are summed,
    /// so later bodies see the new positions of earlier ones.
    #[default]
    Sequential,
    /// Every force is computed from the start-of-tick positions before any
    /// body moves.
    Simultaneous,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimulationError {
    /// Two bodies share a position, so the force between them is undefined.
    CoincidentBodies { position: DVec2 },
    /// A separation evaluated to NaN or infinity.
    NonFiniteSeparation { separation: f64 },
    /// The bodies are distinct but so close that the force overflows.
    NonFiniteForce { separation: f64 },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::CoincidentBodies { position } => write!(
                f,
                "two bodies coincide at ({}, {}); gravitational force is undefined",
                position.x, position.y
            ),
            SimulationError::NonFiniteSeparation { separation } => {
                write!(f, "separation between bodies is not finite: {separation}")
            }
            SimulationError::NonFiniteForce { separation } => write!(
                f,
                "gravitational force is not finite at separation {separation:e} m"
            ),
        }
    }
}

impl std::error::Error for SimulationError {}

/// Brute-force Newtonian stepping engine. Owns the meters-to-display scale
/// shared by every body.
#[derive(Resource, Clone, Debug)]
pub struct Simulator {
    g: f64,
    dt: f64,
    scale: f64,
    order: IntegrationOrder,
    max_trail_len: Option<usize>,
}

impl Simulator {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            g: config.g,
            dt: config.dt,
            scale: config.initial_scale,
            order: config.integration_order,
            max_trail_len: config.max_trail_len,
        }
    }

    pub fn g(&self) -> f64 {
        self.g
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Display units per meter.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn order(&self) -> IntegrationOrder {
        self.order
    }

    pub fn set_order(&mut self, order: IntegrationOrder) {
        self.order = order;
    }

    /// Gravitational pull of `other` on `body`.
    ///
    /// Records the separation on `body` when `other` is the anchor. Coincident
    /// bodies are an error rather than a clamped distance.
    pub fn pairwise_force(&self, body: &mut Body, other: &Body) -> Result<DVec2, SimulationError> {
        let (force, distance) = self.attraction(body, other)?;
        if other.is_anchor {
            body.distance_to_anchor = distance;
        }
        Ok(force)
    }

    /// Advances every body by one tick of `dt` seconds.
    ///
    /// With [`IntegrationOrder::Sequential`] a failure leaves the bodies before
    /// the failing one already advanced; with
    /// [`IntegrationOrder::Simultaneous`] no body is touched at all.
    pub fn step_all(&self, bodies: &mut [Body]) -> Result<(), SimulationError> {
        match self.order {
            IntegrationOrder::Sequential => {
                for index in 0..bodies.len() {
                    let pull = self.net_force(bodies, index)?;
                    self.advance(&mut bodies[index], pull);
                }
            }
            IntegrationOrder::Simultaneous => {
                let pulls = (0..bodies.len())
                    .map(|index| self.net_force(bodies, index))
                    .collect::<Result<Vec<_>, _>>()?;
                for (body, pull) in bodies.iter_mut().zip(pulls) {
                    self.advance(body, pull);
                }
            }
        }
        Ok(())
    }

    /// Multiplies the scale and every body's display radius by `factor`.
    pub fn rescale(&mut self, factor: f64, bodies: &mut [Body]) {
        self.scale *= factor;
        for body in bodies.iter_mut() {
            body.rescale(factor);
        }
    }

    /// Force of `other` on `body` and their separation, without side effects.
    fn attraction(&self, body: &Body, other: &Body) -> Result<(DVec2, f64), SimulationError> {
        let delta = other.position - body.position;
        // d² can underflow to zero for distinct but extremely close positions.
        let distance_sq = delta.x * delta.x + delta.y * delta.y;
        if distance_sq == 0.0 {
            return Err(SimulationError::CoincidentBodies {
                position: body.position,
            });
        }
        let distance = distance_sq.sqrt();
        if !distance.is_finite() {
            return Err(SimulationError::NonFiniteSeparation {
                separation: distance,
            });
        }

        let magnitude = self.g * body.mass * other.mass / (distance * distance);
        let theta = delta.y.atan2(delta.x);
        let force = DVec2::new(theta.cos() * magnitude, theta.sin() * magnitude);
        if !force.is_finite() {
            return Err(SimulationError::NonFiniteForce {
                separation: distance,
            });
        }
        Ok((force, distance))
    }

    fn net_force(&self, bodies: &[Body], index: usize) -> Result<Pull, SimulationError> {
        let body = &bodies[index];
        let mut pull = Pull::default();
        for (other_index, other) in bodies.iter().enumerate() {
            if other_index == index {
                continue;
            }
            let (force, distance) = self.attraction(body, other)?;
            pull.force += force;
            if other.is_anchor {
                pull.distance_to_anchor = Some(distance);
            }
        }
        Ok(pull)
    }

    // Semi-implicit Euler: position uses the freshly updated velocity.
    fn advance(&self, body: &mut Body, pull: Pull) {
        if let Some(distance) = pull.distance_to_anchor {
            body.distance_to_anchor = distance;
        }
        body.velocity += pull.force / body.mass * self.dt;
        body.position += body.velocity * self.dt;
        body.record_position(self.max_trail_len);
    }
}

/// Net force on one body for a tick, with its distance to the anchor if one
/// was seen.
#[derive(Clone, Copy, Debug, Default)]
struct Pull {
    force: DVec2,
    distance_to_anchor: Option<f64>,
}

/// Maps a physical position to screen space (origin top-left, y down).
pub fn project_to_screen(physical: DVec2, scale: f64, half_extent: Vec2, pan: Vec2) -> Vec2 {
    (physical * scale).as_vec2() + half_extent + pan
}

/// Converts a screen-space point into 2D world space (origin centre, y up).
pub fn screen_to_world(screen: Vec2, half_extent: Vec2) -> Vec2 {
    vec2(screen.x - half_extent.x, half_extent.y - screen.y)
}

pub fn meters_to_light_years(meters: f64) -> f64 {
    meters * LIGHT_YEARS_PER_METER
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::dvec2;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    const WHITE: Rgb = Rgb(255, 255, 255);

    fn unit_config(order: IntegrationOrder) -> SimConfig {
        SimConfig {
            g: 1.0,
            dt: 1.0,
            initial_scale: 1.0,
            integration_order: order,
            max_trail_len: None,
            ..SimConfig::default()
        }
    }

    fn still_body(x: f64, y: f64, mass: f64) -> Body {
        Body::new(dvec2(x, y), DVec2::ZERO, mass, 1.0, WHITE)
    }

    fn random_bodies(rng: &mut StdRng, count: usize) -> Vec<Body> {
        (0..count)
            .map(|i| {
                let body = Body::new(
                    dvec2(rng.random_range(-1e12..1e12), rng.random_range(-1e12..1e12)),
                    dvec2(rng.random_range(-3e4..3e4), rng.random_range(-3e4..3e4)),
                    rng.random_range(1e22..1e30),
                    rng.random_range(1.0..40.0),
                    Rgb(i as u8, 0, 0),
                );
                if i == 0 { body.into_anchor() } else { body }
            })
            .collect()
    }

    #[test]
    fn unit_pair_force_points_at_the_other_body() {
        let simulator = Simulator::new(&unit_config(IntegrationOrder::Sequential));
        let mut a = still_body(0.0, 0.0, 1.0);
        let mut b = still_body(1.0, 0.0, 1.0);

        let on_a = simulator.pairwise_force(&mut a, &b).unwrap();
        let on_b = simulator.pairwise_force(&mut b, &a).unwrap();

        assert_eq!(on_a, dvec2(1.0, 0.0));
        assert!((on_b.x + 1.0).abs() < 1e-15);
        assert!(on_b.y.abs() < 1e-15);
    }

    #[test]
    fn sequential_step_reproduces_per_body_update_order() {
        let simulator = Simulator::new(&unit_config(IntegrationOrder::Sequential));
        let mut bodies = vec![still_body(0.0, 0.0, 1.0), still_body(1.0, 0.0, 1.0)];

        let result = simulator.step_all(&mut bodies);

        // The first body lands exactly on the second before the second is
        // advanced, so the second body's force is undefined.
        assert_eq!(bodies[0].velocity, dvec2(1.0, 0.0));
        assert_eq!(bodies[0].position, dvec2(1.0, 0.0));
        assert_eq!(bodies[0].trail().len(), 1);
        assert!(matches!(
            result,
            Err(SimulationError::CoincidentBodies { .. })
        ));
        assert_eq!(bodies[1].position, dvec2(1.0, 0.0));
        assert_eq!(bodies[1].velocity, DVec2::ZERO);
        assert!(bodies[1].trail().is_empty());
    }

    #[test]
    fn simultaneous_step_uses_start_of_tick_positions() {
        let simulator = Simulator::new(&unit_config(IntegrationOrder::Simultaneous));
        let mut bodies = vec![still_body(0.0, 0.0, 1.0), still_body(1.0, 0.0, 1.0)];

        simulator.step_all(&mut bodies).unwrap();

        assert_eq!(bodies[0].velocity, dvec2(1.0, 0.0));
        assert_eq!(bodies[0].position, dvec2(1.0, 0.0));
        assert_eq!(bodies[1].velocity.x, -1.0);
        assert_eq!(bodies[1].position.x, 0.0);
        assert!(bodies[1].position.y.abs() < 1e-15);
        assert_eq!(bodies[1].trail().back(), Some(&bodies[1].position));
    }

    #[test]
    fn coincident_bodies_are_reported_not_integrated() {
        let simulator = Simulator::new(&unit_config(IntegrationOrder::Simultaneous));
        let mut bodies = vec![still_body(2.0, 3.0, 1.0), still_body(2.0, 3.0, 5.0)];

        let result = simulator.step_all(&mut bodies);

        assert_eq!(
            result,
            Err(SimulationError::CoincidentBodies {
                position: dvec2(2.0, 3.0)
            })
        );
        for body in &bodies {
            assert_eq!(body.position, dvec2(2.0, 3.0));
            assert_eq!(body.velocity, DVec2::ZERO);
            assert!(body.trail().is_empty());
        }
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("gravitational force is undefined")
        );
    }

    #[test]
    fn non_finite_separation_is_an_error() {
        let simulator = Simulator::new(&unit_config(IntegrationOrder::Sequential));
        let mut a = still_body(0.0, 0.0, 1.0);
        let b = still_body(f64::NAN, 0.0, 1.0);

        assert!(matches!(
            simulator.pairwise_force(&mut a, &b),
            Err(SimulationError::NonFiniteSeparation { .. })
        ));
    }

    #[test]
    fn underflowing_separation_is_an_error() {
        for order in [IntegrationOrder::Sequential, IntegrationOrder::Simultaneous] {
            let simulator = Simulator::new(&unit_config(order));
            let mut bodies = vec![still_body(0.0, 0.0, 1.0), still_body(1e-170, 0.0, 1.0)];

            let result = simulator.step_all(&mut bodies);

            assert!(
                matches!(result, Err(SimulationError::CoincidentBodies { .. })),
                "{order:?}: {result:?}"
            );
            for body in &bodies {
                assert!(body.position.is_finite());
                assert!(body.velocity.is_finite());
                assert!(body.trail().is_empty());
            }
        }
    }

    #[test]
    fn overflowing_force_is_an_error() {
        let simulator = Simulator::new(&SimConfig {
            g: 1e300,
            ..unit_config(IntegrationOrder::Simultaneous)
        });
        let mut a = still_body(0.0, 0.0, 1e10);
        let b = still_body(1.0, 0.0, 1e10);

        assert_eq!(
            simulator.pairwise_force(&mut a, &b),
            Err(SimulationError::NonFiniteForce { separation: 1.0 })
        );
    }

    #[test]
    fn failed_simultaneous_tick_leaves_anchor_distances_alone() {
        let simulator = Simulator::new(&unit_config(IntegrationOrder::Simultaneous));
        let mut bodies = vec![
            still_body(3.0, 4.0, 1.0),
            still_body(0.0, 0.0, 1.0).into_anchor(),
            still_body(7.0, 7.0, 1.0),
            still_body(7.0, 7.0, 1.0),
        ];

        assert!(simulator.step_all(&mut bodies).is_err());

        assert!(bodies.iter().all(|body| body.distance_to_anchor() == 0.0));
        assert!(bodies.iter().all(|body| body.trail().is_empty()));
    }

    #[test]
    fn pairwise_forces_obey_third_law() {
        let mut rng = StdRng::seed_from_u64(11);
        let simulator = Simulator::new(&SimConfig::default());

        for _ in 0..200 {
            let mut bodies = random_bodies(&mut rng, 2);
            let mut b = bodies.pop().unwrap();
            let mut a = bodies.pop().unwrap();
            let on_a = simulator.pairwise_force(&mut a, &b).unwrap();
            let on_b = simulator.pairwise_force(&mut b, &a).unwrap();

            let tolerance = on_a.length() * 1e-12;
            assert!((on_a.length() - on_b.length()).abs() <= tolerance);
            assert!((on_a + on_b).length() <= tolerance);
        }
    }

    #[test]
    fn step_preserves_mass_color_and_anchor() {
        let mut rng = StdRng::seed_from_u64(5);
        for order in [IntegrationOrder::Sequential, IntegrationOrder::Simultaneous] {
            let simulator = Simulator::new(&SimConfig {
                integration_order: order,
                ..SimConfig::default()
            });
            let mut bodies = random_bodies(&mut rng, 6);
            let before: Vec<_> = bodies
                .iter()
                .map(|b| (b.mass(), b.color(), b.is_anchor()))
                .collect();

            for _ in 0..10 {
                simulator.step_all(&mut bodies).unwrap();
            }

            let after: Vec<_> = bodies
                .iter()
                .map(|b| (b.mass(), b.color(), b.is_anchor()))
                .collect();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn trail_grows_by_one_per_tick() {
        let mut rng = StdRng::seed_from_u64(23);
        let simulator = Simulator::new(&SimConfig {
            max_trail_len: None,
            ..SimConfig::default()
        });
        let mut bodies = random_bodies(&mut rng, 4);
        simulator.step_all(&mut bodies).unwrap();
        let before: Vec<usize> = bodies.iter().map(|b| b.trail().len()).collect();

        for _ in 0..7 {
            simulator.step_all(&mut bodies).unwrap();
        }

        for (body, len) in bodies.iter().zip(before) {
            assert_eq!(body.trail().len(), len + 7);
            assert_eq!(body.trail().back(), Some(&body.position));
        }
    }

    #[test]
    fn capped_trail_keeps_newest_positions() {
        let simulator = Simulator::new(&SimConfig {
            max_trail_len: Some(3),
            ..unit_config(IntegrationOrder::Sequential)
        });
        let mut bodies = vec![Body::new(DVec2::ZERO, dvec2(1.0, 0.0), 1.0, 1.0, WHITE)];

        for _ in 0..5 {
            simulator.step_all(&mut bodies).unwrap();
        }

        let trail: Vec<_> = bodies[0].trail().iter().copied().collect();
        assert_eq!(trail, vec![dvec2(3.0, 0.0), dvec2(4.0, 0.0), dvec2(5.0, 0.0)]);
    }

    #[test]
    fn isolated_body_drifts_freely() {
        let simulator = Simulator::new(&SimConfig {
            dt: 2.0,
            ..SimConfig::default()
        });
        let mut bodies = vec![Body::new(dvec2(10.0, -4.0), dvec2(3.0, 4.0), 7.0, 1.0, WHITE)];

        simulator.step_all(&mut bodies).unwrap();

        assert_eq!(bodies[0].velocity, dvec2(3.0, 4.0));
        assert_eq!(bodies[0].position, dvec2(16.0, 4.0));
        assert_eq!(bodies[0].trail().len(), 1);
    }

    #[test]
    fn distance_to_anchor_is_recorded_during_force_summation() {
        let simulator = Simulator::new(&unit_config(IntegrationOrder::Simultaneous));
        let mut bodies = vec![
            still_body(0.0, 0.0, 1.0).into_anchor(),
            still_body(3.0, 4.0, 1.0),
            still_body(-6.0, 8.0, 1.0),
        ];

        simulator.step_all(&mut bodies).unwrap();

        assert_eq!(bodies[0].distance_to_anchor(), 0.0);
        assert_eq!(bodies[1].distance_to_anchor(), 5.0);
        assert_eq!(bodies[2].distance_to_anchor(), 10.0);
        assert!((bodies[2].distance_to_anchor_light_years() - 1.057e-15).abs() < 1e-27);
    }

    #[test]
    fn rescale_is_multiplicative() {
        let mut simulator = Simulator::new(&SimConfig::default());
        let initial_scale = simulator.scale();
        let mut bodies = vec![still_body(1.0, 2.0, 3.0), still_body(-1.0, 0.0, 3.0)];
        bodies[0].rescale(10.0);
        let radii: Vec<f64> = bodies.iter().map(Body::radius).collect();

        simulator.rescale(0.75, &mut bodies);
        simulator.rescale(1.25, &mut bodies);

        assert!((simulator.scale() - initial_scale * 0.75 * 1.25).abs() < initial_scale * 1e-12);
        for (body, radius) in bodies.iter().zip(radii) {
            assert!((body.radius() - radius * 0.9375).abs() < 1e-12);
        }
        assert_eq!(bodies[0].position, dvec2(1.0, 2.0));
        assert!(bodies[0].trail().is_empty());
    }

    #[test]
    fn body_rescale_round_trips_within_tolerance() {
        let mut body = still_body(0.0, 0.0, 1.0);
        body.rescale(0.75);
        body.rescale(1.0 / 0.75);
        assert!((body.radius() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn projection_applies_scale_half_extent_and_pan() {
        let screen = project_to_screen(
            dvec2(2.0e11, -1.0e11),
            1.0e-9,
            vec2(800.0, 450.0),
            vec2(10.0, -20.0),
        );
        assert_eq!(screen, vec2(1010.0, 330.0));
    }

    #[test]
    fn screen_centre_is_world_origin() {
        let half = vec2(800.0, 450.0);
        assert_eq!(screen_to_world(half, half), Vec2::ZERO);
        assert_eq!(screen_to_world(vec2(900.0, 400.0), half), vec2(100.0, 50.0));
    }
}
