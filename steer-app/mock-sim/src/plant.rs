//! Kinematic bicycle model driving along a gently winding road.
//!
//! The road is described by its curvature as a function of distance travelled,
//! so the vehicle state is kept in road-relative coordinates: lateral offset,
//! heading relative to the road tangent, and distance along the road.

use steer_core::utils::controllers::{ActuatorCommand, Telemetry};

/// Fixed simulation tick (s).
pub const DT: f64 = 0.049;
/// Full-lock steering angle (deg).
pub const MAX_STEERING_DEG: f64 = 25.0;

const WHEELBASE: f64 = 2.67;
const MPH_TO_MS: f64 = 0.447_04;
/// Speed gained per second at full throttle (mph/s).
const THROTTLE_GAIN: f64 = 10.0;
/// Linear drag (1/s).
const DRAG: f64 = 0.1;

/// Road shape: curvature `amplitude * sin(2π s / period)`.
#[derive(Debug, Clone, Copy)]
pub struct Road {
    pub amplitude: f64,
    pub period: f64,
}

impl Default for Road {
    fn default() -> Self {
        Self {
            amplitude: 0.005,
            period: 300.0,
        }
    }
}

impl Road {
    pub fn curvature(
        &self,
        s: f64,
    ) -> f64 {
        self.amplitude * (core::f64::consts::TAU * s / self.period).sin()
    }
}

#[derive(Debug, Clone)]
pub struct Plant {
    road: Road,
    /// Lateral offset from the centre line (m), positive to the left.
    offset: f64,
    /// Heading relative to the road tangent (rad).
    heading: f64,
    /// Distance along the road (m).
    distance: f64,
    /// mph
    speed: f64,
    /// Applied steering angle (rad).
    steering: f64,
}

impl Plant {
    pub fn new(
        road: Road,
        offset: f64,
    ) -> Self {
        Self {
            road,
            offset,
            heading: 0.0,
            distance: 0.0,
            speed: 0.0,
            steering: 0.0,
        }
    }

    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            cte: self.offset,
            speed: self.speed,
            steering_angle: self.steering.to_degrees(),
        }
    }

    /// Apply one actuator command for one tick. The plant saturates both
    /// inputs to its physical range.
    pub fn step(
        &mut self,
        command: ActuatorCommand,
    ) {
        let throttle = command.throttle.clamp(0.0, 1.0);
        self.steering = command.steering_angle.clamp(-1.0, 1.0) * MAX_STEERING_DEG.to_radians();

        let v = self.speed * MPH_TO_MS;
        let kappa = self.road.curvature(self.distance);
        self.offset += v * self.heading.sin() * DT;
        self.distance += v * self.heading.cos() * DT;
        self.heading += (v / WHEELBASE * self.steering.tan() - v * kappa) * DT;
        self.speed = (self.speed + (THROTTLE_GAIN * throttle - DRAG * self.speed) * DT).max(0.0);
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight() -> Road {
        Road {
            amplitude: 0.0,
            period: 1.0,
        }
    }

    #[test]
    fn test_straight_road_holds_offset() {
        let mut plant = Plant::new(straight(), 0.0);
        for _ in 0..100 {
            plant.step(ActuatorCommand {
                steering_angle: 0.0,
                throttle: 0.5,
            });
        }
        assert!(plant.telemetry().cte.abs() < 1e-12);
        assert!(plant.telemetry().speed > 0.0);
        assert!(plant.distance() > 0.0);
    }

    #[test]
    fn test_negative_steering_reduces_offset() {
        let mut plant = Plant::new(straight(), 1.0);
        plant.speed = 20.0;
        for _ in 0..20 {
            plant.step(ActuatorCommand {
                steering_angle: -0.2,
                throttle: 0.2,
            });
        }
        assert!(plant.telemetry().cte < 1.0);
        assert!(plant.telemetry().steering_angle < 0.0);
    }

    #[test]
    fn test_inputs_saturate() {
        let mut plant = Plant::new(straight(), 0.0);
        plant.step(ActuatorCommand {
            steering_angle: 7.0,
            throttle: -3.0,
        });
        assert!((plant.telemetry().steering_angle - MAX_STEERING_DEG).abs() < 1e-9);
        assert_eq!(plant.telemetry().speed, 0.0);
    }
}
