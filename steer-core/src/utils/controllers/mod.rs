//! Control-loop exports.
//!
//! - `pid`: the feedback controller used for steering and throttle.
//!
//! `Autopilot` is the per-tick driver: it consumes `Telemetry` from
//! `TELEMETRY_CHANNEL`, updates both controllers, publishes an
//! `ActuatorCommand` on `ACTUATOR_CHANNEL` and feeds the tuner.

pub mod pid;

use alloc::vec;
use core::cell::RefCell;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use serde::{Deserialize, Serialize};

use crate::utils::{
    config::AutopilotConfig,
    error::ConfigError,
    tuning::{aggregator::SampleAggregator, observer::TracingObserver},
};
use pid::{Controller, Gains};

/// Channel carrying plant telemetry into the autopilot.
pub static TELEMETRY_CHANNEL: Channel<CriticalSectionRawMutex, Telemetry, 16> = Channel::new();
/// Channel carrying actuator commands back to the plant.
pub static ACTUATOR_CHANNEL: Channel<CriticalSectionRawMutex, ActuatorCommand, 16> =
    Channel::new();

/// One telemetry sample from the plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Cross-track error, the signal driven to zero.
    pub cte: f64,
    pub speed: f64,
    /// Current steering angle in degrees.
    pub steering_angle: f64,
}

/// Normalized actuator command sent back to the plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// In `[-1, 1]`.
    pub steering_angle: f64,
    /// In `[0, inf)`.
    pub throttle: f64,
}

impl AutopilotConfig {
    /// Steering controller with the configured gains and integral window.
    pub fn steering_controller(&self) -> Controller {
        Controller::with_gains(self.steering, self.history_capacity)
    }

    /// Throttle controller with the configured gains and integral window.
    pub fn throttle_controller(&self) -> Controller {
        Controller::with_gains(self.throttle, self.history_capacity)
    }
}

/// Steering and throttle loop with optional online tuning.
pub struct Autopilot<'a> {
    steering: &'a RefCell<Controller>,
    throttle: &'a RefCell<Controller>,
    tuner: Option<SampleAggregator<'a, TracingObserver>>,
    target_speed: f64,
    ticks: u64,
}

impl<'a> Autopilot<'a> {
    /// Wire up the two controllers. When tuning is enabled the steering
    /// controller is always tuned; the throttle controller joins the same
    /// tuner when `tune_throttle` is set.
    pub fn new(
        steering: &'a RefCell<Controller>,
        throttle: &'a RefCell<Controller>,
        cfg: &AutopilotConfig,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let tuner = if cfg.tune {
            let tuned = if cfg.tune_throttle {
                vec![steering, throttle]
            } else {
                vec![steering]
            };
            Some(SampleAggregator::new(tuned, &cfg.tuning)?.with_observer(TracingObserver))
        } else {
            tracing::info!("tuning disabled, running fixed gains");
            None
        };

        Ok(Self {
            steering,
            throttle,
            tuner,
            target_speed: cfg.target_speed,
            ticks: 0,
        })
    }

    /// Run one control tick.
    pub fn handle(
        &mut self,
        telemetry: Telemetry,
    ) -> ActuatorCommand {
        self.steering.borrow_mut().update(telemetry.cte);
        self.throttle
            .borrow_mut()
            .update(telemetry.speed - self.target_speed);

        let steering_angle = self.steering.borrow().output().clamp(-1.0, 1.0);
        let throttle = libm::fmax(self.throttle.borrow().output(), 0.0);
        tracing::trace!(
            cte = telemetry.cte,
            speed = telemetry.speed,
            steering_angle,
            throttle,
            "tick"
        );

        if let Some(agg) = self.tuner.as_mut() {
            agg.record(telemetry.cte);
        }
        self.ticks += 1;

        ActuatorCommand {
            steering_angle,
            throttle,
        }
    }

    /// Serve telemetry from `TELEMETRY_CHANNEL` forever.
    pub async fn run(&mut self) -> ! {
        loop {
            let telemetry = TELEMETRY_CHANNEL.receiver().receive().await;
            let command = self.handle(telemetry);
            ACTUATOR_CHANNEL.sender().send(command).await;
        }
    }

    pub fn steering_gains(&self) -> Gains {
        self.steering.borrow().gains()
    }

    pub fn throttle_gains(&self) -> Gains {
        self.throttle.borrow().gains()
    }

    /// `false` while tuning, or whenever tuning is disabled.
    pub fn is_converged(&self) -> bool {
        self.tuner.as_ref().is_some_and(|agg| agg.is_converged())
    }

    /// Completed tuning trials.
    pub fn trial_count(&self) -> u32 {
        self.tuner.as_ref().map_or(0, |agg| agg.trial_count())
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn aggregator(&self) -> Option<&SampleAggregator<'a, TracingObserver>> {
        self.tuner.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::{StepSeed, TuningConfig};

    fn telemetry(
        cte: f64,
        speed: f64,
    ) -> Telemetry {
        Telemetry {
            cte,
            speed,
            steering_angle: 0.0,
        }
    }

    #[test]
    fn test_steering_is_clamped() {
        let cfg = AutopilotConfig {
            steering: Gains::new(10.0, 0.0, 0.0),
            tune: false,
            ..Default::default()
        };
        let steering = RefCell::new(cfg.steering_controller());
        let throttle = RefCell::new(cfg.throttle_controller());
        let mut ap = Autopilot::new(&steering, &throttle, &cfg).unwrap();

        assert_eq!(ap.handle(telemetry(5.0, 40.0)).steering_angle, -1.0);
        assert_eq!(ap.handle(telemetry(-5.0, 40.0)).steering_angle, 1.0);
        assert_eq!(ap.ticks(), 2);
        assert!(ap.aggregator().is_none());
        assert!(!ap.is_converged());
    }

    #[test]
    fn test_throttle_never_negative() {
        let cfg = AutopilotConfig {
            tune: false,
            ..Default::default()
        };
        let steering = RefCell::new(cfg.steering_controller());
        let throttle = RefCell::new(cfg.throttle_controller());
        let mut ap = Autopilot::new(&steering, &throttle, &cfg).unwrap();

        // too fast: the controller asks for braking, which is clipped
        assert_eq!(ap.handle(telemetry(0.0, 60.0)).throttle, 0.0);
        // too slow: positive throttle
        let cmd = ap.handle(telemetry(0.0, 10.0));
        assert!(cmd.throttle > 0.0);
    }

    #[test]
    fn test_tuning_feeds_steering_errors() {
        let cfg = AutopilotConfig {
            tuning: TuningConfig {
                window_size: 5,
                warmup_discard: 1,
                initial_step: StepSeed::Fixed { step: 0.05 },
                ..Default::default()
            },
            ..Default::default()
        };
        let steering = RefCell::new(cfg.steering_controller());
        let throttle = RefCell::new(cfg.throttle_controller());
        let mut ap = Autopilot::new(&steering, &throttle, &cfg).unwrap();

        for _ in 0..5 {
            ap.handle(telemetry(0.2, 40.0));
        }
        assert_eq!(ap.trial_count(), 1);
        assert!((ap.steering_gains().kp - 0.15).abs() < 1e-12);
        assert_eq!(ap.throttle_gains(), cfg.throttle);
        assert_eq!(ap.aggregator().unwrap().partition().slots(), 1);
    }

    #[test]
    fn test_tune_throttle_registers_both() {
        let cfg = AutopilotConfig {
            tune_throttle: true,
            ..Default::default()
        };
        let steering = RefCell::new(cfg.steering_controller());
        let throttle = RefCell::new(cfg.throttle_controller());
        let ap = Autopilot::new(&steering, &throttle, &cfg).unwrap();
        let agg = ap.aggregator().unwrap();
        assert_eq!(agg.partition().slots(), 2);
        assert_eq!(
            agg.tuner().parameters(),
            &[0.1, 0.001, 0.8, 0.3, 0.0, 0.02]
        );
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let cfg = AutopilotConfig {
            history_capacity: 0,
            ..Default::default()
        };
        let steering = RefCell::new(Controller::default());
        let throttle = RefCell::new(Controller::default());
        assert!(Autopilot::new(&steering, &throttle, &cfg).is_err());
    }
}
