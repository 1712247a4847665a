//! Process-start configuration for the autopilot and its tuner.
//!
//! Every field has a default, so a JSON document only needs to name the values
//! it overrides:
//!
//! ```rust
//! use steer_core::utils::config::AutopilotConfig;
//! let cfg = AutopilotConfig::from_json(r#"{ "target_speed": 30.0 }"#).unwrap();
//! assert_eq!(cfg.tuning.window_size, 1600);
//! ```

use serde::{Deserialize, Serialize};

use crate::utils::{controllers::pid::Gains, error::ConfigError};

/// Weights of the two terms that make up a trial's objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// Weight applied to the mean absolute error.
    pub mean: f64,
    /// Weight applied to the signed error's sample standard deviation.
    pub spread: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            mean: 1.0,
            spread: 1.0,
        }
    }
}

/// How the tuner's initial step size is derived from a seeded gain.
///
/// Serialized as JSON with tag `"kind"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSeed {
    /// Same step for every coordinate.
    Fixed { step: f64 },
    /// `max(|gain| * fraction, floor)`, so zero gains still get explored.
    Relative { fraction: f64, floor: f64 },
}

impl Default for StepSeed {
    fn default() -> Self {
        StepSeed::Fixed { step: 0.1 }
    }
}

impl StepSeed {
    /// Initial step size for a coordinate currently holding `gain`.
    pub fn step_for(
        &self,
        gain: f64,
    ) -> f64 {
        match *self {
            StepSeed::Fixed { step } => step,
            StepSeed::Relative { fraction, floor } => libm::fmax(libm::fabs(gain) * fraction, floor),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            StepSeed::Fixed { step } if !(step > 0.0) => Err(ConfigError::InvalidFactor {
                name: "initial_step.step",
                value: step,
            }),
            StepSeed::Relative { fraction, .. } if !(fraction >= 0.0) => {
                Err(ConfigError::InvalidFactor {
                    name: "initial_step.fraction",
                    value: fraction,
                })
            }
            StepSeed::Relative { floor, .. } if !(floor > 0.0) => Err(ConfigError::InvalidFactor {
                name: "initial_step.floor",
                value: floor,
            }),
            _ => Ok(()),
        }
    }
}

/// Tuner and trial-window constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Raw samples per trial, warm-up included.
    pub window_size: usize,
    /// Leading samples of each trial that are dropped while the plant settles.
    pub warmup_discard: usize,
    /// Convergence threshold on the sum of all step sizes.
    pub tolerance: f64,
    /// Step multiplier after an improvement (> 1).
    pub acceleration: f64,
    /// Step multiplier after both directions failed (in (0, 1)).
    pub deceleration: f64,
    pub weights: ObjectiveWeights,
    pub initial_step: StepSeed,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            window_size: 1600,
            warmup_discard: 32,
            tolerance: 0.001,
            acceleration: 1.1,
            deceleration: 0.9,
            weights: ObjectiveWeights::default(),
            initial_step: StepSeed::default(),
        }
    }
}

impl TuningConfig {
    /// Samples that actually contribute to a trial's objective.
    pub fn retained_samples(&self) -> usize {
        self.window_size.saturating_sub(self.warmup_discard)
    }

    /// Reject configurations the tuner cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retained_samples() < 2 {
            return Err(ConfigError::WindowTooShort {
                window_size: self.window_size,
                warmup_discard: self.warmup_discard,
            });
        }
        if !(self.tolerance > 0.0) {
            return Err(ConfigError::InvalidFactor {
                name: "tolerance",
                value: self.tolerance,
            });
        }
        if !(self.acceleration > 1.0) || !self.acceleration.is_finite() {
            return Err(ConfigError::InvalidFactor {
                name: "acceleration",
                value: self.acceleration,
            });
        }
        if !(self.deceleration > 0.0 && self.deceleration < 1.0) {
            return Err(ConfigError::InvalidFactor {
                name: "deceleration",
                value: self.deceleration,
            });
        }
        self.initial_step.validate()
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Everything the per-tick driver needs at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Speed the throttle controller holds.
    pub target_speed: f64,
    pub steering: Gains,
    pub throttle: Gains,
    /// Integral window of each controller, in samples.
    pub history_capacity: usize,
    /// Run the tuner at all.
    pub tune: bool,
    /// Tune the throttle gains together with the steering gains.
    pub tune_throttle: bool,
    pub tuning: TuningConfig,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            target_speed: 40.0,
            steering: Gains::new(0.1, 0.001, 0.8),
            throttle: Gains::new(0.3, 0.0, 0.02),
            history_capacity: 200,
            tune: true,
            tune_throttle: false,
            tuning: TuningConfig::default(),
        }
    }
}

impl AutopilotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidFactor {
                name: "history_capacity",
                value: 0.0,
            });
        }
        self.tuning.validate()
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
