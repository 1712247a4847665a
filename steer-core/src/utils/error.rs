//! Configuration errors for the controller and tuner.
//!
//! Only construction can fail. Once a tuner or aggregator exists, the per-tick
//! path (`update`, `output`, `record`, `step`) is total over real inputs.

use core::fmt;

/// Errors raised while validating or building the tuning stack.
#[derive(Debug)]
pub enum ConfigError {
    /// A trial must keep at least two samples for the sample standard deviation.
    WindowTooShort {
        window_size: usize,
        warmup_discard: usize,
    },
    /// The step-size vector does not match the parameter vector.
    LengthMismatch {
        parameters: usize,
        step_sizes: usize,
    },
    /// Step sizes must be strictly positive.
    NonPositiveStep { index: usize, value: f64 },
    /// A multiplier, tolerance or capacity is outside its valid range.
    InvalidFactor { name: &'static str, value: f64 },
    /// An aggregator needs at least one controller to tune.
    NoControllers,
    /// Configuration text could not be decoded.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConfigError::WindowTooShort {
                window_size,
                warmup_discard,
            } => write!(
                f,
                "window of {} samples with {} discarded leaves fewer than 2 per trial",
                window_size, warmup_discard
            ),
            ConfigError::LengthMismatch {
                parameters,
                step_sizes,
            } => write!(
                f,
                "{} step sizes given for {} parameters",
                step_sizes, parameters
            ),
            ConfigError::NonPositiveStep { index, value } => {
                write!(f, "step size {} at index {} is not positive", value, index)
            }
            ConfigError::InvalidFactor { name, value } => {
                write!(f, "{} = {} is out of range", name, value)
            }
            ConfigError::NoControllers => write!(f, "no controllers registered for tuning"),
            ConfigError::Parse(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}
