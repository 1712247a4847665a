//! Utility re-exports and helper macros for the steering autopilot.
//!
//! - `controllers`: PID controller and the per-tick `Autopilot` driver
//! - `tuning`: coordinate-ascent tuner, trial aggregation and observers
//! - `math`: sample statistics used to score a trial
//! - `config`: process-start configuration values
//! - `error`: configuration errors
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod controllers;
pub mod error;
pub mod math;
pub mod tuning;

#[doc(hidden)]
pub use static_cell;

pub use config::{AutopilotConfig, TuningConfig};
pub use controllers::{pid::Controller, Autopilot};
pub use error::ConfigError;
pub use tuning::{aggregator::SampleAggregator, twiddle::CoordinateTuner};

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: $crate::utils::static_cell::StaticCell<$t> =
            $crate::utils::static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
