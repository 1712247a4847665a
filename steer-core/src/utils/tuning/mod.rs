//! Online gain tuning.
//!
//! - `twiddle`: coordinate-ascent state machine over a flat parameter vector
//! - `aggregator`: reduces raw per-tick errors to one objective per trial and
//!   writes the tuned gains back into the registered controllers
//! - `observer`: hooks invoked at every tuner transition

pub mod aggregator;
pub mod observer;
pub mod twiddle;

pub use aggregator::{GainPartition, SampleAggregator, TrialSummary};
pub use observer::{Direction, TracingObserver, TuneEvent, TuneObserver};
pub use twiddle::{CoordinateTuner, Phase};
