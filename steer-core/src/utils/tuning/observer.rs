//! Transition hooks for the coordinate tuner.
//!
//! The tuner never prints. Anything that wants to watch the search (logging,
//! tests, a UI) implements [`TuneObserver`].

use alloc::vec::Vec;

/// Which side of the original value a coordinate is being tried on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

/// A tuner state-machine transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TuneEvent {
    /// New parameters are in place; the next trial runs with them.
    TrialStarted { trial: u32 },
    /// A coordinate was moved to `value`.
    CoordinateTried {
        index: usize,
        direction: Direction,
        value: f64,
    },
    /// The last try improved the best objective; the step grew to `step`.
    CoordinateSucceeded {
        index: usize,
        objective: f64,
        step: f64,
    },
    /// Both directions failed; the value was restored and the step shrank to `step`.
    CoordinateFailed { index: usize, step: f64 },
    RoundCompleted { round: u32, total_step: f64 },
    Converged { round: u32, total_step: f64 },
}

pub trait TuneObserver {
    fn on_event(
        &mut self,
        event: TuneEvent,
    );
}

impl TuneObserver for () {
    fn on_event(
        &mut self,
        _event: TuneEvent,
    ) {
    }
}

/// Records every event in order.
impl TuneObserver for Vec<TuneEvent> {
    fn on_event(
        &mut self,
        event: TuneEvent,
    ) {
        self.push(event);
    }
}

impl<O: TuneObserver + ?Sized> TuneObserver for &mut O {
    fn on_event(
        &mut self,
        event: TuneEvent,
    ) {
        (**self).on_event(event);
    }
}

/// Forwards tuner transitions to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TuneObserver for TracingObserver {
    fn on_event(
        &mut self,
        event: TuneEvent,
    ) {
        match event {
            TuneEvent::TrialStarted { trial } => tracing::trace!(trial, "trial started"),
            TuneEvent::CoordinateTried {
                index,
                direction,
                value,
            } => tracing::debug!(index, ?direction, value, "trying coordinate"),
            TuneEvent::CoordinateSucceeded {
                index,
                objective,
                step,
            } => tracing::debug!(index, objective, step, "coordinate improved"),
            TuneEvent::CoordinateFailed { index, step } => {
                tracing::debug!(index, step, "coordinate failed both ways")
            }
            TuneEvent::RoundCompleted { round, total_step } => {
                tracing::info!(round, total_step, "finished parameter round")
            }
            TuneEvent::Converged { round, total_step } => {
                tracing::info!(round, total_step, "tuner converged")
            }
        }
    }
}
