//! Trial aggregation between the control loop and the tuner.
//!
//! `SampleAggregator` buffers per-tick errors, reduces each full trial to one
//! objective, steps the shared [`CoordinateTuner`] and writes the resulting
//! gains back into every registered controller. Controllers are shared with the
//! control loop through `&RefCell`, so the aggregator never owns them.

use alloc::vec::Vec;
use core::{cell::RefCell, ops::Range};

use crate::utils::{
    config::{ObjectiveWeights, TuningConfig},
    controllers::pid::{Controller, Gains},
    error::ConfigError,
    math::stats,
    tuning::{observer::TuneObserver, twiddle::CoordinateTuner},
};

/// Coefficients per controller in the tuner's parameter vector.
pub const GAINS_PER_CONTROLLER: usize = 3;

/// Maps each controller slot to its contiguous `[kp, ki, kd]` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainPartition {
    slots: usize,
}

impl GainPartition {
    pub fn new(slots: usize) -> Self {
        Self { slots }
    }

    /// Number of controllers.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Length of the parameter vector.
    pub fn len(&self) -> usize {
        self.slots * GAINS_PER_CONTROLLER
    }

    pub fn is_empty(&self) -> bool {
        self.slots == 0
    }

    /// Coordinates owned by controller `slot`.
    pub fn range(
        &self,
        slot: usize,
    ) -> Range<usize> {
        let start = slot * GAINS_PER_CONTROLLER;
        start..start + GAINS_PER_CONTROLLER
    }

    /// Controller slot that owns coordinate `index`.
    pub fn slot_of(
        &self,
        index: usize,
    ) -> usize {
        index / GAINS_PER_CONTROLLER
    }

    /// Gains of controller `slot`, as stored in `parameters` (signs untouched).
    pub fn gains(
        &self,
        parameters: &[f64],
        slot: usize,
    ) -> Gains {
        let p = &parameters[self.range(slot)];
        Gains::new(p[0], p[1], p[2])
    }

    /// Concatenate per-controller gains into one parameter vector.
    pub fn flatten<I>(gains: I) -> Vec<f64>
    where
        I: IntoIterator<Item = Gains>,
    {
        gains.into_iter().flat_map(Gains::to_array).collect()
    }
}

/// Statistics of one completed trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialSummary {
    /// 1-based index of the completed trial.
    pub trial: u32,
    pub objective: f64,
    pub mean_abs: f64,
    pub stdd_abs: f64,
    pub mean_signed: f64,
    pub stdd_signed: f64,
    /// Tuner state after this trial was fed to it.
    pub converged: bool,
}

/// Buffers raw errors into trials and drives the tuner with them.
pub struct SampleAggregator<'a, O = ()> {
    controllers: Vec<&'a RefCell<Controller>>,
    partition: GainPartition,
    tuner: CoordinateTuner<O>,
    errors: Vec<f64>,
    abs_errors: Vec<f64>,
    window_size: usize,
    warmup_discard: usize,
    discarded: usize,
    weights: ObjectiveWeights,
    trials: u32,
}

impl<'a> SampleAggregator<'a, ()> {
    /// Register `controllers` (in order) under one shared tuner, seeded from
    /// their current gains.
    pub fn new(
        controllers: Vec<&'a RefCell<Controller>>,
        cfg: &TuningConfig,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        if controllers.is_empty() {
            return Err(ConfigError::NoControllers);
        }

        let partition = GainPartition::new(controllers.len());
        let seed = GainPartition::flatten(controllers.iter().map(|c| c.borrow().gains()));
        let tuner = CoordinateTuner::from_config(seed, cfg)?;
        let retained = cfg.retained_samples();

        tracing::info!(
            controllers = partition.slots(),
            parameters = partition.len(),
            window = cfg.window_size,
            discard = cfg.warmup_discard,
            "tuning enabled"
        );

        Ok(Self {
            controllers,
            partition,
            tuner,
            errors: Vec::with_capacity(retained),
            abs_errors: Vec::with_capacity(retained),
            window_size: cfg.window_size,
            warmup_discard: cfg.warmup_discard,
            discarded: 0,
            weights: cfg.weights,
            trials: 0,
        })
    }
}

impl<'a, O: TuneObserver> SampleAggregator<'a, O> {
    /// Swap in a different tuner observer.
    pub fn with_observer<P: TuneObserver>(
        self,
        observer: P,
    ) -> SampleAggregator<'a, P> {
        SampleAggregator {
            controllers: self.controllers,
            partition: self.partition,
            tuner: self.tuner.with_observer(observer),
            errors: self.errors,
            abs_errors: self.abs_errors,
            window_size: self.window_size,
            warmup_discard: self.warmup_discard,
            discarded: self.discarded,
            weights: self.weights,
            trials: self.trials,
        }
    }

    /// Feed one raw error sample. Returns the trial statistics when this
    /// sample completed a trial.
    pub fn record(
        &mut self,
        error: f64,
    ) -> Option<TrialSummary> {
        if self.discarded < self.warmup_discard {
            self.discarded += 1;
            return None;
        }

        self.errors.push(error);
        self.abs_errors.push(libm::fabs(error));
        if self.errors.len() < self.window_size - self.warmup_discard {
            return None;
        }

        let summary = self.finish_trial();
        self.errors.clear();
        self.abs_errors.clear();
        self.discarded = 0;
        Some(summary)
    }

    fn finish_trial(&mut self) -> TrialSummary {
        let mean_abs = stats::mean(&self.abs_errors);
        let stdd_abs = stats::sample_stddev_about(&self.abs_errors, mean_abs);
        let mean_signed = stats::mean(&self.errors);
        let stdd_signed = stats::sample_stddev_about(&self.errors, mean_signed);
        let objective = self.weights.mean * mean_abs + self.weights.spread * stdd_signed;
        self.trials += 1;

        tracing::info!(
            trial = self.trials,
            objective,
            mean_abs,
            stdd_signed,
            best = self.tuner.best_objective(),
            "trial complete"
        );

        let was_converged = self.tuner.is_converged();
        let converged = self.tuner.step(objective);
        if !converged {
            self.apply_parameters();
        } else if !was_converged {
            tracing::info!(
                rounds = self.tuner.round_count(),
                best = self.tuner.best_objective(),
                "tuning converged, holding gains"
            );
        }

        TrialSummary {
            trial: self.trials,
            objective,
            mean_abs,
            stdd_abs,
            mean_signed,
            stdd_signed,
            converged,
        }
    }

    /// Push the tuner's parameters into the controllers, sign-corrected.
    fn apply_parameters(&self) {
        let params = self.tuner.parameters();
        for (slot, controller) in self.controllers.iter().enumerate() {
            let raw = self.partition.gains(params, slot);
            let (kp, ki, kd) = (libm::fabs(raw.kp), libm::fabs(raw.ki), libm::fabs(raw.kd));
            tracing::debug!(slot, kp, ki, kd, "applying gains");
            controller.borrow_mut().configure(kp, ki, kd);
        }
    }

    pub fn tuner(&self) -> &CoordinateTuner<O> {
        &self.tuner
    }

    pub fn partition(&self) -> GainPartition {
        self.partition
    }

    pub fn is_converged(&self) -> bool {
        self.tuner.is_converged()
    }

    /// Completed trials.
    pub fn trial_count(&self) -> u32 {
        self.trials
    }

    /// Samples buffered for the trial in progress (warm-up excluded).
    pub fn pending(&self) -> &[f64] {
        &self.errors
    }

    /// Warm-up samples dropped so far in the trial in progress.
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}
