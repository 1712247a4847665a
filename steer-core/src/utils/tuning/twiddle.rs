//! Coordinate-ascent ("twiddle") tuner.
//!
//! One coordinate is perturbed at a time. Each call to [`CoordinateTuner::step`]
//! consumes the objective of exactly one trial run with the current
//! parameters, then leaves the parameters the next trial must run with.
//!
//! Per active coordinate:
//!
//! ```text
//! Untried --(+step)--> TriedIncrease --better--> next coordinate (step *= acceleration)
//!                            |
//!                          worse (-2 step)
//!                            v
//!                      TriedDecrease --better--> next coordinate (step *= acceleration)
//!                            |
//!                          worse (restore, step *= deceleration)
//!                            v
//!                      next coordinate
//! ```
//!
//! Convergence is checked once per completed round, on the call after the
//! round's last coordinate advanced, and only against the step sizes.

use alloc::vec::Vec;

use crate::utils::{
    config::TuningConfig,
    error::ConfigError,
    tuning::observer::{Direction, TuneEvent, TuneObserver},
};

/// Default step multiplier after an improvement.
pub const DEFAULT_ACCELERATION: f64 = 1.1;
/// Default step multiplier after a coordinate failed in both directions.
pub const DEFAULT_DECELERATION: f64 = 0.9;

/// What was last done to the active coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Untried,
    TriedIncrease,
    TriedDecrease,
}

/// Derivative-free minimizer over a flat parameter vector.
#[derive(Debug, Clone)]
pub struct CoordinateTuner<O = ()> {
    parameters: Vec<f64>,
    step_sizes: Vec<f64>,
    active: usize,
    phase: Phase,
    best_objective: f64,
    rounds: u32,
    trials: u32,
    tolerance: f64,
    acceleration: f64,
    deceleration: f64,
    converged: bool,
    objectives: Vec<f64>,
    observer: O,
}

impl CoordinateTuner<()> {
    /// Build a tuner starting at `parameters` with one step size per parameter.
    ///
    /// Uses [`DEFAULT_ACCELERATION`] and [`DEFAULT_DECELERATION`]; see
    /// [`CoordinateTuner::with_factors`].
    pub fn new(
        parameters: Vec<f64>,
        step_sizes: Vec<f64>,
        tolerance: f64,
    ) -> Result<Self, ConfigError> {
        if !(tolerance > 0.0) {
            return Err(ConfigError::InvalidFactor {
                name: "tolerance",
                value: tolerance,
            });
        }
        check_lengths(parameters.len(), step_sizes.len())?;
        check_steps(&step_sizes)?;

        Ok(Self {
            parameters,
            step_sizes,
            active: 0,
            phase: Phase::Untried,
            best_objective: f64::INFINITY,
            rounds: 0,
            trials: 0,
            tolerance,
            acceleration: DEFAULT_ACCELERATION,
            deceleration: DEFAULT_DECELERATION,
            converged: false,
            objectives: Vec::new(),
            observer: (),
        })
    }

    /// Build a tuner from a validated configuration, deriving each initial
    /// step size from the seeded value.
    pub fn from_config(
        parameters: Vec<f64>,
        cfg: &TuningConfig,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let steps = parameters
            .iter()
            .map(|&p| cfg.initial_step.step_for(p))
            .collect();
        Self::new(parameters, steps, cfg.tolerance)?.with_factors(cfg.acceleration, cfg.deceleration)
    }
}

impl<O: TuneObserver> CoordinateTuner<O> {
    /// Replace the step multipliers. `acceleration` must exceed 1 and
    /// `deceleration` must lie in (0, 1).
    pub fn with_factors(
        mut self,
        acceleration: f64,
        deceleration: f64,
    ) -> Result<Self, ConfigError> {
        if !(acceleration > 1.0) || !acceleration.is_finite() {
            return Err(ConfigError::InvalidFactor {
                name: "acceleration",
                value: acceleration,
            });
        }
        if !(deceleration > 0.0 && deceleration < 1.0) {
            return Err(ConfigError::InvalidFactor {
                name: "deceleration",
                value: deceleration,
            });
        }
        self.acceleration = acceleration;
        self.deceleration = deceleration;
        Ok(self)
    }

    /// Swap in a different transition observer.
    pub fn with_observer<P: TuneObserver>(
        self,
        observer: P,
    ) -> CoordinateTuner<P> {
        CoordinateTuner {
            parameters: self.parameters,
            step_sizes: self.step_sizes,
            active: self.active,
            phase: self.phase,
            best_objective: self.best_objective,
            rounds: self.rounds,
            trials: self.trials,
            tolerance: self.tolerance,
            acceleration: self.acceleration,
            deceleration: self.deceleration,
            converged: self.converged,
            objectives: self.objectives,
            observer,
        }
    }

    /// Feed the objective of the trial that just ran (lower is better).
    ///
    /// Returns `true` once the tuner has converged; afterwards every call is
    /// a no-op that keeps returning `true`.
    pub fn step(
        &mut self,
        objective: f64,
    ) -> bool {
        if self.converged {
            return true;
        }
        self.objectives.push(objective);

        // Round boundary: checking convergence must not use up this sample,
        // so a fresh round starts with the same objective.
        if self.active >= self.parameters.len() {
            self.rounds += 1;
            let total_step = self.total_step();
            if total_step <= self.tolerance {
                self.converged = true;
                self.observer.on_event(TuneEvent::Converged {
                    round: self.rounds,
                    total_step,
                });
                return true;
            }
            self.observer.on_event(TuneEvent::RoundCompleted {
                round: self.rounds,
                total_step,
            });
            self.active = 0;
            self.phase = Phase::Untried;
        }

        let i = self.active;
        match self.phase {
            Phase::Untried => {
                self.parameters[i] += self.step_sizes[i];
                self.phase = Phase::TriedIncrease;
                self.observer.on_event(TuneEvent::CoordinateTried {
                    index: i,
                    direction: Direction::Increase,
                    value: self.parameters[i],
                });
            }
            Phase::TriedIncrease if objective < self.best_objective => self.succeed(objective),
            Phase::TriedIncrease => {
                self.parameters[i] -= 2.0 * self.step_sizes[i];
                self.phase = Phase::TriedDecrease;
                self.observer.on_event(TuneEvent::CoordinateTried {
                    index: i,
                    direction: Direction::Decrease,
                    value: self.parameters[i],
                });
            }
            Phase::TriedDecrease if objective < self.best_objective => self.succeed(objective),
            Phase::TriedDecrease => {
                self.parameters[i] += self.step_sizes[i];
                self.step_sizes[i] *= self.deceleration;
                self.observer.on_event(TuneEvent::CoordinateFailed {
                    index: i,
                    step: self.step_sizes[i],
                });
                self.move_on();
            }
        }

        self.trials += 1;
        self.observer.on_event(TuneEvent::TrialStarted { trial: self.trials });
        false
    }

    fn succeed(
        &mut self,
        objective: f64,
    ) {
        let i = self.active;
        self.best_objective = objective;
        self.step_sizes[i] *= self.acceleration;
        self.observer.on_event(TuneEvent::CoordinateSucceeded {
            index: i,
            objective,
            step: self.step_sizes[i],
        });
        self.move_on();
    }

    fn move_on(&mut self) {
        self.active += 1;
        self.phase = Phase::Untried;
    }

    /// Current parameter vector.
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Bulk replace the parameters. Meant for seeding before the first step;
    /// the search position is left as is.
    pub fn set_parameters(
        &mut self,
        values: Vec<f64>,
    ) -> Result<(), ConfigError> {
        check_lengths(values.len(), self.step_sizes.len())?;
        self.parameters = values;
        Ok(())
    }

    pub fn step_sizes(&self) -> &[f64] {
        &self.step_sizes
    }

    /// Bulk replace the step sizes. Every value must be positive.
    pub fn set_step_sizes(
        &mut self,
        values: Vec<f64>,
    ) -> Result<(), ConfigError> {
        check_lengths(self.parameters.len(), values.len())?;
        check_steps(&values)?;
        self.step_sizes = values;
        Ok(())
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn total_step(&self) -> f64 {
        self.step_sizes.iter().sum()
    }

    pub fn best_objective(&self) -> f64 {
        self.best_objective
    }

    /// Index of the coordinate being perturbed. Equals the parameter count
    /// between the end of a round and the next call.
    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Completed rounds over all coordinates.
    pub fn round_count(&self) -> u32 {
        self.rounds
    }

    /// Trials handed out so far.
    pub fn trial_count(&self) -> u32 {
        self.trials
    }

    /// Every objective fed to `step` before convergence, in order.
    pub fn objectives(&self) -> &[f64] {
        &self.objectives
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}

fn check_lengths(
    parameters: usize,
    step_sizes: usize,
) -> Result<(), ConfigError> {
    if parameters != step_sizes {
        return Err(ConfigError::LengthMismatch {
            parameters,
            step_sizes,
        });
    }
    Ok(())
}

fn check_steps(steps: &[f64]) -> Result<(), ConfigError> {
    match steps.iter().position(|&s| !(s > 0.0) || !s.is_finite()) {
        Some(index) => Err(ConfigError::NonPositiveStep {
            index,
            value: steps[index],
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(
        start: f64,
        step: f64,
        tolerance: f64,
    ) -> CoordinateTuner {
        CoordinateTuner::new(vec![start], vec![step], tolerance)
            .unwrap()
            .with_factors(1.1, 0.9)
            .unwrap()
    }

    #[test]
    fn test_first_step_increases_first_coordinate() {
        let mut t = CoordinateTuner::new(vec![0.5, 2.0], vec![0.1, 0.2], 0.001).unwrap();
        assert!(!t.step(0.0));
        assert!((t.parameters()[0] - 0.6).abs() < 1e-12);
        assert_eq!(t.parameters()[1], 2.0);
        assert_eq!(t.phase(), Phase::TriedIncrease);
        assert_eq!(t.active_index(), 0);
    }

    #[test]
    fn test_improvement_then_round_restart() {
        let mut t = single(0.0, 1.0, 0.1);
        assert!(!t.step(123.0));
        assert_eq!(t.parameters(), &[1.0]);

        assert!(!t.step(0.5));
        assert_eq!(t.parameters(), &[1.0]);
        assert!((t.step_sizes()[0] - 1.1).abs() < 1e-12);
        assert_eq!(t.active_index(), 1);
        assert_eq!(t.best_objective(), 0.5);

        assert!(!t.step(0.7));
        assert_eq!(t.round_count(), 1);
        assert_eq!(t.active_index(), 0);
        assert_eq!(t.phase(), Phase::TriedIncrease);
        assert!((t.parameters()[0] - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_failed_increase_swings_to_decrease() {
        let mut t = single(0.0, 1.0, 0.1);
        t.step(0.0);
        t.step(1.0); // improves against +inf
        t.step(0.0); // new round, p = 2.1
        assert!(!t.step(2.0));
        assert_eq!(t.phase(), Phase::TriedDecrease);
        assert!((t.parameters()[0] - (1.0 - 1.1)).abs() < 1e-12);
    }

    #[test]
    fn test_failed_both_ways_restores_and_shrinks() {
        let mut t = single(0.0, 1.0, 0.1);
        t.step(0.0);
        t.step(1.0);
        t.step(0.0);
        t.step(2.0);
        assert!(!t.step(3.0));
        assert!((t.parameters()[0] - 1.0).abs() < 1e-12);
        assert!((t.step_sizes()[0] - 1.1 * 0.9).abs() < 1e-12);
        assert_eq!(t.phase(), Phase::Untried);
        assert_eq!(t.active_index(), 1);
    }

    #[test]
    fn test_successful_decrease_keeps_value() {
        let mut t = single(0.0, 1.0, 0.1);
        t.step(0.0);
        t.step(1.0);
        t.step(0.0);
        t.step(2.0);
        assert!(!t.step(0.5));
        assert!((t.parameters()[0] + 0.1).abs() < 1e-12);
        assert!((t.step_sizes()[0] - 1.21).abs() < 1e-12);
        assert_eq!(t.best_objective(), 0.5);
    }

    #[test]
    fn test_converged_is_idempotent() {
        let mut t = single(0.0, 0.05, 0.1);
        assert!(!t.step(9.0));
        assert!(!t.step(1.0));
        assert!(t.step(1.0));
        assert!(t.is_converged());

        let params = t.parameters().to_vec();
        let steps = t.step_sizes().to_vec();
        let seen = t.objectives().len();
        for x in [-5.0, 0.0, f64::NAN, 1e9] {
            assert!(t.step(x));
        }
        assert_eq!(t.parameters(), params.as_slice());
        assert_eq!(t.step_sizes(), steps.as_slice());
        assert_eq!(t.objectives().len(), seen);
    }

    #[test]
    fn test_converges_on_unimodal_objective() {
        let f = |p: f64| (p - 3.0) * (p - 3.0);
        let tolerance = 0.01;
        let mut t = single(0.0, 1.0, tolerance);

        let mut converged = false;
        for _ in 0..10_000 {
            let objective = f(t.parameters()[0]);
            if t.step(objective) {
                converged = true;
                break;
            }
        }
        assert!(converged, "tuner did not converge");
        assert!(t.total_step() <= tolerance);
        assert!(
            (t.parameters()[0] - 3.0).abs() < 5.0 * tolerance,
            "parameter {} too far from minimum",
            t.parameters()[0]
        );
    }

    #[test]
    fn test_event_sequence() {
        let mut t = CoordinateTuner::new(vec![0.0], vec![0.5], 0.1)
            .unwrap()
            .with_factors(1.5, 0.5)
            .unwrap()
            .with_observer(Vec::<TuneEvent>::new());
        t.step(0.0);
        t.step(0.5);
        t.step(0.5);
        assert_eq!(
            t.observer().as_slice(),
            &[
                TuneEvent::CoordinateTried {
                    index: 0,
                    direction: Direction::Increase,
                    value: 0.5
                },
                TuneEvent::TrialStarted { trial: 1 },
                TuneEvent::CoordinateSucceeded {
                    index: 0,
                    objective: 0.5,
                    step: 0.75
                },
                TuneEvent::TrialStarted { trial: 2 },
                TuneEvent::RoundCompleted {
                    round: 1,
                    total_step: 0.75
                },
                TuneEvent::CoordinateTried {
                    index: 0,
                    direction: Direction::Increase,
                    value: 1.25
                },
                TuneEvent::TrialStarted { trial: 3 },
            ]
        );
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            CoordinateTuner::new(vec![0.0, 0.0], vec![0.1], 0.01),
            Err(ConfigError::LengthMismatch {
                parameters: 2,
                step_sizes: 1
            })
        ));
        assert!(matches!(
            CoordinateTuner::new(vec![0.0, 0.0], vec![0.1, 0.0], 0.01),
            Err(ConfigError::NonPositiveStep { index: 1, .. })
        ));
        assert!(CoordinateTuner::new(vec![0.0], vec![0.1], 0.0).is_err());
        assert!(single(0.0, 1.0, 0.1).with_factors(0.9, 0.5).is_err());

        let mut t = single(0.0, 1.0, 0.1);
        assert!(t.set_parameters(vec![1.0, 2.0]).is_err());
        assert!(t.set_step_sizes(vec![-1.0]).is_err());
        t.set_step_sizes(vec![0.3]).unwrap();
        t.set_parameters(vec![4.0]).unwrap();
        t.step(0.0);
        assert!((t.parameters()[0] - 4.3).abs() < 1e-12);
    }

    #[test]
    fn test_from_config_seeds_steps() {
        let cfg = TuningConfig::default();
        let t = CoordinateTuner::from_config(vec![0.1, 0.001, 0.8], &cfg).unwrap();
        assert_eq!(t.step_sizes(), &[0.1, 0.1, 0.1]);
        assert_eq!(t.parameters(), &[0.1, 0.001, 0.8]);
    }
}
