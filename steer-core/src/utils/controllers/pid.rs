//! Discrete PID controller with a sliding-window integral.
//!
//! The sample interval is treated as constant, so the derivative is a plain
//! difference between consecutive errors and the integral is a plain sum over
//! the most recent `capacity` samples.
//!
//! # Example
//! ```rust
//! use steer_core::utils::controllers::pid::Controller;
//! let mut pid = Controller::new(200);
//! pid.configure(1.0, 0.0, 0.0);
//! pid.update(0.5);
//! assert_eq!(pid.output(), -0.5);
//! ```

use alloc::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default integral window, in samples.
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Proportional, integral and derivative coefficients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Gains {
    pub const fn new(
        kp: f64,
        ki: f64,
        kd: f64,
    ) -> Self {
        Self { kp, ki, kd }
    }

    /// Gains as the `[kp, ki, kd]` coordinate triple used by the tuner.
    pub fn to_array(self) -> [f64; 3] {
        [self.kp, self.ki, self.kd]
    }
}

/// Feedback controller for a single actuator.
#[derive(Debug, Clone)]
pub struct Controller {
    gains: Gains,
    p_term: f64,
    i_term: f64,
    d_term: f64,
    history: VecDeque<f64>,
    capacity: usize,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl Controller {
    /// Create a controller with zero gains and an integral window of
    /// `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            gains: Gains::default(),
            p_term: 0.0,
            i_term: 0.0,
            d_term: 0.0,
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Create a controller that starts with `gains`.
    pub fn with_gains(
        gains: Gains,
        capacity: usize,
    ) -> Self {
        let mut pid = Self::new(capacity);
        pid.gains = gains;
        pid
    }

    /// Replace the gains. History and terms are left untouched.
    pub fn configure(
        &mut self,
        kp: f64,
        ki: f64,
        kd: f64,
    ) {
        self.gains = Gains::new(kp, ki, kd);
    }

    /// Feed one error sample.
    pub fn update(
        &mut self,
        error: f64,
    ) {
        self.history.push_back(error);
        self.d_term = error - self.p_term;
        self.p_term = error;
        self.i_term += error;

        // The window holds at most `capacity` samples.
        while self.history.len() > self.capacity {
            if let Some(old) = self.history.pop_front() {
                self.i_term -= old;
            }
        }
    }

    /// Corrective signal. Not clamped; the caller owns actuator limits.
    pub fn output(&self) -> f64 {
        -self.gains.kp * self.p_term - self.gains.ki * self.i_term - self.gains.kd * self.d_term
    }

    /// Clear history and terms, keeping the gains.
    pub fn reset(&mut self) {
        self.history.clear();
        self.p_term = 0.0;
        self.i_term = 0.0;
        self.d_term = 0.0;
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn proportional_term(&self) -> f64 {
        self.p_term
    }

    pub fn integral_term(&self) -> f64 {
        self.i_term
    }

    pub fn derivative_term(&self) -> f64 {
        self.d_term
    }

    /// Samples currently inside the integral window.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
