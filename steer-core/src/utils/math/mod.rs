//! Math utilities for the steering autopilot.
//!
//! This module provides the sample statistics used to reduce a trial to a
//! single objective value.

pub mod stats;
