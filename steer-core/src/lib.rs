//! Closed-loop steering control with online coordinate-ascent ("twiddle")
//! gain tuning, for no-std targets with an allocator.
//!
//! For a runnable host simulation, see the `steer-app/mock-sim` crate.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[cfg(test)]
use critical_section as _;

pub mod utils;
