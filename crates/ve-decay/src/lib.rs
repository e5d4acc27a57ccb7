//! # ve-decay
//!
//! Linear vote-escrow decay math.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Bias and slope**: a lock of `base_value` with `remaining` seconds out of
//!   `max_duration` carries `bias = base_value * remaining / max_duration`,
//!   decaying to zero at rate `slope = bias * SLOPE_MULTIPLIER / remaining`.
//! - **Exact fixed-point products**: [`mul_div`] evaluates `a * b / d` through
//!   a 256-bit intermediate.
//! - **Week-stride projection**: [`walk`] advances an aggregate point across
//!   week boundaries, applying the slope reductions scheduled at each one.

pub mod engine;
pub mod fixed;
pub mod stride;

pub use engine::LinearDecay;
pub use fixed::mul_div;
pub use stride::{walk, Projection};
