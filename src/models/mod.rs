//! Forecasting model primitives (smoothing recursions).

pub mod smoothing;

pub use smoothing::*;
