//! Mathematical utilities: scalar statistics and least-squares trend fitting.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
