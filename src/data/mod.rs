//! Acquisition of the fact relation: Eurostat fetch or synthetic samples.

pub mod eurostat;
pub mod sample;

pub use eurostat::EurostatClient;
pub use sample::{generate_facts, SampleSpec};
