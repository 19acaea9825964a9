//! Development factor estimation

mod factors;

pub use factors::{chain_to_ultimate, DevelopmentFactors, LagStatistics};
