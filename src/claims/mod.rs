//! Claim and exposure records and their tab-delimited loaders

mod data;
pub mod loader;

pub use data::{ClaimRecord, Dimensions, ExposureRecord};
pub use loader::{
    load_claims, load_claims_from_reader, load_exposures, load_exposures_from_reader,
    load_snapshot_from,
};
