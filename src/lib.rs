//! Claims Reserving - Loss development triangles and IBNR estimation
//!
//! This library provides:
//! - Period bucketing and development lag arithmetic (month, quarter, year)
//! - Paid, severity and frequency triangles from claim transactions
//! - Volume-weighted development factors and factors-to-ultimate
//! - Chain-ladder and Bornhuetter-Ferguson ultimate losses with a TOTAL row
//! - Claims summaries and delimited-text export

pub mod claims;
pub mod config;
pub mod development;
pub mod error;
pub mod period;
pub mod report;
pub mod runner;
pub mod triangle;
pub mod ultimate;

// Re-export commonly used types
pub use claims::{ClaimRecord, Dimensions, ExposureRecord};
pub use config::{CategoryFilter, DateRange, MethodSelector, ReservingConfig, TriangleType, ValueType};
pub use development::DevelopmentFactors;
pub use error::{ReservingError, Result};
pub use period::Periodicity;
pub use runner::{ReservingReport, ReservingRunner};
pub use triangle::{Cell, Triangle};
pub use ultimate::{PeriodLabel, ProjectionMethod, UltimateLossRow, UltimateLossTable};
