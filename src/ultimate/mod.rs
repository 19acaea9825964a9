//! Ultimate loss estimation
//!
//! - `exposure`: exposure per origin period with its default
//! - `estimator`: chain-ladder and Bornhuetter-Ferguson projections plus the TOTAL row

mod estimator;
mod exposure;

pub use estimator::{
    a_priori_loss_ratio, estimate_ultimate, recent_flags, PeriodLabel, ProjectionMethod,
    UltimateLossRow, UltimateLossTable, DEFAULT_A_PRIORI_RATIO, RECENT_WINDOW_MONTHS,
};
pub use exposure::{ExposureByPeriod, DEFAULT_EXPOSURE};
