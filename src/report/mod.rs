//! Claims summaries and delimited-text export

mod export;
mod summary;

pub use export::{
    export_file_name, write_factor_statistics, write_individual_factors, write_triangle,
    write_ultimate,
};
pub use summary::{
    development_summary, occurrence_summary, ClaimsMetrics, DatasetRange, DevelopmentSummary, FilterOptions,
    OccurrenceSummary,
};
