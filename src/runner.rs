//! Reserving runner for repeated requests over one snapshot
//!
//! Loads claims and exposures once, then evaluates any number of
//! [`ReservingConfig`] requests without re-reading the extracts.

use chrono::NaiveDate;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::claims::{load_snapshot_from, ClaimRecord, ExposureRecord};
use crate::config::{MethodSelector, ReservingConfig};
use crate::development::DevelopmentFactors;
use crate::error::Result;
use crate::report::{
    development_summary, export_file_name, occurrence_summary, write_factor_statistics,
    write_individual_factors, write_triangle, write_ultimate, ClaimsMetrics, DatasetRange,
    DevelopmentSummary, FilterOptions, OccurrenceSummary,
};
use crate::triangle::{build_triangle, prepare_claims, Triangle};
use crate::ultimate::{estimate_ultimate, ExposureByPeriod, UltimateLossTable, DEFAULT_EXPOSURE};

/// Data-quality counters collected while answering a request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub claims_filtered_out: usize,
    pub non_positive_dropped: usize,
    pub negative_lags_clamped: usize,
    /// Set when the triangle could not resolve a value column
    pub triangle_failure: Option<String>,
}

/// Everything produced for one request
#[derive(Debug, Clone, Serialize)]
pub struct ReservingReport {
    pub config: ReservingConfig,
    pub cache_key: String,
    pub triangle: Triangle,
    pub factors: DevelopmentFactors,
    pub ultimate: UltimateLossTable,
    pub metrics: ClaimsMetrics,
    pub occurrence: Vec<OccurrenceSummary>,
    /// Claims grouped by registration period, oldest first
    pub development: Vec<DevelopmentSummary>,
    pub diagnostics: Diagnostics,
}

impl ReservingReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the triangle, factor and ultimate tables into `dir`
    ///
    /// The triangle takes the dated export name; the other tables share its stem.
    pub fn export_to_dir(&self, dir: &Path, delimiter: u8, as_of: NaiveDate) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let name = export_file_name(self.config.triangle_type, self.config.value_type, as_of);
        let stem = name.trim_end_matches(".csv");

        let triangle_path = dir.join(&name);
        write_triangle(&self.triangle, File::create(&triangle_path)?, delimiter)?;

        let factors_path = dir.join(format!("{}_factors.csv", stem));
        write_individual_factors(&self.factors, File::create(&factors_path)?, delimiter)?;

        let statistics_path = dir.join(format!("{}_statistics.csv", stem));
        write_factor_statistics(&self.factors, File::create(&statistics_path)?, delimiter)?;

        let ultimate_path = dir.join(format!("{}_ultimate.csv", stem));
        write_ultimate(&self.ultimate, File::create(&ultimate_path)?, delimiter)?;

        let paths = vec![triangle_path, factors_path, statistics_path, ultimate_path];
        info!("Exported {} tables to {}", paths.len(), dir.display());
        Ok(paths)
    }
}

/// Immutable claim and exposure snapshot with a version tag
#[derive(Debug, Clone)]
pub struct ReservingRunner {
    claims: Vec<ClaimRecord>,
    exposures: Vec<ExposureRecord>,
    dataset_version: String,
}

impl ReservingRunner {
    pub fn new(claims: Vec<ClaimRecord>, exposures: Vec<ExposureRecord>, dataset_version: impl Into<String>) -> Self {
        Self {
            claims,
            exposures,
            dataset_version: dataset_version.into(),
        }
    }

    /// Load `siniestros.txt` and `expuestos.txt` from a directory
    ///
    /// The dataset version is derived from the record counts and the last
    /// registration date.
    pub fn from_data_dir(dir: &Path) -> Result<Self> {
        let (claims, exposures) = load_snapshot_from(dir)?;
        let version = match DatasetRange::of(&claims) {
            Some(range) => format!(
                "{}-{}-{}",
                range.last_registration.format("%Y%m%d"),
                claims.len(),
                exposures.len()
            ),
            None => format!("empty-{}", exposures.len()),
        };
        Ok(Self::new(claims, exposures, version))
    }

    pub fn claims(&self) -> &[ClaimRecord] {
        &self.claims
    }

    pub fn exposures(&self) -> &[ExposureRecord] {
        &self.exposures
    }

    pub fn dataset_version(&self) -> &str {
        &self.dataset_version
    }

    pub fn dataset_range(&self) -> Option<DatasetRange> {
        DatasetRange::of(&self.claims)
    }

    pub fn filter_options(&self, line: Option<&str>, channel: Option<&str>, coverage: Option<&str>) -> FilterOptions {
        FilterOptions::cascade(&self.claims, line, channel, coverage)
    }

    /// Run the full pipeline for one request
    pub fn run(&self, config: &ReservingConfig) -> ReservingReport {
        let prepared = prepare_claims(&self.claims, config);
        let triangle = build_triangle(&prepared.frame, config.triangle_type, config.value_type);
        let factors = DevelopmentFactors::estimate(&triangle);
        let exposure = ExposureByPeriod::aggregate(&self.exposures, config);
        if exposure.is_empty() && config.method != MethodSelector::ChainLadder {
            warn!("No exposure matches the request, assuming {} per period", DEFAULT_EXPOSURE);
        }
        let ultimate = estimate_ultimate(&triangle, &factors, &exposure, config.method, config.triangle_type);

        info!(
            "{} {} triangle: {} periods x {} lags, {} ultimate rows",
            config.triangle_type,
            config.value_type,
            triangle.num_periods(),
            triangle.num_lags(),
            ultimate.rows.len()
        );

        ReservingReport {
            config: config.clone(),
            cache_key: config.cache_key(&self.dataset_version),
            metrics: ClaimsMetrics::from_frame(&prepared.frame, config.value_type),
            occurrence: occurrence_summary(&prepared.frame, config.value_type),
            development: development_summary(&prepared.frame, config.value_type),
            diagnostics: Diagnostics {
                claims_filtered_out: prepared.filtered_out,
                non_positive_dropped: prepared.non_positive_dropped,
                negative_lags_clamped: prepared.negative_lags_clamped,
                triangle_failure: triangle.failure.clone(),
            },
            triangle,
            factors,
            ultimate,
        }
    }

    /// Run independent requests in parallel
    pub fn run_batch(&self, configs: &[ReservingConfig]) -> Vec<ReservingReport> {
        configs.par_iter().map(|config| self.run(config)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Dimensions;
    use crate::config::TriangleType;
    use crate::period::Periodicity;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Claims reproducing the incremental triangle [[100,50,30],[120,50],[90]]
    fn test_runner() -> ReservingRunner {
        let dims = Dimensions::new("Auto", "Direct", "Collision", Some("Motor"));
        let claim = |occ: NaiveDate, reg: NaiveDate, amount: f64| {
            ClaimRecord::new(occ, reg, amount, amount, dims.clone())
        };
        let claims = vec![
            claim(d(2023, 1, 3), d(2023, 1, 10), 100.0),
            claim(d(2023, 1, 4), d(2023, 2, 10), 50.0),
            claim(d(2023, 1, 5), d(2023, 3, 10), 30.0),
            claim(d(2023, 2, 3), d(2023, 2, 10), 120.0),
            claim(d(2023, 2, 4), d(2023, 3, 10), 50.0),
            claim(d(2023, 3, 3), d(2023, 3, 10), 90.0),
        ];
        ReservingRunner::new(claims, Vec::new(), "test")
    }

    #[test]
    fn test_run_chain_ladder_end_to_end() {
        let runner = test_runner();
        let config = ReservingConfig::default().with_method(MethodSelector::ChainLadder);
        let report = runner.run(&config);

        assert_eq!(report.triangle.num_periods(), 3);
        assert_eq!(report.triangle.value(0, 2), Some(180.0));
        assert_abs_diff_eq!(report.factors.cumulative[0], 1.745_454_5, epsilon = 1e-6);

        let newest = report.ultimate.row(d(2023, 3, 1)).unwrap();
        assert_abs_diff_eq!(newest.ultimate, 157.090_909, epsilon = 1e-5);
        assert_eq!(report.metrics.total_claims, 6);
        let registered: Vec<usize> = report.development.iter().map(|s| s.total_claims).collect();
        assert_eq!(registered, vec![1, 2, 3]);
        assert_abs_diff_eq!(report.development[2].total_payments, 170.0);
        assert_eq!(report.cache_key, config.cache_key("test"));
    }

    #[test]
    fn test_chain_ladder_identity_at_last_column() {
        let report = test_runner().run(&ReservingConfig::default().with_method(MethodSelector::ChainLadder));
        let oldest = report.ultimate.row(d(2023, 1, 1)).unwrap();
        assert_abs_diff_eq!(oldest.ultimate, oldest.current_value);
    }

    #[test]
    fn test_run_with_no_matching_claims() {
        let mut config = ReservingConfig::default();
        config.filters.line = Some("Marine".to_string());
        let report = test_runner().run(&config);

        assert!(report.triangle.is_empty());
        assert!(report.factors.is_empty());
        assert!(report.ultimate.is_empty());
        assert_eq!(report.diagnostics.claims_filtered_out, 6);
        assert!(report.to_json().unwrap().contains("\"claims_filtered_out\": 6"));
    }

    #[test]
    fn test_export_to_dir() {
        let report = test_runner().run(&ReservingConfig::default());
        let dir = std::env::temp_dir().join(format!("reserving_export_{}", std::process::id()));
        let paths = report.export_to_dir(&dir, b',', d(2024, 1, 31)).unwrap();

        assert_eq!(paths.len(), 4);
        assert!(paths[0].ends_with("triangle_paid_gross_20240131.csv"));
        let triangle = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(triangle.starts_with("period,0,1,2"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_batch_matches_sequential() {
        let runner = test_runner();
        let configs: Vec<ReservingConfig> = [Periodicity::Month, Periodicity::Quarter, Periodicity::Year]
            .iter()
            .map(|p| ReservingConfig::default().with_periodicity(*p))
            .chain(std::iter::once(
                ReservingConfig::default().with_triangle_type(TriangleType::Frequency),
            ))
            .collect();

        let batch = runner.run_batch(&configs);
        assert_eq!(batch.len(), configs.len());
        for (report, config) in batch.iter().zip(&configs) {
            let single = runner.run(config);
            assert_eq!(report.cache_key, single.cache_key);
            assert_eq!(report.ultimate.rows.len(), single.ultimate.rows.len());
        }
        // Every claim falls into a single year
        assert_eq!(batch[2].triangle.num_periods(), 1);
    }

    #[test]
    fn test_filter_options_and_range() {
        let runner = test_runner();
        assert_eq!(runner.filter_options(None, None, None).lines, vec!["Auto"]);
        let range = runner.dataset_range().unwrap();
        assert_eq!(range.first_occurrence, d(2023, 1, 3));
        assert_eq!(range.last_registration, d(2023, 3, 10));
    }
}
