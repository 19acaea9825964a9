//! Exposure per origin period

use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

use crate::claims::ExposureRecord;
use crate::config::ReservingConfig;

/// Exposure assumed for a period with no positive recorded exposure
pub const DEFAULT_EXPOSURE: f64 = 1000.0;

/// Exposure summed per period start
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExposureByPeriod {
    totals: BTreeMap<NaiveDate, f64>,
}

impl ExposureByPeriod {
    /// Filter exposures with the request's category filters and sum them per period
    pub fn aggregate(exposures: &[ExposureRecord], config: &ReservingConfig) -> Self {
        let mut totals = BTreeMap::new();
        for record in exposures.iter().filter(|e| config.includes_exposure(e)) {
            *totals.entry(config.periodicity.bucket(record.period_date)).or_insert(0.0) += record.exposure;
        }
        debug!("Exposure aggregated into {} periods", totals.len());
        Self { totals }
    }

    /// Build from already-aggregated totals
    pub fn from_totals<I: IntoIterator<Item = (NaiveDate, f64)>>(totals: I) -> Self {
        Self {
            totals: totals.into_iter().collect(),
        }
    }

    /// Recorded exposure for a period, if any
    pub fn recorded(&self, period: NaiveDate) -> Option<f64> {
        self.totals.get(&period).copied()
    }

    /// Exposure used by the estimator: recorded when positive, else the default
    pub fn for_period(&self, period: NaiveDate) -> f64 {
        match self.recorded(period) {
            Some(value) if value > 0.0 => value,
            _ => DEFAULT_EXPOSURE,
        }
    }

    /// No exposure record matched the request
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}
