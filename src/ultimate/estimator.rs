//! Ultimate loss projection per origin period
//!
//! Chain-ladder develops the latest observed value with the factor-to-ultimate
//! of its lag. Bornhuetter-Ferguson adds the expected unreported share of an
//! a-priori loss estimate instead. A TOTAL row closes the table.

use chrono::NaiveDate;
use log::{debug, info};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use super::exposure::ExposureByPeriod;
use crate::config::{MethodSelector, TriangleType};
use crate::development::DevelopmentFactors;
use crate::period::months_before;
use crate::triangle::Triangle;

/// A-priori loss ratio used when no historical ratio can be derived
pub const DEFAULT_A_PRIORI_RATIO: f64 = 0.01;

/// Origins starting within this many months of the latest origin are recent
pub const RECENT_WINDOW_MONTHS: u32 = 12;

/// Row label; `Total` sorts above every period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PeriodLabel {
    Period(NaiveDate),
    Total,
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodLabel::Period(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            PeriodLabel::Total => f.write_str("TOTAL"),
        }
    }
}

/// Projection applied to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectionMethod {
    ChainLadder,
    BornhuetterFerguson,
    /// Label of the TOTAL row
    Combined,
}

impl ProjectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionMethod::ChainLadder => "chain_ladder",
            ProjectionMethod::BornhuetterFerguson => "bornhuetter_ferguson",
            ProjectionMethod::Combined => "combined",
        }
    }
}

impl fmt::Display for ProjectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projected ultimate for one origin period, or the TOTAL
#[derive(Debug, Clone, Serialize)]
pub struct UltimateLossRow {
    pub label: PeriodLabel,
    pub method: ProjectionMethod,
    pub exposure: f64,
    /// Value at the first lag
    pub initial_value: f64,
    /// Value at the latest observed lag; NaN when nothing was observed
    pub current_value: f64,
    pub ultimate: f64,
    pub ibnr: f64,
    /// `ultimate / current`; NaN unless current is positive
    pub development_factor: f64,
    /// `ultimate / exposure`; NaN unless exposure is positive
    pub loss_ratio: f64,
    /// Claims per hundred exposed, frequency triangles only
    pub indicator: Option<f64>,
}

impl UltimateLossRow {
    pub fn is_total(&self) -> bool {
        self.label == PeriodLabel::Total
    }
}

/// Result table of the ultimate-loss estimator
#[derive(Debug, Clone, Serialize)]
pub struct UltimateLossTable {
    /// TOTAL first, then periods newest to oldest
    pub rows: Vec<UltimateLossRow>,
    pub a_priori_ratio: f64,
}

impl UltimateLossTable {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            a_priori_ratio: DEFAULT_A_PRIORI_RATIO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> Option<&UltimateLossRow> {
        self.rows.iter().find(|r| r.is_total())
    }

    pub fn period_rows(&self) -> impl Iterator<Item = &UltimateLossRow> {
        self.rows.iter().filter(|r| !r.is_total())
    }

    pub fn row(&self, period: NaiveDate) -> Option<&UltimateLossRow> {
        self.rows.iter().find(|r| r.label == PeriodLabel::Period(period))
    }
}

/// Origins whose start is on or after the latest origin less the recent window
pub fn recent_flags(origins: &[NaiveDate]) -> Vec<bool> {
    match origins.iter().max() {
        Some(latest) => {
            let cutoff = months_before(*latest, RECENT_WINDOW_MONTHS);
            origins.iter().map(|o| *o >= cutoff).collect()
        }
        None => Vec::new(),
    }
}

/// Historical ratio of first-lag value to exposure over non-recent origins
///
/// Falls back to [`DEFAULT_A_PRIORI_RATIO`] when there is no non-recent origin
/// or their exposure sums to zero.
pub fn a_priori_loss_ratio(initial: &[f64], exposure: &[f64], recent: &[bool]) -> f64 {
    let mut value_sum = 0.0;
    let mut exposure_sum = 0.0;
    let mut any_historical = false;

    for ((value, exp), is_recent) in initial.iter().zip(exposure).zip(recent) {
        if !is_recent {
            any_historical = true;
            value_sum += value;
            exposure_sum += exp;
        }
    }

    if any_historical && exposure_sum > 0.0 {
        value_sum / exposure_sum
    } else {
        DEFAULT_A_PRIORI_RATIO
    }
}

/// Project ultimates for every origin of a triangle
pub fn estimate_ultimate(
    triangle: &Triangle,
    factors: &DevelopmentFactors,
    exposure: &ExposureByPeriod,
    method: MethodSelector,
    triangle_type: TriangleType,
) -> UltimateLossTable {
    if triangle.is_empty() {
        debug!("Empty triangle, no ultimate losses");
        return UltimateLossTable::empty();
    }

    let origins = triangle.origins();
    let recent = recent_flags(origins);
    let exposures: Vec<f64> = origins.iter().map(|o| exposure.for_period(*o)).collect();
    let initial: Vec<f64> = (0..origins.len())
        .map(|i| triangle.value(i, 0).unwrap_or(0.0))
        .collect();
    let ratio = a_priori_loss_ratio(&initial, &exposures, &recent);
    info!("A-priori loss ratio: {:.4}", ratio);

    let mut rows: Vec<UltimateLossRow> = origins
        .iter()
        .enumerate()
        .map(|(i, origin)| {
            let projection = match method {
                MethodSelector::Auto if recent[i] => ProjectionMethod::BornhuetterFerguson,
                MethodSelector::Auto | MethodSelector::ChainLadder => ProjectionMethod::ChainLadder,
                MethodSelector::BornhuetterFerguson => ProjectionMethod::BornhuetterFerguson,
            };

            let (current, ultimate) = match triangle.latest(i) {
                Some((position, current)) => {
                    (current, project(projection, current, position, exposures[i], ratio, factors))
                }
                None => (f64::NAN, 0.0),
            };

            derive_row(
                PeriodLabel::Period(*origin),
                projection,
                exposures[i],
                initial[i],
                current,
                ultimate,
                triangle_type,
            )
        })
        .collect();

    rows.push(total_row(&rows, triangle_type));
    rows.sort_by(|a, b| b.label.cmp(&a.label));

    UltimateLossTable {
        rows,
        a_priori_ratio: ratio,
    }
}

fn project(
    method: ProjectionMethod,
    current: f64,
    position: usize,
    exposure: f64,
    ratio: f64,
    factors: &DevelopmentFactors,
) -> f64 {
    let Some(cumulative) = factors.cumulative_at(position) else {
        // Already at the tail
        return current;
    };

    match method {
        ProjectionMethod::BornhuetterFerguson => {
            let unreported = if cumulative > 1.0 {
                exposure * ratio * (1.0 - 1.0 / cumulative)
            } else {
                0.0
            };
            current + unreported
        }
        _ => current * cumulative,
    }
}

fn ratio_or_nan(numerator: f64, denominator: f64) -> f64 {
    match denominator.partial_cmp(&0.0) {
        Some(Ordering::Greater) => numerator / denominator,
        _ => f64::NAN,
    }
}

fn derive_row(
    label: PeriodLabel,
    method: ProjectionMethod,
    exposure: f64,
    initial_value: f64,
    current_value: f64,
    ultimate: f64,
    triangle_type: TriangleType,
) -> UltimateLossRow {
    let loss_ratio = ratio_or_nan(ultimate, exposure);
    UltimateLossRow {
        label,
        method,
        exposure,
        initial_value,
        current_value,
        ultimate,
        ibnr: ultimate - current_value,
        development_factor: ratio_or_nan(ultimate, current_value),
        loss_ratio,
        indicator: (triangle_type == TriangleType::Frequency).then_some(loss_ratio * 100.0),
    }
}

fn total_row(rows: &[UltimateLossRow], triangle_type: TriangleType) -> UltimateLossRow {
    fn sum(rows: &[UltimateLossRow], field: impl Fn(&UltimateLossRow) -> f64) -> f64 {
        rows.iter().map(field).filter(|v| !v.is_nan()).sum()
    }

    let current = sum(rows, |r| r.current_value);
    let ultimate = sum(rows, |r| r.ultimate);
    let mut total = derive_row(
        PeriodLabel::Total,
        ProjectionMethod::Combined,
        sum(rows, |r| r.exposure),
        sum(rows, |r| r.initial_value),
        current,
        ultimate,
        triangle_type,
    );
    total.ibnr = sum(rows, |r| r.ibnr);
    total
}
