//! Prepared claim frame: filtered, bucketed and lagged records with their
//! candidate value columns

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::claims::ClaimRecord;
use crate::config::{ReservingConfig, TriangleType, ValueType};
use crate::period::Periodicity;

/// Numeric columns a triangle can aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueColumn {
    GrossPayment,
    RetainedPayment,
    GrossSeverity,
    RetainedSeverity,
    Frequency,
    /// Generic value already selected for the request
    Value,
}

impl ValueColumn {
    /// Column order of a fully prepared frame
    pub const ALL: [ValueColumn; 6] = [
        ValueColumn::GrossPayment,
        ValueColumn::RetainedPayment,
        ValueColumn::GrossSeverity,
        ValueColumn::RetainedSeverity,
        ValueColumn::Frequency,
        ValueColumn::Value,
    ];

    /// Column holding the measure requested by a triangle/value type pair
    pub fn requested(triangle_type: TriangleType, value_type: ValueType) -> Self {
        match (triangle_type, value_type) {
            (TriangleType::Paid, ValueType::Gross) => ValueColumn::GrossPayment,
            (TriangleType::Paid, ValueType::Retained) => ValueColumn::RetainedPayment,
            (TriangleType::Severity, ValueType::Gross) => ValueColumn::GrossSeverity,
            (TriangleType::Severity, ValueType::Retained) => ValueColumn::RetainedSeverity,
            (TriangleType::Frequency, _) => ValueColumn::Frequency,
        }
    }

    /// Payment column for a value type
    pub fn payment(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Gross => ValueColumn::GrossPayment,
            ValueType::Retained => ValueColumn::RetainedPayment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueColumn::GrossPayment => "gross_payment",
            ValueColumn::RetainedPayment => "retained_payment",
            ValueColumn::GrossSeverity => "gross_severity",
            ValueColumn::RetainedSeverity => "retained_severity",
            ValueColumn::Frequency => "frequency",
            ValueColumn::Value => "value",
        }
    }
}

impl fmt::Display for ValueColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prepared claim record
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub occurrence_date: NaiveDate,
    /// Start of the origin period
    pub origin_period: NaiveDate,
    /// Start of the registration period
    pub registration_period: NaiveDate,
    /// Development lag, clamped at zero
    pub lag: u32,
    /// Values aligned with [`ClaimFrame::columns`]
    pub values: Vec<f64>,
}

/// Typed stand-in for the prepared record table
///
/// Frames normally carry every [`ValueColumn`]; frames assembled by callers
/// may carry a subset, which is what the builder's fallback chain resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimFrame {
    pub periodicity: Periodicity,
    columns: Vec<ValueColumn>,
    rows: Vec<FrameRow>,
}

impl ClaimFrame {
    /// Assemble a frame from rows whose values follow `columns`
    ///
    /// A row shorter than `columns` reads as missing in the columns it lacks.
    pub fn from_parts(periodicity: Periodicity, columns: Vec<ValueColumn>, rows: Vec<FrameRow>) -> Self {
        Self { periodicity, columns, rows }
    }

    pub fn empty(periodicity: Periodicity) -> Self {
        Self::from_parts(periodicity, ValueColumn::ALL.to_vec(), Vec::new())
    }

    pub fn columns(&self) -> &[ValueColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[FrameRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: ValueColumn) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    pub fn has_column(&self, column: ValueColumn) -> bool {
        self.column_index(column).is_some()
    }

    /// Value of `column` in `row`, if the frame carries that column and the row fills it
    pub fn value(&self, row: &FrameRow, column: ValueColumn) -> Option<f64> {
        self.column_index(column).and_then(|idx| row.values.get(idx).copied())
    }

    /// Frame restricted to the given columns, in the given order
    pub fn select_columns(&self, columns: &[ValueColumn]) -> ClaimFrame {
        let kept: Vec<(ValueColumn, usize)> = columns
            .iter()
            .filter_map(|c| self.column_index(*c).map(|idx| (*c, idx)))
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| FrameRow {
                values: kept
                    .iter()
                    .map(|(_, idx)| row.values.get(*idx).copied().unwrap_or(f64::NAN))
                    .collect(),
                ..row.clone()
            })
            .collect();

        ClaimFrame {
            periodicity: self.periodicity,
            columns: kept.into_iter().map(|(c, _)| c).collect(),
            rows,
        }
    }
}

/// Prepared frame plus data-quality counters
#[derive(Debug, Clone)]
pub struct PreparedClaims {
    pub frame: ClaimFrame,
    /// Claims excluded by the category or date filters
    pub filtered_out: usize,
    /// Claims dropped because the requested measure was not positive
    pub non_positive_dropped: usize,
    /// Claims registered in a period before their occurrence (lag clamped to 0)
    pub negative_lags_clamped: usize,
}

/// Filter, enrich, bucket and lag claim records for one request
///
/// Frequency is the number of retained claims sharing an occurrence date;
/// severity is the payment divided by that frequency.
pub fn prepare_claims(claims: &[ClaimRecord], config: &ReservingConfig) -> PreparedClaims {
    let periodicity = config.periodicity;
    let included: Vec<&ClaimRecord> = claims.iter().filter(|c| config.includes_claim(c)).collect();
    let filtered_out = claims.len() - included.len();
    debug!("{} of {} claims pass the filters", included.len(), claims.len());

    let mut per_date: HashMap<NaiveDate, usize> = HashMap::new();
    for claim in &included {
        *per_date.entry(claim.occurrence_date).or_insert(0) += 1;
    }

    let requested = ValueColumn::requested(config.triangle_type, config.value_type);
    let mut rows = Vec::with_capacity(included.len());
    let mut non_positive_dropped = 0;
    let mut negative_lags_clamped = 0;

    for claim in included {
        let frequency = per_date.get(&claim.occurrence_date).copied().unwrap_or(1) as f64;
        let mut values = vec![
            claim.gross_amount,
            claim.retained_amount,
            claim.gross_amount / frequency,
            claim.retained_amount / frequency,
            frequency,
            0.0,
        ];
        let selected = match requested {
            ValueColumn::GrossPayment => values[0],
            ValueColumn::RetainedPayment => values[1],
            ValueColumn::GrossSeverity => values[2],
            ValueColumn::RetainedSeverity => values[3],
            ValueColumn::Frequency | ValueColumn::Value => values[4],
        };
        if selected.is_nan() || selected <= 0.0 {
            non_positive_dropped += 1;
            continue;
        }
        values[5] = selected;

        if periodicity.raw_lag(claim.occurrence_date, claim.registration_date) < 0 {
            negative_lags_clamped += 1;
        }

        rows.push(FrameRow {
            occurrence_date: claim.occurrence_date,
            origin_period: periodicity.bucket(claim.occurrence_date),
            registration_period: periodicity.bucket(claim.registration_date),
            lag: periodicity.development_lag(claim.occurrence_date, claim.registration_date),
            values,
        });
    }

    if negative_lags_clamped > 0 {
        warn!(
            "{} claims registered before their occurrence period; development lag clamped to 0",
            negative_lags_clamped
        );
    }
    info!(
        "Prepared {} claim rows ({} filtered out, {} without {} value)",
        rows.len(),
        filtered_out,
        non_positive_dropped,
        requested
    );

    PreparedClaims {
        frame: ClaimFrame::from_parts(periodicity, ValueColumn::ALL.to_vec(), rows),
        filtered_out,
        non_positive_dropped,
        negative_lags_clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Dimensions;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn claim(occ: NaiveDate, reg: NaiveDate, gross: f64, line: &str) -> ClaimRecord {
        ClaimRecord::new(occ, reg, gross, gross * 0.8, Dimensions::new(line, "Direct", "Basic", Some("G1")))
    }

    #[test]
    fn test_frequency_and_severity_by_occurrence_date() {
        let claims = vec![
            claim(d(2023, 1, 5), d(2023, 1, 20), 100.0, "Auto"),
            claim(d(2023, 1, 5), d(2023, 2, 20), 300.0, "Auto"),
            claim(d(2023, 1, 9), d(2023, 1, 20), 50.0, "Auto"),
        ];
        let config = ReservingConfig::default().with_triangle_type(TriangleType::Severity);
        let prepared = prepare_claims(&claims, &config);
        let frame = &prepared.frame;

        assert_eq!(frame.len(), 3);
        let first = &frame.rows()[0];
        assert_relative_eq!(frame.value(first, ValueColumn::Frequency).unwrap(), 2.0);
        assert_relative_eq!(frame.value(first, ValueColumn::GrossSeverity).unwrap(), 50.0);
        assert_relative_eq!(frame.value(first, ValueColumn::RetainedSeverity).unwrap(), 40.0);
        assert_relative_eq!(frame.value(first, ValueColumn::Value).unwrap(), 50.0);
        assert_eq!(frame.rows()[1].lag, 1);
        assert_relative_eq!(frame.value(&frame.rows()[2], ValueColumn::Frequency).unwrap(), 1.0);
    }

    #[test]
    fn test_filters_and_non_positive_values() {
        let claims = vec![
            claim(d(2023, 1, 5), d(2023, 1, 20), 100.0, "Auto"),
            claim(d(2023, 1, 6), d(2023, 1, 20), 0.0, "Auto"),
            claim(d(2023, 1, 7), d(2023, 1, 20), 75.0, "Home"),
        ];
        let mut config = ReservingConfig::default();
        config.filters.line = Some("Auto".to_string());

        let prepared = prepare_claims(&claims, &config);
        assert_eq!(prepared.filtered_out, 1);
        assert_eq!(prepared.non_positive_dropped, 1);
        assert_eq!(prepared.frame.len(), 1);
    }

    #[test]
    fn test_negative_lag_counted_and_clamped() {
        let claims = vec![claim(d(2023, 3, 5), d(2023, 1, 20), 100.0, "Auto")];
        let prepared = prepare_claims(&claims, &ReservingConfig::default());
        assert_eq!(prepared.negative_lags_clamped, 1);
        assert_eq!(prepared.frame.rows()[0].lag, 0);
    }

    #[test]
    fn test_quarter_buckets() {
        let claims = vec![claim(d(2023, 2, 14), d(2023, 8, 1), 10.0, "Auto")];
        let config = ReservingConfig::default().with_periodicity(Periodicity::Quarter);
        let prepared = prepare_claims(&claims, &config);
        let row = &prepared.frame.rows()[0];
        assert_eq!(row.origin_period, d(2023, 1, 1));
        assert_eq!(row.registration_period, d(2023, 7, 1));
        assert_eq!(row.lag, 2);
    }

    #[test]
    fn test_select_columns() {
        let claims = vec![claim(d(2023, 1, 5), d(2023, 1, 20), 100.0, "Auto")];
        let prepared = prepare_claims(&claims, &ReservingConfig::default());
        let reduced = prepared
            .frame
            .select_columns(&[ValueColumn::Frequency, ValueColumn::GrossPayment]);

        assert_eq!(reduced.columns(), &[ValueColumn::Frequency, ValueColumn::GrossPayment]);
        assert!(!reduced.has_column(ValueColumn::Value));
        assert_relative_eq!(reduced.value(&reduced.rows()[0], ValueColumn::GrossPayment).unwrap(), 100.0);
    }

    #[test]
    fn test_short_row_reads_as_missing() {
        let row = FrameRow {
            occurrence_date: d(2023, 1, 5),
            origin_period: d(2023, 1, 1),
            registration_period: d(2023, 1, 1),
            lag: 0,
            values: vec![100.0],
        };
        let frame = ClaimFrame::from_parts(
            Periodicity::Month,
            vec![ValueColumn::GrossPayment, ValueColumn::Frequency],
            vec![row],
        );

        let row = &frame.rows()[0];
        assert_eq!(frame.value(row, ValueColumn::GrossPayment), Some(100.0));
        assert_eq!(frame.value(row, ValueColumn::Frequency), None);

        let reduced = frame.select_columns(&[ValueColumn::Frequency]);
        assert!(reduced.value(&reduced.rows()[0], ValueColumn::Frequency).unwrap().is_nan());
    }
}
