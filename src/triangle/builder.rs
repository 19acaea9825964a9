//! Aggregate a prepared frame into a cumulative triangle
//!
//! The value column is resolved once per build through an ordered fallback
//! chain: the requested column, then the generic value column, then a severity
//! rebuilt from payment and frequency (severity triangles only), then the
//! first numeric column the frame carries. When nothing resolves the builder
//! returns an empty triangle that records why.

use chrono::NaiveDate;
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;

use super::frame::{ClaimFrame, FrameRow, ValueColumn};
use super::matrix::Triangle;
use crate::config::{TriangleType, ValueType};

/// Outcome of the value-column fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnResolution {
    /// The requested column was present
    Direct(ValueColumn),
    /// The generic value column stood in for the requested one
    Generic,
    /// Severity rebuilt as `payment / frequency`
    ReconstructedSeverity { payment: ValueColumn },
    /// First column carried by the frame
    FirstAvailable(ValueColumn),
}

impl ColumnResolution {
    /// Value of the resolved column for one row
    fn extract(&self, frame: &ClaimFrame, row: &FrameRow) -> Option<f64> {
        match self {
            ColumnResolution::Direct(column) | ColumnResolution::FirstAvailable(column) => {
                frame.value(row, *column)
            }
            ColumnResolution::Generic => frame.value(row, ValueColumn::Value),
            ColumnResolution::ReconstructedSeverity { payment } => {
                let frequency = frame.value(row, ValueColumn::Frequency)?;
                if frequency > 0.0 {
                    frame.value(row, *payment).map(|p| p / frequency)
                } else {
                    None
                }
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ColumnResolution::Direct(column) => column.to_string(),
            ColumnResolution::Generic => ValueColumn::Value.to_string(),
            ColumnResolution::ReconstructedSeverity { payment } => {
                format!("{} / {}", payment, ValueColumn::Frequency)
            }
            ColumnResolution::FirstAvailable(column) => format!("{} (fallback)", column),
        }
    }
}

/// Walk the fallback chain for a requested column
pub fn resolve_value_column(
    frame: &ClaimFrame,
    triangle_type: TriangleType,
    value_type: ValueType,
) -> Result<ColumnResolution, String> {
    let requested = ValueColumn::requested(triangle_type, value_type);
    if frame.has_column(requested) {
        return Ok(ColumnResolution::Direct(requested));
    }
    if frame.has_column(ValueColumn::Value) {
        return Ok(ColumnResolution::Generic);
    }
    if triangle_type == TriangleType::Severity {
        let payment = ValueColumn::payment(value_type);
        if frame.has_column(payment) && frame.has_column(ValueColumn::Frequency) {
            return Ok(ColumnResolution::ReconstructedSeverity { payment });
        }
    }
    if let Some(first) = frame.columns().first() {
        return Ok(ColumnResolution::FirstAvailable(*first));
    }
    Err(format!("no numeric column available for {}", requested))
}

/// Aggregate, cumulate and mask a frame into a triangle
pub fn build_triangle(frame: &ClaimFrame, triangle_type: TriangleType, value_type: ValueType) -> Triangle {
    let periodicity = frame.periodicity;
    if frame.is_empty() {
        debug!("No claim rows to aggregate, returning empty triangle");
        return Triangle::empty(periodicity);
    }

    let resolution = match resolve_value_column(frame, triangle_type, value_type) {
        Ok(resolution) => resolution,
        Err(reason) => {
            warn!("Cannot build {} triangle: {}", triangle_type, reason);
            return Triangle::failed(periodicity, reason);
        }
    };
    if !matches!(resolution, ColumnResolution::Direct(_)) {
        warn!("Building {} triangle from {}", triangle_type, resolution.describe());
    }

    let values: Vec<(&FrameRow, f64)> = frame
        .rows()
        .iter()
        .filter_map(|row| resolution.extract(frame, row).map(|v| (row, v)))
        .filter(|(_, v)| v.is_finite())
        .collect();
    if values.is_empty() {
        return Triangle::empty(periodicity);
    }

    let mut incremental: HashMap<(NaiveDate, u32), f64> = HashMap::new();
    for (row, value) in &values {
        *incremental.entry((row.origin_period, row.lag)).or_insert(0.0) += value;
    }

    let mut triangle = Triangle::from_incremental(periodicity, &incremental);
    debug!(
        "Triangle {}x{} from {} rows ({})",
        triangle.num_periods(),
        triangle.num_lags(),
        values.len(),
        resolution.describe()
    );
    triangle.source = Some(resolution);
    triangle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Periodicity;
    use crate::triangle::Cell;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    /// Rows of (origin, lag, gross, freq) with every column populated
    fn full_frame(rows: &[(NaiveDate, u32, f64, f64)]) -> ClaimFrame {
        let rows = rows
            .iter()
            .map(|(origin, lag, gross, freq)| FrameRow {
                occurrence_date: *origin,
                origin_period: *origin,
                registration_period: *origin,
                lag: *lag,
                values: vec![*gross, gross * 0.5, gross / freq, gross * 0.5 / freq, *freq, *gross],
            })
            .collect();
        ClaimFrame::from_parts(Periodicity::Month, ValueColumn::ALL.to_vec(), rows)
    }

    fn scenario_frame() -> ClaimFrame {
        full_frame(&[
            (d(2023, 1), 0, 100.0, 1.0),
            (d(2023, 1), 1, 50.0, 1.0),
            (d(2023, 1), 2, 30.0, 1.0),
            (d(2023, 2), 0, 120.0, 1.0),
            (d(2023, 2), 1, 50.0, 1.0),
            (d(2023, 3), 0, 90.0, 1.0),
            // Registered after the as-of diagonal; masked out
            (d(2023, 3), 2, 10.0, 1.0),
        ])
    }

    #[test]
    fn test_build_paid_triangle() {
        let tri = build_triangle(&scenario_frame(), TriangleType::Paid, ValueType::Gross);

        assert_eq!(tri.num_periods(), 3);
        assert_eq!(tri.lags(), &[0, 1, 2]);
        assert_eq!(tri.value(0, 0), Some(100.0));
        assert_eq!(tri.value(0, 1), Some(150.0));
        assert_eq!(tri.value(0, 2), Some(180.0));
        assert_eq!(tri.value(1, 1), Some(170.0));
        assert_eq!(tri.cell(1, 2), Cell::Absent);
        assert_eq!(tri.value(2, 0), Some(90.0));
        assert_eq!(tri.cell(2, 2), Cell::Absent);
        assert_eq!(tri.source, Some(ColumnResolution::Direct(ValueColumn::GrossPayment)));
    }

    #[test]
    fn test_cumulation_is_monotonic() {
        let tri = build_triangle(&scenario_frame(), TriangleType::Paid, ValueType::Retained);
        for row in tri.rows() {
            let observed: Vec<f64> = row.iter().filter_map(|c| c.value()).collect();
            assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_empty_frame_gives_empty_triangle() {
        let tri = build_triangle(&ClaimFrame::empty(Periodicity::Month), TriangleType::Paid, ValueType::Gross);
        assert!(tri.is_empty());
        assert!(tri.failure.is_none());
    }

    #[test]
    fn test_fallback_to_generic_value() {
        let frame = scenario_frame().select_columns(&[ValueColumn::Frequency, ValueColumn::Value]);
        let resolution = resolve_value_column(&frame, TriangleType::Paid, ValueType::Gross).unwrap();
        assert_eq!(resolution, ColumnResolution::Generic);
    }

    #[test]
    fn test_fallback_rebuilds_severity() {
        let frame = full_frame(&[(d(2023, 1), 0, 300.0, 3.0)])
            .select_columns(&[ValueColumn::Frequency, ValueColumn::GrossPayment]);
        let resolution = resolve_value_column(&frame, TriangleType::Severity, ValueType::Gross).unwrap();
        assert_eq!(
            resolution,
            ColumnResolution::ReconstructedSeverity {
                payment: ValueColumn::GrossPayment
            }
        );

        let tri = build_triangle(&frame, TriangleType::Severity, ValueType::Gross);
        assert_eq!(tri.value(0, 0), Some(100.0));
    }

    #[test]
    fn test_fallback_to_first_column() {
        let frame = scenario_frame().select_columns(&[ValueColumn::RetainedSeverity, ValueColumn::Frequency]);
        // Paid triangles never rebuild from severity parts
        let resolution = resolve_value_column(&frame, TriangleType::Paid, ValueType::Gross).unwrap();
        assert_eq!(resolution, ColumnResolution::FirstAvailable(ValueColumn::RetainedSeverity));
    }

    #[test]
    fn test_no_columns_gives_failed_triangle() {
        let frame = scenario_frame().select_columns(&[]);
        assert!(resolve_value_column(&frame, TriangleType::Frequency, ValueType::Gross).is_err());

        let tri = build_triangle(&frame, TriangleType::Frequency, ValueType::Gross);
        assert!(tri.is_empty());
        assert!(tri.failure.is_some());
    }

    #[test]
    fn test_short_rows_skip_rebuilt_severity() {
        let row = FrameRow {
            occurrence_date: d(2023, 1),
            origin_period: d(2023, 1),
            registration_period: d(2023, 1),
            lag: 0,
            values: vec![300.0],
        };
        let frame = ClaimFrame::from_parts(
            Periodicity::Month,
            vec![ValueColumn::GrossPayment, ValueColumn::Frequency],
            vec![row],
        );

        let resolution = resolve_value_column(&frame, TriangleType::Severity, ValueType::Gross).unwrap();
        assert!(matches!(resolution, ColumnResolution::ReconstructedSeverity { .. }));
        // The row has no frequency, so nothing aggregates
        let tri = build_triangle(&frame, TriangleType::Severity, ValueType::Gross);
        assert!(tri.is_empty());
        assert!(tri.failure.is_none());
    }
}
