//! Delimited-text export of triangles, factors and ultimate tables

use chrono::NaiveDate;
use csv::WriterBuilder;
use std::io::Write;

use crate::config::{TriangleType, ValueType};
use crate::development::DevelopmentFactors;
use crate::error::Result;
use crate::triangle::Triangle;
use crate::ultimate::UltimateLossTable;

/// File name for an exported triangle, e.g. `triangle_paid_gross_20240131.csv`
pub fn export_file_name(triangle_type: TriangleType, value_type: ValueType, date: NaiveDate) -> String {
    format!(
        "triangle_{}_{}_{}.csv",
        triangle_type,
        value_type,
        date.format("%Y%m%d")
    )
}

/// Missing and NaN values are written as empty fields
fn num(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => String::new(),
    }
}

fn period(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Write the triangle with one row per origin and one column per lag
pub fn write_triangle<W: Write>(triangle: &Triangle, writer: W, delimiter: u8) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(writer);

    let mut header = vec!["period".to_string()];
    header.extend(triangle.lags().iter().map(|lag| lag.to_string()));
    wtr.write_record(&header)?;

    for (origin, row) in triangle.origins().iter().zip(triangle.rows()) {
        let mut record = vec![period(origin)];
        record.extend(row.iter().map(|cell| num(cell.value())));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the per-origin individual factors
pub fn write_individual_factors<W: Write>(factors: &DevelopmentFactors, writer: W, delimiter: u8) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(writer);

    let mut header = vec!["period".to_string()];
    header.extend(factors.lags.iter().map(|lag| format!("factor_{}", lag)));
    wtr.write_record(&header)?;

    for (origin, row) in factors.origins.iter().zip(&factors.individual) {
        let mut record = vec![period(origin)];
        record.extend(row.iter().map(|f| num(*f)));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the per-lag factor statistics, one row per lag
pub fn write_factor_statistics<W: Write>(factors: &DevelopmentFactors, writer: W, delimiter: u8) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(writer);

    wtr.write_record([
        "lag",
        "average_factor",
        "cumulative_factor",
        "count",
        "min",
        "max",
        "std_dev",
    ])?;

    for stats in &factors.statistics {
        wtr.write_record(&[
            stats.lag.to_string(),
            num(Some(stats.average_factor)),
            num(Some(stats.cumulative_factor)),
            stats.count.to_string(),
            num(Some(stats.min)),
            num(Some(stats.max)),
            num(Some(stats.std_dev)),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the ultimate table, TOTAL first
pub fn write_ultimate<W: Write>(table: &UltimateLossTable, writer: W, delimiter: u8) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    let with_indicator = table.rows.iter().any(|r| r.indicator.is_some());

    let mut header = vec![
        "period",
        "method",
        "exposure",
        "initial_value",
        "current_value",
        "ultimate",
        "ibnr",
        "development_factor",
        "loss_ratio",
    ];
    if with_indicator {
        header.push("indicator");
    }
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![
            row.label.to_string(),
            row.method.to_string(),
            num(Some(row.exposure)),
            num(Some(row.initial_value)),
            num(Some(row.current_value)),
            num(Some(row.ultimate)),
            num(Some(row.ibnr)),
            num(Some(row.development_factor)),
            num(Some(row.loss_ratio)),
        ];
        if with_indicator {
            record.push(num(row.indicator));
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MethodSelector;
    use crate::period::Periodicity;
    use crate::ultimate::{estimate_ultimate, ExposureByPeriod};

    fn triangle() -> Triangle {
        let origins = vec![
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
        ];
        Triangle::from_cumulative(
            Periodicity::Month,
            origins,
            vec![0, 1],
            vec![vec![Some(10.0), Some(0.0)], vec![Some(5.5), None]],
        )
    }

    fn written<F: FnOnce(&mut Vec<u8>) -> Result<()>>(f: F) -> String {
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            export_file_name(TriangleType::Severity, ValueType::Retained, date),
            "triangle_severity_retained_20240131.csv"
        );
    }

    #[test]
    fn test_write_triangle_absent_is_empty_field() {
        let out = written(|buf| write_triangle(&triangle(), buf, b';'));
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "period;0;1");
        // Zero stays distinct from absent
        assert_eq!(lines[1], "2023-01-01;10;0");
        assert_eq!(lines[2], "2023-02-01;5.5;");
    }

    #[test]
    fn test_write_factor_tables() {
        let factors = DevelopmentFactors::estimate(&triangle());
        let individual = written(|buf| write_individual_factors(&factors, buf, b','));
        assert_eq!(individual.lines().next(), Some("period,factor_0"));
        assert_eq!(individual.lines().nth(1), Some("2023-01-01,0"));

        let stats = written(|buf| write_factor_statistics(&factors, buf, b','));
        assert!(stats.starts_with("lag,average_factor,cumulative_factor,count,min,max,std_dev"));
        assert_eq!(stats.lines().count(), 2);
    }

    #[test]
    fn test_write_ultimate_total_first() {
        let tri = triangle();
        let factors = DevelopmentFactors::estimate(&tri);
        let table = estimate_ultimate(
            &tri,
            &factors,
            &ExposureByPeriod::default(),
            MethodSelector::ChainLadder,
            TriangleType::Paid,
        );
        let out = written(|buf| write_ultimate(&table, buf, b'\t'));
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("period\tmethod"));
        assert!(!lines[0].contains("indicator"));
        assert!(lines[1].starts_with("TOTAL\tcombined"));
        assert!(lines[2].starts_with("2023-02-01\tchain_ladder"));
    }
}
