//! Load claims (siniestros.txt) and exposures (expuestos.txt)
//!
//! Both files are tab-delimited with a header row. Column names follow the
//! source extract, so they are mapped onto typed records here and nowhere else.

use super::{ClaimRecord, Dimensions, ExposureRecord};
use crate::error::{ReservingError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use log::info;
use std::io::Read;
use std::path::Path;

/// Default directory holding the claim and exposure extracts
pub const DEFAULT_DATA_PATH: &str = "data";

pub const CLAIMS_FILE: &str = "siniestros.txt";
pub const EXPOSURES_FILE: &str = "expuestos.txt";

/// Raw row matching siniestros.txt columns
#[derive(Debug, serde::Deserialize)]
struct ClaimRow {
    #[serde(rename = "Fecha_Siniestro")]
    occurrence_date: String,
    #[serde(rename = "Fecha_Registro")]
    registration_date: String,
    #[serde(rename = "Pago_Bruto")]
    gross_amount: f64,
    #[serde(rename = "Pago_Retenido")]
    retained_amount: f64,
    #[serde(rename = "Ramo_Desc")]
    line: String,
    #[serde(rename = "Apertura_Canal_Desc")]
    channel: String,
    #[serde(rename = "Apertura_Amparo_Desc")]
    coverage: String,
    #[serde(rename = "Agrupacion_Reservas")]
    reserve_group: String,
}

impl ClaimRow {
    fn into_record(self) -> Result<ClaimRecord> {
        Ok(ClaimRecord {
            occurrence_date: parse_date("Fecha_Siniestro", &self.occurrence_date)?,
            registration_date: parse_date("Fecha_Registro", &self.registration_date)?,
            gross_amount: self.gross_amount,
            retained_amount: self.retained_amount,
            dimensions: Dimensions {
                line: self.line,
                channel: self.channel,
                coverage: self.coverage,
                reserve_group: Some(self.reserve_group),
            },
        })
    }
}

/// Raw row matching expuestos.txt columns
#[derive(Debug, serde::Deserialize)]
struct ExposureRow {
    #[serde(rename = "Fecha_Registro")]
    period_date: String,
    #[serde(rename = "Expuestos")]
    exposure: f64,
    #[serde(rename = "Ramo_Desc", default)]
    line: String,
    #[serde(rename = "Apertura_Canal_Desc", default)]
    channel: String,
    #[serde(rename = "Apertura_Amparo_Desc", default)]
    coverage: String,
    #[serde(rename = "Agrupacion_Reservas", default)]
    reserve_group: Option<String>,
}

impl ExposureRow {
    fn into_record(self) -> Result<ExposureRecord> {
        Ok(ExposureRecord {
            period_date: parse_date("Fecha_Registro", &self.period_date)?,
            exposure: self.exposure,
            dimensions: Dimensions {
                line: self.line,
                channel: self.channel,
                coverage: self.coverage,
                reserve_group: self.reserve_group.filter(|g| !g.is_empty()),
            },
        })
    }
}

/// Accepts ISO dates, ISO timestamps and day-first dates
fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate> {
    let value = raw.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .map_err(|_| ReservingError::Parse {
            field,
            value: value.to_string(),
        })
}

fn tab_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Load claims from any reader (e.g., string buffer, network stream)
pub fn load_claims_from_reader<R: Read>(reader: R) -> Result<Vec<ClaimRecord>> {
    let mut csv_reader = tab_reader(reader);
    let mut claims = Vec::new();

    for result in csv_reader.deserialize() {
        let row: ClaimRow = result?;
        claims.push(row.into_record()?);
    }

    Ok(claims)
}

/// Load exposures from any reader
pub fn load_exposures_from_reader<R: Read>(reader: R) -> Result<Vec<ExposureRecord>> {
    let mut csv_reader = tab_reader(reader);
    let mut exposures = Vec::new();

    for result in csv_reader.deserialize() {
        let row: ExposureRow = result?;
        exposures.push(row.into_record()?);
    }

    Ok(exposures)
}

/// Load all claims from a tab-delimited file
pub fn load_claims<P: AsRef<Path>>(path: P) -> Result<Vec<ClaimRecord>> {
    let path = path.as_ref();
    let claims = load_claims_from_reader(std::fs::File::open(path)?)?;
    info!("Loaded {} claim records from {}", claims.len(), path.display());
    Ok(claims)
}

/// Load all exposures from a tab-delimited file
pub fn load_exposures<P: AsRef<Path>>(path: P) -> Result<Vec<ExposureRecord>> {
    let path = path.as_ref();
    let exposures = load_exposures_from_reader(std::fs::File::open(path)?)?;
    info!("Loaded {} exposure records from {}", exposures.len(), path.display());
    Ok(exposures)
}

/// Load both extracts from a data directory
///
/// A missing exposure file is not fatal: the estimator falls back to its
/// default exposure for every period.
pub fn load_snapshot_from(dir: &Path) -> Result<(Vec<ClaimRecord>, Vec<ExposureRecord>)> {
    let claims = load_claims(dir.join(CLAIMS_FILE))?;
    let exposure_path = dir.join(EXPOSURES_FILE);
    let exposures = if exposure_path.exists() {
        load_exposures(exposure_path)?
    } else {
        log::warn!("No exposure file at {}, using default exposure", exposure_path.display());
        Vec::new()
    };
    Ok((claims, exposures))
}
