//! Claim and exposure records as supplied by the loader

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Categorical dimensions shared by claims and exposures
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Line of business
    pub line: String,

    /// Distribution channel
    pub channel: String,

    /// Coverage opened under the line
    pub coverage: String,

    /// Reserve grouping; exposures do not always carry one
    #[serde(default)]
    pub reserve_group: Option<String>,
}

impl Dimensions {
    pub fn new(line: &str, channel: &str, coverage: &str, reserve_group: Option<&str>) -> Self {
        Self {
            line: line.to_string(),
            channel: channel.to_string(),
            coverage: coverage.to_string(),
            reserve_group: reserve_group.map(str::to_string),
        }
    }
}

/// A single claim transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Date of loss occurrence
    pub occurrence_date: NaiveDate,

    /// Date the payment was registered
    pub registration_date: NaiveDate,

    /// Payment before reinsurance
    pub gross_amount: f64,

    /// Payment net of reinsurance
    pub retained_amount: f64,

    pub dimensions: Dimensions,
}

impl ClaimRecord {
    pub fn new(
        occurrence_date: NaiveDate,
        registration_date: NaiveDate,
        gross_amount: f64,
        retained_amount: f64,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            occurrence_date,
            registration_date,
            gross_amount,
            retained_amount,
            dimensions,
        }
    }
}

/// Exposure units recorded for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureRecord {
    /// Any date inside the exposure period
    pub period_date: NaiveDate,

    /// Number of exposed risks
    pub exposure: f64,

    pub dimensions: Dimensions,
}

impl ExposureRecord {
    pub fn new(period_date: NaiveDate, exposure: f64, dimensions: Dimensions) -> Self {
        Self {
            period_date,
            exposure,
            dimensions,
        }
    }
}

