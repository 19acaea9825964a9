//! Request configuration for a reserving run
//!
//! A [`ReservingConfig`] is the full parameter tuple of one request: selectors,
//! row filters and the projection method. It can be deserialized from JSON with
//! every field optional, and renders a canonical cache key.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::claims::{ClaimRecord, Dimensions, ExposureRecord};
use crate::error::{ReservingError, Result};
use crate::period::Periodicity;

/// What the triangle measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TriangleType {
    /// Paid amounts
    Paid,
    /// Payment per claim sharing the same occurrence date
    Severity,
    /// Claim counts
    Frequency,
}

impl TriangleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriangleType::Paid => "paid",
            TriangleType::Severity => "severity",
            TriangleType::Frequency => "frequency",
        }
    }
}

impl Default for TriangleType {
    fn default() -> Self {
        TriangleType::Paid
    }
}

impl fmt::Display for TriangleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriangleType {
    type Err = ReservingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paid" | "plata" => Ok(TriangleType::Paid),
            "severity" | "severidad" => Ok(TriangleType::Severity),
            "frequency" | "frecuencia" => Ok(TriangleType::Frequency),
            other => Err(ReservingError::configuration(format!(
                "unsupported triangle type: {}",
                other
            ))),
        }
    }
}

/// Payment basis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Before reinsurance
    Gross,
    /// Net of reinsurance
    Retained,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Gross => "gross",
            ValueType::Retained => "retained",
        }
    }
}

impl Default for ValueType {
    fn default() -> Self {
        ValueType::Gross
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = ReservingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gross" | "bruto" => Ok(ValueType::Gross),
            "retained" | "net" | "retenido" => Ok(ValueType::Retained),
            other => Err(ReservingError::configuration(format!(
                "unsupported value type: {}",
                other
            ))),
        }
    }
}

/// Projection rule for the ultimate-loss estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MethodSelector {
    /// Bornhuetter-Ferguson for recent origins, chain-ladder for the rest
    Auto,
    ChainLadder,
    BornhuetterFerguson,
}

impl MethodSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodSelector::Auto => "auto",
            MethodSelector::ChainLadder => "chain_ladder",
            MethodSelector::BornhuetterFerguson => "bornhuetter_ferguson",
        }
    }
}

impl Default for MethodSelector {
    fn default() -> Self {
        MethodSelector::Auto
    }
}

impl fmt::Display for MethodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodSelector {
    type Err = ReservingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(MethodSelector::Auto),
            "chain_ladder" | "cl" => Ok(MethodSelector::ChainLadder),
            "bornhuetter_ferguson" | "bf" => Ok(MethodSelector::BornhuetterFerguson),
            other => Err(ReservingError::configuration(format!(
                "unsupported method: {}",
                other
            ))),
        }
    }
}

/// Optional equality filters on the categorical dimensions
///
/// `None` and empty strings both mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryFilter {
    pub line: Option<String>,
    pub channel: Option<String>,
    pub coverage: Option<String>,
    pub reserve_group: Option<String>,
}

fn field_matches(filter: &Option<String>, value: &str) -> bool {
    match filter.as_deref() {
        None | Some("") => true,
        Some(wanted) => wanted == value,
    }
}

impl CategoryFilter {
    /// Claims must match every populated filter
    pub fn matches_claim(&self, dimensions: &Dimensions) -> bool {
        field_matches(&self.line, &dimensions.line)
            && field_matches(&self.channel, &dimensions.channel)
            && field_matches(&self.coverage, &dimensions.coverage)
            && field_matches(
                &self.reserve_group,
                dimensions.reserve_group.as_deref().unwrap_or(""),
            )
    }

    /// Exposures are matched on line, channel and coverage; the reserve
    /// group filter never applies to them
    pub fn matches_exposure(&self, dimensions: &Dimensions) -> bool {
        field_matches(&self.line, &dimensions.line)
            && field_matches(&self.channel, &dimensions.channel)
            && field_matches(&self.coverage, &dimensions.coverage)
    }

    pub fn is_empty(&self) -> bool {
        [&self.line, &self.channel, &self.coverage, &self.reserve_group]
            .iter()
            .all(|f| f.as_deref().map_or(true, str::is_empty))
    }
}

/// Inclusive bounds on the occurrence date; each side is optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Full parameter set of one reserving request
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservingConfig {
    pub periodicity: Periodicity,
    pub triangle_type: TriangleType,
    pub value_type: ValueType,
    pub method: MethodSelector,
    pub filters: CategoryFilter,
    pub date_range: DateRange,
}

impl ReservingConfig {
    /// Load a config from a JSON file; absent fields take their defaults
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            ReservingError::configuration(format!("invalid reserving config: {}", e))
        })
    }

    pub fn with_periodicity(mut self, periodicity: Periodicity) -> Self {
        self.periodicity = periodicity;
        self
    }

    pub fn with_triangle_type(mut self, triangle_type: TriangleType) -> Self {
        self.triangle_type = triangle_type;
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_method(mut self, method: MethodSelector) -> Self {
        self.method = method;
        self
    }

    /// Row-level inclusion mask for claims
    pub fn includes_claim(&self, claim: &ClaimRecord) -> bool {
        self.filters.matches_claim(&claim.dimensions) && self.date_range.contains(claim.occurrence_date)
    }

    /// Row-level inclusion mask for exposures (no date restriction)
    pub fn includes_exposure(&self, exposure: &ExposureRecord) -> bool {
        self.filters.matches_exposure(&exposure.dimensions)
    }

    /// Canonical key for external memoization of this request's results
    ///
    /// Two configs produce the same key exactly when they request the same
    /// computation over the same dataset version.
    pub fn cache_key(&self, dataset_version: &str) -> String {
        fn opt(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or("")
        }
        fn date(value: Option<NaiveDate>) -> String {
            value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
        }

        format!(
            "{}|{}|{}|{}|{}|line={}|channel={}|coverage={}|group={}|from={}|to={}",
            dataset_version,
            self.periodicity,
            self.triangle_type,
            self.value_type,
            self.method,
            opt(&self.filters.line),
            opt(&self.filters.channel),
            opt(&self.filters.coverage),
            opt(&self.filters.reserve_group),
            date(self.date_range.start),
            date(self.date_range.end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config = ReservingConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ReservingConfig::default());
        assert_eq!(config.periodicity, Periodicity::Month);
        assert_eq!(config.method, MethodSelector::Auto);
    }

    #[test]
    fn test_config_from_json() {
        let config = ReservingConfig::from_json_str(
            r#"{
                "periodicity": "quarter",
                "triangle_type": "severity",
                "value_type": "retained",
                "method": "bornhuetter_ferguson",
                "filters": { "line": "Auto" },
                "date_range": { "start": "2022-01-01" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.periodicity, Periodicity::Quarter);
        assert_eq!(config.triangle_type, TriangleType::Severity);
        assert_eq!(config.value_type, ValueType::Retained);
        assert_eq!(config.method, MethodSelector::BornhuetterFerguson);
        assert_eq!(config.filters.line.as_deref(), Some("Auto"));
        assert_eq!(config.date_range.start, Some(d(2022, 1, 1)));
        assert!(config.date_range.end.is_none());
    }

    #[test]
    fn test_unknown_selector_is_configuration_error() {
        let err = ReservingConfig::from_json_str(r#"{ "periodicity": "weekly" }"#).unwrap_err();
        assert!(matches!(err, ReservingError::Configuration(_)));

        assert!(matches!(
            "triangular".parse::<TriangleType>(),
            Err(ReservingError::Configuration(_))
        ));
        assert_eq!("retenido".parse::<ValueType>().unwrap(), ValueType::Retained);
        assert_eq!("chain-ladder".parse::<MethodSelector>().unwrap(), MethodSelector::ChainLadder);
    }

    #[test]
    fn test_category_filter() {
        let dims = Dimensions::new("Auto", "Direct", "Collision", Some("Motor"));
        let mut filter = CategoryFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches_claim(&dims));

        filter.line = Some("Auto".to_string());
        filter.channel = Some(String::new());
        assert!(filter.matches_claim(&dims));

        filter.reserve_group = Some("Property".to_string());
        assert!(!filter.matches_claim(&dims));

        // Exposures ignore the reserve group, whether or not they carry one
        assert!(filter.matches_exposure(&Dimensions::new("Auto", "Direct", "Collision", None)));
        assert!(filter.matches_exposure(&dims));

        filter.coverage = Some("Theft".to_string());
        assert!(!filter.matches_exposure(&dims));
    }

    #[test]
    fn test_date_range_inclusive() {
        let range = DateRange {
            start: Some(d(2023, 1, 1)),
            end: Some(d(2023, 6, 30)),
        };
        assert!(range.contains(d(2023, 1, 1)));
        assert!(range.contains(d(2023, 6, 30)));
        assert!(!range.contains(d(2022, 12, 31)));

        let open = DateRange {
            start: None,
            end: Some(d(2023, 6, 30)),
        };
        assert!(open.contains(d(1990, 1, 1)));
    }

    #[test]
    fn test_cache_key_is_canonical() {
        let a = ReservingConfig::default().with_periodicity(Periodicity::Quarter);
        let b = ReservingConfig::default().with_periodicity(Periodicity::Quarter);
        assert_eq!(a.cache_key("v1"), b.cache_key("v1"));
        assert_ne!(a.cache_key("v1"), a.cache_key("v2"));
        assert_ne!(
            a.cache_key("v1"),
            a.clone().with_method(MethodSelector::ChainLadder).cache_key("v1")
        );
    }
}
