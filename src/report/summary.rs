//! Descriptive summaries of the claim snapshot

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::claims::ClaimRecord;
use crate::config::ValueType;
use crate::triangle::{ClaimFrame, ValueColumn};

/// Headline figures over the filtered claims
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClaimsMetrics {
    pub total_claims: usize,
    pub claims_with_payment: usize,
    pub total_payments: f64,
    /// Sum of the measure the triangle is built from
    pub total_incurred: f64,
}

impl ClaimsMetrics {
    pub fn from_frame(frame: &ClaimFrame, value_type: ValueType) -> Self {
        let payment = ValueColumn::payment(value_type);
        let mut metrics = ClaimsMetrics {
            total_claims: frame.len(),
            ..Default::default()
        };

        for row in frame.rows() {
            let paid = frame.value(row, payment).unwrap_or(0.0);
            if paid > 0.0 {
                metrics.claims_with_payment += 1;
            }
            metrics.total_payments += paid;
            metrics.total_incurred += frame
                .value(row, ValueColumn::Value)
                .unwrap_or(paid);
        }

        metrics
    }
}

/// Claim counts and payments of one origin period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccurrenceSummary {
    pub period: NaiveDate,
    pub total_claims: usize,
    pub claims_with_payment: usize,
    pub total_payments: f64,
    /// Share of claims with a payment, in percent rounded to one decimal
    pub percent_paid: f64,
}

/// Per-origin summary, newest period first
pub fn occurrence_summary(frame: &ClaimFrame, value_type: ValueType) -> Vec<OccurrenceSummary> {
    let payment = ValueColumn::payment(value_type);
    let mut by_period: BTreeMap<NaiveDate, (usize, usize, f64)> = BTreeMap::new();

    for row in frame.rows() {
        let paid = frame.value(row, payment).unwrap_or(0.0);
        let entry = by_period.entry(row.origin_period).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if paid > 0.0 {
            entry.1 += 1;
        }
        entry.2 += paid;
    }

    by_period
        .into_iter()
        .rev()
        .map(|(period, (total, with_payment, payments))| OccurrenceSummary {
            period,
            total_claims: total,
            claims_with_payment: with_payment,
            total_payments: payments,
            percent_paid: if total > 0 {
                (with_payment as f64 / total as f64 * 1000.0).round() / 10.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Claim counts and payments of one registration (development) period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevelopmentSummary {
    pub period: NaiveDate,
    pub total_claims: usize,
    pub claims_with_payment: usize,
    pub total_payments: f64,
}

/// Per-registration-period summary, oldest period first
pub fn development_summary(frame: &ClaimFrame, value_type: ValueType) -> Vec<DevelopmentSummary> {
    let payment = ValueColumn::payment(value_type);
    let mut by_period: BTreeMap<NaiveDate, DevelopmentSummary> = BTreeMap::new();

    for row in frame.rows() {
        let paid = frame.value(row, payment).unwrap_or(0.0);
        let entry = by_period
            .entry(row.registration_period)
            .or_insert_with(|| DevelopmentSummary {
                period: row.registration_period,
                total_claims: 0,
                claims_with_payment: 0,
                total_payments: 0.0,
            });
        entry.total_claims += 1;
        if paid > 0.0 {
            entry.claims_with_payment += 1;
        }
        entry.total_payments += paid;
    }

    by_period.into_values().collect()
}

/// Date span covered by a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetRange {
    pub first_occurrence: NaiveDate,
    pub last_registration: NaiveDate,
}

impl DatasetRange {
    pub fn of(claims: &[ClaimRecord]) -> Option<Self> {
        Some(Self {
            first_occurrence: claims.iter().map(|c| c.occurrence_date).min()?,
            last_registration: claims.iter().map(|c| c.registration_date).max()?,
        })
    }
}

/// Values offered for each category filter, narrowed by the choices above it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub lines: Vec<String>,
    pub channels: Vec<String>,
    pub coverages: Vec<String>,
    pub reserve_groups: Vec<String>,
}

impl FilterOptions {
    /// Channels are listed once a line is chosen, coverages once a channel is too,
    /// and reserve groups once all three are set
    pub fn cascade(
        claims: &[ClaimRecord],
        line: Option<&str>,
        channel: Option<&str>,
        coverage: Option<&str>,
    ) -> Self {
        let line = line.filter(|s| !s.is_empty());
        let channel = channel.filter(|s| !s.is_empty()).filter(|_| line.is_some());
        let coverage = coverage.filter(|s| !s.is_empty()).filter(|_| channel.is_some());

        let in_line = |c: &&ClaimRecord| line.map_or(false, |l| c.dimensions.line == l);
        let in_channel = |c: &&ClaimRecord| in_line(c) && channel.map_or(false, |ch| c.dimensions.channel == ch);
        let in_coverage =
            |c: &&ClaimRecord| in_channel(c) && coverage.map_or(false, |cv| c.dimensions.coverage == cv);

        FilterOptions {
            lines: distinct(claims.iter().map(|c| c.dimensions.line.as_str())),
            channels: distinct(claims.iter().filter(&in_line).map(|c| c.dimensions.channel.as_str())),
            coverages: distinct(claims.iter().filter(&in_channel).map(|c| c.dimensions.coverage.as_str())),
            reserve_groups: distinct(
                claims
                    .iter()
                    .filter(&in_coverage)
                    .filter_map(|c| c.dimensions.reserve_group.as_deref()),
            ),
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
