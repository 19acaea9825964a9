//! Volume-weighted age-to-age factors and factors-to-ultimate

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::triangle::Triangle;

/// Descriptive statistics of the individual factors at one lag
///
/// A lag with no contributing origin still reports the volume-weighted
/// average (1.0) and the factor-to-ultimate chained through later lags,
/// which is not necessarily 1.0.
#[derive(Debug, Clone, Serialize)]
pub struct LagStatistics {
    /// Lag the factor develops from
    pub lag: u32,
    pub average_factor: f64,
    pub cumulative_factor: f64,
    /// Number of origin periods contributing an individual factor
    pub count: usize,
    /// NaN when `count` is zero
    pub min: f64,
    pub max: f64,
    /// Population standard deviation; NaN when `count` is zero
    pub std_dev: f64,
}

/// Development factors derived from one triangle
///
/// `average` and `cumulative` have one entry per lag except the last.
#[derive(Debug, Clone, Serialize)]
pub struct DevelopmentFactors {
    /// Lag labels the factors develop from
    pub lags: Vec<u32>,
    /// Origin labels of the individual factor rows
    pub origins: Vec<NaiveDate>,
    /// Per-origin factors `cell[i, j+1] / cell[i, j]`
    pub individual: Vec<Vec<Option<f64>>>,
    /// Volume-weighted factor per lag
    pub average: Vec<f64>,
    /// Factor-to-ultimate per lag
    pub cumulative: Vec<f64>,
    pub statistics: Vec<LagStatistics>,
}

impl DevelopmentFactors {
    pub fn empty() -> Self {
        Self {
            lags: Vec::new(),
            origins: Vec::new(),
            individual: Vec::new(),
            average: Vec::new(),
            cumulative: Vec::new(),
            statistics: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.average.is_empty()
    }

    pub fn len(&self) -> usize {
        self.average.len()
    }

    /// Factor-to-ultimate for a column position, if the position can still develop
    pub fn cumulative_at(&self, position: usize) -> Option<f64> {
        self.cumulative.get(position).copied()
    }

    /// Estimate factors from a cumulative triangle
    ///
    /// Only pairs with both cells inside the observable region contribute.
    /// A lag with no positive volume gets a factor of 1.0.
    pub fn estimate(triangle: &Triangle) -> Self {
        if triangle.is_empty() || triangle.num_lags() < 2 {
            return Self::empty();
        }

        let n = triangle.num_periods();
        let width = triangle.num_lags() - 1;
        let mut individual = vec![vec![None; width]; n];
        let mut average = vec![1.0; width];

        for j in 0..width {
            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for (i, row) in individual.iter_mut().enumerate() {
                // Both j and j+1 must be observable
                if i + j + 1 >= n {
                    continue;
                }
                if let (Some(actual), Some(next)) = (triangle.value(i, j), triangle.value(i, j + 1)) {
                    numerator += next;
                    denominator += actual;
                    if actual > 0.0 {
                        row[j] = Some(next / actual);
                    }
                }
            }
            if denominator > 0.0 {
                average[j] = numerator / denominator;
            }
        }

        let cumulative = chain_to_ultimate(&average);
        debug!("Average factors: {:?}", average);
        debug!("Cumulative factors: {:?}", cumulative);

        let lags = triangle.lags()[..width].to_vec();
        let statistics = (0..width)
            .map(|j| {
                let column: Vec<f64> = individual.iter().filter_map(|row| row[j]).collect();
                summarize(lags[j], average[j], cumulative[j], &column)
            })
            .collect();

        Self {
            lags,
            origins: triangle.origins().to_vec(),
            individual,
            average,
            cumulative,
            statistics,
        }
    }
}

/// Chain factors from the tail inward: `c[last] = f[last]`, `c[j] = f[j] * c[j+1]`
pub fn chain_to_ultimate(average: &[f64]) -> Vec<f64> {
    let mut cumulative = average.to_vec();
    for j in (0..cumulative.len().saturating_sub(1)).rev() {
        cumulative[j] = average[j] * cumulative[j + 1];
    }
    cumulative
}

fn summarize(lag: u32, average_factor: f64, cumulative_factor: f64, factors: &[f64]) -> LagStatistics {
    if factors.is_empty() {
        return LagStatistics {
            lag,
            average_factor,
            cumulative_factor,
            count: 0,
            min: f64::NAN,
            max: f64::NAN,
            std_dev: f64::NAN,
        };
    }

    let count = factors.len();
    let mean = factors.iter().sum::<f64>() / count as f64;
    let variance = factors.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / count as f64;

    LagStatistics {
        lag,
        average_factor,
        cumulative_factor,
        count,
        min: factors.iter().copied().fold(f64::INFINITY, f64::min),
        max: factors.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std_dev: variance.sqrt(),
    }
}
