//! Cumulative development triangle

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::builder::ColumnResolution;
use crate::period::Periodicity;

/// One position of the triangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Cell {
    /// Cumulative value known at this development age
    Observed(f64),
    /// Not yet observable, or never populated
    Absent,
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Observed(v) => Some(*v),
            Cell::Absent => None,
        }
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, Cell::Observed(_))
    }
}

/// Cumulative triangle indexed by origin period (rows) and lag (columns)
///
/// Origins and lags are ascending. A cell at row `i`, column `j` can only be
/// observed when `j <= n - i - 1`, `n` being the number of origin periods.
#[derive(Debug, Clone, Serialize)]
pub struct Triangle {
    pub periodicity: Periodicity,
    origins: Vec<NaiveDate>,
    lags: Vec<u32>,
    #[serde(skip)]
    origin_index: HashMap<NaiveDate, usize>,
    #[serde(skip)]
    lag_index: HashMap<u32, usize>,
    cells: Vec<Vec<Cell>>,
    /// How the aggregated column was chosen
    pub source: Option<ColumnResolution>,
    /// Why the triangle is empty, when no value column could be resolved
    pub failure: Option<String>,
}

impl Triangle {
    pub fn empty(periodicity: Periodicity) -> Self {
        Self {
            periodicity,
            origins: Vec::new(),
            lags: Vec::new(),
            origin_index: HashMap::new(),
            lag_index: HashMap::new(),
            cells: Vec::new(),
            source: None,
            failure: None,
        }
    }

    /// Empty triangle carrying the reason it could not be built
    pub fn failed(periodicity: Periodicity, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::empty(periodicity)
        }
    }

    /// Triangle of the given shape with every cell absent
    fn shaped(periodicity: Periodicity, origins: Vec<NaiveDate>, lags: Vec<u32>) -> Self {
        Self {
            periodicity,
            origin_index: origins.iter().enumerate().map(|(i, o)| (*o, i)).collect(),
            lag_index: lags.iter().enumerate().map(|(j, l)| (*l, j)).collect(),
            cells: vec![vec![Cell::Absent; lags.len()]; origins.len()],
            origins,
            lags,
            source: None,
            failure: None,
        }
    }

    /// Build from cumulative rows, one per origin and one value per lag
    ///
    /// Values outside the observable region are discarded.
    pub fn from_cumulative(
        periodicity: Periodicity,
        origins: Vec<NaiveDate>,
        lags: Vec<u32>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Self {
        let mut triangle = Self::shaped(periodicity, origins, lags);
        let n = triangle.origins.len();
        for (i, (row, values)) in triangle.cells.iter_mut().zip(rows).enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                if let Some(v) = values.get(j).copied().flatten() {
                    if is_observable(n, i, j) {
                        *cell = Cell::Observed(v);
                    }
                }
            }
        }
        triangle
    }

    /// Build from incremental sums keyed by (origin period, lag)
    ///
    /// Origins and lags are the distinct keys, ascending. Rows are cumulated
    /// and masked; combinations with no contributing record count as zero
    /// increments, so every observable cell is present.
    pub(crate) fn from_incremental(periodicity: Periodicity, increments: &HashMap<(NaiveDate, u32), f64>) -> Self {
        let origins: BTreeSet<NaiveDate> = increments.keys().map(|(origin, _)| *origin).collect();
        let lags: BTreeSet<u32> = increments.keys().map(|(_, lag)| *lag).collect();
        let mut triangle = Self::shaped(periodicity, origins.into_iter().collect(), lags.into_iter().collect());

        let mut sums: Vec<Vec<f64>> = vec![vec![0.0; triangle.num_lags()]; triangle.num_periods()];
        for ((origin, lag), value) in increments {
            if let (Some(i), Some(j)) = (triangle.origin_position(*origin), triangle.lag_position(*lag)) {
                sums[i][j] += value;
            }
        }

        let n = triangle.num_periods();
        for (i, (row, row_sums)) in triangle.cells.iter_mut().zip(sums).enumerate() {
            let mut running = 0.0;
            for (j, (cell, increment)) in row.iter_mut().zip(row_sums).enumerate() {
                running += increment;
                if is_observable(n, i, j) {
                    *cell = Cell::Observed(running);
                }
            }
        }
        triangle
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn num_periods(&self) -> usize {
        self.origins.len()
    }

    pub fn num_lags(&self) -> usize {
        self.lags.len()
    }

    pub fn origins(&self) -> &[NaiveDate] {
        &self.origins
    }

    pub fn lags(&self) -> &[u32] {
        &self.lags
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    pub fn cell(&self, i: usize, j: usize) -> Cell {
        self.cells
            .get(i)
            .and_then(|row| row.get(j))
            .copied()
            .unwrap_or(Cell::Absent)
    }

    pub fn value(&self, i: usize, j: usize) -> Option<f64> {
        self.cell(i, j).value()
    }

    /// Row of an origin period start
    pub fn origin_position(&self, origin: NaiveDate) -> Option<usize> {
        self.origin_index.get(&origin).copied()
    }

    /// Column of a development lag
    pub fn lag_position(&self, lag: u32) -> Option<usize> {
        self.lag_index.get(&lag).copied()
    }

    /// Rightmost observed cell of row `i` as (column, value)
    pub fn latest(&self, i: usize) -> Option<(usize, f64)> {
        self.cells
            .get(i)?
            .iter()
            .enumerate()
            .rev()
            .find_map(|(j, c)| c.value().map(|v| (j, v)))
    }

    /// First observed value of row `i`
    pub fn initial(&self, i: usize) -> Option<f64> {
        self.cells.get(i)?.iter().find_map(Cell::value)
    }

    pub fn is_observable(&self, i: usize, j: usize) -> bool {
        is_observable(self.origins.len(), i, j)
    }
}

fn is_observable(n: usize, i: usize, j: usize) -> bool {
    i + j < n
}
