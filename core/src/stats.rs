//! Descriptive statistics behind the plots.

use std::collections::HashMap;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use framelens_common::{ErrorContext, Result};

use crate::dataset::Dataset;
use crate::types::ColumnKind;

/// Read a column as `f64`, keeping nulls.
pub fn numeric_values(column: &ArrayRef) -> Result<Vec<Option<f64>>> {
    let floats = cast(column, &DataType::Float64).with_conversion_context(|| {
        format!("Failed to read {} column as numbers", column.data_type())
    })?;
    Ok(floats.as_primitive::<Float64Type>().iter().collect())
}

/// Count occurrences of each distinct non-null value.
///
/// Values are rendered with Arrow's display formatting. The result is sorted by
/// count, most frequent first; equal counts keep the order of first appearance.
pub fn value_counts(column: &ArrayRef) -> Result<Vec<(String, usize)>> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(column.as_ref(), &options)
        .with_conversion_context(|| format!("Cannot format {} values", column.data_type()))?;

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in 0..column.len() {
        if column.is_null(row) {
            continue;
        }
        let label = formatter.value(row).to_string();
        match index.get(&label) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(label.clone(), counts.len());
                counts.push((label, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts)
}

/// Pearson correlation over the rows where both values are present.
///
/// Returns NaN for fewer than two such rows or when either side is constant.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if !a.is_nan() && !b.is_nan() => Some((*a, *b)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Square matrix of pairwise correlations
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `columns.len()` squared entries
    pub values: Vec<f64>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.columns.len() + col]
    }
}

/// Correlate every integer and float column with every other, in schema order.
pub fn correlation_matrix(dataset: &Dataset) -> Result<CorrelationMatrix> {
    let mut columns = Vec::new();
    let mut series = Vec::new();
    for (field, array) in dataset.columns() {
        if ColumnKind::of(field.data_type()).is_numeric() {
            columns.push(field.name().clone());
            series.push(numeric_values(array)?);
        }
    }

    let n = columns.len();
    let mut values = vec![f64::NAN; n * n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&series[i], &series[j]);
            values[i * n + j] = r;
            values[j * n + i] = r;
        }
    }
    Ok(CorrelationMatrix { columns, values })
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `counts.len() + 1` bin boundaries
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Bin the finite values into `bins` equal-width bins spanning [min, max].
///
/// Every bin is half-open except the last, which also holds `max`. A
/// constant input is centred in [v - 0.5, v + 0.5]; an input with no finite
/// values spans [0, 1].
pub fn histogram(values: &[Option<f64>], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let finite: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();

    let (mut low, mut high) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if finite.is_empty() {
        (low, high) = (0.0, 1.0);
    } else if low == high {
        (low, high) = (low - 0.5, high + 0.5);
    }

    let width = (high - low) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| low + width * i as f64).collect();
    let mut counts = vec![0; bins];
    for v in finite {
        let slot = (((v - low) / width) as usize).min(bins - 1);
        counts[slot] += 1;
    }
    Histogram { edges, counts }
}
