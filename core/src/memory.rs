//! Per-column memory accounting.
//!
//! Sizes are computed from the logical extent of each column rather than
//! from buffer capacity, so two identical tables always report identical
//! numbers regardless of how their buffers were allocated.

use arrow::array::{Array, AsArray};
use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::types::dtype_tag;

/// Memory statistics of a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStat {
    pub column: String,
    pub memory_usage: u64,
    pub percentage: f64,
    pub dtype: String,
}

/// Column statistics of one dataset snapshot, largest column first
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryProfile {
    pub columns: Vec<ColumnStat>,
    pub total_bytes: u64,
}

impl MemoryProfile {
    /// Look up the statistics of a column
    pub fn column(&self, name: &str) -> Option<&ColumnStat> {
        self.columns.iter().find(|stat| stat.column == name)
    }
}

/// Compute per-column deep memory usage, sorted by size descending.
///
/// Columns of equal size keep their schema order.
pub fn analyze_memory_usage(dataset: &Dataset) -> MemoryProfile {
    let sizes: Vec<(String, u64, String)> = dataset
        .columns()
        .map(|(field, array)| {
            (
                field.name().clone(),
                deep_memory_size(array.as_ref()) as u64,
                dtype_tag(field.data_type()),
            )
        })
        .collect();
    let total_bytes: u64 = sizes.iter().map(|(_, size, _)| size).sum();

    let mut columns: Vec<ColumnStat> = sizes
        .into_iter()
        .map(|(column, memory_usage, dtype)| ColumnStat {
            percentage: percentage_of(memory_usage, total_bytes),
            column,
            memory_usage,
            dtype,
        })
        .collect();
    // sort_by is stable
    columns.sort_by(|a, b| b.memory_usage.cmp(&a.memory_usage));

    MemoryProfile {
        columns,
        total_bytes,
    }
}

fn percentage_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Deep byte size of an array, including variable-length payloads and the
/// values of a dictionary.
pub fn deep_memory_size(array: &dyn Array) -> usize {
    let len = array.len();
    let validity = if array.nulls().is_some() {
        len.div_ceil(8)
    } else {
        0
    };

    let values = match array.data_type() {
        DataType::Null => return 0,
        DataType::Boolean => len.div_ceil(8),
        DataType::Utf8 => {
            let offsets = array.as_string::<i32>().value_offsets();
            offsets_size(offsets.len(), 4) + payload_size(offsets)
        }
        DataType::LargeUtf8 => {
            let offsets = array.as_string::<i64>().value_offsets();
            offsets_size(offsets.len(), 8) + payload_size(offsets)
        }
        DataType::Binary => {
            let offsets = array.as_binary::<i32>().value_offsets();
            offsets_size(offsets.len(), 4) + payload_size(offsets)
        }
        DataType::LargeBinary => {
            let offsets = array.as_binary::<i64>().value_offsets();
            offsets_size(offsets.len(), 8) + payload_size(offsets)
        }
        DataType::Utf8View => {
            let views = array.as_string_view();
            len * 16 + views.data_buffers().iter().map(|b| b.len()).sum::<usize>()
        }
        DataType::Dictionary(_, _) => {
            let dictionary = array.as_any_dictionary();
            // The keys carry the validity of the column
            return deep_memory_size(dictionary.keys())
                + deep_memory_size(dictionary.values().as_ref());
        }
        other => match other.primitive_width() {
            Some(width) => len * width,
            None => return array.get_buffer_memory_size(),
        },
    };

    validity + values
}

fn offsets_size(count: usize, width: usize) -> usize {
    count * width
}

fn payload_size<O: arrow::array::OffsetSizeTrait>(offsets: &[O]) -> usize {
    match (offsets.first(), offsets.last()) {
        (Some(first), Some(last)) => (last.as_usize()).saturating_sub(first.as_usize()),
        _ => 0,
    }
}
