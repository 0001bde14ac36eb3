//! Storage type optimization.
//!
//! Low-cardinality strings become dictionaries, integers narrow to the
//! smallest width holding their range and `Float64` narrows to `Float32`
//! when the round trip stays within [`FLOAT32_ABS_TOLERANCE`].

use std::collections::HashSet;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array};
use arrow::compute::{cast, max, min};
use arrow::datatypes::{DataType, Float64Type, Int64Type, UInt64Type};
use framelens_common::{CATEGORICAL_RATIO_THRESHOLD, CommonError, ErrorContext, Result};
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::types::{ColumnKind, integer_width};

/// Largest absolute difference a value may move by when stored as `f32`.
pub const FLOAT32_ABS_TOLERANCE: f64 = 5e-4;

/// Rewrites column storage types of a dataset.
#[derive(Debug, Clone)]
pub struct TypeOptimizer {
    categorical_threshold: f64,
}

impl TypeOptimizer {
    /// Create an optimizer with the given distinct-value ratio threshold
    pub fn new(categorical_threshold: f64) -> Self {
        Self {
            categorical_threshold,
        }
    }

    /// Consume a dataset and return one with narrowed column types.
    ///
    /// Column names and order are preserved.
    pub fn optimize(&self, dataset: Dataset) -> Result<Dataset> {
        let rows = dataset.num_rows();
        let mut converted = 0usize;
        let mut columns = Vec::with_capacity(dataset.num_columns());

        for (field, array) in dataset.columns() {
            let before = array.data_type().clone();
            let optimized = match ColumnKind::of(&before) {
                ColumnKind::String => self.categorize(field.name(), array, rows)?,
                ColumnKind::SignedInteger | ColumnKind::UnsignedInteger => {
                    downcast_integer(field.name(), array)?
                }
                ColumnKind::Float => downcast_float(field.name(), array)?,
                _ => None,
            };

            match optimized {
                Some(new_array) => {
                    debug!(
                        "Column '{}' converted from {} to {}",
                        field.name(),
                        before,
                        new_array.data_type()
                    );
                    converted += 1;
                    columns.push(new_array);
                }
                None => columns.push(array.clone()),
            }
        }

        info!(
            "Optimized {} of {} columns",
            converted,
            dataset.num_columns()
        );
        dataset.with_columns(columns)
    }

    fn categorize(&self, name: &str, array: &ArrayRef, rows: usize) -> Result<Option<ArrayRef>> {
        if rows == 0 {
            warn!("Column '{}' has no rows; leaving it as a string column", name);
            return Ok(None);
        }

        let distinct = distinct_strings(array)?;
        let ratio = distinct as f64 / rows as f64;
        if ratio >= self.categorical_threshold {
            debug!(
                "Column '{}' keeps string storage (distinct ratio {:.3})",
                name, ratio
            );
            return Ok(None);
        }

        let utf8 = if array.data_type() == &DataType::Utf8 {
            array.clone()
        } else {
            cast(array, &DataType::Utf8)
                .with_conversion_context(|| format!("Failed to normalize column '{}'", name))?
        };
        let target = DataType::Dictionary(
            Box::new(dictionary_key_type(distinct)),
            Box::new(DataType::Utf8),
        );
        let encoded = cast(&utf8, &target)
            .with_conversion_context(|| format!("Failed to dictionary-encode column '{}'", name))?;
        Ok(Some(encoded))
    }
}

impl Default for TypeOptimizer {
    fn default() -> Self {
        Self::new(CATEGORICAL_RATIO_THRESHOLD)
    }
}

/// Count distinct non-null values of a string column
fn distinct_strings(array: &ArrayRef) -> Result<usize> {
    let count = match array.data_type() {
        DataType::Utf8 => array
            .as_string::<i32>()
            .iter()
            .flatten()
            .collect::<HashSet<_>>()
            .len(),
        DataType::LargeUtf8 => array
            .as_string::<i64>()
            .iter()
            .flatten()
            .collect::<HashSet<_>>()
            .len(),
        DataType::Utf8View => array
            .as_string_view()
            .iter()
            .flatten()
            .collect::<HashSet<_>>()
            .len(),
        other => {
            return Err(CommonError::internal_error(format!(
                "distinct count requested for non-string type {}",
                other
            )));
        }
    };
    Ok(count)
}

/// Narrowest signed key type able to index `distinct` dictionary values
fn dictionary_key_type(distinct: usize) -> DataType {
    if distinct <= i8::MAX as usize {
        DataType::Int8
    } else if distinct <= i16::MAX as usize {
        DataType::Int16
    } else {
        DataType::Int32
    }
}

/// Smallest signed integer type containing `[min, max]`
pub fn narrowest_signed(min: i64, max: i64) -> DataType {
    if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
        DataType::Int8
    } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
        DataType::Int16
    } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
        DataType::Int32
    } else {
        DataType::Int64
    }
}

/// Smallest unsigned integer type containing `max`
pub fn narrowest_unsigned(max: u64) -> DataType {
    if max <= u8::MAX as u64 {
        DataType::UInt8
    } else if max <= u16::MAX as u64 {
        DataType::UInt16
    } else if max <= u32::MAX as u64 {
        DataType::UInt32
    } else {
        DataType::UInt64
    }
}

fn downcast_integer(name: &str, array: &ArrayRef) -> Result<Option<ArrayRef>> {
    let current = array.data_type();
    let target = if ColumnKind::of(current) == ColumnKind::SignedInteger {
        let wide = cast(array, &DataType::Int64)
            .with_conversion_context(|| format!("Failed to widen column '{}'", name))?;
        let values = wide.as_primitive::<Int64Type>();
        match (min(values), max(values)) {
            (Some(lo), Some(hi)) => narrowest_signed(lo, hi),
            _ => DataType::Int8,
        }
    } else {
        let wide = cast(array, &DataType::UInt64)
            .with_conversion_context(|| format!("Failed to widen column '{}'", name))?;
        match max(wide.as_primitive::<UInt64Type>()) {
            Some(hi) => narrowest_unsigned(hi),
            None => DataType::UInt8,
        }
    };

    // Never widen
    match (integer_width(&target), integer_width(current)) {
        (Some(new_width), Some(old_width)) if new_width < old_width => {
            let narrowed = cast(array, &target)
                .with_conversion_context(|| format!("Failed to narrow column '{}'", name))?;
            Ok(Some(narrowed))
        }
        _ => Ok(None),
    }
}

/// Check whether every value of a `Float64` column survives a trip through `f32`.
pub fn fits_float32(values: &Float64Array) -> bool {
    values.iter().flatten().all(|value| {
        let narrowed = value as f32;
        if value.is_nan() {
            narrowed.is_nan()
        } else if value.is_infinite() {
            narrowed as f64 == value
        } else {
            narrowed.is_finite() && (narrowed as f64 - value).abs() <= FLOAT32_ABS_TOLERANCE
        }
    })
}

fn downcast_float(name: &str, array: &ArrayRef) -> Result<Option<ArrayRef>> {
    if array.data_type() != &DataType::Float64 {
        return Ok(None);
    }
    if !fits_float32(array.as_primitive::<Float64Type>()) {
        debug!("Column '{}' keeps float64 storage (values exceed f32 tolerance)", name);
        return Ok(None);
    }
    let narrowed = cast(array, &DataType::Float32)
        .with_conversion_context(|| format!("Failed to narrow column '{}'", name))?;
    Ok(Some(narrowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::analyze_memory_usage;
    use arrow::array::{
        BooleanArray, Float64Array, Int8Array, Int16Array, Int64Array, StringArray, UInt32Array,
    };
    use std::sync::Arc;

    fn single(name: &str, array: ArrayRef) -> Dataset {
        Dataset::from_columns([(name, array)]).unwrap()
    }

    fn optimized_type(array: ArrayRef) -> DataType {
        let out = TypeOptimizer::default().optimize(single("c", array)).unwrap();
        out.column("c").unwrap().data_type().clone()
    }

    #[test]
    fn test_constant_sevens_narrow_to_int8() {
        let ty = optimized_type(Arc::new(Int64Array::from(vec![7; 1000])));
        assert_eq!(ty, DataType::Int8);
    }

    #[test]
    fn test_integer_range_boundaries() {
        assert_eq!(narrowest_signed(-128, 127), DataType::Int8);
        assert_eq!(narrowest_signed(-129, 0), DataType::Int16);
        assert_eq!(narrowest_signed(0, 32_768), DataType::Int32);
        assert_eq!(narrowest_signed(0, i32::MAX as i64 + 1), DataType::Int64);
        assert_eq!(narrowest_unsigned(255), DataType::UInt8);
        assert_eq!(narrowest_unsigned(65_536), DataType::UInt32);
    }

    #[test]
    fn test_integer_values_preserved() {
        let out = TypeOptimizer::default()
            .optimize(single(
                "c",
                Arc::new(Int64Array::from(vec![Some(-300), None, Some(12_000)])),
            ))
            .unwrap();
        let column = out.column("c").unwrap();
        assert_eq!(column.data_type(), &DataType::Int16);
        let values = column.as_any().downcast_ref::<Int16Array>().unwrap();
        assert_eq!(values.value(0), -300);
        assert!(values.is_null(1));
        assert_eq!(values.value(2), 12_000);
    }

    #[test]
    fn test_unsigned_and_never_widen() {
        let ty = optimized_type(Arc::new(UInt32Array::from(vec![1, 2, 300])));
        assert_eq!(ty, DataType::UInt16);

        let ty = optimized_type(Arc::new(Int16Array::from(vec![1, 2, 3])));
        assert_eq!(ty, DataType::Int8);

        let ty = optimized_type(Arc::new(Int8Array::from(vec![1, 2, 3])));
        assert_eq!(ty, DataType::Int8);
    }

    #[test]
    fn test_low_cardinality_strings_become_categorical() {
        let values: Vec<&str> = (0..1000).map(|i| ["own", "rent", "other"][i % 3]).collect();
        let ty = optimized_type(Arc::new(StringArray::from(values)));
        assert_eq!(
            ty,
            DataType::Dictionary(Box::new(DataType::Int8), Box::new(DataType::Utf8))
        );
    }

    #[test]
    fn test_high_cardinality_strings_stay_strings() {
        let values: Vec<String> = (0..1000).map(|i| format!("id-{}", i % 900)).collect();
        let ty = optimized_type(Arc::new(StringArray::from(values)));
        assert_eq!(ty, DataType::Utf8);
    }

    #[test]
    fn test_ratio_exactly_at_threshold_is_not_converted() {
        let values: Vec<String> = (0..10).map(|i| format!("v{}", i % 5)).collect();
        let ty = optimized_type(Arc::new(StringArray::from(values)));
        assert_eq!(ty, DataType::Utf8);
    }

    #[test]
    fn test_dictionary_key_widths() {
        assert_eq!(dictionary_key_type(3), DataType::Int8);
        assert_eq!(dictionary_key_type(127), DataType::Int8);
        assert_eq!(dictionary_key_type(128), DataType::Int16);
        assert_eq!(dictionary_key_type(40_000), DataType::Int32);
    }

    #[test]
    fn test_empty_string_column_unchanged() {
        let ty = optimized_type(Arc::new(StringArray::from(Vec::<&str>::new())));
        assert_eq!(ty, DataType::Utf8);
    }

    #[test]
    fn test_float_narrowing() {
        let ty = optimized_type(Arc::new(Float64Array::from(vec![0.5, 1.25, 20.0])));
        assert_eq!(ty, DataType::Float32);

        let ty = optimized_type(Arc::new(Float64Array::from(vec![
            Some(f64::NAN),
            None,
            Some(f64::INFINITY),
            Some(0.1),
        ])));
        assert_eq!(ty, DataType::Float32);
    }

    #[test]
    fn test_float_that_cannot_be_narrowed_stays_float64() {
        // Needs more precision than f32 carries at this magnitude
        let ty = optimized_type(Arc::new(Float64Array::from(vec![1.0e10 + 0.123, 2.0])));
        assert_eq!(ty, DataType::Float64);

        // Beyond the f32 range
        let ty = optimized_type(Arc::new(Float64Array::from(vec![1.0e300])));
        assert_eq!(ty, DataType::Float64);
    }

    #[test]
    fn test_other_columns_untouched_and_order_kept() {
        let data = Dataset::from_columns([
            ("flag", Arc::new(BooleanArray::from(vec![true, false])) as ArrayRef),
            ("n", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
        ])
        .unwrap();
        let out = TypeOptimizer::default().optimize(data).unwrap();
        assert_eq!(out.column_names(), vec!["flag", "n"]);
        assert_eq!(out.column("flag").unwrap().data_type(), &DataType::Boolean);
    }

    #[test]
    fn test_optimization_never_grows_memory() {
        let housing: Vec<&str> = (0..500).map(|i| ["BA", "BB", "BC"][i % 3]).collect();
        let ages: Vec<i64> = (0..500).map(|i| 18 + i % 60).collect();
        let data = Dataset::from_columns([
            ("age", Arc::new(Int64Array::from(ages)) as ArrayRef),
            ("housing", Arc::new(StringArray::from(housing)) as ArrayRef),
        ])
        .unwrap();
        let before = analyze_memory_usage(&data).total_bytes;
        let optimized = TypeOptimizer::default().optimize(data).unwrap();
        let after = analyze_memory_usage(&optimized).total_bytes;
        assert!(after < before);
    }
}
