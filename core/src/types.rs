//! Column classification for framelens
//!
//! Groups Arrow data types into the handful of kinds the analysis cares
//! about and renders the short type tags written to the reports.

use arrow::datatypes::DataType;

/// Storage kind of a column as seen by the optimizer and the plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Int8 through Int64
    SignedInteger,
    /// UInt8 through UInt64
    UnsignedInteger,
    /// Float16 through Float64
    Float,
    Boolean,
    /// Any UTF-8 layout
    String,
    /// Dictionary encoded values
    Categorical,
    /// Every value is null
    Null,
    /// Temporal, binary, decimal and nested types
    Other,
}

impl ColumnKind {
    /// Classify an Arrow data type
    pub fn of(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
                ColumnKind::SignedInteger
            }
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                ColumnKind::UnsignedInteger
            }
            DataType::Float16 | DataType::Float32 | DataType::Float64 => ColumnKind::Float,
            DataType::Boolean => ColumnKind::Boolean,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnKind::String,
            DataType::Dictionary(_, _) => ColumnKind::Categorical,
            DataType::Null => ColumnKind::Null,
            _ => ColumnKind::Other,
        }
    }

    /// Check if this kind is an integer
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnKind::SignedInteger | ColumnKind::UnsignedInteger
        )
    }

    /// Check if this kind takes part in the correlation matrix.
    ///
    /// Booleans and categoricals are excluded even though both can be cast
    /// to numbers.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, ColumnKind::Float)
    }
}

/// Short type tag used in the column statistics report
pub fn dtype_tag(data_type: &DataType) -> String {
    let tag = match data_type {
        DataType::Int8 => "int8",
        DataType::Int16 => "int16",
        DataType::Int32 => "int32",
        DataType::Int64 => "int64",
        DataType::UInt8 => "uint8",
        DataType::UInt16 => "uint16",
        DataType::UInt32 => "uint32",
        DataType::UInt64 => "uint64",
        DataType::Float16 => "float16",
        DataType::Float32 => "float32",
        DataType::Float64 => "float64",
        DataType::Boolean => "bool",
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "string",
        DataType::Dictionary(_, _) => "category",
        DataType::Null => "null",
        other => return other.to_string().to_lowercase(),
    };
    tag.to_string()
}

/// Byte width of a signed or unsigned integer type
pub(crate) fn integer_width(data_type: &DataType) -> Option<usize> {
    match data_type {
        DataType::Int8 | DataType::UInt8 => Some(1),
        DataType::Int16 | DataType::UInt16 => Some(2),
        DataType::Int32 | DataType::UInt32 => Some(4),
        DataType::Int64 | DataType::UInt64 => Some(8),
        _ => None,
    }
}
