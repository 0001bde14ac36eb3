//! In-memory table and the CSV loader.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{Field, FieldRef, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use framelens_common::{CommonError, ErrorContext, Result};
use tracing::debug;

/// A table of named, typed columns backed by a single Arrow record batch.
///
/// Datasets are immutable: transformations such as type optimization build a
/// new dataset and leave the original snapshot untouched.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Wrap an existing record batch
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Build a dataset from named columns, all of the same length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ArrayRef)>,
        S: Into<String>,
    {
        let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns
            .into_iter()
            .map(|(name, array)| {
                let field = Field::new(name, array.data_type().clone(), true);
                (field, array)
            })
            .unzip();
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema, arrays)
            .with_conversion_context(|| "Failed to assemble dataset columns".to_string())?;
        Ok(Self::new(batch))
    }

    /// Replace the columns while keeping names, nullability and metadata.
    pub(crate) fn with_columns(&self, columns: Vec<ArrayRef>) -> Result<Self> {
        let schema = self.batch.schema();
        let fields: Vec<FieldRef> = schema
            .fields()
            .iter()
            .zip(&columns)
            .map(|(field, array)| {
                Arc::new(
                    field
                        .as_ref()
                        .clone()
                        .with_data_type(array.data_type().clone()),
                )
            })
            .collect();
        let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows()));
        let batch = RecordBatch::try_new_with_options(schema, columns, &options)
            .with_conversion_context(|| "Failed to rebuild dataset".to_string())?;
        Ok(Self::new(batch))
    }

    /// Get the schema
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Column names in schema order
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| CommonError::not_found_error(format!("column '{}'", name)))
    }

    /// Iterate over `(field, column)` pairs in schema order
    pub fn columns(&self) -> impl Iterator<Item = (&FieldRef, &ArrayRef)> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .zip(self.batch.columns())
    }

    /// Get the underlying record batch
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }
}

/// Infer a CSV schema from every record in the file.
pub(crate) fn infer_csv_schema(path: &Path) -> Result<SchemaRef> {
    let file = File::open(path)
        .with_io_context(|| format!("Failed to open {}", path.display()))?;
    let (schema, records) = Format::default()
        .with_header(true)
        .infer_schema(BufReader::new(file), None)
        .with_parse_context(|| format!("Failed to infer schema of {}", path.display()))?;
    debug!(
        "Inferred {} columns from {} records of {}",
        schema.fields().len(),
        records,
        path.display()
    );
    Ok(Arc::new(schema))
}

/// Read a CSV file with a header row into a dataset.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let schema = infer_csv_schema(path)?;

    let file = File::open(path)
        .with_io_context(|| format!("Failed to open {}", path.display()))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(file)
        .with_parse_context(|| format!("Failed to create CSV reader for {}", path.display()))?;
    let batches = reader
        .collect::<std::result::Result<Vec<_>, ArrowError>>()
        .with_parse_context(|| format!("Failed to read {}", path.display()))?;

    let batch = concat_batches(&schema, &batches)
        .with_parse_context(|| format!("Failed to combine batches of {}", path.display()))?;
    debug!(
        "Loaded {} rows in {} batches from {}",
        batch.num_rows(),
        batches.len(),
        path.display()
    );
    Ok(Dataset::new(batch))
}
