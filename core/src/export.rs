//! Column-filtered re-export of the source CSV.
//!
//! The source is streamed in fixed-size chunks so at most one chunk of the
//! selected columns is held in memory while the output is written.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use framelens_common::{CommonError, ErrorContext, FILTER_CHUNK_ROWS, Result};
use tracing::{debug, info};

use crate::dataset::infer_csv_schema;

/// Outcome of a filtered export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: usize,
    pub chunks: usize,
}

/// Writes a subset of a CSV's columns to a new CSV.
#[derive(Debug, Clone)]
pub struct FilteredExporter {
    columns: Vec<String>,
    chunk_size: usize,
}

impl FilteredExporter {
    /// Create an exporter for `columns`, written in the given order
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            chunk_size: FILTER_CHUNK_ROWS,
        }
    }

    /// Override the number of rows read per chunk
    pub fn with_chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows.max(1);
        self
    }

    /// Get the selected columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the number of rows read per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Stream `input` restricted to the selected columns into `output`.
    ///
    /// Missing columns are reported before the output file is created.
    pub fn export(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<ExportSummary> {
        let input = input.as_ref();
        let output = output.as_ref();

        let schema = infer_csv_schema(input)?;
        let mut projection = Vec::with_capacity(self.columns.len());
        let mut missing = Vec::new();
        for name in &self.columns {
            match schema.index_of(name) {
                Ok(index) => projection.push(index),
                Err(_) => missing.push(name.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(CommonError::not_found_error(format!(
                "columns {:?} in {}",
                missing,
                input.display()
            )));
        }

        let projected = Arc::new(
            schema
                .project(&projection)
                .with_parse_context(|| "Failed to project CSV schema".to_string())?,
        );
        let source = File::open(input)
            .with_io_context(|| format!("Failed to open {}", input.display()))?;
        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .with_batch_size(self.chunk_size)
            .with_projection(projection)
            .build(source)
            .with_parse_context(|| format!("Failed to create CSV reader for {}", input.display()))?;

        let sink = File::create(output)
            .with_io_context(|| format!("Failed to create {}", output.display()))?;
        let mut writer = WriterBuilder::new().with_header(true).build(sink);

        let mut summary = ExportSummary { rows: 0, chunks: 0 };
        for chunk in reader {
            let chunk = chunk.with_parse_context(|| {
                format!("Failed to read chunk {} of {}", summary.chunks, input.display())
            })?;
            writer
                .write(&chunk)
                .with_io_context(|| format!("Failed to write {}", output.display()))?;
            summary.rows += chunk.num_rows();
            summary.chunks += 1;
            debug!(
                "Exported chunk {} ({} rows)",
                summary.chunks,
                chunk.num_rows()
            );
        }
        if summary.chunks == 0 {
            // Still emit the header row
            writer
                .write(&RecordBatch::new_empty(projected))
                .with_io_context(|| format!("Failed to write {}", output.display()))?;
        }

        info!(
            "Exported {} rows x {} columns to {} in {} chunks",
            summary.rows,
            self.columns.len(),
            output.display(),
            summary.chunks
        );
        Ok(summary)
    }
}
