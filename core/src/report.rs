//! JSON reports.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use framelens_common::{ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::debug;

/// Total memory of the loaded table against the optimized one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryComparison {
    #[serde(rename = "Original memory usage")]
    pub original: u64,
    #[serde(rename = "Optimized memory usage")]
    pub optimized: u64,
}

impl MemoryComparison {
    pub fn new(original: u64, optimized: u64) -> Self {
        Self {
            original,
            optimized,
        }
    }

    /// Bytes saved by the optimization; zero if it grew
    pub fn saved_bytes(&self) -> u64 {
        self.original.saturating_sub(self.optimized)
    }
}

/// Serialize `value` as JSON indented by four spaces, replacing any file at `path`.
pub fn save_to_json<T>(value: &T, path: impl AsRef<Path>) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let path = path.as_ref();
    let file = File::create(path)
        .with_io_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .with_serialization_context(|| format!("Failed to encode {}", path.display()))?;
    writer
        .flush()
        .with_io_context(|| format!("Failed to write {}", path.display()))?;

    debug!("Wrote {}", path.display());
    Ok(())
}
