use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::SourceRecord;

/// Reads the FAQ table. Each data row becomes one `SourceRecord` whose
/// content lists every column as `header: value`.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    prompt_column: String,
}

impl Default for SourceLoader {
    fn default() -> Self {
        Self::new("prompt")
    }
}

impl SourceLoader {
    pub fn new(prompt_column: impl Into<String>) -> Self {
        Self { prompt_column: prompt_column.into() }
    }

    pub fn load(&self, path: &Path) -> Result<Vec<SourceRecord>> {
        if !path.is_file() {
            return Err(Error::load(path, "file does not exist"));
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(path)
            .map_err(|e| Error::load(path, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::load(path, e))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let prompt_idx = headers
            .iter()
            .position(|h| h == &self.prompt_column)
            .ok_or_else(|| Error::load(path, format!("missing column '{}' (found: {})", self.prompt_column, headers.join(", "))))?;

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| Error::load(path, e))?;
            records.push(Self::to_source_record(row, &headers, prompt_idx, &record));
        }
        if records.is_empty() {
            return Err(Error::load(path, "no data rows"));
        }
        debug!(columns = headers.len(), "source headers: {}", headers.join(", "));
        info!(rows = records.len(), path = %path.display(), "loaded source table");
        Ok(records)
    }

    fn to_source_record(row: usize, headers: &[String], prompt_idx: usize, record: &StringRecord) -> SourceRecord {
        let content = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| format!("{}: {}", h, v.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = record.get(prompt_idx).unwrap_or_default().trim().to_string();
        SourceRecord { row, prompt, content }
    }
}
