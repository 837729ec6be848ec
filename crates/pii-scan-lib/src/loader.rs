use crate::data_structures::ColumnSample;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_MAX_SAMPLES: usize = 5;
/// Uploads above this size are rejected before parsing.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

pub struct CsvLoader {
    max_samples_per_column: usize,
}

impl CsvLoader {
    pub fn new(max_samples_per_column: usize) -> Self {
        Self {
            max_samples_per_column,
        }
    }

    pub fn max_samples_per_column(&self) -> usize {
        self.max_samples_per_column
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ColumnSample>> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        if metadata.len() > MAX_FILE_BYTES {
            anyhow::bail!(
                "CSV file too large: {} ({} bytes, max {} bytes)",
                path.display(),
                metadata.len(),
                MAX_FILE_BYTES
            );
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        self.load_from_reader(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))
    }

    /// Samples every column of a headed CSV stream, in header order.
    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<Vec<ColumnSample>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .context("Failed to read header row")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            anyhow::bail!("CSV has no header row");
        }

        let mut samplers: Vec<ColumnSampler> = headers
            .iter()
            .map(|_| ColumnSampler::new(self.max_samples_per_column))
            .collect();

        let mut rows = 0usize;
        for (row_num, record) in csv_reader.records().enumerate() {
            // header is line 1
            let record = record.with_context(|| format!("Failed to read row {}", row_num + 2))?;
            rows += 1;

            for (sampler, value) in samplers.iter_mut().zip(record.iter()) {
                sampler.offer(value);
            }

            if samplers.iter().all(|s| s.is_full()) {
                break;
            }
        }

        debug!(columns = headers.len(), rows, "sampled CSV columns");

        Ok(headers
            .into_iter()
            .zip(samplers)
            .map(|(name, sampler)| ColumnSample::new(name, sampler.into_samples()))
            .collect())
    }
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES)
    }
}

/// First-seen unique, non-blank values up to a cap.
struct ColumnSampler {
    cap: usize,
    seen: HashSet<String>,
    samples: Vec<String>,
}

impl ColumnSampler {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            seen: HashSet::new(),
            samples: Vec::new(),
        }
    }

    fn offer(&mut self, value: &str) {
        if self.is_full() || value.trim().is_empty() {
            return;
        }
        if self.seen.insert(value.to_string()) {
            self.samples.push(value.to_string());
        }
    }

    fn is_full(&self) -> bool {
        self.samples.len() >= self.cap
    }

    fn into_samples(self) -> Vec<String> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_samples_deduplicated_in_order() {
        let loader = CsvLoader::new(5);
        let content = "email,age\na@b.com,31\nc@d.com,31\na@b.com,42\n";

        let columns = loader.load_from_reader(content.as_bytes()).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].column_name(), "email");
        assert_eq!(columns[0].samples(), &["a@b.com".to_string(), "c@d.com".to_string()]);
        assert_eq!(columns[1].samples(), &["31".to_string(), "42".to_string()]);
    }

    #[test]
    fn test_samples_capped() {
        let loader = CsvLoader::new(2);
        let content = "id\n1\n2\n3\n4\n";

        let columns = loader.load_from_reader(content.as_bytes()).unwrap();
        assert_eq!(columns[0].samples(), &["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_blank_values_dropped() {
        let loader = CsvLoader::default();
        let content = "name,notes\nAda,\n,  \nGrace,\n";

        let columns = loader.load_from_reader(content.as_bytes()).unwrap();
        assert_eq!(columns[0].samples(), &["Ada".to_string(), "Grace".to_string()]);
        assert!(columns[1].is_empty());
    }

    #[test]
    fn test_ragged_rows_tolerated() {
        let loader = CsvLoader::default();
        let content = "a,b,c\n1,2\n4,5,6,7\n";

        let columns = loader.load_from_reader(content.as_bytes()).unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[2].samples(), &["6".to_string()]);
    }

    #[test]
    fn test_header_only_file() {
        let loader = CsvLoader::default();
        let columns = loader.load_from_reader("ssn,phone\n".as_bytes()).unwrap();
        assert_eq!(columns.len(), 2);
        assert!(columns.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_empty_input_rejected() {
        let loader = CsvLoader::default();
        assert!(loader.load_from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn test_quoted_values() {
        let loader = CsvLoader::default();
        let content = "address\n\"1 Main St, Springfield\"\n";

        let columns = loader.load_from_reader(content.as_bytes()).unwrap();
        assert_eq!(columns[0].samples(), &["1 Main St, Springfield".to_string()]);
    }

    #[test]
    fn test_load_from_file() {
        let loader = CsvLoader::default();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"first_name,phone\nAda,555-0100\nGrace,555-0199\n")
            .unwrap();

        let columns = loader.load_from_file(temp_file.path()).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].samples().len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let loader = CsvLoader::default();
        let err = loader.load_from_file("/definitely/not/here.csv").unwrap_err();
        assert!(err.to_string().contains("Failed to open file"));
    }
}
