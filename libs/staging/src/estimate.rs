use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::StagingError;

/// Pricing and throughput of record-by-record writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteCostModel {
    pub price_per_million_writes: f64,
    /// Each record is billed per started unit of this many bytes.
    pub write_unit_bytes: u64,
    pub records_per_second: f64,
}

impl Default for WriteCostModel {
    fn default() -> Self {
        Self {
            price_per_million_writes: 0.50,
            write_unit_bytes: 1024,
            records_per_second: 1000.0,
        }
    }
}

impl WriteCostModel {
    /// USD to write `rows` records of `avg_row_bytes` each.
    pub fn estimate_cost(&self, rows: usize, avg_row_bytes: u64) -> f64 {
        let units = avg_row_bytes.max(1).div_ceil(self.write_unit_bytes.max(1));
        let writes = rows as f64 * units as f64;
        writes / 1_000_000.0 * self.price_per_million_writes
    }

    /// Minutes to write `rows` records.
    pub fn estimate_minutes(&self, rows: usize) -> f64 {
        rows as f64 / self.records_per_second / 60.0
    }

    /// Total cost over `(path, rows)` pairs; row size is averaged from each
    /// file's size on disk.
    pub fn walking_cost(&self, path_rows: &[(PathBuf, usize)]) -> Result<f64, StagingError> {
        let mut total = 0.0;
        for (path, rows) in path_rows {
            let size = fs::metadata(path).map_err(StagingError::io(path))?.len();
            let avg = size / (*rows as u64).max(1);
            let cost = self.estimate_cost(*rows, avg);
            tracing::debug!(path = %path.display(), rows, avg_row_bytes = avg, cost, "write cost");
            total += cost;
        }
        Ok(total)
    }

    pub fn walking_time(&self, path_rows: &[(PathBuf, usize)]) -> f64 {
        path_rows
            .iter()
            .map(|(_, rows)| self.estimate_minutes(*rows))
            .sum()
    }
}

/// Data lines in a CSV, not counting the header or blank lines.
pub fn count_rows(path: &Path) -> Result<usize, StagingError> {
    let reader = BufReader::new(File::open(path).map_err(StagingError::io(path))?);
    let mut rows = 0;
    for line in reader.lines().skip(1) {
        if !line.map_err(StagingError::io(path))?.trim().is_empty() {
            rows += 1;
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_per_write_unit() {
        let model = WriteCostModel::default();
        assert_eq!(model.estimate_cost(2_000_000, 40), 1.0);
        assert_eq!(model.estimate_cost(1_000_000, 1025), 1.0);
        assert_eq!(model.estimate_cost(0, 40), 0.0);
    }

    #[test]
    fn test_minutes() {
        let model = WriteCostModel::default();
        assert_eq!(model.estimate_minutes(120_000), 2.0);
        let pairs = vec![(PathBuf::from("a"), 60_000), (PathBuf::from("b"), 60_000)];
        assert_eq!(model.walking_time(&pairs), 2.0);
    }

    #[test]
    fn test_count_rows_and_walk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp.csv");
        fs::write(&path, "t,v\n1,2\n3,4\n\n").unwrap();
        assert_eq!(count_rows(&path).unwrap(), 2);

        let model = WriteCostModel::default();
        let cost = model.walking_cost(&[(path, 2)]).unwrap();
        assert_eq!(cost, 2.0 / 1_000_000.0 * 0.5);
        assert!(model.walking_cost(&[(dir.path().join("missing.csv"), 1)]).is_err());
    }
}
