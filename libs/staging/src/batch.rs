use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::csv::{join_fields, split_line};
use crate::error::StagingError;
use crate::layout::{extract_ids_from_path, extract_month, stream_of};

pub const PENDING_DIR: &str = "pending_upload";

const ACC_HEADER: [&str; 6] = ["Time", "x", "y", "z", "ppt_id", "dev_id"];
const MEASURE_HEADER: [&str; 4] = ["Time", "MeasureValue", "ppt_id", "dev_id"];

/// Where staged files go and how big they may grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub output_dir: PathBuf,
    pub chunk_rows: usize,
    pub max_file_bytes: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            chunk_rows: 1_000_000,
            // batch load rejects objects of 5 GB and above
            max_file_bytes: 4_900_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub files_read: usize,
    pub records_written: usize,
    /// Rows whose field count did not match the stream; padded or cut to fit.
    pub malformed_rows: usize,
    pub outputs: BTreeSet<PathBuf>,
    pub bytes_written: u64,
}

// ═══════════════════════════════════════════════════════════════
//  BatchWriter
// ═══════════════════════════════════════════════════════════════

/// Re-shapes raw sensor CSVs into combined files for batch loading:
/// `<out>/pending_upload/<month>/<stream>/combined_<n>.csv`.
///
/// Output indexes are tracked per directory for the writer's lifetime and
/// start after the highest file already on disk.
pub struct BatchWriter {
    config: BatchConfig,
    indexes: HashMap<PathBuf, usize>,
}

impl BatchWriter {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            indexes: HashMap::new(),
        }
    }

    pub fn pending_dir(&self) -> PathBuf {
        self.config.output_dir.join(PENDING_DIR)
    }

    pub fn stage(&mut self, paths: &[PathBuf]) -> Result<StageReport, StagingError> {
        let mut report = StageReport::default();
        for path in paths {
            self.stage_file(path, &mut report)?;
            report.files_read += 1;
        }
        tracing::info!(
            files = report.files_read,
            records = report.records_written,
            malformed = report.malformed_rows,
            outputs = report.outputs.len(),
            bytes = report.bytes_written,
            "staging finished"
        );
        Ok(report)
    }

    fn stage_file(&mut self, path: &Path, report: &mut StageReport) -> Result<(), StagingError> {
        let month = extract_month(path)?;
        let (dev_id, ppt_id) = extract_ids_from_path(path)?;
        let stream = stream_of(path)?;
        let header: &[&str] = if stream == "acc" { &ACC_HEADER } else { &MEASURE_HEADER };
        let width = header.len() - 2;

        let dir = self.pending_dir().join(&month).join(&stream);
        fs::create_dir_all(&dir).map_err(StagingError::io(&dir))?;
        tracing::debug!(path = %path.display(), %ppt_id, %dev_id, %stream, "staging file");

        let reader = BufReader::new(File::open(path).map_err(StagingError::io(path))?);
        let mut chunk = String::new();
        let mut chunk_rows = 0usize;
        let mut chunks = 0usize;
        let mut malformed = 0usize;

        // first line is the export's own header
        for line in reader.lines().skip(1) {
            let line = line.map_err(StagingError::io(path))?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let mut fields = split_line(line);
            if fields.len() != width {
                malformed += 1;
                fields.resize(width, String::new());
            }
            fields.push(ppt_id.clone());
            fields.push(dev_id.clone());
            chunk.push_str(&join_fields(&fields));
            chunk.push('\n');
            chunk_rows += 1;

            if chunk_rows == self.config.chunk_rows {
                chunks += 1;
                self.append_chunk(&dir, header, &chunk, chunk_rows, report)?;
                chunk.clear();
                chunk_rows = 0;
            }
        }
        if chunk_rows > 0 {
            chunks += 1;
            self.append_chunk(&dir, header, &chunk, chunk_rows, report)?;
        }

        if malformed > 0 {
            tracing::warn!(
                path = %path.display(),
                rows = malformed,
                expected_fields = width,
                "rows with the wrong field count were padded or cut"
            );
            report.malformed_rows += malformed;
        }
        tracing::info!(path = %path.display(), chunks, "file staged");
        Ok(())
    }

    fn append_chunk(
        &mut self,
        dir: &Path,
        header: &[&str],
        chunk: &str,
        rows: usize,
        report: &mut StageReport,
    ) -> Result<(), StagingError> {
        let header_line = format!("{}\n", join_fields(header));
        let mut index = match self.indexes.get(dir) {
            Some(i) => *i,
            None => highest_index(dir)?.unwrap_or(0),
        };
        let mut target = dir.join(combined_name(index));
        let current = file_len(&target)?;
        if current > header_line.len() as u64
            && current + chunk.len() as u64 > self.config.max_file_bytes
        {
            index += 1;
            target = dir.join(combined_name(index));
            tracing::info!(path = %target.display(), "size limit reached, starting new file");
        }
        self.indexes.insert(dir.to_path_buf(), index);

        let fresh = file_len(&target)? == 0;
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target)
            .map_err(StagingError::io(&target))?;
        let mut written = 0u64;
        if fresh {
            tracing::info!(path = %target.display(), "creating new file");
            out.write_all(header_line.as_bytes())
                .map_err(StagingError::io(&target))?;
            written += header_line.len() as u64;
        }
        out.write_all(chunk.as_bytes())
            .map_err(StagingError::io(&target))?;
        written += chunk.len() as u64;

        report.records_written += rows;
        report.bytes_written += written;
        report.outputs.insert(target);
        Ok(())
    }
}

fn combined_name(index: usize) -> String {
    format!("combined_{index}.csv")
}

fn file_len(path: &Path) -> Result<u64, StagingError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(StagingError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Highest `n` among `combined_<n>.csv` files in `dir`.
fn highest_index(dir: &Path) -> Result<Option<usize>, StagingError> {
    let mut highest = None;
    for entry in fs::read_dir(dir).map_err(StagingError::io(dir))? {
        let entry = entry.map_err(StagingError::io(dir))?;
        let name = entry.file_name();
        let n = name
            .to_str()
            .and_then(|n| n.strip_prefix("combined_"))
            .and_then(|n| n.strip_suffix(".csv"))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(n) = n {
            highest = highest.max(Some(n));
        }
    }
    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "Sensors_U02_ALLSITES_20190801_20190831";

    fn sensor_file(root: &Path, site: &str, num: &str, dev: &str, stream: &str, body: &str) -> PathBuf {
        let dir = root.join(EXPORT).join("U02").join(site).join(num).join(dev);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{stream}.csv"));
        fs::write(&path, body).unwrap();
        path
    }

    fn writer(out: &Path, chunk_rows: usize, max_file_bytes: u64) -> BatchWriter {
        BatchWriter::new(BatchConfig {
            output_dir: out.to_path_buf(),
            chunk_rows,
            max_file_bytes,
        })
    }

    #[test]
    fn test_stage_appends_ids() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let temp = sensor_file(src.path(), "FC", "096", "2M4Y4111FK", "temp", "timestamp,temp\n1564617600000,31.5\n1564617600250,31.6\n");
        let acc = sensor_file(src.path(), "FC", "096", "2M4Y4111FK", "acc", "t,x,y,z\n1,0.1,0.2,0.3\n");

        let report = writer(out.path(), 1000, u64::MAX).stage(&[temp, acc]).unwrap();
        assert_eq!(report.files_read, 2);
        assert_eq!(report.records_written, 3);
        assert_eq!(report.outputs.len(), 2);

        let month = out.path().join(PENDING_DIR).join("20190801_20190831");
        let staged = fs::read_to_string(month.join("temp/combined_0.csv")).unwrap();
        assert_eq!(
            staged,
            "Time,MeasureValue,ppt_id,dev_id\n1564617600000,31.5,fc096,2M4Y4111FK\n1564617600250,31.6,fc096,2M4Y4111FK\n"
        );
        let staged = fs::read_to_string(month.join("acc/combined_0.csv")).unwrap();
        assert_eq!(staged, "Time,x,y,z,ppt_id,dev_id\n1,0.1,0.2,0.3,fc096,2M4Y4111FK\n");
        let total: u64 = report.outputs.iter().map(|p| fs::metadata(p).unwrap().len()).sum();
        assert_eq!(report.bytes_written, total);
    }

    #[test]
    fn test_second_file_appends_without_header() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let a = sensor_file(src.path(), "FC", "096", "A", "eda", "h\n1,0.5\n");
        let b = sensor_file(src.path(), "FC", "097", "B", "eda", "h\n2,0.7\n");

        writer(out.path(), 1000, u64::MAX).stage(&[a, b]).unwrap();
        let staged = fs::read_to_string(
            out.path().join(PENDING_DIR).join("20190801_20190831/eda/combined_0.csv"),
        )
        .unwrap();
        assert_eq!(staged, "Time,MeasureValue,ppt_id,dev_id\n1,0.5,fc096,A\n2,0.7,fc097,B\n");
    }

    #[test]
    fn test_rolls_over_at_size_limit() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let body: String = std::iter::once("h\n".to_string())
            .chain((0..6).map(|i| format!("{i},0.5\n")))
            .collect();
        let eda = sensor_file(src.path(), "FC", "096", "A", "eda", &body);

        // each 2-row chunk is "n,0.5,fc096,A\n" * 2 = 28 bytes, header is 32
        let report = writer(out.path(), 2, 100).stage(&[eda]).unwrap();
        let names: Vec<String> = report
            .outputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["combined_0.csv", "combined_1.csv"]);
        assert_eq!(report.records_written, 6);

        let dir = out.path().join(PENDING_DIR).join("20190801_20190831/eda");
        let first = fs::read_to_string(dir.join("combined_0.csv")).unwrap();
        let second = fs::read_to_string(dir.join("combined_1.csv")).unwrap();
        assert_eq!(first.lines().count(), 5);
        assert_eq!(second.lines().count(), 3);
        assert!(second.starts_with("Time,MeasureValue"));
    }

    #[test]
    fn test_index_continues_from_existing_files() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let dir = out.path().join(PENDING_DIR).join("20190801_20190831/temp");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("combined_3.csv"), "Time,MeasureValue,ppt_id,dev_id\n").unwrap();
        fs::write(dir.join("combined_1.csv"), "").unwrap();

        let temp = sensor_file(src.path(), "FC", "096", "A", "temp", "h\n1,30\n");
        let report = writer(out.path(), 10, u64::MAX).stage(&[temp]).unwrap();
        assert_eq!(report.outputs.into_iter().collect::<Vec<_>>(), vec![dir.join("combined_3.csv")]);
        assert_eq!(
            fs::read_to_string(dir.join("combined_3.csv")).unwrap(),
            "Time,MeasureValue,ppt_id,dev_id\n1,30,fc096,A\n"
        );
    }

    #[test]
    fn test_wrong_field_counts_are_counted() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let eda = sensor_file(src.path(), "FC", "096", "A", "eda", "h\n1,0.5\n2\n3,0.7,extra\n");

        let report = writer(out.path(), 1000, u64::MAX).stage(&[eda]).unwrap();
        assert_eq!(report.records_written, 3);
        assert_eq!(report.malformed_rows, 2);
        let staged = fs::read_to_string(
            out.path().join(PENDING_DIR).join("20190801_20190831/eda/combined_0.csv"),
        )
        .unwrap();
        assert_eq!(
            staged,
            "Time,MeasureValue,ppt_id,dev_id\n1,0.5,fc096,A\n2,,fc096,A\n3,0.7,fc096,A\n"
        );
    }

    #[test]
    fn test_bad_layout_is_reported() {
        let src = tempfile::tempdir().unwrap();
        let path = src.path().join("temp.csv");
        fs::write(&path, "h\n1,2\n").unwrap();
        let result = writer(src.path(), 10, u64::MAX).stage(&[path]);
        assert!(matches!(result, Err(StagingError::BadLayout(_))));
    }
}
