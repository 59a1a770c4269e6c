//! Wear-time insights over the `eda` stream.
//!
//! A sample stream is sampled at 4 Hz. Ten-second windows where almost every
//! value sits below a conductance threshold are treated as "device not worn"
//! and dropped; what remains is summarised per day and device.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{json, Value};
use timestone_api::ResultTable;
use tokio_util::sync::CancellationToken;

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::export::csv_line;
use crate::service::QueryService;

pub const DEFAULT_THRESHOLD: f64 = 0.03;
pub const SUMMARY_FILE: &str = "wear_time_summary.csv";
pub const DROPPED_DIR: &str = "dropped_times";

const WINDOW_MILLIS: i64 = 10_000;
const DROP_FRACTION: f64 = 0.9;
const SAMPLES_PER_MINUTE: f64 = 4.0 * 60.0;
const MINUTES_PER_DAY: f64 = 60.0 * 24.0;
const MAX_PARTICIPANT_LEN: usize = 7;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ═══════════════════════════════════════════════════════════════
//  Queries
// ═══════════════════════════════════════════════════════════════

pub fn participants_query(config: &QueryConfig) -> String {
    format!("SELECT DISTINCT \"ppt_id\" FROM {}", config.table_ref())
}

pub fn participant_series_query(config: &QueryConfig, ppt_id: &str) -> Result<String, QueryError> {
    let valid = !ppt_id.is_empty()
        && ppt_id.len() < MAX_PARTICIPANT_LEN
        && ppt_id.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err(QueryError::InvalidParticipant(ppt_id.to_string()));
    }
    Ok(format!(
        "SELECT \"time\", \"value\", \"dev_id\" FROM {} WHERE \"ppt_id\" = '{ppt_id}'",
        config.table_ref()
    ))
}

/// Keep the ids `pattern` matches at their start.
pub fn filter_participants(ids: &[String], pattern: &str) -> Result<Vec<String>, QueryError> {
    let re = Regex::new(&format!("^(?:{pattern})"))?;
    Ok(ids.iter().filter(|id| re.is_match(id)).cloned().collect())
}

pub async fn list_participants<S: QueryService>(
    executor: &QueryExecutor<S>,
    config: &QueryConfig,
    cancel: &CancellationToken,
) -> Result<Vec<String>, QueryError> {
    let (pages, _) = executor.collect(&participants_query(config), cancel).await?;
    let table = ResultTable::from_pages(&pages)?;
    let column = table
        .column("ppt_id")
        .ok_or_else(|| QueryError::Handler("result has no ppt_id column".into()))?;
    Ok(column
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}

pub async fn fetch_participant<S: QueryService>(
    executor: &QueryExecutor<S>,
    config: &QueryConfig,
    ppt_id: &str,
    cancel: &CancellationToken,
) -> Result<ResultTable, QueryError> {
    let query = participant_series_query(config, ppt_id)?;
    tracing::info!(ppt_id, "fetching participant series");
    let (pages, stats) = executor.collect(&query, cancel).await?;
    tracing::debug!("{}", stats.timing_line());
    Ok(ResultTable::from_pages(&pages)?)
}

// ═══════════════════════════════════════════════════════════════
//  Samples & windows
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct WearSample {
    pub time: NaiveDateTime,
    pub value: f64,
    pub dev_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Read `time`, `value` and `dev_id` columns. Null values count as not
/// below any threshold.
pub fn samples_from_table(table: &ResultTable) -> Result<Vec<WearSample>, QueryError> {
    let index = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| QueryError::Handler(format!("result has no {name} column")))
    };
    let (time_idx, value_idx, dev_idx) = (index("time")?, index("value")?, index("dev_id")?);

    table
        .rows
        .iter()
        .map(|row| {
            let raw_time = row[time_idx]
                .as_str()
                .ok_or_else(|| QueryError::Handler(format!("time {} is not text", row[time_idx])))?;
            let time = NaiveDateTime::parse_from_str(raw_time, TIME_FORMAT)
                .map_err(|e| QueryError::Handler(format!("time {raw_time:?}: {e}")))?;
            let value = match &row[value_idx] {
                Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
                Value::String(s) => s
                    .parse()
                    .map_err(|e| QueryError::Handler(format!("value {s:?}: {e}")))?,
                _ => f64::NAN,
            };
            let dev_id = match &row[dev_idx] {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            Ok(WearSample { time, value, dev_id })
        })
        .collect()
}

/// Split `samples` into kept samples and the windows that were dropped.
///
/// Windows are 10 s bins counted from the earliest sample. A window is
/// dropped when more than 90 % of its values are below `threshold`.
/// Dropped windows come back in time order.
pub fn drop_low_windows(
    samples: Vec<WearSample>,
    threshold: f64,
) -> (Vec<WearSample>, Vec<DroppedWindow>) {
    let Some(first) = samples.iter().map(|s| s.time).min() else {
        return (samples, Vec::new());
    };
    let window_of = |s: &WearSample| (s.time - first).num_milliseconds().div_euclid(WINDOW_MILLIS);

    // window -> (below, total, start, end)
    let mut windows: BTreeMap<i64, (usize, usize, NaiveDateTime, NaiveDateTime)> = BTreeMap::new();
    for s in &samples {
        let entry = windows.entry(window_of(s)).or_insert((0, 0, s.time, s.time));
        if s.value < threshold {
            entry.0 += 1;
        }
        entry.1 += 1;
        entry.2 = entry.2.min(s.time);
        entry.3 = entry.3.max(s.time);
    }

    let mut dropped = Vec::new();
    let mut drop_ids = Vec::new();
    for (id, (below, total, start, end)) in &windows {
        if *below as f64 / *total as f64 > DROP_FRACTION {
            drop_ids.push(*id);
            dropped.push(DroppedWindow {
                start: *start,
                end: *end,
            });
        }
    }

    let kept = samples
        .into_iter()
        .filter(|s| drop_ids.binary_search(&window_of(s)).is_err())
        .collect();
    (kept, dropped)
}

// ═══════════════════════════════════════════════════════════════
//  Daily summary
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub dev_id: String,
    pub samples: usize,
    pub minutes_worn: f64,
    pub percent_worn: f64,
}

/// One summary per (date, device), ordered by date then device.
pub fn wear_time_by_day(samples: &[WearSample]) -> Vec<DaySummary> {
    let mut counts: BTreeMap<(NaiveDate, &str), usize> = BTreeMap::new();
    for s in samples {
        *counts.entry((s.time.date(), s.dev_id.as_str())).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((date, dev_id), samples)| {
            let minutes_worn = samples as f64 / SAMPLES_PER_MINUTE;
            DaySummary {
                date,
                dev_id: dev_id.to_string(),
                samples,
                minutes_worn,
                percent_worn: minutes_worn / MINUTES_PER_DAY,
            }
        })
        .collect()
}

/// Everything derived for one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct WearAnalysis {
    pub ppt_id: String,
    pub days: Vec<DaySummary>,
    pub dropped: Vec<DroppedWindow>,
    pub starting_rows: usize,
    pub ending_rows: usize,
}

impl WearAnalysis {
    pub fn dropped_rows(&self) -> usize {
        self.starting_rows - self.ending_rows
    }

    /// Share of rows dropped, in percent with two decimals.
    pub fn dropped_percent(&self) -> f64 {
        if self.starting_rows == 0 {
            return 0.0;
        }
        let pct = self.dropped_rows() as f64 / self.starting_rows as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }
}

pub fn analyze_participant(
    ppt_id: &str,
    table: &ResultTable,
    threshold: f64,
) -> Result<WearAnalysis, QueryError> {
    let samples = samples_from_table(table)?;
    let starting_rows = samples.len();
    let (kept, dropped) = drop_low_windows(samples, threshold);
    Ok(WearAnalysis {
        ppt_id: ppt_id.to_string(),
        days: wear_time_by_day(&kept),
        dropped,
        starting_rows,
        ending_rows: kept.len(),
    })
}

// ═══════════════════════════════════════════════════════════════
//  Output files
// ═══════════════════════════════════════════════════════════════

pub fn write_summary(dir: &Path, analyses: &[WearAnalysis]) -> Result<PathBuf, QueryError> {
    let mut out = String::from("ppt_id,dev_id,date,minutes_worn,percent_worn\n");
    for a in analyses {
        for day in &a.days {
            out.push_str(&csv_line(&[
                json!(a.ppt_id),
                json!(day.dev_id),
                json!(day.date.to_string()),
                json!(day.minutes_worn),
                json!(day.percent_worn),
            ]));
            out.push('\n');
        }
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(SUMMARY_FILE);
    fs::write(&path, out)?;
    Ok(path)
}

pub fn write_dropped(dir: &Path, analysis: &WearAnalysis) -> Result<PathBuf, QueryError> {
    let mut out = String::from("start_time,end_time\n");
    for w in &analysis.dropped {
        out.push_str(&format!(
            "{},{}\n",
            w.start.format(TIME_FORMAT),
            w.end.format(TIME_FORMAT)
        ));
    }
    let dropped_dir = dir.join(DROPPED_DIR);
    fs::create_dir_all(&dropped_dir)?;
    let path = dropped_dir.join(format!("{}.csv", analysis.ppt_id));
    fs::write(&path, out)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIME_FORMAT).unwrap()
    }

    fn series(start: &str, n: usize, value: f64, dev: &str) -> Vec<WearSample> {
        let start = t(start);
        (0..n)
            .map(|i| WearSample {
                time: start + Duration::milliseconds(250 * i as i64),
                value,
                dev_id: dev.into(),
            })
            .collect()
    }

    #[test]
    fn test_queries() {
        let cfg = QueryConfig::new("embrace", "eda");
        assert_eq!(participants_query(&cfg), r#"SELECT DISTINCT "ppt_id" FROM "embrace"."eda""#);
        assert_eq!(
            participant_series_query(&cfg, "fc096").unwrap(),
            r#"SELECT "time", "value", "dev_id" FROM "embrace"."eda" WHERE "ppt_id" = 'fc096'"#
        );
        assert!(matches!(
            participant_series_query(&cfg, "x' OR '1'='1"),
            Err(QueryError::InvalidParticipant(_))
        ));
        assert!(participant_series_query(&cfg, "abcdefg").is_err());
    }

    #[test]
    fn test_filter_is_anchored() {
        let ids: Vec<String> = ["fc096", "fc101", "xfc1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(filter_participants(&ids, "fc0").unwrap(), vec!["fc096".to_string()]);
        assert_eq!(filter_participants(&ids, "fc|x").unwrap().len(), 3);
        assert!(filter_participants(&ids, "(").is_err());
    }

    #[test]
    fn test_samples_from_table() {
        let table = ResultTable {
            columns: vec!["time".into(), "value".into(), "dev_id".into()],
            rows: vec![
                vec![json!("2019-08-01 00:00:00.250000000"), json!(0.5), json!("A1")],
                vec![json!("2019-08-01 00:00:01"), json!("0.01"), json!("A1")],
            ],
        };
        let samples = samples_from_table(&table).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].time, t("2019-08-01 00:00:00.25"));
        assert_eq!(samples[1].value, 0.01);
    }

    #[test]
    fn test_drop_low_windows() {
        // window 0: all low, window 1: all high, window 2: 36 low of 40 (exactly 90 %, kept)
        let mut samples = series("2019-08-01 00:00:00", 40, 0.0, "A1");
        samples.extend(series("2019-08-01 00:00:10", 40, 1.0, "A1"));
        let mut third = series("2019-08-01 00:00:20", 40, 0.0, "A1");
        for s in third.iter_mut().take(4) {
            s.value = 1.0;
        }
        samples.extend(third);

        let (kept, dropped) = drop_low_windows(samples, DEFAULT_THRESHOLD);
        assert_eq!(kept.len(), 80);
        assert_eq!(
            dropped,
            vec![DroppedWindow {
                start: t("2019-08-01 00:00:00"),
                end: t("2019-08-01 00:00:09.75"),
            }]
        );
    }

    #[test]
    fn test_wear_time_by_day() {
        let mut samples = series("2019-08-01 23:59:00", 240, 1.0, "A1");
        samples.extend(series("2019-08-02 00:00:00", 480, 1.0, "A1"));
        samples.extend(series("2019-08-02 00:00:00", 240, 1.0, "B2"));
        let days = wear_time_by_day(&samples);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2019, 8, 1).unwrap());
        assert_eq!(days[0].minutes_worn, 1.0);
        assert_eq!(days[1].dev_id, "A1");
        assert_eq!(days[1].minutes_worn, 2.0);
        assert_eq!(days[2].dev_id, "B2");
        assert_eq!(days[2].percent_worn, 1.0 / 1440.0);
    }

    #[test]
    fn test_analysis_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = Vec::new();
        for s in series("2019-08-01 00:00:00", 40, 0.0, "A1")
            .into_iter()
            .chain(series("2019-08-01 00:00:10", 40, 1.0, "A1"))
        {
            rows.push(vec![
                json!(s.time.format(TIME_FORMAT).to_string()),
                json!(s.value),
                json!(s.dev_id),
            ]);
        }
        let table = ResultTable {
            columns: vec!["time".into(), "value".into(), "dev_id".into()],
            rows,
        };
        let analysis = analyze_participant("fc096", &table, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(analysis.dropped_rows(), 40);
        assert_eq!(analysis.dropped_percent(), 50.0);

        let summary = write_summary(dir.path(), &[analysis.clone()]).unwrap();
        let text = fs::read_to_string(summary).unwrap();
        assert_eq!(
            text.lines().next(),
            Some("ppt_id,dev_id,date,minutes_worn,percent_worn")
        );
        assert!(text.lines().nth(1).unwrap().starts_with("fc096,A1,2019-08-01,"));

        let dropped = write_dropped(dir.path(), &analysis).unwrap();
        assert_eq!(dropped, dir.path().join("dropped_times/fc096.csv"));
        assert_eq!(fs::read_to_string(dropped).unwrap().lines().count(), 2);
    }
}
