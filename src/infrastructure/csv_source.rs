// CSV-backed series source - locates, parses and normalizes voltage data
use crate::application::series_source::SeriesSource;
use crate::domain::series::{MAX_PLAUSIBLE_VOLTS, MIN_PLAUSIBLE_VOLTS, Reading, Series};
use crate::error::PipelineError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;

const TIMESTAMP_COLUMNS: &[&str] = &["ds", "time", "timestamp", "date", "datetime"];
const VALUE_COLUMNS: &[&str] = &["y", "value", "voltage", "v", "volts"];

/// If the median magnitude exceeds this, the column is assumed to be in
/// millivolts and scaled down by 1e-3. A heuristic, not unit metadata:
/// stack cells sit well below 10 V, while mV exports land in the hundreds.
const MILLIVOLT_MEDIAN_CUTOFF: f64 = 10.0;

/// Gaps of up to this many missing steps at the inferred cadence are filled
/// by linear interpolation; longer outages stay as gaps rather than being
/// invented.
const GAP_FILL_LIMIT_STEPS: i64 = 5;

pub struct CsvSeriesSource {
    candidates: Vec<PathBuf>,
    max_series_length: usize,
    context_pad: usize,
}

impl CsvSeriesSource {
    pub fn new(candidates: Vec<PathBuf>, max_series_length: usize, context_pad: usize) -> Self {
        Self {
            candidates,
            max_series_length,
            context_pad,
        }
    }

    async fn read_first_candidate(&self) -> Result<(PathBuf, String), PipelineError> {
        for path in &self.candidates {
            match tokio::fs::read_to_string(path).await {
                Ok(text) if !text.trim().is_empty() => {
                    return Ok((path.clone(), text));
                }
                Ok(_) => {
                    tracing::debug!(path = %path.display(), "candidate exists but is empty");
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "candidate not readable");
                }
            }
        }
        Err(PipelineError::DataUnavailable)
    }

    fn parse(&self, text: &str) -> Result<Series, PipelineError> {
        let mut lines = text.lines();
        let header = lines.next().ok_or(PipelineError::DataUnavailable)?;
        let delimiter = detect_delimiter(header);

        let columns: Vec<String> = header
            .split(delimiter)
            .map(|c| c.trim().trim_matches('"').to_ascii_lowercase())
            .collect();
        let ts_idx = find_column(&columns, TIMESTAMP_COLUMNS).ok_or_else(|| {
            PipelineError::InvalidSchema(format!(
                "no timestamp-like column among {:?}",
                columns
            ))
        })?;
        let value_idx = find_column(&columns, VALUE_COLUMNS).ok_or_else(|| {
            PipelineError::InvalidSchema(format!("no value-like column among {:?}", columns))
        })?;

        let mut rows: Vec<(DateTime<Utc>, f64)> = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
            let parsed = fields
                .get(ts_idx)
                .and_then(|f| parse_timestamp(f))
                .zip(fields.get(value_idx).and_then(|f| f.parse::<f64>().ok()));
            match parsed {
                Some((ts, value)) => rows.push((ts, value)),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "skipped unparseable data rows");
        }
        if rows.is_empty() {
            return Err(PipelineError::InvalidSchema(
                "no parseable data rows".to_string(),
            ));
        }

        let series = self.normalize(rows);
        if series.is_empty() {
            return Err(PipelineError::InvalidSchema(
                "no positive voltage readings".to_string(),
            ));
        }
        Ok(series)
    }

    /// Trailing non-zero streak + context pad, deduplicate (last write wins),
    /// sort, unit-normalize, cap length.
    fn normalize(&self, mut rows: Vec<(DateTime<Utc>, f64)>) -> Series {
        rows.sort_by_key(|(ts, _)| *ts);

        // The file often ends in shutdown zeros; forecast only the trailing
        // operating streak, with some context before it.
        let streak = trailing_positive_streak(&rows);
        let start = streak
            .map(|(s, _)| s.saturating_sub(self.context_pad))
            .unwrap_or(0);
        let end = streak.map(|(_, e)| e).unwrap_or(rows.len() - 1);

        // BTreeMap keeps timestamps unique and ordered; later rows overwrite
        // earlier ones on duplicate timestamps.
        let mut by_time: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
        for (ts, value) in &rows[start..=end] {
            if *value > MIN_PLAUSIBLE_VOLTS {
                by_time.insert(*ts, *value);
            }
        }

        let mut values: Vec<f64> = by_time.values().map(|v| v.abs()).collect();
        let scale = if median(&mut values) > MILLIVOLT_MEDIAN_CUTOFF {
            tracing::info!("median magnitude suggests millivolts, scaling by 1e-3");
            1e-3
        } else {
            1.0
        };

        let readings: Vec<Reading> = by_time
            .into_iter()
            .map(|(ts, v)| Reading::new(ts, v * scale))
            .filter(|r| r.voltage < MAX_PLAUSIBLE_VOLTS)
            .collect();

        let series = Series::new(readings);
        let cadence = series.sampling_interval();
        let mut readings = fill_small_gaps(&series, cadence);

        if readings.len() > self.max_series_length {
            readings.drain(..readings.len() - self.max_series_length);
        }

        Series::new(readings)
    }
}

#[async_trait]
impl SeriesSource for CsvSeriesSource {
    async fn load(&self) -> Result<Series, PipelineError> {
        let (path, text) = self.read_first_candidate().await?;
        let series = self.parse(&text)?;
        tracing::debug!(
            path = %path.display(),
            points = series.len(),
            "loaded voltage series"
        );
        Ok(series)
    }
}

fn detect_delimiter(header: &str) -> char {
    if header.contains('\t') {
        '\t'
    } else if header.contains(';') {
        ';'
    } else {
        ','
    }
}

fn find_column(columns: &[String], names: &[&str]) -> Option<usize> {
    columns
        .iter()
        .position(|c| names.contains(&c.as_str()))
}

fn parse_timestamp(field: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(field) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(field, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Regularize to the inferred cadence: linearly interpolate gaps of up to
/// `GAP_FILL_LIMIT_STEPS` missing steps so the forecast request sees a
/// continuous series. Longer gaps are left untouched.
fn fill_small_gaps(series: &Series, cadence: chrono::Duration) -> Vec<Reading> {
    let readings = series.readings();
    let step_ms = cadence.num_milliseconds();
    if readings.len() < 2 || step_ms <= 0 {
        return readings.to_vec();
    }

    let mut out = Vec::with_capacity(readings.len());
    out.push(readings[0]);
    for pair in readings.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let delta_ms = (next.timestamp - prev.timestamp).num_milliseconds();
        let steps = ((delta_ms as f64) / (step_ms as f64)).round() as i64;
        let missing = steps - 1;
        if (1..=GAP_FILL_LIMIT_STEPS).contains(&missing) {
            for k in 1..steps {
                let ts = prev.timestamp + cadence * k as i32;
                if ts >= next.timestamp {
                    break;
                }
                let frac = k as f64 / steps as f64;
                let value = prev.voltage + (next.voltage - prev.voltage) * frac;
                out.push(Reading::new(ts, value));
            }
        }
        out.push(next);
    }
    out
}

/// Start and end indices (inclusive) of the last run of positive values.
fn trailing_positive_streak(rows: &[(DateTime<Utc>, f64)]) -> Option<(usize, usize)> {
    let end = rows.iter().rposition(|(_, v)| *v > 0.0)?;
    let mut start = end;
    while start > 0 && rows[start - 1].1 > 0.0 {
        start -= 1;
    }
    Some((start, end))
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    values[values.len() / 2]
}
