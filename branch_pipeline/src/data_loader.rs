use crate::error::{CoercionWarning, PipelineError, Result};
use crate::models::{BranchRecord, MonthlyRow, TransactionRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use log::{info, warn};
use std::fs::File;
use std::path::Path;

pub const DEFAULT_TIMESTAMP_COLUMN: &str = "date/time";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Reads the flat input files. Every field is read as text first and
/// coerced afterwards.
#[derive(Debug, Clone)]
pub struct DataLoader {
    timestamp_column: String,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_COLUMN)
    }
}

impl DataLoader {
    pub fn new(timestamp_column: &str) -> Self {
        Self {
            timestamp_column: timestamp_column.trim().to_lowercase(),
        }
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    /// Load transaction rows, parsing the timestamp column of every row
    pub fn load_transactions(&self, path: &Path, max_rows: Option<usize>) -> Result<Vec<TransactionRecord>> {
        let (headers, rows) = read_table(path, max_rows)?;

        let ts_idx = column_index(&headers, &self.timestamp_column).ok_or_else(|| {
            PipelineError::data_format(path, format!("missing timestamp column '{}'", self.timestamp_column))
        })?;
        let branch_idx = column_index(&headers, "branch")
            .ok_or_else(|| PipelineError::data_format(path, "missing 'branch' column"))?;

        let mut transactions = Vec::with_capacity(rows.len());

        for (idx, row) in rows.iter().enumerate() {
            let raw = row.get(ts_idx).unwrap_or("");
            let timestamp = parse_timestamp(raw).ok_or_else(|| {
                PipelineError::data_format(
                    path,
                    format!("row {}: cannot parse '{}' in '{}' as a date-time", idx + 1, raw, self.timestamp_column),
                )
            })?;

            let extra_fields = headers
                .iter()
                .enumerate()
                .filter(|(col, _)| *col != ts_idx && *col != branch_idx)
                .map(|(col, name)| (name.clone(), row.get(col).unwrap_or("").to_string()))
                .collect();

            transactions.push(TransactionRecord {
                branch: row.get(branch_idx).unwrap_or("").to_string(),
                timestamp,
                extra_fields,
            });
        }

        info!("Loaded {} transactions from {}", transactions.len(), path.display());
        Ok(transactions)
    }

    /// Load the branch directory, logging every coordinate that had to be dropped
    pub fn load_branches(&self, path: &Path, max_rows: Option<usize>) -> Result<Vec<BranchRecord>> {
        let (branches, warnings) = self.load_branches_with_warnings(path, max_rows)?;
        for warning in &warnings {
            warn!("{}", warning);
        }
        Ok(branches)
    }

    pub fn load_branches_with_warnings(
        &self,
        path: &Path,
        max_rows: Option<usize>,
    ) -> Result<(Vec<BranchRecord>, Vec<CoercionWarning>)> {
        let (headers, rows) = read_table(path, max_rows)?;

        let required = |name: &str| {
            column_index(&headers, name)
                .ok_or_else(|| PipelineError::data_format(path, format!("missing '{}' column", name)))
        };
        let branch_idx = required("branch")?;
        let name_idx = required("name")?;
        let lat_idx = required("lat")?;
        let lon_idx = required("lon")?;

        let mut branches = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            let mut coordinate = |col: usize, column: &str| {
                let raw = row.get(col).unwrap_or("");
                let (value, bad) = coerce_float(raw);
                if bad {
                    warnings.push(CoercionWarning {
                        path: path.to_path_buf(),
                        row: idx + 1,
                        column: column.to_string(),
                        value: raw.to_string(),
                    });
                }
                value
            };
            let lat = coordinate(lat_idx, "lat");
            let lon = coordinate(lon_idx, "lon");

            branches.push(BranchRecord {
                branch: row.get(branch_idx).unwrap_or("").to_string(),
                name: row.get(name_idx).unwrap_or("").to_string(),
                lat,
                lon,
            });
        }

        info!(
            "Loaded {} branches from {} ({} without usable coordinates)",
            branches.len(),
            path.display(),
            branches.iter().filter(|b| b.coordinates().is_none()).count()
        );
        Ok((branches, warnings))
    }

    /// Load the pre-aggregated monthly series. The month label comes from the
    /// `month` column (or the first column); every other column is a series.
    pub fn load_monthly(&self, path: &Path) -> Result<Vec<MonthlyRow>> {
        let (headers, rows) = read_table(path, None)?;

        let month_idx = column_index(&headers, "month").unwrap_or(0);
        let series: Vec<(usize, &String)> = headers
            .iter()
            .enumerate()
            .filter(|(c, _)| *c != month_idx)
            .collect();
        if series.is_empty() {
            return Err(PipelineError::data_format(path, "monthly file needs at least one count column"));
        }

        let mut monthly = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            let mut values = Vec::with_capacity(series.len());
            for (col, name) in &series {
                let raw = row.get(*col).unwrap_or("").trim();
                let count = raw.parse::<u64>().map_err(|_| {
                    PipelineError::data_format(
                        path,
                        format!("row {}: '{}' value '{}' is not a whole number", idx + 1, name, raw),
                    )
                })?;
                values.push(((*name).clone(), count));
            }
            monthly.push(MonthlyRow {
                month: row.get(month_idx).unwrap_or("").trim().to_string(),
                values,
            });
        }

        info!(
            "Loaded {} monthly rows ({} series) from {}",
            monthly.len(),
            series.len(),
            path.display()
        );
        Ok(monthly)
    }
}

/// Read headers (trimmed, lower-cased) and up to `max_rows` records.
fn read_table(path: &Path, max_rows: Option<usize>) -> Result<(Vec<String>, Vec<StringRecord>)> {
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::from_csv(path, e))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let limit = max_rows.unwrap_or(usize::MAX);
    let mut rows = Vec::new();
    for record in reader.records().take(limit) {
        rows.push(record.map_err(|e| PipelineError::from_csv(path, e))?);
    }

    Ok((headers, rows))
}

fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Returns the parsed value and whether a non-empty value had to be dropped.
fn coerce_float(raw: &str) -> (Option<f64>, bool) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (None, false);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => (Some(v), false),
        _ => (None, true),
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts);
    }

    // Offsets are dropped, keeping the wall-clock time as written
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
