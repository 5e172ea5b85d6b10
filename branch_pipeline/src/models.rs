use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub branch: String,
    pub timestamp: NaiveDateTime,
    // Remaining columns, lower-cased header -> raw value, in file order
    pub extra_fields: Vec<(String, String)>,
}

impl TransactionRecord {
    pub fn new(branch: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            branch: branch.into(),
            timestamp,
            extra_fields: vec![],
        }
    }

    pub fn field(&self, column: &str) -> Option<&str> {
        self.extra_fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub branch: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl BranchRecord {
    /// Both coordinates, only when present and finite.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

/// One row of the outer join between transactions and the branch directory.
/// At least one side is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTransaction {
    pub branch: String,
    pub transaction: Option<TransactionRecord>,
    pub location: Option<BranchRecord>,
}

impl EnrichedTransaction {
    pub fn is_matched(&self) -> bool {
        self.transaction.is_some() && self.location.is_some()
    }
}

/// One month of the pre-aggregated file: every value column as (series name, count)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub month: String,
    pub values: Vec<(String, u64)>,
}

impl MonthlyRow {
    pub fn value(&self, series: &str) -> Option<u64> {
        self.values.iter().find(|(name, _)| name == series).map(|(_, v)| *v)
    }

    pub fn total(&self) -> u64 {
        self.values.iter().map(|(_, v)| v).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchCount {
    pub branch: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub transactions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayShare {
    pub day: String,
    pub percentage: f64,
}

pub const DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: Option<(f64, f64)>,
    pub zoom: u8,
    pub points: Vec<MapPoint>,
}

impl MapView {
    /// Bounding box as ((min_lat, max_lat), (min_lon, max_lon)).
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let first = self.points.first()?;
        let init = ((first.lat, first.lat), (first.lon, first.lon));
        Some(self.points.iter().fold(init, |((lo_lat, hi_lat), (lo_lon, hi_lon)), p| {
            (
                (lo_lat.min(p.lat), hi_lat.max(p.lat)),
                (lo_lon.min(p.lon), hi_lon.max(p.lon)),
            )
        }))
    }
}
