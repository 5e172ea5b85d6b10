use crate::error::{PipelineError, Result};
use crate::models::{
    day_name, BranchCount, BranchRecord, DayShare, HourBucket, MapPoint, MapView, MonthlyRow, TransactionRecord,
    DAYS,
};
use chrono::{Datelike, Timelike};
use polars::prelude::*;

pub const NATIONWIDE_ZOOM: u8 = 11;
pub const CITY_ZOOM: u8 = 12;

/// Monthly series as read from the pre-aggregated file, in file order
pub fn monthly_counts(monthly_raw: &[MonthlyRow]) -> Vec<MonthlyRow> {
    monthly_raw.to_vec()
}

/// Distinct series names across the monthly rows, in first-seen order
pub fn monthly_series(monthly: &[MonthlyRow]) -> Vec<String> {
    let mut names: Vec<String> = vec![];
    for (name, _) in monthly.iter().flat_map(|m| m.values.iter()) {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

/// Count transactions per branch label and keep the `n` busiest.
///
/// Ties keep the order in which the branches first appear.
pub fn top_branches<'a, I>(transactions: I, n: usize) -> Result<Vec<BranchCount>>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    if n == 0 {
        return Err(PipelineError::InvalidTopN(n));
    }

    let labels: Vec<&str> = transactions.into_iter().map(|t| t.branch.as_str()).collect();
    if labels.is_empty() {
        return Ok(vec![]);
    }

    let df = df!("branch" => labels)?;
    // IdxSize is u32 unless polars is built with bigidx
    let limit = IdxSize::try_from(n).unwrap_or(IdxSize::MAX);

    let ranked = df
        .lazy()
        .group_by_stable([col("branch")])
        .agg([len().alias("count")])
        .sort(
            ["count"],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(limit)
        .collect()?;

    let branches = ranked.column("branch")?.str()?;
    let counts = ranked.column("count")?.cast(&DataType::UInt64)?;
    let counts = counts.u64()?;

    Ok(branches
        .into_iter()
        .zip(counts.into_iter())
        .filter_map(|(branch, count)| {
            Some(BranchCount {
                branch: branch?.to_string(),
                count: count?,
            })
        })
        .collect())
}

/// Transactions per hour of day, always 24 buckets in hour order
pub fn hour_histogram<'a, I>(transactions: I) -> Vec<HourBucket>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut counts = [0u64; 24];
    for txn in transactions {
        counts[txn.timestamp.hour() as usize] += 1;
    }

    counts
        .iter()
        .enumerate()
        .map(|(hour, &transactions)| HourBucket {
            hour: hour as u32,
            transactions,
        })
        .collect()
}

/// Share of transactions per weekday, Monday to Sunday.
///
/// With no transactions every day is 0.0.
pub fn day_percentages<'a, I>(transactions: I) -> Vec<DayShare>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut counts = [0u64; 7];
    for txn in transactions {
        counts[txn.timestamp.weekday().num_days_from_monday() as usize] += 1;
    }

    let total: u64 = counts.iter().sum();

    DAYS.iter()
        .zip(counts.iter())
        .map(|(day, &count)| DayShare {
            day: day_name(*day).to_string(),
            percentage: if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Every branch with usable coordinates, centred on their mean position
pub fn nationwide_map(branches: &[BranchRecord]) -> MapView {
    let points: Vec<MapPoint> = branches
        .iter()
        .filter_map(|b| {
            b.coordinates().map(|(lat, lon)| MapPoint {
                lat,
                lon,
                label: b.name.clone(),
            })
        })
        .collect();

    let center = if points.is_empty() {
        None
    } else {
        let n = points.len() as f64;
        let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
        let lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
        Some((lat, lon))
    };

    MapView {
        center,
        zoom: NATIONWIDE_ZOOM,
        points,
    }
}

/// One marker per located branch, labelled with code and name, centred on
/// the first located branch
pub fn city_map(branches: &[BranchRecord]) -> MapView {
    let points: Vec<MapPoint> = branches
        .iter()
        .filter_map(|b| {
            b.coordinates().map(|(lat, lon)| MapPoint {
                lat,
                lon,
                label: format!("{}{}", b.branch, b.name),
            })
        })
        .collect();

    MapView {
        center: points.first().map(|p| (p.lat, p.lon)),
        zoom: CITY_ZOOM,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        // 2021-03-01 is a Monday
        NaiveDate::from_ymd_opt(2021, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn txns_for(branches: &[&str]) -> Vec<TransactionRecord> {
        branches
            .iter()
            .map(|b| TransactionRecord::new(*b, at(1, 9)))
            .collect()
    }

    #[test]
    fn test_top_branches_example() {
        let txns = txns_for(&["A", "B", "A", "C", "A", "B"]);

        let top = top_branches(&txns, 2).unwrap();

        assert_eq!(
            top,
            vec![
                BranchCount { branch: "A".to_string(), count: 3 },
                BranchCount { branch: "B".to_string(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_top_branches_ties_keep_first_occurrence() {
        let txns = txns_for(&["C", "B", "A", "B", "C", "A", "D"]);

        let top = top_branches(&txns, 10).unwrap();
        let labels: Vec<_> = top.iter().map(|b| b.branch.as_str()).collect();

        assert_eq!(labels, vec!["C", "B", "A", "D"]);
    }

    #[test]
    fn test_top_branches_rejects_zero() {
        let txns = txns_for(&["A"]);
        assert!(matches!(top_branches(&txns, 0), Err(PipelineError::InvalidTopN(0))));
    }

    #[test]
    fn test_top_branches_properties() {
        let txns = txns_for(&["E", "A", "B", "A", "C", "E", "E", "D", "B", "E"]);

        for n in 1..8 {
            let top = top_branches(&txns, n).unwrap();
            assert_eq!(top.len(), n.min(5));
            assert!(top.windows(2).all(|w| w[0].count >= w[1].count));

            let mut labels: Vec<_> = top.iter().map(|b| b.branch.clone()).collect();
            labels.sort();
            labels.dedup();
            assert_eq!(labels.len(), top.len());
        }
    }

    #[test]
    fn test_top_branches_huge_n_returns_everything() {
        let txns = txns_for(&["A", "B", "A", "C"]);

        let top = top_branches(&txns, u32::MAX as usize + 1).unwrap();

        assert_eq!(top.len(), 3);
        assert_eq!(top[0], BranchCount { branch: "A".to_string(), count: 2 });
    }

    #[test]
    fn test_top_branches_empty_input() {
        let txns: Vec<TransactionRecord> = vec![];
        assert!(top_branches(&txns, 10).unwrap().is_empty());
    }

    #[test]
    fn test_hour_histogram_example() {
        let txns: Vec<_> = [0, 0, 23, 23, 23]
            .iter()
            .map(|h| TransactionRecord::new("A", at(1, *h)))
            .collect();

        let hist = hour_histogram(&txns);

        assert_eq!(hist.len(), 24);
        assert_eq!(hist[0], HourBucket { hour: 0, transactions: 2 });
        assert_eq!(hist[1], HourBucket { hour: 1, transactions: 0 });
        assert_eq!(hist[23], HourBucket { hour: 23, transactions: 3 });
        assert!(hist.iter().enumerate().all(|(i, b)| b.hour == i as u32));
    }

    #[test]
    fn test_hour_histogram_sums_to_total() {
        let base = at(1, 0);
        let txns: Vec<_> = (0..500)
            .map(|i| TransactionRecord::new("A", base + Duration::minutes(i * 37)))
            .collect();

        let hist = hour_histogram(&txns);
        let total: u64 = hist.iter().map(|b| b.transactions).sum();

        assert_eq!(hist.len(), 24);
        assert_eq!(total, 500);
    }

    #[test]
    fn test_day_percentages_sum_to_hundred() {
        let txns = vec![
            TransactionRecord::new("A", at(1, 9)),
            TransactionRecord::new("A", at(1, 10)),
            TransactionRecord::new("A", at(3, 10)),
            TransactionRecord::new("A", at(7, 10)),
        ];

        let days = day_percentages(&txns);

        assert_eq!(days.len(), 7);
        assert_eq!(days[0].day, "Monday");
        assert_eq!(days[6].day, "Sunday");
        assert!((days[0].percentage - 50.0).abs() < 1e-9);
        assert!((days[2].percentage - 25.0).abs() < 1e-9);
        assert!((days[6].percentage - 25.0).abs() < 1e-9);
        assert_eq!(days[1].percentage, 0.0);

        let sum: f64 = days.iter().map(|d| d.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_day_percentages_empty_input() {
        let txns: Vec<TransactionRecord> = vec![];

        let days = day_percentages(&txns);

        assert_eq!(days.len(), 7);
        assert!(days.iter().all(|d| d.percentage == 0.0));
    }

    #[test]
    fn test_aggregates_are_idempotent() {
        let txns = txns_for(&["A", "B", "A"]);

        assert_eq!(top_branches(&txns, 2).unwrap(), top_branches(&txns, 2).unwrap());
        assert_eq!(hour_histogram(&txns), hour_histogram(&txns));
        assert_eq!(day_percentages(&txns), day_percentages(&txns));
    }

    #[test]
    fn test_aggregates_accept_enriched_rows() {
        let txns = txns_for(&["A", "B"]);
        let branches = vec![BranchRecord {
            branch: "C".to_string(),
            name: "Chidlom".to_string(),
            lat: None,
            lon: None,
        }];
        let rows = crate::branch_mapper::enrich(&txns, &branches);

        let hist = hour_histogram(rows.iter().filter_map(|r| r.transaction.as_ref()));
        assert_eq!(hist.iter().map(|b| b.transactions).sum::<u64>(), 2);
    }

    #[test]
    fn test_monthly_counts_passthrough() {
        let raw = vec![
            MonthlyRow { month: "Feb".to_string(), values: vec![("count".to_string(), 3)] },
            MonthlyRow { month: "Jan".to_string(), values: vec![("count".to_string(), 9)] },
        ];
        assert_eq!(monthly_counts(&raw), raw);
    }

    #[test]
    fn test_monthly_series_in_first_seen_order() {
        let raw = vec![
            MonthlyRow {
                month: "Jan".to_string(),
                values: vec![("bangkok".to_string(), 120), ("provincial".to_string(), 80)],
            },
            MonthlyRow {
                month: "Feb".to_string(),
                values: vec![("bangkok".to_string(), 98), ("provincial".to_string(), 70)],
            },
        ];
        assert_eq!(monthly_series(&raw), vec!["bangkok", "provincial"]);
        assert!(monthly_series(&[]).is_empty());
    }

    #[test]
    fn test_map_views_skip_missing_coordinates() {
        let branches = vec![
            BranchRecord { branch: "0001".to_string(), name: "Silom".to_string(), lat: Some(13.0), lon: Some(100.0) },
            BranchRecord { branch: "0002".to_string(), name: "Ari".to_string(), lat: None, lon: Some(100.5) },
            BranchRecord { branch: "0003".to_string(), name: "Bang Na".to_string(), lat: Some(14.0), lon: Some(101.0) },
        ];

        let nationwide = nationwide_map(&branches);
        assert_eq!(nationwide.points.len(), 2);
        assert_eq!(nationwide.center, Some((13.5, 100.5)));
        assert_eq!(nationwide.zoom, NATIONWIDE_ZOOM);

        let city = city_map(&branches);
        assert_eq!(city.center, Some((13.0, 100.0)));
        assert_eq!(city.points[1].label, "0003Bang Na");
    }

    #[test]
    fn test_map_views_without_coordinates() {
        let view = nationwide_map(&[]);
        assert!(view.center.is_none());
        assert!(view.points.is_empty());
    }
}
