use branch_pipeline::models::{BranchRecord, MonthlyRow, TransactionRecord};
use branch_pipeline::{build_views, AggregationParams, DashboardInputs};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

fn main() {
    // One week of synthetic traffic across three branches
    let base = NaiveDate::from_ymd_opt(2021, 3, 1)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap();

    let codes = ["0001", "0002", "0001", "0003", "0001", "0002"];
    let transactions: Vec<TransactionRecord> = (0..84)
        .map(|i| TransactionRecord::new(codes[i % codes.len()], base + Duration::minutes(i as i64 * 113)))
        .collect();

    let branches = vec![
        BranchRecord { branch: "0001".to_string(), name: "Silom".to_string(), lat: Some(13.7245), lon: Some(100.5296) },
        BranchRecord { branch: "0002".to_string(), name: "Ari".to_string(), lat: Some(13.7797), lon: Some(100.5446) },
        BranchRecord { branch: "0003".to_string(), name: "Bang Na".to_string(), lat: None, lon: None },
    ];

    let monthly: Vec<MonthlyRow> = [("Jan", 1200, 640), ("Feb", 1350, 700), ("Mar", 1410, 655)]
        .iter()
        .map(|(month, bangkok, provincial)| MonthlyRow {
            month: month.to_string(),
            values: vec![("bangkok".to_string(), *bangkok), ("provincial".to_string(), *provincial)],
        })
        .collect();

    let inputs = DashboardInputs {
        transactions: Arc::new(transactions),
        branches: Arc::new(branches),
        monthly: Arc::new(monthly),
    };

    let params = AggregationParams { top_n: 2, substitute_branch_names: true };
    let views = match build_views(&inputs, &params) {
        Ok(views) => views,
        Err(e) => {
            eprintln!("Aggregation failed: {}", e);
            return;
        }
    };

    println!("Dashboard Views");
    println!("===============");
    println!("Map centre: {:?}", views.nationwide.center);
    println!();

    println!("Top branches:");
    for b in &views.top_branches {
        println!("  {}: {}", b.branch, b.count);
    }
    println!();

    println!("Hourly:");
    for h in views.hours.iter().filter(|h| h.transactions > 0) {
        println!("  {:02}:00 {}", h.hour, "#".repeat(h.transactions as usize));
    }
    println!();

    println!("By day:");
    for d in &views.days {
        println!("  {:<10} {:.1}%", d.day, d.percentage);
    }
}
