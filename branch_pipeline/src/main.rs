use anyhow::{Context, Result};
use branch_pipeline::{AggregationParams, DashboardConfig, DashboardViews, Pipeline};
use clap::{Parser, ValueEnum};
use log::info;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "branch_pipeline")]
#[command(about = "Aggregate branch transaction records into dashboard views")]
struct Args {
    /// Preset to start from
    #[arg(short, long, value_enum, default_value = "interactive")]
    variant: Variant,

    /// JSON config file (overrides the preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transactions CSV
    #[arg(long)]
    transactions: Option<PathBuf>,

    /// Branch directory CSV
    #[arg(long)]
    branches: Option<PathBuf>,

    /// Pre-aggregated monthly CSV
    #[arg(long)]
    monthly: Option<PathBuf>,

    /// Number of top branches (clamped to the configured range)
    #[arg(short = 'n', long)]
    top_n: Option<usize>,

    /// Rank branches by display name instead of code
    #[arg(long)]
    substitute_names: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    output: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum Variant {
    Preview,
    Interactive,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Summary,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match args.variant {
            Variant::Preview => DashboardConfig::preview(),
            Variant::Interactive => DashboardConfig::interactive(),
        },
    };

    if let Some(path) = args.transactions {
        config.transactions_path = path;
    }
    if let Some(path) = args.branches {
        config.branches_path = path;
    }
    if let Some(path) = args.monthly {
        config.monthly_path = path;
    }
    if args.substitute_names {
        config.substitute_branch_names = true;
    }

    let mut params = AggregationParams::from_config(&config);
    if let Some(n) = args.top_n {
        params.top_n = config.top_n.clamp(n);
    }

    info!("Starting aggregation (top {})", params.top_n);

    let mut pipeline = Pipeline::new(config);
    let views = pipeline.views(&params)?;

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&views)?;
            println!("{}", json);
        }
        OutputFormat::Csv => write_csv(&views, std::io::stdout())?,
        OutputFormat::Summary => print_summary(&views),
    }

    Ok(())
}

/// One record per view entry: view, key, series (monthly only), value
fn write_csv<W: Write>(views: &DashboardViews, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["view", "key", "series", "value"])?;

    for m in &views.monthly {
        for (series, count) in &m.values {
            writer.write_record(["monthly", m.month.as_str(), series.as_str(), count.to_string().as_str()])?;
        }
    }
    for b in &views.top_branches {
        writer.write_record(["top_branches", b.branch.as_str(), "", b.count.to_string().as_str()])?;
    }
    for h in &views.hours {
        writer.write_record(["hours", h.hour.to_string().as_str(), "", h.transactions.to_string().as_str()])?;
    }
    for d in &views.days {
        writer.write_record(["days", d.day.as_str(), "", format!("{:.4}", d.percentage).as_str()])?;
    }

    writer.flush()?;
    Ok(())
}

fn print_summary(views: &DashboardViews) {
    let total: u64 = views.hours.iter().map(|h| h.transactions).sum();

    println!("Branch Transactions Summary");
    println!("===========================");
    println!("Transactions: {}", total);
    println!("Located branches: {}", views.nationwide.points.len());
    if let Some((lat, lon)) = views.nationwide.center {
        println!("Map centre: {:.4}, {:.4}", lat, lon);
    }
    println!();

    if !views.monthly.is_empty() {
        println!("Monthly transactions:");
        for m in &views.monthly {
            let series: Vec<String> = m.values.iter().map(|(name, v)| format!("{}={}", name, v)).collect();
            println!("  {:<10} {}", m.month, series.join(", "));
        }
        println!();
    }

    println!("Top {} branches:", views.top_n);
    for (rank, b) in views.top_branches.iter().enumerate() {
        println!("  #{:<3} {:<30} {}", rank + 1, b.branch, b.count);
    }
    println!();

    if let Some(peak) = views.hours.iter().max_by_key(|h| h.transactions) {
        println!("Busiest hour: {:02}:00 ({} transactions)", peak.hour, peak.transactions);
    }
    println!("By day of week:");
    for d in &views.days {
        println!("  {:<10} {:>6.2}%", d.day, d.percentage);
    }
}
