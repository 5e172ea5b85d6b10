use anyhow::{Context, Result};
use branch_pipeline::{AggregationParams, DashboardConfig, DashboardViews, Pipeline, RenderSink};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

mod dashboard_visualization;
mod report;

use dashboard_visualization::DashboardVisualizer;
use report::TableReport;

#[derive(Parser)]
#[command(name = "branch_dashboard")]
#[command(about = "Render the branch transaction dashboard as SVG charts and tables")]
struct Args {
    /// JSON config file (defaults to the interactive preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the small preview preset instead of the interactive one
    #[arg(long)]
    preview: bool,

    #[arg(long)]
    transactions: Option<PathBuf>,

    #[arg(long)]
    branches: Option<PathBuf>,

    #[arg(long)]
    monthly: Option<PathBuf>,

    /// Directory for the SVG charts
    #[arg(short, long, default_value = "dashboard")]
    output_dir: PathBuf,

    /// Top-N values to render; each one re-aggregates like a slider move
    #[arg(short = 'n', long = "top-n")]
    top_n: Vec<usize>,

    /// Label the top-N chart with display names (tables always use them)
    #[arg(long)]
    substitute_names: bool,

    #[arg(long)]
    show_top_branches: bool,

    #[arg(long)]
    show_hours: bool,

    #[arg(long)]
    show_days: bool,

    /// Only print tables
    #[arg(long)]
    no_charts: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None if args.preview => DashboardConfig::preview(),
        None => DashboardConfig::interactive(),
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
    config.substitute_branch_names |= args.substitute_names;
    config.tables.top_branches |= args.show_top_branches;
    config.tables.hours |= args.show_hours;
    config.tables.days |= args.show_days;

    println!("🚀 Branch Transactions Dashboard");
    println!("Generated {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("{}", "=".repeat(60));

    let top_ns: Vec<usize> = if args.top_n.is_empty() {
        vec![config.top_n.default]
    } else {
        args.top_n.iter().map(|n| config.top_n.clamp(*n)).collect()
    };

    let tables = config.tables;
    let substitute = config.substitute_branch_names;
    let mut pipeline = Pipeline::new(config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message("Loading transactions and branches...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let loaded = pipeline.load();
    spinner.finish_and_clear();

    let inputs = loaded.context("Failed to load dashboard inputs")?;
    println!(
        "📁 Loaded {} transactions, {} branches, {} monthly rows",
        inputs.transactions.len(),
        inputs.branches.len(),
        inputs.monthly.len()
    );

    let mut visualizer = if args.no_charts {
        None
    } else {
        Some(DashboardVisualizer::new(&args.output_dir)?)
    };
    let mut report = TableReport::new(tables, std::io::stdout());

    let start = std::time::Instant::now();

    for top_n in top_ns {
        info!("Rendering dashboard for top {}", top_n);
        let params = AggregationParams {
            top_n,
            substitute_branch_names: substitute,
        };
        let mut sink = |views: &DashboardViews| -> Result<()> {
            if let Some(visualizer) = visualizer.as_mut() {
                visualizer.render(views)?;
            }
            report.render(views)
        };
        pipeline.run(&params, &mut sink)?;
    }

    let stats = pipeline.cache().stats();
    println!(
        "\n✅ Dashboard complete in {:?} (cache: {} hits, {} misses)",
        start.elapsed(),
        stats.hits,
        stats.misses
    );

    Ok(())
}
