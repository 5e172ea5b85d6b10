use crate::aggregator;
use crate::branch_mapper::substitute_branch_names;
use crate::cache::CachedLoader;
use crate::config::DashboardConfig;
use crate::data_loader::DataLoader;
use crate::error::Result;
use crate::models::{BranchCount, BranchRecord, DayShare, HourBucket, MapView, MonthlyRow, TransactionRecord};
use log::info;
use serde::Serialize;
use std::sync::Arc;

/// Parameters the presentation side may change between renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationParams {
    pub top_n: usize,
    pub substitute_branch_names: bool,
}

impl AggregationParams {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            top_n: config.top_n.default,
            substitute_branch_names: config.substitute_branch_names,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardInputs {
    pub transactions: Arc<Vec<TransactionRecord>>,
    pub branches: Arc<Vec<BranchRecord>>,
    pub monthly: Arc<Vec<MonthlyRow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViews {
    pub top_n: usize,
    pub nationwide: MapView,
    pub city: MapView,
    pub monthly: Vec<MonthlyRow>,
    /// Ranked by the label chosen in `AggregationParams`
    pub top_branches: Vec<BranchCount>,
    /// Same ranking, always by branch display name
    pub top_branches_by_name: Vec<BranchCount>,
    pub hours: Vec<HourBucket>,
    pub days: Vec<DayShare>,
}

/// Consumes the views of one aggregation request
pub trait RenderSink {
    fn render(&mut self, views: &DashboardViews) -> anyhow::Result<()>;
}

impl<F> RenderSink for F
where
    F: FnMut(&DashboardViews) -> anyhow::Result<()>,
{
    fn render(&mut self, views: &DashboardViews) -> anyhow::Result<()> {
        self(views)
    }
}

/// Aggregate loaded inputs into every view. Pure in its arguments.
pub fn build_views(inputs: &DashboardInputs, params: &AggregationParams) -> Result<DashboardViews> {
    let transactions = inputs.transactions.as_slice();
    let branches = inputs.branches.as_slice();

    let renamed = substitute_branch_names(transactions, branches);
    let top_branches_by_name = aggregator::top_branches(&renamed, params.top_n)?;
    let top_branches = if params.substitute_branch_names {
        top_branches_by_name.clone()
    } else {
        aggregator::top_branches(transactions, params.top_n)?
    };

    Ok(DashboardViews {
        top_n: params.top_n,
        nationwide: aggregator::nationwide_map(branches),
        city: aggregator::city_map(branches),
        monthly: aggregator::monthly_counts(&inputs.monthly),
        top_branches,
        top_branches_by_name,
        hours: aggregator::hour_histogram(transactions),
        days: aggregator::day_percentages(transactions),
    })
}

/// Loader -> join -> aggregator -> render sink
pub struct Pipeline {
    config: DashboardConfig,
    loader: CachedLoader,
}

impl Pipeline {
    pub fn new(config: DashboardConfig) -> Self {
        let loader = CachedLoader::new(DataLoader::new(&config.timestamp_column), config.cache_policy);
        Self { config, loader }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn cache(&self) -> &CachedLoader {
        &self.loader
    }

    pub fn load(&mut self) -> Result<DashboardInputs> {
        let config = &self.config;
        let transactions = self
            .loader
            .transactions(&config.transactions_path, config.transaction_row_limit)?;
        let branches = self.loader.branches(&config.branches_path, config.branch_row_limit)?;
        let monthly = self.loader.monthly(&config.monthly_path)?;

        Ok(DashboardInputs {
            transactions,
            branches,
            monthly,
        })
    }

    pub fn views(&mut self, params: &AggregationParams) -> Result<DashboardViews> {
        let inputs = self.load()?;
        build_views(&inputs, params)
    }

    pub fn run<S: RenderSink + ?Sized>(&mut self, params: &AggregationParams, sink: &mut S) -> anyhow::Result<()> {
        let views = self.views(params)?;
        info!(
            "Rendering {} top branches, {} monthly points, {} located branches",
            views.top_branches.len(),
            views.monthly.len(),
            views.nationwide.points.len()
        );
        sink.render(&views)
    }
}
