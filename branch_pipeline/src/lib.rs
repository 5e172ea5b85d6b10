pub mod aggregator;
pub mod branch_mapper;
pub mod cache;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod models;
pub mod pipeline;

pub use aggregator::{city_map, day_percentages, hour_histogram, monthly_counts, monthly_series, nationwide_map, top_branches};
pub use branch_mapper::{enrich, substitute_branch_names, BranchDirectory};
pub use cache::{CachePolicy, CachedLoader};
pub use config::{DashboardConfig, TableToggles, TopNSelector};
pub use data_loader::DataLoader;
pub use error::{CoercionWarning, PipelineError, Result};
pub use models::{BranchCount, BranchRecord, DayShare, EnrichedTransaction, HourBucket, MapView, MonthlyRow, TransactionRecord};
pub use pipeline::{build_views, AggregationParams, DashboardInputs, DashboardViews, Pipeline, RenderSink};
