use crate::cache::CachePolicy;
use crate::data_loader::DEFAULT_TIMESTAMP_COLUMN;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Range and default of the top-N selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopNSelector {
    pub min: usize,
    pub max: usize,
    pub default: usize,
}

impl TopNSelector {
    pub fn fixed(n: usize) -> Self {
        Self { min: n, max: n, default: n }
    }

    pub fn range(min: usize, max: usize, default: usize) -> Self {
        Self { min, max, default }
    }

    pub fn clamp(&self, n: usize) -> usize {
        n.clamp(self.min, self.max)
    }
}

impl Default for TopNSelector {
    fn default() -> Self {
        Self::range(10, 50, 10)
    }
}

/// Which aggregate tables are shown next to their charts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableToggles {
    pub top_branches: bool,
    pub hours: bool,
    pub days: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub transactions_path: PathBuf,
    pub branches_path: PathBuf,
    pub monthly_path: PathBuf,
    pub timestamp_column: String,
    pub transaction_row_limit: Option<usize>,
    pub branch_row_limit: Option<usize>,
    pub cache_policy: CachePolicy,
    pub top_n: TopNSelector,
    pub substitute_branch_names: bool,
    pub tables: TableToggles,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::interactive()
    }
}

impl DashboardConfig {
    /// Small preview: capped rows, no caching, a fixed top 10
    pub fn preview() -> Self {
        Self {
            transactions_path: PathBuf::from("cs_data.csv"),
            branches_path: PathBuf::from("branches.csv"),
            monthly_path: PathBuf::from("monthly_data.csv"),
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            transaction_row_limit: Some(10_000),
            branch_row_limit: Some(10_000),
            cache_policy: CachePolicy::Disabled,
            top_n: TopNSelector::fixed(10),
            substitute_branch_names: false,
            tables: TableToggles::default(),
        }
    }

    /// Larger load kept for the whole session, with a 10..=50 top-N slider
    pub fn interactive() -> Self {
        Self {
            transaction_row_limit: Some(100_000),
            cache_policy: CachePolicy::ProcessLifetime,
            top_n: TopNSelector::range(10, 50, 10),
            ..Self::preview()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let top = &self.top_n;
        if top.min == 0 {
            return Err(PipelineError::Config("top_n.min must be at least 1".to_string()));
        }
        if top.min > top.max {
            return Err(PipelineError::Config(format!(
                "top_n range is empty ({}..={})",
                top.min, top.max
            )));
        }
        if !(top.min..=top.max).contains(&top.default) {
            return Err(PipelineError::Config(format!(
                "top_n.default {} outside {}..={}",
                top.default, top.min, top.max
            )));
        }
        if self.timestamp_column.trim().is_empty() {
            return Err(PipelineError::Config("timestamp_column must not be empty".to_string()));
        }
        Ok(())
    }
}
