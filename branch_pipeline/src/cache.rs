use crate::data_loader::DataLoader;
use crate::error::Result;
use crate::models::{BranchRecord, MonthlyRow, TransactionRecord};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Every request re-reads the file
    Disabled,
    /// Loaded tables are kept until the loader is dropped; nothing is ever evicted
    ProcessLifetime,
}

type CacheKey = (PathBuf, Option<usize>);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Memoizes loads keyed by (path, row limit).
pub struct CachedLoader {
    loader: DataLoader,
    policy: CachePolicy,
    transactions: HashMap<CacheKey, Arc<Vec<TransactionRecord>>>,
    branches: HashMap<CacheKey, Arc<Vec<BranchRecord>>>,
    monthly: HashMap<CacheKey, Arc<Vec<MonthlyRow>>>,
    stats: CacheStats,
}

impl CachedLoader {
    pub fn new(loader: DataLoader, policy: CachePolicy) -> Self {
        Self {
            loader,
            policy,
            transactions: HashMap::new(),
            branches: HashMap::new(),
            monthly: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn transactions(&mut self, path: &Path, max_rows: Option<usize>) -> Result<Arc<Vec<TransactionRecord>>> {
        let loader = &self.loader;
        fetch(
            &mut self.transactions,
            &mut self.stats,
            self.policy,
            path,
            max_rows,
            || loader.load_transactions(path, max_rows),
        )
    }

    pub fn branches(&mut self, path: &Path, max_rows: Option<usize>) -> Result<Arc<Vec<BranchRecord>>> {
        let loader = &self.loader;
        fetch(
            &mut self.branches,
            &mut self.stats,
            self.policy,
            path,
            max_rows,
            || loader.load_branches(path, max_rows),
        )
    }

    pub fn monthly(&mut self, path: &Path) -> Result<Arc<Vec<MonthlyRow>>> {
        let loader = &self.loader;
        fetch(
            &mut self.monthly,
            &mut self.stats,
            self.policy,
            path,
            None,
            || loader.load_monthly(path),
        )
    }
}

fn fetch<T, F>(
    entries: &mut HashMap<CacheKey, Arc<Vec<T>>>,
    stats: &mut CacheStats,
    policy: CachePolicy,
    path: &Path,
    max_rows: Option<usize>,
    load: F,
) -> Result<Arc<Vec<T>>>
where
    F: FnOnce() -> Result<Vec<T>>,
{
    let key = (path.to_path_buf(), max_rows);

    if policy == CachePolicy::ProcessLifetime {
        if let Some(hit) = entries.get(&key) {
            stats.hits += 1;
            debug!("Cache hit for {} (limit {:?})", path.display(), max_rows);
            return Ok(Arc::clone(hit));
        }
    }

    stats.misses += 1;
    debug!("Cache miss for {} (limit {:?})", path.display(), max_rows);
    let loaded = Arc::new(load()?);

    if policy == CachePolicy::ProcessLifetime {
        entries.insert(key, Arc::clone(&loaded));
    }

    Ok(loaded)
}
