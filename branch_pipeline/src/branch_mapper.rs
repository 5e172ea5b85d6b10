use crate::models::{BranchRecord, EnrichedTransaction, TransactionRecord};
use std::collections::{HashMap, HashSet};

/// Branch directory indexed by branch code
pub struct BranchDirectory<'a> {
    by_code: HashMap<&'a str, Vec<&'a BranchRecord>>,
}

impl<'a> BranchDirectory<'a> {
    pub fn new(branches: &'a [BranchRecord]) -> Self {
        let mut by_code: HashMap<&str, Vec<&BranchRecord>> = HashMap::new();
        for branch in branches {
            by_code.entry(branch.branch.as_str()).or_default().push(branch);
        }
        Self { by_code }
    }

    /// All directory entries for a code, in file order
    pub fn lookup(&self, code: &str) -> &[&'a BranchRecord] {
        self.by_code.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Display name of the first entry for a code
    pub fn display_name(&self, code: &str) -> Option<&'a str> {
        self.lookup(code).first().copied().map(|b| b.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// Outer join of transactions and branches on the branch code.
///
/// Rows come out as matched rows (in transaction order, one per matching
/// directory entry), then transactions with no directory entry, then
/// directory entries no transaction refers to.
pub fn enrich(transactions: &[TransactionRecord], branches: &[BranchRecord]) -> Vec<EnrichedTransaction> {
    let directory = BranchDirectory::new(branches);

    let mut matched = Vec::new();
    let mut left_only = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for txn in transactions {
        let entries = directory.lookup(&txn.branch);
        if entries.is_empty() {
            left_only.push(EnrichedTransaction {
                branch: txn.branch.clone(),
                transaction: Some(txn.clone()),
                location: None,
            });
            continue;
        }

        seen.insert(txn.branch.as_str());
        for entry in entries {
            matched.push(EnrichedTransaction {
                branch: txn.branch.clone(),
                transaction: Some(txn.clone()),
                location: Some((*entry).clone()),
            });
        }
    }

    let right_only = branches
        .iter()
        .filter(|b| !seen.contains(b.branch.as_str()))
        .map(|b| EnrichedTransaction {
            branch: b.branch.clone(),
            transaction: None,
            location: Some(b.clone()),
        });

    matched.extend(left_only);
    matched.extend(right_only);
    matched
}

/// Replace branch codes with display names where the directory knows the code.
pub fn substitute_branch_names(transactions: &[TransactionRecord], branches: &[BranchRecord]) -> Vec<TransactionRecord> {
    let directory = BranchDirectory::new(branches);

    transactions
        .iter()
        .map(|txn| {
            let mut renamed = txn.clone();
            if let Some(name) = directory.display_name(&txn.branch) {
                renamed.branch = name.to_string();
            }
            renamed
        })
        .collect()
}
