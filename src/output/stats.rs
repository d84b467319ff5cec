//! Statistics generation from the dedup store
//!
//! This module provides functionality for extracting and displaying
//! what the deduplicating store has indexed so far.

use crate::storage::{DedupStore, SinkResult};

/// Store statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Registered keywords with the number of offers claimed for each
    pub keywords: Vec<(String, u64)>,

    /// Number of distinct records stored
    pub stored_records: u64,
}

impl StoreStatistics {
    /// Total claims across all keywords
    pub fn total_claims(&self) -> u64 {
        self.keywords.iter().map(|(_, count)| count).sum()
    }
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(SinkError)` - Failed to query the store
pub fn load_statistics(store: &DedupStore) -> SinkResult<StoreStatistics> {
    let mut keywords = Vec::new();
    for keyword in store.keywords()? {
        let claimed = store.count_members(&keyword)?;
        keywords.push((keyword, claimed));
    }

    Ok(StoreStatistics {
        keywords,
        stored_records: store.count_records()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Stored records: {}", stats.stored_records);
    println!("  Keywords searched: {}", stats.keywords.len());
    println!("  Total claims: {}", stats.total_claims());
    println!();

    if !stats.keywords.is_empty() {
        println!("Claims by Keyword:");
        let mut counts: Vec<_> = stats.keywords.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        for (keyword, count) in counts {
            let label = if keyword.is_empty() {
                "(all offers)"
            } else {
                keyword.as_str()
            };
            println!("  {}: {}", label, count);
        }
    }
}
