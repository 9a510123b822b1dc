//! Statistics collected during a crawl run
//!
//! This module provides the counters the coordinator updates while it works
//! through the crawl stages, and prints them once the run is over.

use chrono::{DateTime, Duration, Utc};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (None while running)
    pub finished_at: Option<DateTime<Utc>>,

    /// Organizations whose repositories were listed
    pub organizations: u64,

    /// Repositories discovered
    pub repositories: u64,

    /// Repositories skipped by configuration
    pub skipped_repositories: u64,

    /// Pull requests discovered
    pub pull_requests: u64,

    /// Pull request timelines present in the cache after the run
    pub timelines: u64,

    /// Queries answered from the cache
    pub cache_hits: u64,

    /// Queries fetched from the API
    pub fetched_queries: u64,

    /// Cache entries that could not be read back and were re-fetched
    pub corrupt_entries: u64,
}

impl CrawlStatistics {
    /// Creates empty statistics for a run starting now
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            organizations: 0,
            repositories: 0,
            skipped_repositories: 0,
            pull_requests: 0,
            timelines: 0,
            cache_hits: 0,
            fetched_queries: 0,
            corrupt_entries: 0,
        }
    }

    /// Marks the run as finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Returns the run duration, up to now if still running
    pub fn duration(&self) -> Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Total number of cache lookups
    pub fn total_queries(&self) -> u64 {
        self.cache_hits + self.fetched_queries
    }

    /// Share of queries answered from the cache, in percent
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.total_queries();
        if total > 0 {
            (self.cache_hits as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Collected:");
    println!("  Organizations: {}", stats.organizations);
    println!(
        "  Repositories: {} ({} skipped)",
        stats.repositories, stats.skipped_repositories
    );
    println!("  Pull requests: {}", stats.pull_requests);
    println!("  Timelines: {}", stats.timelines);
    println!();

    println!("Cache:");
    println!(
        "  Hits: {} / {} queries ({:.1}%)",
        stats.cache_hits,
        stats.total_queries(),
        stats.cache_hit_rate()
    );
    println!("  Fetched: {}", stats.fetched_queries);
    if stats.corrupt_entries > 0 {
        println!("  Corrupt entries re-fetched: {}", stats.corrupt_entries);
    }
    println!();

    println!("Duration: {}s", stats.duration().num_seconds());
}
