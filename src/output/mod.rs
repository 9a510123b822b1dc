//! Output module for reporting crawl results
//!
//! The harvested data itself lives in the cache; this module only reports
//! what a run did.

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics};
