//! Output module for reporting on indexed data
//!
//! Currently this covers the `--stats` view of the deduplicating store.

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
