//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: where the pagination controller is in its walk
//! - `RowOutcome`: how a single listing row was classified
//! - `CrawlStep` / `HaltReason`: the stop signal and why the walk ended

mod crawl_state;

pub use crawl_state::{CrawlState, CrawlStep, HaltReason, RowOutcome};
