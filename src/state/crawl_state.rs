/// Crawl state definitions for the pagination controller
///
/// This module defines the states the controller moves through while walking
/// the result pages, and how each listing row is classified.
use std::fmt;

/// Represents where the controller is in the pagination walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    // ===== Active States =====
    /// Waiting for the current result page to load
    FetchingPage,

    /// Pulling listing rows out of the loaded page
    ExtractingRows,

    /// Claiming and persisting rows one by one
    Claiming,

    /// All rows handled; deciding whether to advance
    PageDecision,

    // ===== Terminal State =====
    /// Walk finished (stale duplicate or last page)
    Halted,
}

impl CrawlState {
    /// Returns true if the walk is over
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Halted)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::FetchingPage, Self::ExtractingRows)
                | (Self::ExtractingRows, Self::Claiming)
                | (Self::Claiming, Self::PageDecision)
                | (Self::Claiming, Self::Halted)
                | (Self::PageDecision, Self::FetchingPage)
                | (Self::PageDecision, Self::Halted)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchingPage => "fetching_page",
            Self::ExtractingRows => "extracting_rows",
            Self::Claiming => "claiming",
            Self::PageDecision => "page_decision",
            Self::Halted => "halted",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of a single listing row after the claim step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowOutcome {
    /// First sighting for this keyword, persisted
    New,

    /// Already indexed but bumped by an update; skipped, crawl continues
    DuplicateFresh,

    /// Already indexed with no update marker; everything after it is known
    DuplicateStale,
}

impl RowOutcome {
    /// The control signal this classification sends to the page loop
    pub fn step(&self) -> CrawlStep {
        match self {
            Self::New | Self::DuplicateFresh => CrawlStep::Continue,
            Self::DuplicateStale => CrawlStep::HaltCrawl,
        }
    }
}

/// Signal passed from row processing back up through the page loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStep {
    Continue,
    HaltCrawl,
}

/// Why a pagination walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// Reached a previously indexed listing without the update marker
    StaleDuplicate { offer_id: String },

    /// No next-page control on the final page
    LastPage,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleDuplicate { offer_id } => {
                write!(f, "caught up with indexed data at offer {}", offer_id)
            }
            Self::LastPage => write!(f, "reached the last page"),
        }
    }
}
