//! Opportunity scanning and ranking.
//!
//! Connectors are fetched concurrently (bounded fan-out), normalized,
//! filtered, then ranked by a pluggable [`Scorer`].

mod scan;
mod score;
mod source;

pub use scan::{ScanReport, ScanSettings, Scanner};
pub use score::{rank, RiskAdjustedScorer, Scorer};
pub use source::{FileSource, HttpSource, SourceConnector, StaticSource};
