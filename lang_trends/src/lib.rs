//! Yearly language usage statistics
//!
//! # Overview
//!
//! Library measures which programming languages dominate the most popular repositories of a code hosting platform, year by year.
//! For every requested calendar year it searches for repositories above a star threshold that were last pushed within that year, sorted by popularity, until a target sample size is reached.
//! Each sampled repository then contributes its per-language byte counts to a histogram owned by that year.
//! Markup and query languages (HTML, CSS, SQL and friends) are excluded, and the histogram is reduced to the top N languages with their share of the remaining bytes.
//! The result is a mapping from year to a ranked list of (language, percentage) pairs, ready for a presentation layer to render.
//!
//! Collection is deliberately tolerant of partial data: a failed search page truncates that year's sample, and a failed
//! language lookup skips just that repository. Neither aborts the run.

#[cfg(feature = "api")]
pub mod api;

#[cfg(feature = "collector")]
mod collector;

#[cfg(feature = "collector")]
pub use collector::{
    CollectorConfig, LanguageHistogram, RankedLanguage, TrendCollector, YearlyResults, DEFAULT_EXCLUSIONS,
};
