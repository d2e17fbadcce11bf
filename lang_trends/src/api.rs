use async_trait::async_trait;
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error: {0}")]
    Error(&'static str),
    // sole reason for the `reqwest` dependency..
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Sort key accepted by the repository search endpoint.
#[derive(Clone, Copy, Debug, Display, EnumString, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Sort {
    Stars,
    Forks,
    Updated,
}

/// One year's sample population: repositories above `min_stars` stars,
/// last pushed within the calendar year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YearWindow {
    year: u16,
    min_stars: u32,
}

impl YearWindow {
    pub fn new(year: u16, min_stars: u32) -> Self {
        YearWindow { year, min_stars }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    /// Search filter of the window, e.g. `stars:>1000 pushed:2023-01-01..2023-12-31`.
    pub fn query(&self) -> String {
        format!(
            "stars:>{} pushed:{}-01-01..{}-12-31",
            self.min_stars, self.year, self.year
        )
    }
}

/// One repository's byte counts per language, in the order reported by the source.
pub type LanguageBreakdown = Vec<(String, u64)>;

pub trait Repo: Send + Sync {
    fn name(&self) -> &str;

    fn owner(&self) -> &str;
}

#[async_trait]
pub trait Client<REPO: Repo, const MAX_PAGE_SIZE: u32, const FIRST_PAGE_NUMBER: u32>: Send + Sync {
    /// Lists repositories matching `window`, most relevant first according to the
    /// client's sort key.
    async fn search_repos(&self, window: &YearWindow, page: u32, per_page: u32) -> Result<Vec<REPO>>;

    /// Fetches the language byte breakdown of one repository's default branch.
    async fn repo_languages(&self, repo: &REPO) -> Result<LanguageBreakdown>;
}

/// Tests

#[test]
fn year_window_query_test() {
    let window = YearWindow::new(2023, 1000);
    assert_eq!(window.query(), "stars:>1000 pushed:2023-01-01..2023-12-31");
}

#[test]
fn sort_round_trip_test() {
    use std::str::FromStr;
    assert_eq!(Sort::from_str("stars").unwrap(), Sort::Stars);
    assert_eq!(Sort::Stars.to_string(), "stars");
}
