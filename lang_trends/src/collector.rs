use crate::api::{Client, LanguageBreakdown, Repo, YearWindow};
use derive_more::Constructor;
use futures::{stream, StreamExt};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Display;
use std::marker::PhantomData;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};

/// Languages excluded from the ranking by default: markup and query languages
/// that say little about programming language usage.
pub const DEFAULT_EXCLUSIONS: [&str; 5] = ["HTML", "CSS", "SQL", "PLpgSQL", "PLSQL"];

#[derive(Clone, Debug, PartialEq, Constructor)]
pub struct RankedLanguage {
    pub language: String,
    pub percentage: f32,
}

impl Display for RankedLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}\t{:.2}%", self.language, self.percentage))
    }
}

/// Ranked languages per sampled year.
pub type YearlyResults = BTreeMap<u16, Vec<RankedLanguage>>;

/// Accumulated byte counts per language for one year's repositories.
///
/// Entries keep first-insertion order, so languages with equal counts rank
/// deterministically in the order they were first observed.
#[derive(Debug, Default)]
pub struct LanguageHistogram {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl LanguageHistogram {
    /// Adds one repository's breakdown into the histogram. Purely additive:
    /// feeding the same repository twice counts its bytes twice.
    pub fn accumulate(&mut self, breakdown: LanguageBreakdown) {
        for (language, bytes) in breakdown {
            match self.index.get(&language) {
                Some(&at) => self.entries[at].1.add_assign(bytes),
                None => {
                    self.index.insert(language.clone(), self.entries.len());
                    self.entries.push((language, bytes));
                }
            }
        }
    }

    /// Total byte count over all accumulated languages.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, bytes)| bytes).sum()
    }

    /// Drops excluded languages and reduces to the `top_n` languages by byte
    /// count, each expressed as its share of the non-excluded total. Returns
    /// an empty ranking when only excluded languages were observed.
    pub fn finalize(self, exclusions: &HashSet<String>, top_n: usize) -> Vec<RankedLanguage> {
        let mut entries: Vec<(String, u64)> = self
            .entries
            .into_iter()
            .filter(|(language, _)| !exclusions.contains(language))
            .collect();
        let total: u64 = entries.iter().map(|(_, bytes)| bytes).sum();
        if total == 0 {
            return Vec::new();
        }
        // Stable sort, equal counts keep first-encountered order.
        entries.sort_by(|(_, first), (_, second)| second.cmp(first));
        entries
            .into_iter()
            .take(top_n)
            .map(|(language, bytes)| RankedLanguage::new(language, share_percentage(bytes, total)))
            .collect()
    }
}

/// Produces the percentage share rounded to two decimal points.
fn share_percentage(bytes: u64, total: u64) -> f32 {
    let share = bytes as f64 / total as f64 * 100.0;
    ((share * 100.0).round() / 100.0) as f32
}

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    pub repo_target: u32,
    pub top_n: usize,
    pub min_stars: u32,
    pub exclusions: HashSet<String>,
    pub max_language_requests: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            repo_target: 500,
            top_n: 10,
            min_stars: 1000,
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|language| language.to_string()).collect(),
            max_language_requests: 10,
        }
    }
}

pub struct TrendCollector<REPO, const MAX_PAGE_SIZE: u32, const FIRST_PAGE_NUMBER: u32, CLIENT>
where
    REPO: Repo,
    CLIENT: 'static + Client<REPO, MAX_PAGE_SIZE, FIRST_PAGE_NUMBER>,
{
    client: Arc<CLIENT>,
    config: CollectorConfig,
    _repo_type: PhantomData<REPO>,
}

impl<REPO, const MAX_PAGE_SIZE: u32, const FIRST_PAGE_NUMBER: u32, CLIENT>
    TrendCollector<REPO, MAX_PAGE_SIZE, FIRST_PAGE_NUMBER, CLIENT>
where
    REPO: 'static + Repo,
    CLIENT: 'static + Client<REPO, MAX_PAGE_SIZE, FIRST_PAGE_NUMBER>,
{
    pub fn new(client: CLIENT, config: CollectorConfig) -> Self {
        let _repo_type = PhantomData::default();
        TrendCollector {
            client: Arc::new(client),
            config,
            _repo_type,
        }
    }

    /// Runs one collection pass per requested year, sequentially. A repeated
    /// year is collected again and overwrites the earlier entry.
    pub async fn collect_years(&self, years: &[u16]) -> YearlyResults {
        let mut results = YearlyResults::new();
        for &year in years {
            let window = YearWindow::new(year, self.config.min_stars);
            let ranking = self.collect_year(&window).await;
            info!("Year {}: ranked {} languages", year, ranking.len());
            results.insert(year, ranking);
        }
        results
    }

    /// Paginates the year's repository search and folds every repository's
    /// language breakdown into a fresh histogram. A failed page truncates
    /// pagination with the data gathered so far; a failed language lookup
    /// skips that repository only.
    pub async fn collect_year(&self, window: &YearWindow) -> Vec<RankedLanguage> {
        let mut histogram = LanguageHistogram::default();
        let mut paginator = Paginator::new(FIRST_PAGE_NUMBER, MAX_PAGE_SIZE, self.config.repo_target);
        while let Some(page) = paginator.next_page() {
            let repos = match self.client.search_repos(window, page.page_no, page.page_size).await {
                Ok(repos) => repos,
                Err(err) => {
                    warn!(
                        "Repository search for {} stopped at page {}: {}",
                        window.year(),
                        page.page_no,
                        err
                    );
                    break;
                }
            };
            if repos.is_empty() {
                debug!("Repository search for {} exhausted at page {}", window.year(), page.page_no);
                break;
            }
            paginator.advance(repos.len() as u32);
            debug!("Found {} repositories", repos.len());
            let breakdowns: Vec<LanguageBreakdown> = stream::iter(repos)
                .map(|repo| Self::fetch_languages(repo, self.client.clone()))
                .buffered(self.config.max_language_requests)
                .filter_map(map_languages_result)
                .collect()
                .await;
            for breakdown in breakdowns {
                histogram.accumulate(breakdown);
            }
        }
        histogram.finalize(&self.config.exclusions, self.config.top_n)
    }

    fn fetch_languages(repo: REPO, client: Arc<CLIENT>) -> JoinHandle<Option<LanguageBreakdown>> {
        tokio::spawn(async move {
            client.repo_languages(&repo).await.map(Some).unwrap_or_else(|err| {
                warn!(
                    "Failed to get languages of {}/{}: {}",
                    repo.owner(),
                    repo.name(),
                    err
                );
                None
            })
        })
    }
}

/// Utility functions

async fn map_languages_result(
    breakdown: Result<Option<LanguageBreakdown>, JoinError>,
) -> Option<LanguageBreakdown> {
    match breakdown {
        Ok(breakdown) => breakdown,
        err => {
            error!("Language lookup task failed: {:?}", err);
            None
        }
    }
}

#[derive(Constructor)]
struct Page {
    page_no: u32,
    page_size: u32,
}

/// Drives count-based pagination: pages are requested with a constant size
/// until the retrieved total reaches the target. A page returning fewer items
/// than requested is not terminal, the caller keeps paging and stops only on
/// an empty page or a failed request.
struct Paginator {
    page_no: u32,
    page_size: u32,
    target: u32,
    retrieved: u32,
}

impl Paginator {
    fn new(first_page: u32, max_page_size: u32, target: u32) -> Self {
        Paginator {
            page_no: first_page,
            // Constant across pages so page boundaries stay aligned.
            page_size: std::cmp::min(max_page_size, target),
            target,
            retrieved: 0,
        }
    }

    fn next_page(&mut self) -> Option<Page> {
        if self.retrieved >= self.target {
            return None;
        }
        let page = Page::new(self.page_no, self.page_size);
        self.page_no.add_assign(1);
        Some(page)
    }

    /// Records how many repositories the last page actually returned.
    fn advance(&mut self, retrieved: u32) {
        self.retrieved += retrieved;
    }
}

/// Tests

#[test]
fn finalize_percentages_test() {
    let mut histogram = LanguageHistogram::default();
    histogram.accumulate(vec![
        ("Python".to_string(), 300),
        ("Go".to_string(), 100),
        ("HTML".to_string(), 200),
    ]);
    let exclusions = HashSet::from(["HTML".to_string()]);
    let ranking = histogram.finalize(&exclusions, 2);
    assert_eq!(
        ranking,
        vec![
            RankedLanguage::new("Python".to_string(), 75.0),
            RankedLanguage::new("Go".to_string(), 25.0),
        ]
    );
}

#[test]
fn finalize_never_ranks_excluded_test() {
    let mut histogram = LanguageHistogram::default();
    for language in DEFAULT_EXCLUSIONS {
        histogram.accumulate(vec![(language.to_string(), 1000)]);
    }
    histogram.accumulate(vec![("Rust".to_string(), 1)]);
    let ranking = histogram.finalize(&CollectorConfig::default().exclusions, 10);
    assert_eq!(ranking, vec![RankedLanguage::new("Rust".to_string(), 100.0)]);
}

#[test]
fn finalize_degenerate_total_test() {
    let mut histogram = LanguageHistogram::default();
    histogram.accumulate(vec![("HTML".to_string(), 500)]);
    let ranking = histogram.finalize(&CollectorConfig::default().exclusions, 10);
    assert!(ranking.is_empty(), "Only excluded bytes must produce an empty ranking");
}

#[test]
fn finalize_tie_break_test() {
    let mut histogram = LanguageHistogram::default();
    histogram.accumulate(vec![("A".to_string(), 50), ("B".to_string(), 50)]);
    let ranking = histogram.finalize(&HashSet::new(), 1);
    assert_eq!(ranking, vec![RankedLanguage::new("A".to_string(), 100.0)]);
}

#[test]
fn finalize_caps_top_n_test() {
    let mut histogram = LanguageHistogram::default();
    histogram.accumulate(vec![
        ("A".to_string(), 50),
        ("B".to_string(), 30),
        ("C".to_string(), 20),
    ]);
    let ranking = histogram.finalize(&HashSet::new(), 2);
    assert_eq!(
        ranking,
        vec![
            RankedLanguage::new("A".to_string(), 50.0),
            RankedLanguage::new("B".to_string(), 30.0),
        ]
    );
    let sum: f32 = ranking.iter().map(|ranked| ranked.percentage).sum();
    assert!(sum < 100.0, "Shares of a truncated ranking should not reach 100%");
}

#[test]
fn accumulate_is_additive_test() {
    let breakdown = vec![("Python".to_string(), 100), ("Go".to_string(), 100)];
    let mut histogram = LanguageHistogram::default();
    histogram.accumulate(breakdown.clone());
    assert_eq!(histogram.total(), 200);
    histogram.accumulate(breakdown);
    assert_eq!(histogram.total(), 400, "Repeated breakdowns must double-count");
}

#[test]
fn paginator_test() {
    let mut paginator = Paginator::new(1, 100, 250);
    let page = paginator.next_page().unwrap();
    assert_eq!((page.page_no, page.page_size), (1, 100));
    paginator.advance(100);
    let page = paginator.next_page().unwrap();
    assert_eq!((page.page_no, page.page_size), (2, 100));
    paginator.advance(100);
    let page = paginator.next_page().unwrap();
    assert_eq!((page.page_no, page.page_size), (3, 100));
    paginator.advance(100);
    assert!(paginator.next_page().is_none(), "Target reached, pagination ends");
}

#[test]
fn paginator_short_page_continues_test() {
    let mut paginator = Paginator::new(1, 100, 150);
    paginator.next_page().unwrap();
    paginator.advance(40);
    let page = paginator.next_page().unwrap();
    assert_eq!(
        (page.page_no, page.page_size),
        (2, 100),
        "A short page is not terminal, the next page is still requested"
    );
}

#[test]
fn paginator_small_target_test() {
    let mut paginator = Paginator::new(1, 100, 3);
    let page = paginator.next_page().unwrap();
    assert_eq!((page.page_no, page.page_size), (1, 3));
}

#[test]
fn paginator_zero_target_test() {
    let mut paginator = Paginator::new(1, 100, 0);
    assert!(paginator.next_page().is_none());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Error, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    struct StubRepo {
        owner: String,
        name: String,
    }

    fn repo(name: &str) -> StubRepo {
        StubRepo {
            owner: "owner".to_string(),
            name: name.to_string(),
        }
    }

    impl Repo for StubRepo {
        fn name(&self) -> &str {
            &self.name
        }

        fn owner(&self) -> &str {
            &self.owner
        }
    }

    struct StubClient {
        pages: Mutex<VecDeque<Result<Vec<StubRepo>>>>,
        languages: HashMap<String, LanguageBreakdown>,
    }

    #[async_trait]
    impl Client<StubRepo, 2, 1> for StubClient {
        async fn search_repos(&self, _window: &YearWindow, _page: u32, _per_page: u32) -> Result<Vec<StubRepo>> {
            self.pages.lock().await.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn repo_languages(&self, repo: &StubRepo) -> Result<LanguageBreakdown> {
            self.languages
                .get(&repo.name)
                .cloned()
                .ok_or(Error::Error("Languages not found"))
        }
    }

    fn collector(client: StubClient, repo_target: u32) -> TrendCollector<StubRepo, 2, 1, StubClient> {
        let config = CollectorConfig {
            repo_target,
            ..CollectorConfig::default()
        };
        TrendCollector::new(client, config)
    }

    fn breakdown(language: &str, bytes: u64) -> LanguageBreakdown {
        vec![(language.to_string(), bytes)]
    }

    #[tokio::test]
    async fn page_failure_truncates_year_test() {
        let pages = VecDeque::from([
            Ok(vec![repo("first"), repo("second")]),
            Err(Error::Error("Search failed")),
        ]);
        let languages = HashMap::from([
            ("first".to_string(), breakdown("Rust", 10)),
            ("second".to_string(), breakdown("Go", 30)),
        ]);
        let client = StubClient {
            pages: Mutex::new(pages),
            languages,
        };

        let ranking = collector(client, 6).collect_year(&YearWindow::new(2023, 1000)).await;

        assert_eq!(
            ranking,
            vec![
                RankedLanguage::new("Go".to_string(), 75.0),
                RankedLanguage::new("Rust".to_string(), 25.0),
            ]
        );
    }

    #[tokio::test]
    async fn empty_page_ends_pagination_test() {
        let pages = VecDeque::from([
            Ok(vec![repo("first"), repo("second")]),
            Ok(Vec::new()),
            Ok(vec![repo("third"), repo("fourth")]),
        ]);
        let languages = HashMap::from([
            ("first".to_string(), breakdown("Rust", 10)),
            ("second".to_string(), breakdown("Rust", 10)),
            ("third".to_string(), breakdown("Python", 80)),
            ("fourth".to_string(), breakdown("Python", 80)),
        ]);
        let client = StubClient {
            pages: Mutex::new(pages),
            languages,
        };

        let ranking = collector(client, 6).collect_year(&YearWindow::new(2023, 1000)).await;

        assert_eq!(ranking, vec![RankedLanguage::new("Rust".to_string(), 100.0)]);
    }

    #[tokio::test]
    async fn failed_language_lookup_skips_repo_test() {
        let pages = VecDeque::from([Ok(vec![repo("first"), repo("unknown")])]);
        let languages = HashMap::from([("first".to_string(), breakdown("Rust", 10))]);
        let client = StubClient {
            pages: Mutex::new(pages),
            languages,
        };

        let ranking = collector(client, 2).collect_year(&YearWindow::new(2023, 1000)).await;

        assert_eq!(ranking, vec![RankedLanguage::new("Rust".to_string(), 100.0)]);
    }

    #[tokio::test]
    async fn collect_years_owns_histogram_per_year_test() {
        let pages = VecDeque::from([Ok(vec![repo("first")]), Ok(vec![repo("second")])]);
        let languages = HashMap::from([
            ("first".to_string(), breakdown("Rust", 10)),
            ("second".to_string(), breakdown("Python", 10)),
        ]);
        let client = StubClient {
            pages: Mutex::new(pages),
            languages,
        };

        let results = collector(client, 1).collect_years(&[2022, 2023]).await;

        assert_eq!(results[&2022], vec![RankedLanguage::new("Rust".to_string(), 100.0)]);
        assert_eq!(results[&2023], vec![RankedLanguage::new("Python".to_string(), 100.0)]);
    }
}
