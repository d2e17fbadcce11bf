mod builder;
mod limiter;
mod payload;

use async_trait::async_trait;
use lang_trends::api::{LanguageBreakdown, Result, Sort, YearWindow};
use limiter::RateLimiter;
use log::debug;
use reqwest::Client;
use reqwest::Response;
use serde::de::DeserializeOwned;

pub use builder::GithubClientBuilder;

/// Maximal `per_page` accepted by the search endpoint.
pub const MAX_PAGE_SIZE: u32 = 100;
pub const FIRST_PAGE_NUMBER: u32 = 1;

pub struct GithubClient {
    pub(crate) client: Client,
    pub(crate) github_url: String,
    pub(crate) sort: Sort,
    pub(crate) search_limiter: RateLimiter,
    pub(crate) languages_limiter: RateLimiter,
}

pub struct GithubRepo {
    name: String,
    owner: String,
}

impl lang_trends::api::Repo for GithubRepo {
    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> &str {
        &self.owner
    }
}

#[async_trait]
impl lang_trends::api::Client<GithubRepo, MAX_PAGE_SIZE, FIRST_PAGE_NUMBER> for GithubClient {
    async fn search_repos(&self, window: &YearWindow, page: u32, per_page: u32) -> Result<Vec<GithubRepo>> {
        self.search_limiter.wait().await;
        let request_url = format!("{}/search/repositories", self.github_url);
        let response = self
            .client
            .get(request_url)
            .query(&[
                ("q", window.query()),
                ("sort", self.sort.to_string()),
                ("order", "desc".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await?;
        let response = read_response::<payload::SearchRepos>(&self.search_limiter, response).await?;
        Ok(response.items.into_iter().map(GithubRepo::from).collect())
    }

    async fn repo_languages(&self, repo: &GithubRepo) -> Result<LanguageBreakdown> {
        self.languages_limiter.wait().await;
        let request_url = format!("{}/repos/{}/{}/languages", self.github_url, repo.owner, repo.name);
        let response = self.client.get(request_url).send().await?;
        let languages = read_response::<payload::Languages>(&self.languages_limiter, response).await?;
        Ok(languages.0)
    }
}

async fn read_response<BODY: DeserializeOwned>(limiter: &RateLimiter, response: Response) -> Result<BODY> {
    if let Err(err) = limiter.update(response.headers()).await {
        // Mock servers and proxies may not send the rate limit headers.
        debug!("Rate limit headers ignored: {}", err);
    }
    let response = response.error_for_status()?;
    Ok(response.json::<BODY>().await?)
}
