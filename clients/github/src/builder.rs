use crate::limiter::RateLimit;
use crate::limiter::RateLimiter;
use crate::GithubClient;
use lang_trends::api::{Result, Sort};
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use secrecy::SecretString;
use std::time::Duration;
use tokio::sync::Mutex;

// Unauthenticated budget floors. Responses carry `x-ratelimit-*` headers that
// correct these after the first request on each resource.
const INITIAL_SEARCH_LIMIT: u32 = 10;
const INITIAL_CORE_LIMIT: u32 = 60;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GithubClientBuilder {
    client_builder: ClientBuilder,
    github_url: String,
    sort: Sort,
    headers: HeaderMap,
}

impl Default for GithubClientBuilder {
    fn default() -> Self {
        let builder = Self {
            client_builder: ClientBuilder::default().timeout(REQUEST_TIMEOUT),
            github_url: "https://api.github.com".to_string(),
            sort: Sort::Stars,
            headers: HeaderMap::default(),
        };
        builder
            .try_with_header(header::USER_AGENT, "lang_trends")
            .and_then(|builder| builder.try_with_header(header::ACCEPT, "application/vnd.github.v3+json"))
            .expect("Static default headers")
    }
}

impl GithubClientBuilder {
    /// Authorizes requests with an OAuth token. The header value is marked
    /// sensitive so it never shows up in logs.
    pub fn try_with_token(mut self, token: SecretString) -> Result<GithubClientBuilder> {
        let token = format!("token {}", token.expose_secret());
        let mut token = HeaderValue::from_str(&token).map_err(anyhow::Error::new)?;
        token.set_sensitive(true);
        self.headers.insert(header::AUTHORIZATION, token);
        Ok(self)
    }

    pub fn try_with_user_agent<STR: AsRef<str>>(self, user_agent: STR) -> Result<GithubClientBuilder> {
        Ok(self.try_with_header(header::USER_AGENT, user_agent)?)
    }

    pub fn with_github_url<STR: AsRef<str>>(mut self, url: STR) -> GithubClientBuilder {
        self.github_url = url.as_ref().to_string();
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> GithubClientBuilder {
        self.sort = sort;
        self
    }

    fn try_with_header(mut self, key: HeaderName, val: impl AsRef<str>) -> anyhow::Result<GithubClientBuilder> {
        let val = HeaderValue::from_str(val.as_ref())?;
        self.headers.insert(key, val);
        Ok(self)
    }

    pub fn build(self) -> Result<GithubClient> {
        let client = self.client_builder.default_headers(self.headers).build()?;
        let search_limit = RateLimit::new(INITIAL_SEARCH_LIMIT, INITIAL_SEARCH_LIMIT, 0);
        let core_limit = RateLimit::new(INITIAL_CORE_LIMIT, INITIAL_CORE_LIMIT, 0);
        Ok(GithubClient {
            client,
            github_url: self.github_url,
            sort: self.sort,
            search_limiter: RateLimiter::new(Mutex::new(search_limit)),
            languages_limiter: RateLimiter::new(Mutex::new(core_limit)),
        })
    }
}
