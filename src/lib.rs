mod args;

use github_client::GithubClientBuilder;
use lang_trends::api::Result;
use lang_trends::{CollectorConfig, TrendCollector, YearlyResults};
use log::debug;

pub use args::Args;
pub use lang_trends::RankedLanguage;

pub async fn collect_language_trends(args: Args) -> Result<YearlyResults> {
    let _ = env_logger::try_init();

    let client = GithubClientBuilder::default()
        .with_github_url(&args.api_url)
        .with_sort(args.sort)
        .try_with_token(args.api_token)?
        .build()?;

    let config = CollectorConfig {
        repo_target: args.repo_count,
        top_n: args.top_count,
        min_stars: args.min_stars,
        exclusions: args.exclude.into_iter().collect(),
        max_language_requests: args.max_lang_req,
    };
    debug!("Collecting {:?} with {:?}", args.years, config);

    let collector = TrendCollector::new(client, config);
    Ok(collector.collect_years(&args.years).await)
}
