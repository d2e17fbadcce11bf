use clap::Parser;
use lang_trends::api::Sort;
use lang_trends::DEFAULT_EXCLUSIONS;
use secrecy::SecretString;
use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Calendar years to sample
    #[clap(short, long, multiple_values = true, required = true, parse(try_from_str=year_in_range))]
    pub years: Vec<u16>,

    /// Minimal star count of sampled repositories
    #[clap(long, env, default_value_t = 1000)]
    pub min_stars: u32,

    /// Number of repositories sampled per year
    #[clap(short, long, env, default_value_t = 500, parse(try_from_str=repo_count_in_range))]
    pub repo_count: u32,

    /// Number of ranked languages reported per year
    #[clap(short, long, env, default_value_t = 10, parse(try_from_str=top_count_in_range))]
    pub top_count: usize,

    /// Languages excluded from the ranking
    #[clap(short, long, multiple_values = true, default_values = &DEFAULT_EXCLUSIONS)]
    pub exclude: Vec<String>,

    #[clap(short, long, env, default_value = "stars")]
    pub sort: Sort,

    /// API OAuth access token
    #[clap(short, long, env = "GITHUB_TOKEN")]
    pub api_token: SecretString,

    /// Repository API URL
    #[clap(long, env, default_value = "https://api.github.com")]
    pub api_url: String,

    /// Maximal parallel repository language requests
    #[clap(long, env, default_value_t = 10, parse(try_from_str=max_lang_req_in_range))]
    pub max_lang_req: usize,
}

fn year_in_range(value: &str) -> clap::Result<u16, String> {
    // GitHub went live in 2008, nothing to sample before that.
    number_in_range(value, 2008, 2100, "year".to_string())
}

fn repo_count_in_range(value: &str) -> clap::Result<u32, String> {
    number_in_range(value, 1, u32::MAX, "repo_count".to_string())
}

fn top_count_in_range(value: &str) -> clap::Result<usize, String> {
    number_in_range(value, 1, 100, "top_count".to_string())
}

fn max_lang_req_in_range(value: &str) -> clap::Result<usize, String> {
    number_in_range(value, 1, usize::MAX, "max_lang_req".to_string())
}

fn number_in_range<T>(value: &str, min: T, max: T, name: String) -> clap::Result<T, String>
where
    T: FromStr + PartialOrd + Display,
    <T as FromStr>::Err: Display,
{
    value.parse::<T>().map_err(|err| format!("{}", err)).and_then(|value| {
        if value < min || value > max {
            return Err(format!("{} is not in range {} .. {}.", name, min, max));
        }
        Ok(value)
    })
}

/// Tests

#[test]
fn year_in_range_test() {
    assert_eq!(year_in_range("2023"), Ok(2023));
    assert!(year_in_range("1999").is_err(), "Years before 2008 are invalid");
    assert!(year_in_range("20x3").is_err(), "Malformed years are invalid");
    assert!(year_in_range("").is_err(), "Empty years are invalid");
}
