use clap::Parser;
use lang_trends::api::Error;
use lang_trends_app::Args;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let results = lang_trends_app::collect_language_trends(args).await?;

    for (year, ranking) in &results {
        println!("{}", year);
        for ranked in ranking {
            println!("\t{}", ranked);
        }
    }

    Ok(())
}
