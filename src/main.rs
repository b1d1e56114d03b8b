use log::error;
use std::env;
use std::process::ExitCode;

use recette_import::search::search_recipes;
use recette_import::{scrape_recipes, ImportError, ScraperConfig};

const USAGE: &str = "Usage:\n  recette-import scrape <url>...\n  recette-import search <query...>";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<ExitCode, ImportError> {
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::FAILURE);
    };
    if rest.is_empty() || !matches!(command.as_str(), "scrape" | "search") {
        eprintln!("{USAGE}");
        return Ok(ExitCode::FAILURE);
    }

    let config = ScraperConfig::load()?;
    let fetcher = config.build_fetcher()?;

    match command.as_str() {
        "scrape" => {
            let outcome = scrape_recipes(rest, &fetcher).await;
            for failure in &outcome.failures {
                eprintln!("Failed to scrape {}: {}", failure.url, failure.message);
            }

            let output = match outcome.recipes.as_slice() {
                [single] if rest.len() == 1 => serde_json::to_string_pretty(single),
                recipes => serde_json::to_string_pretty(recipes),
            };
            if !outcome.recipes.is_empty() {
                println!("{}", output.unwrap_or_default());
            }

            Ok(exit_code(outcome.failures.is_empty()))
        }
        "search" => {
            let query = rest.join(" ");
            let outcome = search_recipes(&query, &config.search_options(), &fetcher).await?;
            for e in &outcome.errors {
                eprintln!("Search failed for {} ({}): {}", e.site_name, e.site_id, e.message);
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).unwrap_or_default()
            );

            Ok(exit_code(outcome.errors.is_empty()))
        }
        _ => {
            eprintln!("{USAGE}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
