//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    limit: usize,
    video: Option<&str>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let pipeline = Pipeline::new(&settings).await?;

    let spinner = Output::spinner("Searching...");
    let results = pipeline.search(query, limit, video).await;
    spinner.finish_and_clear();

    match results {
        Ok(results) if results.is_empty() => {
            Output::warning("No results found. Has a video been processed yet?");
        }
        Ok(results) => {
            Output::success(&format!("Found {} results", results.len()));

            for result in &results {
                let record = &result.record;
                Output::search_result(
                    &record.metadata.video_label,
                    &record.metadata.citation(),
                    result.score,
                    &record.text,
                );
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
