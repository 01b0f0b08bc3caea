//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    top_k: Option<usize>,
    video: Option<&str>,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidrag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let top_k = top_k.unwrap_or(settings.rag.top_k);
    let pipeline = Pipeline::new(&settings).await?;

    let spinner = Output::spinner("Searching knowledge base...");
    let result = pipeline.ask_with(question, top_k, video).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            println!("\n{}\n", answer.text);

            if !answer.citations.is_empty() {
                Output::header("Sources");
                for citation in &answer.citations {
                    Output::list_item(citation);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
