//! Process command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::source::VideoReference;
use anyhow::Result;

/// Run the process command.
pub async fn run_process(input: &str, name: Option<&str>, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::process(&settings.transcript.preference)) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidrag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let reference = VideoReference::parse(input)?;
    let label = name.map(str::to_string).unwrap_or_else(|| reference.key());

    let pipeline = Pipeline::new(&settings).await?;

    Output::info(&format!("Processing {} as '{}'", reference, label));
    let spinner = Output::spinner("Fetching transcript and indexing...");

    let result = pipeline.process_reference(&reference, &label).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) if result.chunk_count == 0 => {
            Output::warning("The transcript contained no usable text; nothing was indexed.");
        }
        Ok(result) => {
            Output::success(&format!(
                "Indexed {} chunks for '{}'",
                result.chunk_count, result.video_label
            ));
            Output::info("Ask away: vidrag ask \"...\"");
        }
        Err(e) => {
            Output::error(&format!("Processing failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
