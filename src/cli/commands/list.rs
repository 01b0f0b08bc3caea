//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::knowledge_base::{open_index, KnowledgeBase};
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let index = open_index(&settings.knowledge_base, &settings.sqlite_path())?;
    let kb = KnowledgeBase::open(index, &settings.knowledge_base.collection).await?;

    match kb.list_videos().await {
        Ok(videos) if videos.is_empty() => {
            Output::info("No videos indexed yet. Use 'vidrag process <input>' to add one.");
        }
        Ok(videos) => {
            Output::header(&format!("Indexed Videos ({})", videos.len()));
            println!();

            for video in &videos {
                Output::video_info(&video.video_label, video.chunk_count, video.duration_seconds);
            }

            let total_chunks: usize = videos.iter().map(|v| v.chunk_count).sum();
            println!();
            Output::kv("Policy", &settings.knowledge_base.policy.to_string());
            Output::kv("Total chunks", &total_chunks.to_string());
        }
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
