//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::error::{Result, VidragError};
use crate::openai::is_api_key_configured;
use crate::transcript::TranscriptKind;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Processing always embeds; speech recognition also needs ffmpeg.
    Process { speech_recognition: bool },
    /// Asking questions embeds the question and calls the model.
    Ask,
    /// Search embeds the query.
    Search,
}

impl Operation {
    /// Processing requirements for a transcript preference list.
    pub fn process(preference: &[TranscriptKind]) -> Self {
        Operation::Process {
            speech_recognition: preference.contains(&TranscriptKind::Speech),
        }
    }
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    check_api_key()?;

    if let Operation::Process { speech_recognition } = operation {
        check_tool("yt-dlp")?;
        if speech_recognition {
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(VidragError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    tool_version(name).map(|_| ())
}

/// First line a tool prints for its version flag.
pub fn tool_version(name: &str) -> Result<String> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()),
        Ok(_) => Err(VidragError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidragError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(VidragError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
