//! Video references: YouTube videos or local media files.

use crate::error::{Result, VidragError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Supported local media extensions (audio is extracted from video files).
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "aac", "ogg", "opus", "m4a", "mp4", "mkv", "avi", "mov", "webm", "m4v",
    "mpeg", "mpg",
];

/// A video the pipeline can acquire a transcript for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoReference {
    /// A YouTube video, identified by its 11-character ID.
    YouTube { id: String },
    /// A media file on disk.
    Local { path: PathBuf },
}

impl VideoReference {
    /// Parse a YouTube URL, bare YouTube ID, or local media path.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim().trim_matches('"');

        if let Some(id) = extract_youtube_id(input) {
            return Ok(VideoReference::YouTube { id });
        }

        let path = PathBuf::from(shellexpand::tilde(input).to_string());
        if path.is_file() {
            if is_media_file(&path) {
                return Ok(VideoReference::Local { path });
            }
            return Err(VidragError::InvalidInput(format!(
                "Unsupported media file: {}",
                path.display()
            )));
        }

        Err(VidragError::InvalidInput(format!(
            "Not a YouTube link or an existing media file: {}",
            input
        )))
    }

    /// URL or path handed to external tools.
    pub fn location(&self) -> String {
        match self {
            VideoReference::YouTube { id } => format!("https://www.youtube.com/watch?v={}", id),
            VideoReference::Local { path } => path.display().to_string(),
        }
    }

    /// Stable identifier used for temporary file names.
    pub fn key(&self) -> String {
        match self {
            VideoReference::YouTube { id } => id.clone(),
            VideoReference::Local { path } => path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| format!("local_{}", s))
                .unwrap_or_else(|| "local_media".to_string()),
        }
    }
}

impl std::fmt::Display for VideoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.location())
    }
}

fn youtube_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^(?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

/// Extract a YouTube video ID from a URL or bare ID.
pub fn extract_youtube_id(input: &str) -> Option<String> {
    // A bare 11-char name could also be a local file in the working directory.
    if Path::new(input).exists() {
        return None;
    }

    let caps = youtube_regex().captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_youtube_id() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_youtube_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?list=PL1&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_youtube_id("https://youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_youtube_id("dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));

        assert_eq!(extract_youtube_id("not-a-video-id"), None);
        assert_eq!(extract_youtube_id(""), None);
    }

    #[test]
    fn test_youtube_url_must_start_at_host() {
        assert_eq!(
            extract_youtube_id("https://evil.example/youtube.com/watch?v=dQw4w9WgXcQ"),
            None
        );
        assert_eq!(
            extract_youtube_id("see youtu.be/dQw4w9WgXcQ"),
            None
        );
        assert_eq!(
            extract_youtube_id("m.youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_parse_local_media() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.mp4");
        std::fs::write(&path, b"").unwrap();

        let reference = VideoReference::parse(path.to_str().unwrap()).unwrap();
        assert_eq!(reference, VideoReference::Local { path: path.clone() });
        assert_eq!(reference.key(), "local_lecture");
    }

    #[test]
    fn test_parse_rejects_unknown_input() {
        assert!(matches!(
            VideoReference::parse("/definitely/not/here.mp4"),
            Err(VidragError::InvalidInput(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"").unwrap();
        assert!(VideoReference::parse(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_youtube_location() {
        let reference = VideoReference::parse("\"https://youtu.be/dQw4w9WgXcQ\"").unwrap();
        assert_eq!(reference.location(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(reference.key(), "dQw4w9WgXcQ");
    }
}
