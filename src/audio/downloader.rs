//! Audio download and splitting.
//!
//! YouTube audio is fetched with yt-dlp; local media has its audio track
//! extracted with ffmpeg. Long files are cut into pieces small enough for the
//! speech recognition API.

use crate::error::{Result, VidragError};
use crate::source::VideoReference;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Produce an MP3 of the reference's audio inside `output_dir`.
///
/// The caller owns the returned file and should remove it when done.
#[instrument(skip(output_dir), fields(video = %reference))]
pub async fn extract_audio(reference: &VideoReference, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let target_path = output_dir.join(format!("{}.mp3", reference.key()));

    match reference {
        VideoReference::YouTube { .. } => {
            download_with_ytdlp(&reference.location(), &reference.key(), output_dir).await?;
            let downloaded = find_audio_file(output_dir, &reference.key())?;
            if downloaded != target_path {
                convert_to_mp3(&downloaded, &target_path).await?;
                if let Err(e) = std::fs::remove_file(&downloaded) {
                    warn!("Failed to remove intermediate audio file: {}", e);
                }
            }
        }
        VideoReference::Local { path } => {
            info!("Extracting audio from {:?}", path);
            convert_to_mp3(path, &target_path).await?;
        }
    }

    Ok(target_path)
}

async fn download_with_ytdlp(url: &str, key: &str, output_dir: &Path) -> Result<()> {
    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", key));

    let result = Command::new("yt-dlp")
        .arg("--format").arg("bestaudio/best")
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("192K")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VidragError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(VidragError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VidragError::AudioDownload(format!("yt-dlp failed: {stderr}")));
    }

    Ok(())
}

/// Locates a downloaded audio file by key.
fn find_audio_file(dir: &Path, key: &str) -> Result<PathBuf> {
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", key, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(VidragError::AudioDownload("Audio file not found after download".into()))
}

/// Converts any media file's audio track to MP3 using ffmpeg.
async fn convert_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {:?} to MP3", source);

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("4")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(VidragError::AudioDownload(format!("ffmpeg conversion failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidragError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(VidragError::AudioDownload(format!("ffmpeg error: {e}"))),
    }
}

/// Cut `source` into pieces of at most `piece_seconds`.
///
/// Returns `(piece_path, offset_seconds)` pairs in playback order. Audio
/// shorter than one piece is returned as-is with offset zero.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    piece_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    std::fs::create_dir_all(output_dir)?;

    let total_duration = probe_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let piece_len = piece_seconds.max(1) as f64;
    if total_duration <= piece_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut pieces = Vec::new();
    let mut offset = 0.0;
    let mut idx = 0u32;

    while offset < total_duration {
        let piece_path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        let length = piece_len.min(total_duration - offset);

        extract_piece(source, &piece_path, offset, length).await?;

        debug!("Created piece {} at offset {:.1}s", idx, offset);
        pieces.push((piece_path, offset));

        offset += piece_len;
        idx += 1;
    }

    info!("Split audio into {} pieces", pieces.len());
    Ok(pieces)
}

async fn extract_piece(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() && dest.exists() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(VidragError::AudioDownload(format!("Piece extraction failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidragError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(VidragError::AudioDownload(format!("ffmpeg error: {e}"))),
    }
}

/// Queries the duration of an audio file using ffprobe.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VidragError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(VidragError::AudioDownload(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(VidragError::AudioDownload("ffprobe returned error".into()));
    }

    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_duration(json_str: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|_| VidragError::AudioDownload("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| VidragError::AudioDownload("Could not determine audio duration".into()))
}
