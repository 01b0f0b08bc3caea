//! `vidrag doctor`: can this machine process videos and answer questions?

use crate::cli::preflight::tool_version;
use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::TranscriptKind;
use console::style;
use std::path::Path;

const VERSION_WIDTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Verdict {
    Pass,
    Warn,
    Fail,
}

/// One diagnostic line.
#[derive(Debug)]
struct Finding {
    subject: String,
    verdict: Verdict,
    detail: String,
    remedy: Option<String>,
}

impl Finding {
    fn pass(subject: &str, detail: impl Into<String>) -> Self {
        Self {
            subject: subject.to_string(),
            verdict: Verdict::Pass,
            detail: detail.into(),
            remedy: None,
        }
    }

    fn warn(subject: &str, detail: impl Into<String>, remedy: &str) -> Self {
        Self {
            verdict: Verdict::Warn,
            remedy: Some(remedy.to_string()),
            ..Self::pass(subject, detail)
        }
    }

    fn fail(subject: &str, detail: impl Into<String>, remedy: &str) -> Self {
        Self {
            verdict: Verdict::Fail,
            ..Self::warn(subject, detail, remedy)
        }
    }

    /// A failure of something the configured pipeline never uses.
    fn optional(self, reason: &str) -> Self {
        if self.verdict != Verdict::Fail {
            return self;
        }
        Self {
            verdict: Verdict::Warn,
            detail: format!("{} ({})", self.detail, reason),
            ..self
        }
    }

    fn print(&self) {
        let icon = match self.verdict {
            Verdict::Pass => style("✓").green(),
            Verdict::Warn => style("!").yellow(),
            Verdict::Fail => style("✗").red(),
        };
        println!("  {} {} - {}", icon, style(&self.subject).bold(), self.detail);
        if let Some(remedy) = &self.remedy {
            println!("    {} {}", style("→").dim(), style(remedy).dim());
        }
    }
}

/// Run every diagnostic and print a report grouped by section.
pub fn run_doctor(settings: &Settings, config_path: Option<&str>) -> anyhow::Result<()> {
    Output::header("vidrag Doctor");
    println!();

    let sections = [
        ("External Tools", tool_findings(settings)),
        ("OpenAI", vec![api_key_finding(std::env::var("OPENAI_API_KEY").ok())]),
        ("Pipeline", pipeline_findings(settings)),
        ("Storage", storage_findings(settings)),
        (
            "Configuration",
            vec![config_finding(&Settings::config_path(config_path))],
        ),
    ];

    for (title, findings) in &sections {
        println!("{}", style(title).bold());
        for finding in findings {
            finding.print();
        }
        println!();
    }

    let all = sections.iter().flat_map(|(_, f)| f);
    let (failures, warnings) = all.fold((0, 0), |(f, w), finding| match finding.verdict {
        Verdict::Fail => (f + 1, w),
        Verdict::Warn => (f, w + 1),
        Verdict::Pass => (f, w),
    });

    if failures > 0 {
        Output::error(&format!("{} problem(s) must be fixed before using vidrag.", failures));
        anyhow::bail!("doctor found {} failing check(s)", failures);
    }
    if warnings > 0 {
        Output::warning(&format!("Ready, with {} warning(s).", warnings));
    } else {
        Output::success("Ready to process videos.");
    }
    Ok(())
}

fn tool_findings(settings: &Settings) -> Vec<Finding> {
    let speech = settings.transcript.preference.contains(&TranscriptKind::Speech);

    let mut findings = vec![tool_finding("yt-dlp", ytdlp_remedy())];
    for tool in ["ffmpeg", "ffprobe"] {
        let finding = tool_finding(tool, ffmpeg_remedy());
        findings.push(if speech {
            finding
        } else {
            finding.optional("only needed for speech recognition")
        });
    }
    findings
}

fn tool_finding(name: &str, remedy: &str) -> Finding {
    match tool_version(name) {
        Ok(version) if version.is_empty() => Finding::pass(name, "installed"),
        Ok(version) => Finding::pass(name, shorten(&version, VERSION_WIDTH)),
        Err(e) => Finding::fail(name, e.to_string(), remedy),
    }
}

/// At most `width` characters, with an ellipsis when cut.
fn shorten(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn api_key_finding(key: Option<String>) -> Finding {
    const NAME: &str = "OPENAI_API_KEY";
    const REMEDY: &str = "Set with: export OPENAI_API_KEY='sk-...'";

    match key {
        None => Finding::fail(NAME, "not set", REMEDY),
        Some(key) if key.is_empty() => Finding::fail(NAME, "empty", REMEDY),
        Some(key) if key.starts_with("sk-") && key.chars().count() > 20 => {
            let head: String = key.chars().take(7).collect();
            let tail: String = key.chars().skip(key.chars().count() - 4).collect();
            Finding::pass(NAME, format!("configured ({}...{})", head, tail))
        }
        Some(_) => Finding::warn(
            NAME,
            "set, but does not look like an OpenAI key",
            "Expected format: sk-...",
        ),
    }
}

fn pipeline_findings(settings: &Settings) -> Vec<Finding> {
    let preference = &settings.transcript.preference;
    let transcripts = if preference.is_empty() {
        Finding::fail(
            "Transcript sources",
            "none configured",
            "Set transcript.preference, e.g. [\"manual\", \"auto\", \"speech\"]",
        )
    } else {
        let order: Vec<String> = preference.iter().map(ToString::to_string).collect();
        Finding::pass("Transcript sources", order.join(" -> "))
    };

    let kb = &settings.knowledge_base;
    let knowledge_base = match kb.provider.as_str() {
        "sqlite" | "memory" => Finding::pass(
            "Knowledge base",
            format!("{} ({}, policy: {})", kb.collection, kb.provider, kb.policy),
        ),
        other => Finding::fail(
            "Knowledge base",
            format!("unknown provider '{}'", other),
            "Use knowledge_base.provider = \"sqlite\" or \"memory\"",
        ),
    };

    vec![transcripts, knowledge_base]
}

fn storage_findings(settings: &Settings) -> Vec<Finding> {
    if settings.knowledge_base.provider == "memory" {
        return vec![Finding::pass("Database", "in memory; nothing persists")];
    }

    let db_path = settings.sqlite_path();
    let database = match std::fs::metadata(&db_path) {
        Ok(meta) => Finding::pass(
            "Database",
            format!("{} ({})", db_path.display(), human_size(meta.len())),
        ),
        Err(_) => Finding::warn(
            "Database",
            format!("{} (not created yet)", db_path.display()),
            "It is created when the first video is processed",
        ),
    };
    vec![database]
}

/// The config file must parse if it exists; a missing file means defaults.
fn config_finding(path: &Path) -> Finding {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            return Finding::warn(
                "Config file",
                format!("{} not found, using defaults", path.display()),
                "Create with: vidrag config edit",
            )
        }
    };

    match toml::from_str::<Settings>(&content) {
        Ok(_) => Finding::pass("Config file", path.display().to_string()),
        Err(e) => Finding::fail(
            "Config file",
            format!("{} does not parse: {}", path.display(), e.message()),
            "Fix the file or recreate it with: vidrag config edit",
        ),
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }

    if unit == "B" {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, unit)
    }
}

fn ytdlp_remedy() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else {
        "Install with: pip install yt-dlp (or your package manager)"
    }
}

fn ffmpeg_remedy() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    }
}
