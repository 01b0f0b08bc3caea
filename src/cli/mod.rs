//! CLI module for vidrag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// vidrag - Ask questions about videos
///
/// Indexes a video's transcript into a knowledge base and answers questions
/// about it with timestamp citations.
#[derive(Parser, Debug)]
#[command(name = "vidrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Fetch a video's transcript and index it
    Process {
        /// YouTube URL/ID, or local audio/video file path
        input: String,

        /// Label to index the video under (defaults to the video ID or file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Ask a question about the indexed video
    Ask {
        /// The question to ask
        question: String,

        /// Number of transcript chunks to ground the answer on
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only use chunks from this video label
        #[arg(long)]
        video: Option<String>,
    },

    /// Search for relevant transcript chunks
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Only search this video label
        #[arg(long)]
        video: Option<String>,
    },

    /// List indexed videos
    List,

    /// Start HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
