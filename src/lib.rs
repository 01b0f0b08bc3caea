//! vidrag - Question answering over video transcripts
//!
//! Turns a video into a searchable knowledge base of timestamped transcript
//! chunks, then answers questions about it with citations pointing back to
//! the moments in the video the answer came from.
//!
//! # Architecture
//!
//! - `source` - Video references (YouTube, local files)
//! - `audio` - Audio download, probing and splitting
//! - `transcript` - Transcript acquisition (captions, speech recognition)
//! - `segmenter` - Grouping transcript fragments into timed chunks
//! - `embedding` - Embedding generation
//! - `knowledge_base` - Vector index providers and the shared knowledge base
//! - `indexer` - Embedding and storing chunks
//! - `retriever` - Similarity search
//! - `llm` - Language model completion
//! - `synthesizer` - Grounded answers with citations
//! - `pipeline` - Process and ask
//!
//! # Example
//!
//! ```rust,no_run
//! use vidrag::config::Settings;
//! use vidrag::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(&settings).await?;
//!
//!     let result = pipeline.process("dQw4w9WgXcQ", "rick").await?;
//!     println!("Indexed {} chunks", result.chunk_count);
//!
//!     let answer = pipeline.ask("What is the song about?").await?;
//!     println!("{} {:?}", answer.text, answer.citations);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod knowledge_base;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod retriever;
pub mod segmenter;
pub mod source;
pub mod synthesizer;
pub mod transcript;

pub use error::{Result, VidragError};
