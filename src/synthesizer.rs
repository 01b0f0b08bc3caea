//! Grounded answer generation.

use crate::config::Prompts;
use crate::error::{Result, VidragError};
use crate::llm::LanguageModel;
use crate::retriever::RetrievalResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A generated answer and the timestamp ranges it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// `[start - end]` for each retrieved record, in ranking order.
    pub citations: Vec<String>,
}

/// Builds the grounding prompt and asks the language model once.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LanguageModel>,
    prompts: Prompts,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>, prompts: Prompts) -> Self {
        Self { llm, prompts }
    }

    /// Answer `question` from `results`.
    ///
    /// With no results the model is not called and the configured
    /// not-found answer comes back with no citations.
    #[instrument(skip(self, results), fields(results = results.len()))]
    pub async fn synthesize(&self, question: &str, results: &RetrievalResult) -> Result<Answer> {
        if results.is_empty() {
            info!("No relevant content retrieved");
            return Ok(Answer {
                text: self.prompts.rag.not_found.clone(),
                citations: Vec::new(),
            });
        }

        let citations: Vec<String> = results
            .iter()
            .map(|r| r.record.metadata.citation())
            .collect();
        let prompt = self.build_prompt(question, results);

        let text = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|e| VidragError::Synthesis(e.to_string()))?;

        debug!("Answer grounded on {} records", citations.len());
        Ok(Answer { text, citations })
    }

    fn build_prompt(&self, question: &str, results: &RetrievalResult) -> String {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), format_context(results));
        vars.insert("question".to_string(), question.to_string());

        let user = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);
        format!("{}\n\n{}", self.prompts.rag.system, user)
    }
}

/// One `Timestamp [start - end]: text` paragraph per record, in ranking order.
pub fn format_context(results: &RetrievalResult) -> String {
    results
        .iter()
        .map(|r| format!("Timestamp {}: {}\n\n", r.record.metadata.citation(), r.record.text))
        .collect()
}
