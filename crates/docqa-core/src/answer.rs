//! Answer synthesis port.
//!
//! An [`AnswerSynthesizer`] turns a question plus retrieved context into a
//! natural-language answer. Concrete providers (Gemini, OpenAI chat) live in
//! the `docqa` app crate.
//!
//! The fixed answers below are what [`Notebook::ask`](crate::notebook::Notebook::ask)
//! returns when no synthesizer call is made or the call fails, so a caller
//! always gets answer text.

use async_trait::async_trait;

/// Returned when retrieval finds no passage for the question.
pub const NO_RELEVANT_INFO_ANSWER: &str =
    "I couldn't find any relevant information in the uploaded document.";

/// Returned when the question itself could not be embedded.
pub const EMBEDDING_FAILED_ANSWER: &str =
    "I couldn't process the question right now because the embedding service failed. Please try again.";

#[derive(Debug, Clone, thiserror::Error)]
pub enum SynthesisError {
    #[error("answer provider is disabled")]
    Disabled,

    #[error("answer provider error: {0}")]
    Provider(String),

    #[error("answer provider returned no text")]
    EmptyResponse,
}

/// Trait for answer-generation backends.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    /// Provider identifier for logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    async fn answer(&self, question: &str, context: &str) -> Result<String, SynthesisError>;
}

/// Build the grounded prompt sent to a generation model.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question using only the context below. \
         If the context does not contain the answer, say so.\n\n\
         Context:\n{}\n\nQuestion: {}",
        context, question
    )
}

/// Explanatory answer text for a failed synthesis call.
pub fn synthesis_failure_answer(err: &SynthesisError) -> String {
    format!("Unable to generate an answer: {}", err)
}
