//! Answer synthesis boundary.
//!
//! Synthesis lives outside this crate: a chat-completion backend takes a
//! question plus the rendered context block and produces the final
//! natural-language answer. The engine forwards whatever the collaborator
//! returns without interpreting or validating it.

use async_trait::async_trait;

use crate::error::Result;

/// A language-model collaborator that turns retrieved context into an
/// answer.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    /// Produce an answer to `question` grounded in `context`.
    ///
    /// Implementations map their transport or model failures to
    /// [`RetrievalError::Synthesis`](crate::RetrievalError::Synthesis).
    async fn synthesize(&self, question: &str, context: &str) -> Result<String>;
}
