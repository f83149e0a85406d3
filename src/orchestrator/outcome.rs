use crate::chat::ChatMessage;
use crate::error::LLMError;

/// How an orchestration loop ended.
#[derive(Debug)]
pub enum OutcomeStatus {
    /// The model produced a final answer
    Completed,
    /// The model kept asking for tools past the round budget
    BudgetExhausted,
    /// A turn failed. `partial_text` holds what that turn streamed before failing
    /// and is never part of `Outcome::messages`.
    Failed {
        error: LLMError,
        partial_text: Option<String>,
    },
    Cancelled,
}

/// Result of one orchestration loop.
#[derive(Debug)]
pub struct Outcome {
    /// Input messages plus every completed round; safe to persist as-is
    pub messages: Vec<ChatMessage>,
    pub status: OutcomeStatus,
    /// Tool-execution rounds performed
    pub rounds: usize,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Completed | OutcomeStatus::BudgetExhausted
        )
    }

    /// The last assistant message, if any.
    pub fn final_message(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::chat::ChatRole::Assistant)
    }
}
