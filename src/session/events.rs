use crate::corpus::Category;
use crate::engine::scoring::Completion;
use crate::session::progress::CategoryProgress;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionSummary {
    pub category: Category,
    pub completion: Completion,
    pub attempts: u32,
    pub incorrect_count: usize,
    pub total_possible: usize,
}

/// Outbound notifications for the presentation layer, drained after each
/// inbound action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged {
        category: Category,
        progress: CategoryProgress,
    },
    FeedbackRevealed {
        index: usize,
        message: String,
    },
    CompletionReached(CompletionSummary),
}
