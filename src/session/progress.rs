use serde::{Deserialize, Serialize};

use crate::corpus::{Category, Corpus};
use crate::engine::scoring;

pub use crate::engine::scoring::{Grade, TokenStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Selecting,
    Graded,
    Complete,
}

/// Progress of one category on one text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub attempts: u32,
    pub is_attempting: bool,
    pub is_graded: bool,
    pub is_complete: bool,
    pub total_possible: usize,
    pub token_statuses: Vec<TokenStatus>,
}

impl CategoryProgress {
    pub fn fresh(corpus: &Corpus, category: Category) -> Self {
        Self {
            attempts: 0,
            is_attempting: true,
            is_graded: false,
            is_complete: false,
            total_possible: scoring::compute_total_possible(corpus, category),
            token_statuses: vec![TokenStatus::default(); corpus.len()],
        }
    }

    pub fn phase(&self) -> Phase {
        if self.is_complete {
            Phase::Complete
        } else if self.is_graded && !self.is_attempting {
            Phase::Graded
        } else {
            Phase::Selecting
        }
    }

    /// Whether a persisted record still fits the corpus it is loaded against.
    pub fn fits(&self, corpus: &Corpus, category: Category) -> bool {
        self.token_statuses.len() == corpus.len()
            && self.total_possible == scoring::compute_total_possible(corpus, category)
    }

    pub fn correct_units(&self, corpus: &Corpus, category: Category) -> usize {
        scoring::correct_unit_count(corpus, &self.token_statuses, category)
    }
}
