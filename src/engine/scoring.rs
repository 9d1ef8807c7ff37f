use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::corpus::{Category, Corpus};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    #[default]
    None,
    Correct,
    Incorrect,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatus {
    pub selected: bool,
    pub status: Grade,
    #[serde(default)]
    pub feedback_shown: bool,
}

impl TokenStatus {
    pub fn is_graded(&self) -> bool {
        self.status != Grade::None
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealedFeedback {
    pub index: usize,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GradeReport {
    pub statuses: Vec<TokenStatus>,
    /// Every selected token outside the category, counted individually.
    pub incorrect_count: usize,
    /// Gradable units now fully correct, composite groups collapsed.
    pub correct_units: usize,
    pub revealed: Vec<RevealedFeedback>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Gamed,
    Excellent,
    Standard,
}

impl Completion {
    pub fn as_str(self) -> &'static str {
        match self {
            Completion::Gamed => "gamed",
            Completion::Excellent => "excellent",
            Completion::Standard => "standard",
        }
    }
}

/// Count gradable units for `category` whose members all satisfy `pred`.
///
/// A non-composite token is one unit. A composite group is one unit, made of
/// its members that belong to the category; it counts only when every such
/// member satisfies `pred`.
fn count_units(corpus: &Corpus, category: Category, pred: impl Fn(usize) -> bool) -> usize {
    let mut simple = 0;
    let mut groups: BTreeMap<&str, bool> = BTreeMap::new();

    for (i, token) in corpus.tokens().iter().enumerate() {
        if !token.matches(category) {
            continue;
        }
        match token.composite.as_deref() {
            Some(group) => {
                let all = groups.entry(group).or_insert(true);
                *all = *all && pred(i);
            }
            None => {
                if pred(i) {
                    simple += 1;
                }
            }
        }
    }

    simple + groups.values().filter(|&&all| all).count()
}

pub fn compute_total_possible(corpus: &Corpus, category: Category) -> usize {
    count_units(corpus, category, |_| true)
}

pub fn correct_unit_count(corpus: &Corpus, statuses: &[TokenStatus], category: Category) -> usize {
    count_units(corpus, category, |i| {
        statuses.get(i).is_some_and(|s| s.status == Grade::Correct)
    })
}

/// Provisional score shown while selecting: units whose members are all
/// currently selected.
pub fn selected_unit_count(corpus: &Corpus, statuses: &[TokenStatus], category: Category) -> usize {
    count_units(corpus, category, |i| statuses.get(i).is_some_and(|s| s.selected))
}

pub fn selected_incorrect_count(
    corpus: &Corpus,
    statuses: &[TokenStatus],
    category: Category,
) -> usize {
    statuses
        .iter()
        .zip(corpus.tokens())
        .filter(|(s, t)| s.selected && !t.matches(category))
        .count()
}

pub fn grade(statuses: &[TokenStatus], corpus: &Corpus, category: Category) -> GradeReport {
    let mut statuses = statuses.to_vec();
    let mut incorrect_count = 0;
    let mut revealed = Vec::new();

    for (i, (status, token)) in statuses.iter_mut().zip(corpus.tokens()).enumerate() {
        if !status.selected {
            continue;
        }

        if token.matches(category) {
            status.status = Grade::Correct;
        } else {
            status.status = Grade::Incorrect;
            incorrect_count += 1;
        }

        if !status.feedback_shown {
            if let Some(message) = token.feedback.get(&category) {
                status.feedback_shown = true;
                if !message.trim().is_empty() {
                    revealed.push(RevealedFeedback {
                        index: i,
                        message: message.clone(),
                    });
                }
            }
        }
    }

    let correct_units = correct_unit_count(corpus, &statuses, category);
    GradeReport {
        statuses,
        incorrect_count,
        correct_units,
        revealed,
    }
}

pub fn classify_completion(attempts: u32, incorrect_count: usize, total_possible: usize) -> Completion {
    if incorrect_count >= total_possible && incorrect_count > 5 {
        Completion::Gamed
    } else if attempts <= 2 && incorrect_count <= 3 {
        Completion::Excellent
    } else {
        Completion::Standard
    }
}
