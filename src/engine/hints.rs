use crate::corpus::{Category, Corpus};
use crate::engine::scoring::{Grade, TokenStatus};

pub const OTHER_CATEGORIES_THRESHOLD: f64 = 0.5;
pub const SENTENCES_THRESHOLD: f64 = 0.75;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HintTier {
    /// Marks words already found in the other categories.
    OtherCategories,
    /// Marks sentences that still hide a target word.
    Sentences,
}

impl HintTier {
    pub const ALL: [HintTier; 2] = [HintTier::OtherCategories, HintTier::Sentences];

    pub fn threshold(self) -> f64 {
        match self {
            HintTier::OtherCategories => OTHER_CATEGORIES_THRESHOLD,
            HintTier::Sentences => SENTENCES_THRESHOLD,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HintTier::OtherCategories => "Show other categories",
            HintTier::Sentences => "Highlight unfinished sentences",
        }
    }
}

pub fn completion_ratio(correct_units: usize, total_possible: usize) -> f64 {
    if total_possible == 0 {
        return 0.0;
    }
    correct_units as f64 / total_possible as f64
}

pub fn is_unlocked(tier: HintTier, correct_units: usize, total_possible: usize) -> bool {
    completion_ratio(correct_units, total_possible) >= tier.threshold()
}

/// For each token, the other category it was already found in, if any.
/// `statuses` holds one slice per category, indexed by `Category::index`.
///
/// A token whose own categories include `active` is never marked, since
/// marking it would give the answer away.
pub fn other_category_marks(
    corpus: &Corpus,
    active: Category,
    statuses: &[&[TokenStatus]],
) -> Vec<Option<Category>> {
    corpus
        .tokens()
        .iter()
        .enumerate()
        .map(|(i, token)| {
            if token.pos.len() > 1 && token.matches(active) {
                return None;
            }
            Category::ALL
                .into_iter()
                .filter(|&c| c != active)
                .find(|&c| {
                    statuses
                        .get(c.index())
                        .and_then(|s| s.get(i))
                        .is_some_and(|s| s.status == Grade::Correct)
                })
        })
        .collect()
}

/// Indices into `corpus.sentences()` of sentences holding a target word not
/// yet graded correct.
pub fn unfinished_sentences(
    corpus: &Corpus,
    statuses: &[TokenStatus],
    category: Category,
) -> Vec<usize> {
    corpus
        .sentences()
        .iter()
        .enumerate()
        .filter(|&(_, range)| {
            range.clone().any(|i| {
                corpus.tokens()[i].matches(category)
                    && statuses.get(i).is_none_or(|s| s.status != Grade::Correct)
            })
        })
        .map(|(n, _)| n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::{punct, word};
    use Category::{Adjective, Noun, Verb};

    fn corpus() -> Corpus {
        Corpus::from_tokens(vec![
            word("Puella", &[Noun]),
            word("cantat", &[Verb]),
            punct("."),
            word("amica", &[Noun, Adjective]),
            word("bona", &[Adjective]),
            word("est", &[Verb]),
            punct("."),
        ])
    }

    #[test]
    fn test_unlock_thresholds() {
        assert!(!is_unlocked(HintTier::OtherCategories, 1, 4));
        assert!(is_unlocked(HintTier::OtherCategories, 2, 4));
        assert!(!is_unlocked(HintTier::Sentences, 2, 4));
        assert!(is_unlocked(HintTier::Sentences, 3, 4));
    }

    #[test]
    fn test_empty_category_never_unlocks() {
        assert_eq!(completion_ratio(0, 0), 0.0);
        assert!(!is_unlocked(HintTier::OtherCategories, 0, 0));
    }

    #[test]
    fn test_other_category_marks_skip_dual_tokens() {
        let corpus = corpus();
        let mut found = vec![vec![TokenStatus::default(); corpus.len()]; Category::ALL.len()];
        found[Noun.index()][0].status = Grade::Correct;
        found[Noun.index()][3].status = Grade::Correct;

        let statuses: Vec<&[TokenStatus]> = found.iter().map(Vec::as_slice).collect();
        let marks = other_category_marks(&corpus, Adjective, &statuses);
        assert_eq!(marks[0], Some(Noun));
        // amica is Noun and Adjective: no giveaway while hunting adjectives.
        assert_eq!(marks[3], None);

        let marks = other_category_marks(&corpus, Verb, &statuses);
        assert_eq!(marks[3], Some(Noun));
    }

    #[test]
    fn test_unfinished_sentences() {
        let corpus = corpus();
        let mut statuses = vec![TokenStatus::default(); corpus.len()];
        assert_eq!(unfinished_sentences(&corpus, &statuses, Verb), vec![0, 1]);

        statuses[1].status = Grade::Correct;
        assert_eq!(unfinished_sentences(&corpus, &statuses, Verb), vec![1]);

        statuses[5].status = Grade::Correct;
        assert!(unfinished_sentences(&corpus, &statuses, Verb).is_empty());
        // A sentence without adjectives never lights up.
        assert_eq!(unfinished_sentences(&corpus, &statuses, Adjective), vec![1]);
    }
}
