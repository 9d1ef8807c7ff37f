use anyhow::Result;

use crate::corpus::{Category, Corpus};
use crate::engine::hints::{self, HintTier};
use crate::engine::scoring;
use crate::session::events::{CompletionSummary, SessionEvent};
use crate::session::progress::{CategoryProgress, Phase, TokenStatus};
use crate::store::schema::ProgressKey;
use crate::store::{self, ProgressStore};

/// Counters shown once a category has been graded at least once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Counters {
    /// True while selecting: `units` counts selections, not graded answers.
    pub provisional: bool,
    pub units: usize,
    pub total_possible: usize,
    pub incorrect: usize,
    pub attempts: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct HintSlot {
    unlocked: bool,
    enabled: bool,
}

/// Quiz state for one text: the active category, every category's progress
/// and the hint toggles. Each mutation is persisted before returning.
pub struct Session {
    text_id: String,
    corpus: Corpus,
    store: Box<dyn ProgressStore>,
    active: Category,
    progress: Vec<CategoryProgress>,
    hints: [HintSlot; 2],
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(
        text_id: &str,
        corpus: Corpus,
        store: Box<dyn ProgressStore>,
        initial: Category,
    ) -> Self {
        let progress = store::keys_for_text(text_id)
            .iter()
            .map(|key| store::load_progress(store.as_ref(), key, &corpus))
            .collect();

        let mut session = Self {
            text_id: text_id.to_string(),
            corpus,
            store,
            active: initial,
            progress,
            hints: [HintSlot::default(); 2],
            events: Vec::new(),
        };
        session.refresh_hints();
        session.notify_state(initial);
        session
    }

    pub fn text_id(&self) -> &str {
        &self.text_id
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn active(&self) -> Category {
        self.active
    }

    pub fn progress(&self, category: Category) -> &CategoryProgress {
        &self.progress[category.index()]
    }

    pub fn active_progress(&self) -> &CategoryProgress {
        self.progress(self.active)
    }

    pub fn all_progress(&self) -> &[CategoryProgress] {
        &self.progress
    }

    pub fn phase(&self) -> Phase {
        self.active_progress().phase()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Toggle the token at `index` (and its composite group) for the active
    /// category. Returns false when the action is ignored.
    pub fn toggle_selection(&mut self, index: usize) -> bool {
        let category = self.active;
        let Some(token) = self.corpus.token(index) else {
            log::debug!("toggle ignored: no token at {index}");
            return false;
        };
        if !token.is_selectable() {
            log::debug!("toggle ignored: token {index} is not a word");
            return false;
        }

        let unit = self.corpus.selection_unit(index);
        let progress = &mut self.progress[category.index()];
        if progress.is_complete {
            log::debug!("toggle ignored: {category} is complete");
            return false;
        }
        if progress.token_statuses[index].is_graded() {
            log::debug!("toggle ignored: token {index} is already graded");
            return false;
        }

        if progress.phase() == Phase::Graded {
            progress.is_attempting = true;
            progress.is_graded = false;
            progress.attempts += 1;
        }

        let selected = !progress.token_statuses[index].selected;
        for i in unit {
            let status = &mut progress.token_statuses[i];
            if !status.is_graded() {
                status.selected = selected;
            }
        }

        self.persist(category);
        self.notify_state(category);
        true
    }

    /// Grade the active category's selection. Returns false when the category
    /// is already complete.
    pub fn submit_for_grading(&mut self) -> bool {
        let category = self.active;
        let progress = &self.progress[category.index()];
        if progress.is_complete {
            log::debug!("submit ignored: {category} is complete");
            return false;
        }

        let report = scoring::grade(&progress.token_statuses, &self.corpus, category);
        let progress = &mut self.progress[category.index()];
        progress.token_statuses = report.statuses;
        progress.attempts = progress.attempts.max(1);
        progress.is_attempting = false;
        progress.is_graded = true;

        for revealed in report.revealed {
            self.events.push(SessionEvent::FeedbackRevealed {
                index: revealed.index,
                message: revealed.message,
            });
        }

        if report.correct_units == progress.total_possible {
            progress.is_complete = true;
            let summary = CompletionSummary {
                category,
                completion: scoring::classify_completion(
                    progress.attempts,
                    report.incorrect_count,
                    progress.total_possible,
                ),
                attempts: progress.attempts,
                incorrect_count: report.incorrect_count,
                total_possible: progress.total_possible,
            };
            log::info!(
                "{} {category} complete: {} after {} attempt(s)",
                self.text_id,
                summary.completion.as_str(),
                summary.attempts
            );
            self.events.push(SessionEvent::CompletionReached(summary));
        } else {
            log::debug!(
                "{} {category}: {}/{} units, {} incorrect",
                self.text_id,
                report.correct_units,
                progress.total_possible,
                report.incorrect_count
            );
        }

        self.persist(category);
        self.refresh_hints();
        self.notify_state(category);
        true
    }

    /// Save the outgoing category and make `category` the active one. The
    /// incoming progress is already in memory and is never reloaded.
    pub fn switch_category(&mut self, category: Category) -> bool {
        if category == self.active {
            return false;
        }
        let outgoing = self.active;
        self.persist(outgoing);
        self.active = category;

        self.refresh_hints();
        self.notify_state(category);
        true
    }

    /// Erase all stored progress, for every text, and restart this one fresh.
    pub fn reset_all(&mut self) -> Result<()> {
        self.store.reset_all()?;
        log::info!("all progress reset");

        for category in Category::ALL {
            let key = ProgressKey::new(&self.text_id, category);
            self.progress[category.index()] =
                store::load_progress(self.store.as_ref(), &key, &self.corpus);
        }
        self.hints = [HintSlot::default(); 2];
        self.refresh_hints();
        self.notify_state(self.active);
        Ok(())
    }

    pub fn counters(&self) -> Option<Counters> {
        let progress = self.active_progress();
        if progress.attempts == 0 && !progress.is_complete {
            return None;
        }
        let statuses = &progress.token_statuses;
        Some(Counters {
            provisional: progress.is_attempting,
            units: scoring::selected_unit_count(&self.corpus, statuses, self.active),
            total_possible: progress.total_possible,
            incorrect: scoring::selected_incorrect_count(&self.corpus, statuses, self.active),
            attempts: progress.attempts,
        })
    }

    pub fn completion_ratio(&self) -> f64 {
        let progress = self.active_progress();
        hints::completion_ratio(
            progress.correct_units(&self.corpus, self.active),
            progress.total_possible,
        )
    }

    pub fn hint_unlocked(&self, tier: HintTier) -> bool {
        self.hints[tier_slot(tier)].unlocked
    }

    pub fn hint_enabled(&self, tier: HintTier) -> bool {
        let slot = self.hints[tier_slot(tier)];
        slot.unlocked && slot.enabled
    }

    /// Turn a hint on or off. Locked hints cannot be enabled.
    pub fn set_hint_enabled(&mut self, tier: HintTier, enabled: bool) -> bool {
        let slot = &mut self.hints[tier_slot(tier)];
        if enabled && !slot.unlocked {
            return false;
        }
        slot.enabled = enabled;
        true
    }

    /// Per-token marks for the "other categories" hint, empty when inactive.
    pub fn other_category_marks(&self) -> Vec<Option<Category>> {
        if !self.hint_enabled(HintTier::OtherCategories) {
            return vec![None; self.corpus.len()];
        }
        let statuses: Vec<&[TokenStatus]> = self
            .progress
            .iter()
            .map(|p| p.token_statuses.as_slice())
            .collect();
        hints::other_category_marks(&self.corpus, self.active, &statuses)
    }

    /// Sentence indices for the "sentences" hint, empty when inactive.
    pub fn unfinished_sentences(&self) -> Vec<usize> {
        if !self.hint_enabled(HintTier::Sentences) {
            return Vec::new();
        }
        hints::unfinished_sentences(
            &self.corpus,
            &self.active_progress().token_statuses,
            self.active,
        )
    }

    fn refresh_hints(&mut self) {
        let progress = &self.progress[self.active.index()];
        let correct = progress.correct_units(&self.corpus, self.active);
        for tier in HintTier::ALL {
            let slot = &mut self.hints[tier_slot(tier)];
            slot.unlocked = hints::is_unlocked(tier, correct, progress.total_possible);
            if !slot.unlocked {
                slot.enabled = false;
            }
        }
    }

    fn persist(&mut self, category: Category) {
        let key = ProgressKey::new(&self.text_id, category);
        if let Err(e) =
            store::save_progress(self.store.as_mut(), &key, &self.progress[category.index()])
        {
            log::warn!("failed to save {key}: {e:#}");
        }
    }

    fn notify_state(&mut self, category: Category) {
        self.events.push(SessionEvent::StateChanged {
            category,
            progress: self.progress[category.index()].clone(),
        });
    }
}

fn tier_slot(tier: HintTier) -> usize {
    match tier {
        HintTier::OtherCategories => 0,
        HintTier::Sentences => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::{composite, punct, word};
    use crate::engine::scoring::Completion;
    use crate::session::progress::Grade;
    use crate::store::MemoryStore;
    use crate::store::schema::ProgressRecord;
    use Category::{Adjective, Noun, Verb};

    fn session_with(tokens: Vec<crate::corpus::Token>, initial: Category) -> Session {
        let mut session = Session::new(
            "test",
            Corpus::from_tokens(tokens),
            Box::new(MemoryStore::new()),
            initial,
        );
        session.drain_events();
        session
    }

    fn story() -> Vec<crate::corpus::Token> {
        vec![
            word("Puella", &[Noun]),
            word("bona", &[Adjective]),
            composite("vocata", &[Verb], "cv1"),
            composite("est", &[Verb], "cv1"),
            punct("."),
            word("Nauta", &[Noun]),
            word("cantat", &[Verb]),
            word("et", &[]),
            word("rosa", &[Noun]),
            word("ridet", &[Verb]),
            word("agricola", &[Noun]),
        ]
    }

    fn completions(events: &[SessionEvent]) -> Vec<CompletionSummary> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::CompletionReached(summary) => Some(summary.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_noun_excellent_completion() {
        let mut session = session_with(
            vec![word("puella", &[Noun]), word("cantat", &[Verb])],
            Noun,
        );
        assert_eq!(session.active_progress().total_possible, 1);

        assert!(session.toggle_selection(0));
        assert!(session.submit_for_grading());

        let progress = session.active_progress();
        assert_eq!(progress.token_statuses[0].status, Grade::Correct);
        assert!(progress.is_complete);
        assert_eq!(session.phase(), Phase::Complete);

        let done = completions(&session.drain_events());
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].completion, Completion::Excellent);
        assert_eq!(done[0].attempts, 1);
        assert_eq!(done[0].incorrect_count, 0);
    }

    #[test]
    fn test_composite_toggle_is_atomic() {
        let mut session = session_with(story(), Verb);
        assert!(session.toggle_selection(2));
        let statuses = &session.active_progress().token_statuses;
        assert!(statuses[2].selected && statuses[3].selected);

        assert!(session.toggle_selection(3));
        let statuses = &session.active_progress().token_statuses;
        assert!(!statuses[2].selected && !statuses[3].selected);
    }

    #[test]
    fn test_composite_group_scores_one_unit() {
        let mut session = session_with(story(), Verb);
        assert_eq!(session.active_progress().total_possible, 3);
        session.toggle_selection(2);
        session.submit_for_grading();
        assert_eq!(session.active_progress().correct_units(session.corpus(), Verb), 1);
        assert!(!session.active_progress().is_complete);
    }

    #[test]
    fn test_graded_tokens_cannot_be_toggled() {
        let mut session = session_with(story(), Noun);
        session.toggle_selection(0);
        session.toggle_selection(1);
        session.submit_for_grading();

        assert!(!session.toggle_selection(0));
        assert!(!session.toggle_selection(1));
        let statuses = &session.active_progress().token_statuses;
        assert_eq!(statuses[0].status, Grade::Correct);
        assert_eq!(statuses[1].status, Grade::Incorrect);
        assert!(statuses[0].selected && statuses[1].selected);
    }

    #[test]
    fn test_punctuation_and_out_of_range_are_ignored() {
        let mut session = session_with(story(), Noun);
        assert!(!session.toggle_selection(4));
        assert!(!session.toggle_selection(99));
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_reengaging_after_grading_starts_new_attempt() {
        let mut session = session_with(story(), Noun);
        session.toggle_selection(0);
        session.submit_for_grading();
        assert_eq!(session.active_progress().attempts, 1);
        assert_eq!(session.phase(), Phase::Graded);

        session.toggle_selection(5);
        assert_eq!(session.active_progress().attempts, 2);
        assert_eq!(session.phase(), Phase::Selecting);

        // Further toggles within the same attempt do not count again.
        session.toggle_selection(8);
        assert_eq!(session.active_progress().attempts, 2);
    }

    #[test]
    fn test_completion_is_exact() {
        let mut session = session_with(story(), Noun);
        for i in [0, 5, 8] {
            session.toggle_selection(i);
        }
        session.submit_for_grading();
        assert!(!session.active_progress().is_complete);

        session.toggle_selection(10);
        session.submit_for_grading();
        assert!(session.active_progress().is_complete);
    }

    #[test]
    fn test_complete_category_rejects_everything() {
        let mut session = session_with(
            vec![word("puella", &[Noun]), word("cantat", &[Verb])],
            Noun,
        );
        session.toggle_selection(0);
        session.submit_for_grading();
        let before = session.active_progress().clone();
        session.drain_events();

        assert!(!session.toggle_selection(1));
        assert!(!session.submit_for_grading());
        assert_eq!(session.active_progress(), &before);
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_gamed_classification() {
        let mut session = session_with(story(), Adjective);
        for i in [0, 1, 2, 5, 6, 7, 8] {
            session.toggle_selection(i);
        }
        session.submit_for_grading();
        let done = completions(&session.drain_events());
        assert_eq!(done.len(), 1);
        // Seven wrong tokens (the composite counts twice) against one unit.
        assert_eq!(done[0].incorrect_count, 7);
        assert_eq!(done[0].completion, Completion::Gamed);
    }

    #[test]
    fn test_feedback_fires_once_per_token() {
        let mut tokens = story();
        tokens[1]
            .feedback
            .insert(Noun, "bona describes puella".to_string());
        let mut session = session_with(tokens, Noun);

        session.toggle_selection(1);
        session.submit_for_grading();
        let revealed: Vec<_> = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::FeedbackRevealed { index: 1, .. }))
            .collect();
        assert_eq!(revealed.len(), 1);

        session.toggle_selection(0);
        session.submit_for_grading();
        assert!(!session
            .drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::FeedbackRevealed { .. })));
    }

    #[test]
    fn test_categories_do_not_share_token_state() {
        let mut session = session_with(story(), Noun);
        session.toggle_selection(0);
        session.submit_for_grading();

        assert!(session.switch_category(Verb));
        let verb = session.active_progress();
        assert!(!verb.token_statuses[0].selected);
        assert_eq!(verb.token_statuses[0].status, Grade::None);
        assert_eq!(
            session.progress(Noun).token_statuses[0].status,
            Grade::Correct
        );
    }

    #[test]
    fn test_switch_does_not_mutate_progress() {
        let mut session = session_with(story(), Noun);
        session.toggle_selection(0);
        session.submit_for_grading();
        session.toggle_selection(5);
        let before = session.active_progress().clone();

        session.switch_category(Adjective);
        session.switch_category(Noun);
        assert_eq!(session.active_progress(), &before);
        assert!(!session.switch_category(Noun));
    }

    /// A store whose writes always fail, as on a read-only disk.
    struct ReadOnlyStore;

    impl ProgressStore for ReadOnlyStore {
        fn load_record(&self, _key: &ProgressKey) -> Option<ProgressRecord> {
            None
        }

        fn save_record(&mut self, _record: &ProgressRecord) -> Result<()> {
            anyhow::bail!("read-only file system")
        }

        fn reset_all(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_switch_keeps_progress_when_saves_fail() {
        let mut session = Session::new(
            "test",
            Corpus::from_tokens(story()),
            Box::new(ReadOnlyStore),
            Noun,
        );
        session.toggle_selection(0);
        session.submit_for_grading();
        session.toggle_selection(5);
        let before = session.active_progress().clone();
        assert_eq!(before.attempts, 2);

        assert!(session.switch_category(Verb));
        assert!(session.switch_category(Noun));
        assert_eq!(session.active_progress(), &before);
        let statuses = &session.active_progress().token_statuses;
        assert_eq!(statuses[0].status, Grade::Correct);
        assert!(statuses[5].selected);
    }

    #[test]
    fn test_empty_category_completes_on_first_submit() {
        let mut session = session_with(
            vec![word("puella", &[Noun]), word("cantat", &[Verb])],
            Adjective,
        );
        assert_eq!(session.active_progress().total_possible, 0);

        assert!(session.submit_for_grading());
        assert!(session.active_progress().is_complete);
        assert_eq!(session.completion_ratio(), 0.0);
        for tier in HintTier::ALL {
            assert!(!session.hint_unlocked(tier));
            assert!(!session.set_hint_enabled(tier, true));
        }
    }

    #[test]
    fn test_graded_composite_group_stays_locked() {
        let mut session = session_with(story(), Verb);
        session.toggle_selection(2);
        session.submit_for_grading();

        assert!(!session.toggle_selection(2));
        assert!(!session.toggle_selection(3));
        let statuses = &session.active_progress().token_statuses;
        for i in [2, 3] {
            assert!(statuses[i].selected);
            assert_eq!(statuses[i].status, Grade::Correct);
        }
    }

    #[test]
    fn test_reset_all_restores_fresh_progress() {
        let mut session = session_with(story(), Noun);
        session.toggle_selection(0);
        session.submit_for_grading();
        session.reset_all().unwrap();

        for category in Category::ALL {
            let progress = session.progress(category);
            assert_eq!(progress.attempts, 0);
            assert!(!progress.is_complete);
            assert!(progress.token_statuses.iter().all(|s| !s.selected));
        }
        assert!(session.counters().is_none());
    }

    #[test]
    fn test_hint_tiers_follow_completion() {
        // Four noun units.
        let mut session = session_with(story(), Noun);
        assert!(!session.hint_unlocked(HintTier::OtherCategories));
        assert!(!session.set_hint_enabled(HintTier::OtherCategories, true));

        session.toggle_selection(0);
        session.toggle_selection(5);
        session.submit_for_grading();
        assert!(session.hint_unlocked(HintTier::OtherCategories));
        assert!(!session.hint_unlocked(HintTier::Sentences));

        session.toggle_selection(8);
        session.submit_for_grading();
        assert!(session.hint_unlocked(HintTier::Sentences));

        assert!(session.set_hint_enabled(HintTier::Sentences, true));
        assert!(session.hint_enabled(HintTier::Sentences));

        // Switching to an untouched category re-locks and disables hints.
        session.switch_category(Verb);
        assert!(!session.hint_unlocked(HintTier::Sentences));
        assert!(!session.hint_enabled(HintTier::Sentences));
        assert!(session.unfinished_sentences().is_empty());
    }

    #[test]
    fn test_other_category_hint_uses_other_progress() {
        let mut session = session_with(story(), Verb);
        session.toggle_selection(2);
        session.toggle_selection(6);
        session.submit_for_grading();
        session.switch_category(Noun);
        for i in [0, 5] {
            session.toggle_selection(i);
        }
        session.submit_for_grading();
        assert!(session.set_hint_enabled(HintTier::OtherCategories, true));

        let marks = session.other_category_marks();
        assert_eq!(marks[2], Some(Verb));
        assert_eq!(marks[6], Some(Verb));
        assert_eq!(marks[9], None);
    }

    #[test]
    fn test_counters_hidden_until_first_grading() {
        let mut session = session_with(story(), Noun);
        session.toggle_selection(0);
        session.toggle_selection(7);
        assert!(session.counters().is_none());

        session.submit_for_grading();
        let counters = session.counters().unwrap();
        assert!(!counters.provisional);
        assert_eq!(counters.units, 1);
        assert_eq!(counters.incorrect, 1);
        assert_eq!(counters.total_possible, 4);
        assert_eq!(counters.attempts, 1);

        session.toggle_selection(5);
        let counters = session.counters().unwrap();
        assert!(counters.provisional);
        assert_eq!(counters.units, 2);
    }

    #[test]
    fn test_every_mutation_emits_state_changed() {
        let mut session = session_with(story(), Noun);
        session.toggle_selection(0);
        let events = session.drain_events();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::StateChanged { category: Noun, .. }]
        ));
    }
}
