use std::collections::VecDeque;

use ratatui::layout::Rect;

use crate::config::Config;
use crate::corpus::library::LoadedText;
use crate::corpus::{Category, CorpusError};
use crate::engine::hints::HintTier;
use crate::session::{CompletionSummary, Session, SessionEvent};
use crate::store::ProgressStore;
use crate::ui::components::text_area::{TextLayout, scroll_offset, text_inner};
use crate::ui::layout::AppLayout;
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Quiz,
    LoadError,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingFeedback {
    pub index: usize,
    pub message: String,
}

pub struct App {
    pub screen: AppScreen,
    pub session: Option<Session>,
    pub load_error: Option<String>,
    pub theme: &'static Theme,
    pub config: Config,
    pub cursor: Option<usize>,
    pub feedback: VecDeque<PendingFeedback>,
    pub completion: Option<CompletionSummary>,
    pub confirm_reset: bool,
    pub status: Option<String>,
    pub should_quit: bool,
    /// Terminal area of the last draw, used to hit-test mouse clicks.
    pub last_area: Rect,
}

impl App {
    pub fn new(
        config: Config,
        theme: &'static Theme,
        loaded: Result<LoadedText, CorpusError>,
        store: Box<dyn ProgressStore>,
    ) -> Self {
        let mut app = Self {
            screen: AppScreen::Quiz,
            session: None,
            load_error: None,
            theme,
            config,
            cursor: None,
            feedback: VecDeque::new(),
            completion: None,
            confirm_reset: false,
            status: None,
            should_quit: false,
            last_area: Rect::default(),
        };

        match loaded {
            Ok(text) => {
                let mut session = Session::new(&text.id, text.corpus, store, app.config.category);
                session.drain_events();
                app.session = Some(session);
                app.cursor = app.first_word();
            }
            Err(e) => {
                log::error!("failed to load text: {e}");
                app.load_error = Some(e.to_string());
                app.screen = AppScreen::LoadError;
            }
        }
        app
    }

    /// Instruction line for the active category.
    pub fn prompt(&self) -> String {
        match self.session.as_ref().map(|s| s.active()) {
            Some(Category::Noun) => "Find all the Nouns and Pronouns.".to_string(),
            Some(category) => format!("Find all the {category}s."),
            None => String::new(),
        }
    }

    pub fn has_overlay(&self) -> bool {
        self.confirm_reset || !self.feedback.is_empty() || self.completion.is_some()
    }

    fn first_word(&self) -> Option<usize> {
        let session = self.session.as_ref()?;
        session.corpus().tokens().iter().position(|t| t.is_selectable())
    }

    /// Move the cursor `delta` selectable words forward or back, stopping at
    /// the ends.
    pub fn move_cursor(&mut self, delta: isize) {
        let (Some(session), Some(cursor)) = (&self.session, self.cursor) else {
            return;
        };
        let tokens = session.corpus().tokens();
        let mut current = cursor;
        let mut remaining = delta.unsigned_abs();
        let forward = delta > 0;

        while remaining > 0 {
            let next = if forward {
                (current + 1..tokens.len()).find(|&i| tokens[i].is_selectable())
            } else {
                (0..current).rev().find(|&i| tokens[i].is_selectable())
            };
            match next {
                Some(i) => current = i,
                None => break,
            }
            remaining -= 1;
        }
        self.cursor = Some(current);
    }

    /// Jump to the first word of the next or previous sentence.
    pub fn move_sentence(&mut self, forward: bool) {
        let (Some(session), Some(cursor)) = (&self.session, self.cursor) else {
            return;
        };
        let corpus = session.corpus();
        let sentences = corpus.sentences();
        let Some(current) = sentences.iter().position(|r| r.contains(&cursor)) else {
            return;
        };

        let candidates: Box<dyn Iterator<Item = usize>> = if forward {
            Box::new(current + 1..sentences.len())
        } else {
            Box::new((0..current).rev())
        };
        for n in candidates {
            if let Some(i) = sentences[n]
                .clone()
                .find(|&i| corpus.tokens()[i].is_selectable())
            {
                self.cursor = Some(i);
                return;
            }
        }
    }

    fn text_geometry(&self) -> Option<(Rect, TextLayout)> {
        let session = self.session.as_ref()?;
        let inner = text_inner(AppLayout::new(self.last_area).main);
        if inner.width == 0 || inner.height == 0 {
            return None;
        }
        Some((inner, TextLayout::new(session.corpus(), inner.width)))
    }

    /// Move to the word on the adjacent wrapped line closest to the cursor's
    /// column.
    pub fn move_line(&mut self, down: bool) {
        let Some((_, layout)) = self.text_geometry() else {
            return;
        };
        let (Some(session), Some(cursor)) = (&self.session, self.cursor) else {
            return;
        };
        let Some(here) = layout.placements[cursor] else {
            return;
        };
        let tokens = session.corpus().tokens();

        let mut line = here.line;
        loop {
            line = if down {
                line + 1
            } else if line == 0 {
                return;
            } else {
                line - 1
            };
            if line >= layout.line_count {
                return;
            }
            let best = layout
                .placements
                .iter()
                .enumerate()
                .filter_map(|(i, p)| p.map(|p| (i, p)))
                .filter(|(i, p)| p.line == line && tokens[*i].is_selectable())
                .min_by_key(|(_, p)| p.col.abs_diff(here.col));
            if let Some((i, _)) = best {
                self.cursor = Some(i);
                return;
            }
        }
    }

    pub fn toggle_at_cursor(&mut self) {
        if let Some(cursor) = self.cursor {
            self.toggle(cursor);
        }
    }

    fn toggle(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.toggle_selection(index) {
            self.absorb_events();
        }
    }

    /// Toggle the word under a mouse click, if any.
    pub fn click(&mut self, column: u16, row: u16) {
        let Some((inner, layout)) = self.text_geometry() else {
            return;
        };
        if column < inner.x
            || column >= inner.x + inner.width
            || row < inner.y
            || row >= inner.y + inner.height
        {
            return;
        }

        let cursor_line = self.cursor.and_then(|c| layout.line_of(c));
        let line = scroll_offset(cursor_line, inner.height) + (row - inner.y) as usize;
        let Some(index) = layout.token_at(line, column - inner.x) else {
            return;
        };
        let selectable = self
            .session
            .as_ref()
            .and_then(|s| s.corpus().token(index))
            .is_some_and(|t| t.is_selectable());
        if selectable {
            self.cursor = Some(index);
            self.toggle(index);
        }
    }

    pub fn submit(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.submit_for_grading() {
            self.absorb_events();
        }
    }

    pub fn switch_category(&mut self, category: Category) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.switch_category(category) {
            self.feedback.clear();
            self.completion = None;
            self.absorb_events();
            self.config.category = category;
        }
    }

    pub fn next_category(&mut self) {
        if let Some(active) = self.session.as_ref().map(|s| s.active()) {
            self.switch_category(active.next());
        }
    }

    pub fn prev_category(&mut self) {
        if let Some(active) = self.session.as_ref().map(|s| s.active()) {
            self.switch_category(active.prev());
        }
    }

    pub fn toggle_hint(&mut self, tier: HintTier) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let enabled = session.hint_enabled(tier);
        if !session.set_hint_enabled(tier, !enabled) {
            self.status = Some(format!(
                "Hint locked: reach {:.0}% to unlock",
                tier.threshold() * 100.0
            ));
        }
    }

    pub fn request_reset(&mut self) {
        if self.session.is_some() {
            self.confirm_reset = true;
        }
    }

    pub fn confirm_reset(&mut self) {
        self.confirm_reset = false;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.reset_all() {
            Ok(()) => {
                self.feedback.clear();
                self.completion = None;
                self.absorb_events();
                self.status = Some("All progress reset".to_string());
            }
            Err(e) => {
                log::error!("reset failed: {e:#}");
                self.status = Some(format!("Reset failed: {e}"));
            }
        }
    }

    pub fn cancel_reset(&mut self) {
        self.confirm_reset = false;
    }

    /// Close the front-most overlay: feedback bubbles first, then the
    /// completion popup.
    pub fn dismiss_overlay(&mut self) -> bool {
        if self.feedback.pop_front().is_some() {
            return true;
        }
        self.completion.take().is_some()
    }

    fn absorb_events(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.status = None;
        for event in session.drain_events() {
            match event {
                SessionEvent::FeedbackRevealed { index, message } => {
                    self.feedback.push_back(PendingFeedback { index, message });
                }
                SessionEvent::CompletionReached(summary) => {
                    self.completion = Some(summary);
                }
                SessionEvent::StateChanged { category, progress } => {
                    log::trace!(
                        "{category}: attempts={} graded={} complete={}",
                        progress.attempts,
                        progress.is_graded,
                        progress.is_complete
                    );
                }
            }
        }
    }
}
