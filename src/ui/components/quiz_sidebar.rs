use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::engine::hints::HintTier;
use crate::session::Session;
use crate::ui::components::progress_bar::ProgressBar;
use crate::ui::theme::Theme;

pub struct QuizSidebar<'a> {
    session: &'a Session,
    theme: &'a Theme,
}

impl<'a> QuizSidebar<'a> {
    pub fn new(session: &'a Session, theme: &'a Theme) -> Self {
        Self { session, theme }
    }
}

pub fn hint_key(tier: HintTier) -> char {
    match tier {
        HintTier::OtherCategories => 'o',
        HintTier::Sentences => 's',
    }
}

/// "Selected 3 / 8" while choosing, "Correct 3 / 8" once graded.
pub fn counter_lines<'a>(session: &Session, theme: &Theme) -> Vec<Line<'a>> {
    let colors = &theme.colors;
    let Some(counters) = session.counters() else {
        return vec![Line::from(Span::styled(
            "Select words, then press Enter to check.",
            Style::default().fg(colors.text_punctuation()),
        ))];
    };

    let (label, score_style) = if counters.provisional {
        (
            "Selected: ",
            Style::default()
                .fg(colors.warning())
                .add_modifier(Modifier::ITALIC),
        )
    } else {
        (
            "Correct:  ",
            Style::default()
                .fg(colors.success())
                .add_modifier(Modifier::BOLD),
        )
    };

    vec![
        Line::from(vec![
            Span::styled(label, Style::default().fg(colors.fg())),
            Span::styled(counters.units.to_string(), score_style),
            Span::styled(
                format!(" / {}", counters.total_possible),
                Style::default().fg(colors.fg()),
            ),
        ]),
        Line::from(vec![
            Span::styled("Incorrect: ", Style::default().fg(colors.fg())),
            Span::styled(
                counters.incorrect.to_string(),
                Style::default().fg(if counters.incorrect > 0 {
                    colors.error()
                } else {
                    colors.fg()
                }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Attempts:  ", Style::default().fg(colors.fg())),
            Span::styled(
                counters.attempts.to_string(),
                Style::default().fg(colors.accent()),
            ),
        ]),
    ]
}

impl Widget for QuizSidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let category = self.session.active();
        let progress = self.session.active_progress();

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Length(3),
                Constraint::Min(6),
            ])
            .split(area);

        let block = Block::bordered()
            .title(format!(" {category}s "))
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(sections[0]);
        block.render(sections[0], buf);
        Paragraph::new(counter_lines(self.session, self.theme)).render(inner, buf);

        let found = progress.correct_units(self.session.corpus(), category);
        ProgressBar::new("Found", found, progress.total_possible, self.theme).render(sections[1], buf);

        let block = Block::bordered()
            .title(" Hints ")
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(sections[2]);
        block.render(sections[2], buf);

        let mut lines = Vec::new();
        for tier in HintTier::ALL {
            let unlocked = self.session.hint_unlocked(tier);
            let enabled = self.session.hint_enabled(tier);
            let checkbox = if enabled { "[x]" } else { "[ ]" };
            let style = if unlocked {
                Style::default().fg(colors.fg())
            } else {
                Style::default().fg(colors.accent_dim())
            };
            lines.push(Line::from(Span::styled(
                format!("{checkbox} [{}] {}", hint_key(tier), tier.label()),
                style,
            )));
            if !unlocked {
                lines.push(Line::from(Span::styled(
                    format!(
                        "    Unlock at {:.0}% completion",
                        tier.threshold() * 100.0
                    ),
                    Style::default().fg(colors.text_punctuation()),
                )));
            }
        }
        Paragraph::new(lines).render(inner, buf);
    }
}
