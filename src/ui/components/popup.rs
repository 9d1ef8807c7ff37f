use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};

use crate::engine::scoring::Completion;
use crate::session::CompletionSummary;
use crate::ui::theme::Theme;

const FEEDBACK_RENDER_WIDTH: usize = 1000;

/// Render corpus feedback markup as a single line of plain text.
pub fn strip_tags(text: &str) -> String {
    let rendered = html2text::config::plain_no_decorate()
        .string_from_read(text.as_bytes(), FEEDBACK_RENDER_WIDTH)
        .unwrap_or_else(|_| text.to_string());
    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title and body for the completion popup.
pub fn completion_message(summary: &CompletionSummary) -> (&'static str, String) {
    match summary.completion {
        Completion::Gamed => (
            "System Gamed?",
            "You selected every correct answer, but also a large number of incorrect ones. \
             The goal is precision, not completion."
                .to_string(),
        ),
        Completion::Excellent => (
            "Excellent Work!",
            format!(
                "Congratulations! You finished in just {} attempt(s) with high accuracy. Well done!",
                summary.attempts
            ),
        ),
        Completion::Standard => (
            "Category Complete!",
            "You did it! You found all the correct words. Great job persisting!".to_string(),
        ),
    }
}

fn render_box(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    border: Color,
    theme: &Theme,
    lines: Vec<Line<'_>>,
) {
    let colors = &theme.colors;
    Clear.render(area, buf);
    let block = Block::bordered()
        .title(format!(" {title} "))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(area);
    block.render(area, buf);
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .render(inner, buf);
}

/// Tooltip for a feedback message revealed on an incorrect word.
pub struct FeedbackBubble<'a> {
    word: &'a str,
    message: String,
    queued: usize,
    theme: &'a Theme,
}

impl<'a> FeedbackBubble<'a> {
    pub fn new(word: &'a str, message: &str, queued: usize, theme: &'a Theme) -> Self {
        Self {
            word,
            message: strip_tags(message),
            queued,
            theme,
        }
    }
}

impl Widget for FeedbackBubble<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let mut lines = vec![
            Line::from(Span::styled(self.message, Style::default().fg(colors.fg()))),
            Line::from(""),
        ];
        let more = if self.queued > 0 {
            format!("[Esc] Next ({} more)", self.queued)
        } else {
            "[Esc] Close".to_string()
        };
        lines.push(Line::from(Span::styled(
            more,
            Style::default().fg(colors.text_punctuation()),
        )));
        render_box(area, buf, self.word, colors.warning(), self.theme, lines);
    }
}

pub struct CompletionPopup<'a> {
    summary: &'a CompletionSummary,
    theme: &'a Theme,
}

impl<'a> CompletionPopup<'a> {
    pub fn new(summary: &'a CompletionSummary, theme: &'a Theme) -> Self {
        Self { summary, theme }
    }
}

impl Widget for CompletionPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let (title, body) = completion_message(self.summary);
        let accent = match self.summary.completion {
            Completion::Gamed => colors.warning(),
            Completion::Excellent => colors.success(),
            Completion::Standard => colors.accent(),
        };

        let lines = vec![
            Line::from(Span::styled(
                title,
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            Line::from(""),
            Line::from(Span::styled(body, Style::default().fg(colors.fg()))),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "{}s: {} found, {} wrong selection(s)",
                    self.summary.category, self.summary.total_possible, self.summary.incorrect_count
                ),
                Style::default().fg(colors.text_punctuation()),
            )),
            Line::from(Span::styled(
                "[Esc] Close  [Tab] Next category",
                Style::default().fg(colors.text_punctuation()),
            )),
        ];
        render_box(area, buf, "Complete", accent, self.theme, lines);
    }
}

/// y/n prompt guarding destructive actions.
pub struct ConfirmDialog<'a> {
    question: &'a str,
    theme: &'a Theme,
}

impl<'a> ConfirmDialog<'a> {
    pub fn new(question: &'a str, theme: &'a Theme) -> Self {
        Self { question, theme }
    }
}

impl Widget for ConfirmDialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let lines = vec![
            Line::from(Span::styled(self.question, Style::default().fg(colors.fg()))),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    "[y] Yes",
                    Style::default()
                        .fg(colors.error())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("  [n] No", Style::default().fg(colors.fg())),
            ]),
        ];
        render_box(area, buf, "Confirm", colors.error(), self.theme, lines);
    }
}
