use ratatui::buffer::Buffer;
use ratatui::layout::{Margin, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::corpus::Corpus;
use crate::session::Session;
use crate::session::progress::Grade;
use crate::ui::theme::Theme;

/// Where a token lands once the text is wrapped to a given width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub line: usize,
    pub col: u16,
    pub width: u16,
}

/// Word-wrapped positions for every token; paragraph breaks have none.
#[derive(Clone, Debug)]
pub struct TextLayout {
    pub placements: Vec<Option<Placement>>,
    pub line_count: usize,
}

impl TextLayout {
    pub fn new(corpus: &Corpus, width: u16) -> Self {
        let mut placements = Vec::with_capacity(corpus.len());
        let mut line = 0usize;
        let mut col = 0u16;

        for (i, token) in corpus.tokens().iter().enumerate() {
            if token.is_paragraph_break() {
                if col > 0 {
                    line += 1;
                }
                // Blank line between paragraphs.
                line += 1;
                col = 0;
                placements.push(None);
                continue;
            }

            let w = token.text.chars().count().min(u16::MAX as usize) as u16;
            if col > 0 && col.saturating_add(w) > width {
                line += 1;
                col = 0;
            }
            placements.push(Some(Placement {
                line,
                col,
                width: w,
            }));
            col = col.saturating_add(w);
            if corpus.space_after(i) {
                col = col.saturating_add(1);
            }
        }

        Self {
            placements,
            line_count: if corpus.is_empty() { 0 } else { line + 1 },
        }
    }

    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.placements.get(index).copied().flatten().map(|p| p.line)
    }

    pub fn token_at(&self, line: usize, col: u16) -> Option<usize> {
        self.placements.iter().position(|p| {
            p.is_some_and(|p| p.line == line && col >= p.col && col < p.col + p.width)
        })
    }
}

/// First visible line so that `cursor_line` stays on screen.
pub fn scroll_offset(cursor_line: Option<usize>, height: u16) -> usize {
    let height = height as usize;
    match cursor_line {
        Some(line) if height > 0 && line >= height => line + 1 - height,
        _ => 0,
    }
}

pub fn text_inner(area: Rect) -> Rect {
    area.inner(Margin::new(1, 1))
}

pub struct TextArea<'a> {
    session: &'a Session,
    cursor: Option<usize>,
    theme: &'a Theme,
}

impl<'a> TextArea<'a> {
    pub fn new(session: &'a Session, cursor: Option<usize>, theme: &'a Theme) -> Self {
        Self {
            session,
            cursor,
            theme,
        }
    }

    fn token_style(&self, index: usize, hint_mark: Option<Style>, sentence_bg: Option<Style>) -> Style {
        let colors = &self.theme.colors;
        let corpus = self.session.corpus();
        let token = &corpus.tokens()[index];
        let progress = self.session.active_progress();
        let status = &progress.token_statuses[index];

        let mut style = if token.is_selectable() {
            Style::default().fg(colors.fg())
        } else {
            Style::default().fg(colors.text_punctuation())
        };
        if let Some(bg) = sentence_bg {
            style = style.patch(bg);
        }
        if let Some(mark) = hint_mark {
            style = style.patch(mark);
        }

        style = match status.status {
            Grade::Correct => style.fg(colors.correct()).add_modifier(Modifier::BOLD),
            Grade::Incorrect => style
                .fg(colors.incorrect())
                .bg(colors.incorrect_bg())
                .add_modifier(Modifier::CROSSED_OUT),
            Grade::None if status.selected => style.fg(colors.selected_fg()).bg(colors.selected_bg()),
            Grade::None if progress.is_complete && token.is_selectable() => {
                style.add_modifier(Modifier::DIM)
            }
            Grade::None => style,
        };

        if self.cursor == Some(index) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        style
    }
}

impl Widget for TextArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let progress = self.session.active_progress();

        let border = if progress.is_complete {
            colors.success()
        } else {
            colors.border_focused()
        };
        let block = Block::bordered()
            .title(format!(" {} ", self.session.text_id()))
            .border_style(Style::default().fg(border));
        let inner = text_inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let corpus = self.session.corpus();
        let layout = TextLayout::new(corpus, inner.width);

        let marks = self.session.other_category_marks();
        let mut in_hinted_sentence = vec![false; corpus.len()];
        for n in self.session.unfinished_sentences() {
            for i in corpus.sentences()[n].clone() {
                in_hinted_sentence[i] = true;
            }
        }
        let sentence_bg = Style::default().bg(colors.hint_sentence_bg());

        let mut lines: Vec<Vec<Span>> = vec![Vec::new(); layout.line_count];
        let mut line_cols: Vec<u16> = vec![0; layout.line_count];
        let mut prev_on_line: Vec<Option<usize>> = vec![None; layout.line_count];

        for (i, placement) in layout.placements.iter().enumerate() {
            let Some(p) = placement else { continue };

            if p.col > line_cols[p.line] {
                let gap = " ".repeat((p.col - line_cols[p.line]) as usize);
                let joined = prev_on_line[p.line]
                    .is_some_and(|prev| in_hinted_sentence[prev] && in_hinted_sentence[i]);
                let style = if joined { sentence_bg } else { Style::default() };
                lines[p.line].push(Span::styled(gap, style));
            }

            let hint_mark = marks
                .get(i)
                .copied()
                .flatten()
                .map(|c| Style::default().fg(colors.hint(c)).add_modifier(Modifier::UNDERLINED));
            let bg = in_hinted_sentence[i].then_some(sentence_bg);
            let style = self.token_style(i, hint_mark, bg);
            lines[p.line].push(Span::styled(corpus.tokens()[i].text.clone(), style));

            line_cols[p.line] = p.col + p.width;
            prev_on_line[p.line] = Some(i);
        }

        let cursor_line = self.cursor.and_then(|c| layout.line_of(c));
        let scroll = scroll_offset(cursor_line, inner.height);
        let visible: Vec<Line> = lines
            .into_iter()
            .skip(scroll)
            .take(inner.height as usize)
            .map(Line::from)
            .collect();

        Paragraph::new(visible).render(inner, buf);
    }
}
