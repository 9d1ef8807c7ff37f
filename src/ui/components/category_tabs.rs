use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::corpus::Category;
use crate::session::Session;
use crate::ui::theme::Theme;

pub struct CategoryTabs<'a> {
    session: &'a Session,
    theme: &'a Theme,
}

impl<'a> CategoryTabs<'a> {
    pub fn new(session: &'a Session, theme: &'a Theme) -> Self {
        Self { session, theme }
    }
}

impl Widget for CategoryTabs<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.header_bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut spans = vec![Span::styled(
            " grammaticus ",
            Style::default()
                .fg(colors.header_fg())
                .add_modifier(Modifier::BOLD),
        )];

        for (n, category) in Category::ALL.into_iter().enumerate() {
            let active = category == self.session.active();
            let complete = self.session.progress(category).is_complete;
            let check = if complete { " \u{2713}" } else { "" };
            let label = format!(" [{}] {category}{check} ", n + 1);

            let mut style = Style::default().fg(if complete {
                colors.success()
            } else {
                colors.fg()
            });
            if active {
                style = style
                    .fg(colors.bg())
                    .bg(colors.accent())
                    .add_modifier(Modifier::BOLD);
            }
            spans.push(Span::raw(" "));
            spans.push(Span::styled(label, style));
        }

        Paragraph::new(Line::from(spans)).render(inner, buf);
    }
}
