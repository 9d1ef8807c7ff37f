use std::fs::{self, OpenOptions};
use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use env_logger::{Env, Target};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};

use grammaticus::app::{App, AppScreen};
use grammaticus::config::{self, Config};
use grammaticus::corpus::Category;
use grammaticus::corpus::library::TextLibrary;
use grammaticus::engine::hints::HintTier;
use grammaticus::event::{AppEvent, EventHandler};
use grammaticus::store::json_store::JsonStore;
use grammaticus::store::{MemoryStore, ProgressStore};
use grammaticus::ui::components::category_tabs::CategoryTabs;
use grammaticus::ui::components::popup::{CompletionPopup, ConfirmDialog, FeedbackBubble};
use grammaticus::ui::components::quiz_sidebar::{QuizSidebar, counter_lines, hint_key};
use grammaticus::ui::components::text_area::TextArea;
use grammaticus::ui::layout::{AppLayout, centered_rect, pack_hint_lines};
use grammaticus::ui::theme::Theme;

#[derive(Parser)]
#[command(
    name = "grammaticus",
    version,
    about = "Terminal Latin grammar quiz: find the nouns, verbs and adjectives in a passage"
)]
struct Cli {
    #[arg(long, help = "Text identifier to open (see --list-texts)")]
    text: Option<String>,

    #[arg(long, help = "Load a corpus from a JSON file path or URL")]
    corpus: Option<String>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Initial category (noun, verb, adjective)")]
    category: Option<Category>,

    #[arg(long, help = "List available texts and exit")]
    list_texts: bool,

    #[arg(long, help = "Erase all saved progress and exit")]
    reset: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(&config.log_level);
    if let Some(e) = config_error {
        log::warn!("using default config: {e:#}");
    }

    let library = TextLibrary::new(config.texts_dir()).with_downloads(config.corpus_downloads_enabled);

    if cli.list_texts {
        for id in library.available_texts() {
            println!("{id}");
        }
        return Ok(());
    }

    let mut store: Box<dyn ProgressStore> = match JsonStore::new() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("progress will not be saved: {e:#}");
            Box::new(MemoryStore::new())
        }
    };

    if cli.reset {
        store.reset_all()?;
        println!("All progress reset.");
        return Ok(());
    }

    config.normalize_text(&library.available_texts());
    if let Some(category) = cli.category {
        config.category = category;
    }
    let loaded = match (&cli.corpus, &cli.text) {
        (Some(location), _) => library.load_location(location),
        (None, Some(id)) => library.load(Some(id)),
        (None, None) => library.load(Some(&config.text)),
    };

    let theme_name = cli.theme.unwrap_or_else(|| config.theme.clone());
    let theme = Theme::load(&theme_name).unwrap_or_else(|| {
        log::warn!("unknown theme {theme_name:?}, using default");
        Theme::default()
    });
    let theme: &'static Theme = Box::leak(Box::new(theme));

    let mut app = App::new(config, theme, loaded, store);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if app.session.is_some() {
        if let Err(e) = app.config.save() {
            log::warn!("failed to save config: {e:#}");
        }
    }

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

/// The terminal is in raw alternate-screen mode, so log records go to a file
/// in the data directory. Logging stays off if that file cannot be opened.
fn init_logging(level: &str) {
    let dir = config::data_dir();
    let file = fs::create_dir_all(&dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("grammaticus.log"))
    });
    let Ok(file) = file else {
        return;
    };

    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .target(Target::Pipe(Box::new(file)))
        .try_init();
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| {
            app.last_area = frame.area();
            render(frame, app);
        })?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
            AppEvent::Tick | AppEvent::Resize(_, _) => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.screen {
        AppScreen::LoadError => {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter) {
                app.should_quit = true;
            }
        }
        AppScreen::Quiz => handle_quiz_key(app, key),
    }
}

fn handle_quiz_key(app: &mut App, key: KeyEvent) {
    // Confirmation dialog takes priority
    if app.confirm_reset {
        match key.code {
            KeyCode::Char('y') => app.confirm_reset(),
            KeyCode::Char('n') | KeyCode::Esc => app.cancel_reset(),
            _ => {}
        }
        return;
    }

    if app.has_overlay() {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') => {
                app.dismiss_overlay();
            }
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Tab => app.next_category(),
            KeyCode::BackTab => app.prev_category(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Left | KeyCode::Char('h') => app.move_cursor(-1),
        KeyCode::Right | KeyCode::Char('l') => app.move_cursor(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_line(false),
        KeyCode::Down | KeyCode::Char('j') => app.move_line(true),
        KeyCode::Char('[') => app.move_sentence(false),
        KeyCode::Char(']') => app.move_sentence(true),
        KeyCode::Char(' ') => app.toggle_at_cursor(),
        KeyCode::Enter => app.submit(),
        KeyCode::Char('1') => app.switch_category(Category::Noun),
        KeyCode::Char('2') => app.switch_category(Category::Verb),
        KeyCode::Char('3') => app.switch_category(Category::Adjective),
        KeyCode::Tab => app.next_category(),
        KeyCode::BackTab => app.prev_category(),
        KeyCode::Char(c) if c == hint_key(HintTier::OtherCategories) => {
            app.toggle_hint(HintTier::OtherCategories)
        }
        KeyCode::Char(c) if c == hint_key(HintTier::Sentences) => {
            app.toggle_hint(HintTier::Sentences)
        }
        KeyCode::Char('R') => app.request_reset(),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != AppScreen::Quiz || app.has_overlay() {
        return;
    }
    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
        app.click(mouse.column, mouse.row);
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    match app.screen {
        AppScreen::Quiz => render_quiz(frame, app),
        AppScreen::LoadError => render_load_error(frame, app),
    }
}

fn render_quiz(frame: &mut ratatui::Frame, app: &App) {
    let Some(session) = app.session.as_ref() else {
        return;
    };
    let area = frame.area();
    let colors = &app.theme.colors;
    let layout = AppLayout::new(area);

    frame.render_widget(CategoryTabs::new(session, app.theme), layout.header);

    let prompt = Paragraph::new(Line::from(Span::styled(
        format!(" {}", app.prompt()),
        Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(prompt, layout.prompt);

    frame.render_widget(TextArea::new(session, app.cursor, app.theme), layout.main);

    if let Some(sidebar) = layout.sidebar {
        frame.render_widget(QuizSidebar::new(session, app.theme), sidebar);
    }

    let mut footer_lines: Vec<Line> = Vec::new();
    if let Some(status) = &app.status {
        footer_lines.push(Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(colors.warning()),
        )));
    } else if !layout.tier.show_sidebar() {
        // Narrow terminals show the counters in the status line.
        let spans: Vec<Span> = counter_lines(session, app.theme)
            .into_iter()
            .flat_map(|line| {
                let mut spans = vec![Span::raw(" ")];
                spans.extend(line.spans);
                spans
            })
            .collect();
        footer_lines.push(Line::from(spans));
    }
    let hints = [
        "[\u{2190}\u{2192}\u{2191}\u{2193}] Move",
        "[Space] Select",
        "[Enter] Check",
        "[1-3/Tab] Category",
        "[o/s] Hints",
        "[R] Reset",
        "[q] Quit",
    ];
    let remaining = (layout.footer.height as usize).saturating_sub(footer_lines.len());
    for hint in pack_hint_lines(&hints, layout.footer.width as usize)
        .into_iter()
        .take(remaining)
    {
        footer_lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(colors.text_punctuation()),
        )));
    }
    frame.render_widget(Paragraph::new(footer_lines), layout.footer);

    render_overlays(frame, app);
}

fn render_overlays(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();

    if app.confirm_reset {
        let rect = centered_rect(48, 6, area);
        frame.render_widget(
            ConfirmDialog::new("Erase all saved progress for every text?", app.theme),
            rect,
        );
        return;
    }

    if let Some(pending) = app.feedback.front() {
        let word = app
            .session
            .as_ref()
            .and_then(|s| s.corpus().token(pending.index))
            .map(|t| t.text.as_str())
            .unwrap_or("");
        let rect = centered_rect(56, 8, area);
        frame.render_widget(
            FeedbackBubble::new(word, &pending.message, app.feedback.len() - 1, app.theme),
            rect,
        );
        return;
    }

    if let Some(summary) = &app.completion {
        let rect = centered_rect(60, 11, area);
        frame.render_widget(CompletionPopup::new(summary, app.theme), rect);
    }
}

fn render_load_error(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;
    let rect = centered_rect(70, 9, area);

    let message = app.load_error.as_deref().unwrap_or("unknown error");
    let lines = vec![
        Line::from(Span::styled(
            "The text could not be loaded.",
            Style::default()
                .fg(colors.error())
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(colors.fg()))),
        Line::from(""),
        Line::from(Span::styled(
            "[q] Quit",
            Style::default().fg(colors.text_punctuation()),
        )),
    ];
    let block = Block::bordered()
        .title(" Error ")
        .border_style(Style::default().fg(colors.error()))
        .style(Style::default().bg(colors.bg()));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        rect,
    );
}
