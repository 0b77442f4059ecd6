//! Terminal front end: one document, keyboard driven

mod halfblock;
mod theme;
mod ui;

pub use halfblock::{CELL_WIDTH_PX, HALF_CELL_HEIGHT_PX, PageCanvas};
pub use theme::Palette;

use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, enable_raw_mode};
use log::{debug, error, info, warn};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};

use crate::bookmark::{AnnotationStore, Highlight};
use crate::event_source::{Event, EventSource, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crate::i18n::tr;
use crate::navigation::{Command, DocumentKind, Effect, Orientation, ViewMode};
use crate::panic_handler::{initialize_panic_handler, restore_terminal};
use crate::pdf::{PasswordPrompt, Viewport};
use crate::session::Session;
use crate::settings::Settings;

/// Rows taken by the title and status bars
const CHROME_ROWS: u16 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    GoTo,
    ZoomPercent,
    Bookmark,
    Highlight,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    Bookmarks,
}

pub struct App {
    session: Session,
    settings: Settings,
    settings_path: Option<PathBuf>,
    store: AnnotationStore,
    highlights: Vec<Highlight>,
    prompt: Option<Prompt>,
    overlay: Overlay,
    status: Option<String>,
    scroll: u32,
    hscroll: u32,
    /// Size of the last drawn content, used to clamp scrolling
    content_rows: u32,
    view_rows: u32,
    /// Plain text of the EPUB page last drawn, by page index
    text_cache: Option<(usize, String)>,
    should_quit: bool,
}

impl App {
    pub fn new(
        session: Session,
        settings: Settings,
        settings_path: Option<PathBuf>,
        store: AnnotationStore,
    ) -> Self {
        let mut app = Self {
            session,
            settings,
            settings_path,
            store,
            highlights: Vec::new(),
            prompt: None,
            overlay: Overlay::None,
            status: None,
            scroll: 0,
            hscroll: 0,
            content_rows: 0,
            view_rows: 0,
            text_cache: None,
            should_quit: false,
        };
        app.reload_highlights();
        app
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn scroll(&self) -> u32 {
        self.scroll
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Open `path` in the session, reporting failures in the status bar
    pub fn open(&mut self, path: &Path, password: Option<PasswordPrompt<'_>>) -> bool {
        let result = self.session.open(path, password).map(|info| info.title.clone());
        self.scroll = 0;
        self.hscroll = 0;
        self.text_cache = None;
        match result {
            Ok(title) => {
                self.status = Some(title);
                self.reload_highlights();
                true
            }
            Err(e) => {
                if e.is_user_error() {
                    warn!("Open {path:?} refused: {e}");
                } else {
                    error!("Open {path:?} failed: {e}");
                }
                self.status = Some(e.to_string());
                self.highlights.clear();
                false
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize(_, rows) => {
                self.view_rows = u32::from(rows.saturating_sub(CHROME_ROWS));
                self.clamp_scroll();
            }
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }
        if self.overlay != Overlay::None {
            self.handle_overlay_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Right | KeyCode::Char('l' | 'n' | ' ') | KeyCode::PageDown => {
                self.dispatch(Command::Next)
            }
            KeyCode::Left | KeyCode::Char('h' | 'p') | KeyCode::PageUp => {
                self.dispatch(Command::Prev)
            }
            KeyCode::Home => self.dispatch(Command::GoToPage(1)),
            KeyCode::End => {
                let last = self.session.navigator().page_count();
                self.dispatch(Command::GoToPage(last));
            }
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::Char('d') => self.scroll_by(self.half_page()),
            KeyCode::Char('u') => self.scroll_by(-self.half_page()),
            KeyCode::Char('>') => self.hscroll = self.hscroll.saturating_add(4),
            KeyCode::Char('<') => self.hscroll = self.hscroll.saturating_sub(4),
            KeyCode::Char('+' | '=') => self.dispatch(Command::ZoomIn),
            KeyCode::Char('-') => self.dispatch(Command::ZoomOut),
            KeyCode::Char('v') => {
                let mode = match self.session.navigator().view_mode() {
                    ViewMode::Single => ViewMode::Continuous,
                    ViewMode::Continuous => ViewMode::Single,
                };
                self.dispatch(Command::SetViewMode(mode));
            }
            KeyCode::Char('o') => {
                let orientation = match self.session.navigator().orientation() {
                    Orientation::Vertical => Orientation::Spread,
                    Orientation::Spread => Orientation::Vertical,
                };
                self.dispatch(Command::SetOrientation(orientation));
            }
            KeyCode::Char('g') => self.start_prompt(PromptKind::GoTo),
            KeyCode::Char('z') => self.start_prompt(PromptKind::ZoomPercent),
            KeyCode::Char('b') => self.start_prompt(PromptKind::Bookmark),
            KeyCode::Char('m') => {
                if self.session.navigator().kind() == DocumentKind::Epub {
                    self.start_prompt(PromptKind::Highlight);
                }
            }
            KeyCode::Char('B') => {
                if self.session.document().is_some() {
                    self.overlay = Overlay::Bookmarks;
                }
            }
            KeyCode::Char('?') => self.overlay = Overlay::Help,
            KeyCode::Char('t') => {
                self.settings.theme = self.settings.theme.toggled();
                self.save_settings();
            }
            KeyCode::Char('L') => {
                self.settings.language = self.settings.language.toggled();
                self.save_settings();
            }
            KeyCode::Char(']') => self.change_base_font(2),
            KeyCode::Char('[') => self.change_base_font(-2),
            _ => {}
        }
    }

    fn dispatch(&mut self, cmd: Command) {
        let before = self.session.navigator().current_index();
        let effects = self.session.apply(cmd);
        if effects.is_empty() {
            return;
        }
        debug!("{cmd:?} -> {effects:?}");

        let moved = self.session.navigator().current_index() != before;
        if moved || matches!(cmd, Command::SetViewMode(_) | Command::SetOrientation(_)) {
            self.scroll = 0;
            self.hscroll = 0;
        }
        if moved || effects.contains(&Effect::ReloadHighlights) {
            self.reload_highlights();
        }
    }

    fn reload_highlights(&mut self) {
        self.highlights = match self.session.document() {
            Some(doc) if doc.kind == DocumentKind::Epub => self
                .store
                .highlights(&doc.title, self.session.navigator().current_index()),
            _ => Vec::new(),
        };
    }

    fn half_page(&self) -> i64 {
        i64::from((self.view_rows / 2).max(1))
    }

    fn scroll_by(&mut self, delta: i64) {
        let target = (i64::from(self.scroll) + delta).max(0);
        self.scroll = u32::try_from(target).unwrap_or(u32::MAX);
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        let max = self.content_rows.saturating_sub(self.view_rows);
        self.scroll = self.scroll.min(max);
    }

    fn start_prompt(&mut self, kind: PromptKind) {
        if self.session.document().is_none() {
            self.status = Some(tr(self.settings.language, "no_document").to_string());
            return;
        }
        self.prompt = Some(Prompt {
            kind,
            input: String::new(),
        });
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                prompt.input.pop();
            }
            KeyCode::Char(c) => prompt.input.push(c),
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        let input = prompt.input.trim();
        match prompt.kind {
            PromptKind::GoTo => match input.parse::<usize>() {
                Ok(page) => self.dispatch(Command::GoToPage(page)),
                Err(_) => self.status = Some(format!("Not a page number: {input:?}")),
            },
            PromptKind::ZoomPercent => match input.trim_end_matches('%').parse::<u32>() {
                Ok(percent) => self.dispatch(Command::SetZoomPercent(percent)),
                Err(_) => self.status = Some(format!("Not a percentage: {input:?}")),
            },
            PromptKind::Bookmark => self.add_bookmark(input),
            PromptKind::Highlight => self.add_highlight(input),
        }
    }

    fn add_bookmark(&mut self, name: &str) {
        let Some(doc) = self.session.document() else {
            return;
        };
        let position = match doc.kind {
            DocumentKind::Epub => i64::from(self.scroll),
            DocumentKind::Pdf => 0,
        };
        let index = self.session.navigator().current_index();
        self.status = Some(
            match self.store.set_bookmark(&doc.title, name, index, position) {
                Ok(()) => {
                    info!("Bookmark {name:?} at page {}", index + 1);
                    format!("{} '{name}'", tr(self.settings.language, "bookmark_saved"))
                }
                Err(e) => e.to_string(),
            },
        );
    }

    /// Input is `start-end` (or `start end`) in characters of the page text
    fn add_highlight(&mut self, input: &str) {
        let Some(doc) = self.session.document() else {
            return;
        };
        let bounds: Vec<usize> = input
            .split(|c: char| c == '-' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .filter_map(|part| part.parse().ok())
            .collect();
        let [start, end] = bounds[..] else {
            self.status = Some(format!("Expected start-end, got {input:?}"));
            return;
        };
        let page = self.session.navigator().current_index();
        let title = doc.title.clone();
        self.store.add_highlight(&title, page, Highlight::new(start, end));
        self.reload_highlights();
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) {
        if self.overlay == Overlay::Bookmarks {
            if let KeyCode::Char(c @ '1'..='9') = key.code {
                let slot = c as usize - '1' as usize;
                self.jump_to_bookmark(slot);
            }
        }
        self.overlay = Overlay::None;
    }

    fn jump_to_bookmark(&mut self, slot: usize) {
        let Some(doc) = self.session.document() else {
            return;
        };
        let Some((name, bookmark)) = self.store.bookmarks(&doc.title).into_iter().nth(slot) else {
            return;
        };
        self.dispatch(Command::GoToPage(bookmark.index + 1));
        self.scroll = u32::try_from(bookmark.position.max(0)).unwrap_or(0);
        self.status = Some(name);
    }

    fn change_base_font(&mut self, delta: i32) {
        let size = (i32::from(self.settings.font_size) + delta).clamp(8, 60);
        self.settings.font_size = u16::try_from(size).unwrap_or(16);
        self.dispatch(Command::SetBaseFontSize(self.settings.font_size));
        self.save_settings();
    }

    fn save_settings(&self) {
        if let Some(path) = &self.settings_path {
            if let Err(e) = self.settings.save(path) {
                error!("Failed to save settings: {e}");
            }
        }
    }

    /// Label for the zoom indicator
    pub fn zoom_label(&self) -> String {
        match self.session.document() {
            Some(_) => format!("{}%", self.session.navigator().zoom_percent()),
            None => "100%".to_string(),
        }
    }
}

/// Drive `app` from `event_source` until it asks to quit
pub fn run_app_with_event_source<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui::draw(f, app))?;
        if app.should_quit() {
            break;
        }
        if event_source.poll(Duration::from_millis(250))? {
            let event = event_source.read()?;
            app.handle_event(event);
        }
    }
    app.save_settings();
    Ok(())
}

/// Viewport in bitmap pixels for a terminal of `cols` x `rows` cells
pub fn viewport_for(cols: u16, rows: u16) -> Viewport {
    Viewport::new(
        u32::from(cols) * CELL_WIDTH_PX,
        u32::from(rows.saturating_sub(CHROME_ROWS)) * 2 * HALF_CELL_HEIGHT_PX,
    )
}

/// Open `path` and run the viewer on the real terminal
pub fn run(
    mut app: App,
    path: &Path,
    password: Option<PasswordPrompt<'_>>,
) -> Result<()> {
    let (cols, rows) = crossterm::terminal::size().unwrap_or((100, 40));
    app.session.set_viewport(viewport_for(cols, rows));
    if !app.open(path, password) {
        anyhow::bail!(
            "{}",
            app.status().unwrap_or("failed to open document").to_string()
        );
    }

    initialize_panic_handler();
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(out))?;

    let result = run_app_with_event_source(
        &mut terminal,
        &mut app,
        &mut crate::event_source::KeyboardEventSource,
    );

    restore_terminal();
    info!("Viewer closed");
    result
}
