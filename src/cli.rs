//! Command line entry points

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use crate::bookmark::{AnnotationStore, Highlight, default_store_path};
use crate::convert;
use crate::epub::html_to_text;
use crate::error::FolioError;
use crate::event_source::{
    Event, EventSource, KeyCode, KeyEventKind, KeyModifiers, KeyboardEventSource,
};
use crate::navigation::{Command, DocumentKind, Orientation, ViewMode};
use crate::pdf::{MupdfEngine, PdfEngine, Viewport, stack_vertically};
use crate::session::{Frame, Session, SessionOptions, document_title};
use crate::settings::{Settings, default_settings_path};
use crate::viewer::{self, App};

/// Blank rows between pages in a continuous render
const CONTINUOUS_GAP_PX: u32 = 16;

#[derive(Debug, Parser)]
#[command(name = "folio", version)]
#[command(about = "View PDF and EPUB documents, convert text and images")]
pub struct Cli {
    /// Settings file (default: the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bookmark and highlight store (default: the user data directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub store: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "info",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,

    /// Password for encrypted PDFs. Asked for on the terminal when missing.
    #[arg(long, global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open a document in the terminal viewer.
    View {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print machine-readable document metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render a PDF page (or spread, or every page) to PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Zoom in percent; the viewer's fitted zoom when missing
        #[arg(long)]
        zoom: Option<u32>,
        /// Two pages side by side
        #[arg(long)]
        spread: bool,
        /// All pages top to bottom
        #[arg(long)]
        continuous: bool,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the text of an EPUB page.
    Text {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Print the rewritten markup instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Convert text or images into PDF or EPUB.
    #[command(subcommand)]
    Convert(ConvertCommand),
    /// Manage named bookmarks of a document.
    #[command(subcommand)]
    Bookmark(BookmarkCommand),
    /// Manage character highlights of an EPUB page.
    #[command(subcommand)]
    Highlight(HighlightCommand),
    /// Show or change settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConvertCommand {
    /// Plain text file to PDF
    TextPdf {
        input: PathBuf,
        output: PathBuf,
        /// Encrypt the PDF with this password
        #[arg(long)]
        encrypt: Option<String>,
    },
    /// Plain text file to a one-chapter EPUB
    TextEpub { input: PathBuf, output: PathBuf },
    /// Images to PDF, one page per image
    ImagesPdf {
        output: PathBuf,
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long)]
        encrypt: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum BookmarkCommand {
    Add {
        file: PathBuf,
        name: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 0)]
        position: i64,
    },
    List {
        file: PathBuf,
    },
    Remove {
        file: PathBuf,
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum HighlightCommand {
    /// Highlight characters `start..end` of the page text
    Add {
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: usize,
        start: usize,
        end: usize,
    },
    List {
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set { key: String, value: String },
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    kind: &'static str,
    title: String,
    display_title: Option<String>,
    page_count: usize,
}

#[derive(Debug, Serialize)]
struct BookmarkOutput {
    name: String,
    page: usize,
    position: i64,
    saved_at: Option<String>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(&cli)?;
    info!("folio {} starting", env!("CARGO_PKG_VERSION"));
    execute(cli, Box::new(MupdfEngine), &mut io::stdout().lock())
}

/// Run a parsed command line with `engine` for PDFs, writing output to `out`
pub fn execute(cli: Cli, engine: Box<dyn PdfEngine>, out: &mut dyn Write) -> Result<()> {
    let password = cli.password.clone();
    match cli.command {
        Commands::View { ref file } => run_view(&cli, engine, file, password),
        Commands::Info { ref file } => run_info(&cli, engine, file, password, out),
        Commands::Render {
            ref file,
            page,
            zoom,
            spread,
            continuous,
            ref output,
        } => {
            let mut session = open_session(&cli, engine, file, password)?;
            let output = output
                .clone()
                .unwrap_or_else(|| default_render_output(file, page));
            render_to_png(&mut session, page, zoom, spread, continuous, &output)?;
            writeln!(out, "{}", output.display())?;
            Ok(())
        }
        Commands::Text { ref file, page, html } => {
            let mut session = open_session(&cli, engine, file, password)?;
            let markup = epub_page(&mut session, page)?;
            if html {
                writeln!(out, "{markup}")?;
            } else {
                writeln!(out, "{}", html_to_text(&markup))?;
            }
            Ok(())
        }
        Commands::Convert(ref cmd) => run_convert(cmd, out),
        Commands::Bookmark(ref cmd) => run_bookmark(&cli, cmd, out),
        Commands::Highlight(ref cmd) => run_highlight(&cli, cmd, out),
        Commands::Settings(ref cmd) => run_settings(&cli, cmd, out),
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let Some(path) = cli.log_file.clone().or_else(default_log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build();
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let level = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    WriteLogger::init(level, config, file)?;
    Ok(())
}

fn default_log_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("folio").join("folio.log"))
}

fn settings_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(default_settings_path)
}

fn load_settings(cli: &Cli) -> Settings {
    match settings_path(cli) {
        Some(path) => Settings::load_or_create(&path),
        None => Settings::default(),
    }
}

fn load_store(cli: &Cli) -> AnnotationStore {
    let path = cli.store.clone().or_else(default_store_path);
    AnnotationStore::load_or_ephemeral(path.as_deref())
}

/// Supplies `given`, or reads a password from the terminal when stdin is one
fn password_source(given: Option<String>) -> impl FnMut() -> Option<String> {
    let mut given = given;
    move || {
        if let Some(password) = given.take() {
            return Some(password);
        }
        if !io::stdin().is_terminal() {
            return None;
        }
        eprint!("Password: ");
        let _ = io::stderr().flush();
        match read_hidden_line() {
            Ok(password) => password,
            Err(e) => {
                warn!("Password entry failed: {e}");
                None
            }
        }
    }
}

/// Read a line in raw mode so the typed characters are not echoed
fn read_hidden_line() -> Result<Option<String>> {
    crossterm::terminal::enable_raw_mode()?;
    let line = collect_hidden_input(&mut KeyboardEventSource);
    let _ = crossterm::terminal::disable_raw_mode();
    eprintln!();
    line
}

/// Enter finishes the line; Esc and Ctrl+C cancel it
fn collect_hidden_input(source: &mut dyn EventSource) -> Result<Option<String>> {
    let mut line = String::new();
    loop {
        let Event::Key(key) = source.read()? else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(Some(line)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None);
            }
            KeyCode::Backspace => {
                line.pop();
            }
            KeyCode::Char(c) => line.push(c),
            _ => {}
        }
    }
}

fn open_session(
    cli: &Cli,
    engine: Box<dyn PdfEngine>,
    file: &Path,
    password: Option<String>,
) -> Result<Session> {
    ensure_file_exists(file)?;
    let settings = load_settings(cli);
    let mut session = Session::new(
        engine,
        SessionOptions::from_settings(&settings, Viewport::default()),
    );
    let mut prompt = password_source(password);
    session.open(file, Some(&mut prompt))?;
    Ok(session)
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(FolioError::NoFile.into());
    }
    if !path.is_file() {
        bail!("file does not exist: {}", path.display());
    }
    Ok(())
}

fn run_view(
    cli: &Cli,
    engine: Box<dyn PdfEngine>,
    file: &Path,
    password: Option<String>,
) -> Result<()> {
    ensure_file_exists(file)?;
    let settings_path = settings_path(cli);
    let settings = match &settings_path {
        Some(path) => Settings::load_or_create(path),
        None => Settings::default(),
    };
    let session = Session::new(
        engine,
        SessionOptions::from_settings(&settings, Viewport::default()),
    );
    let app = App::new(session, settings, settings_path, load_store(cli));
    let mut prompt = password_source(password);
    viewer::run(app, file, Some(&mut prompt))
}

fn run_info(
    cli: &Cli,
    engine: Box<dyn PdfEngine>,
    file: &Path,
    password: Option<String>,
    out: &mut dyn Write,
) -> Result<()> {
    let session = open_session(cli, engine, file, password)?;
    let doc = session
        .document()
        .context("document closed unexpectedly")?;
    let payload = InfoOutput {
        path: file.display().to_string(),
        kind: match doc.kind {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Epub => "epub",
        },
        title: doc.title.clone(),
        display_title: doc.display_title.clone(),
        page_count: doc.page_count,
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
    Ok(())
}

fn check_page(session: &Session, page: usize) -> Result<()> {
    let count = session.navigator().page_count();
    if page == 0 || page > count {
        bail!("--page must be between 1 and {count}");
    }
    Ok(())
}

/// Render the requested view of an open PDF into a PNG at `output`
pub fn render_to_png(
    session: &mut Session,
    page: usize,
    zoom: Option<u32>,
    spread: bool,
    continuous: bool,
    output: &Path,
) -> Result<()> {
    if session.navigator().kind() != DocumentKind::Pdf {
        return Err(FolioError::invalid("only PDF pages can be rendered to images").into());
    }
    check_page(session, page)?;

    let _ = session.apply(Command::GoToPage(page));
    if let Some(percent) = zoom {
        let _ = session.apply(Command::SetZoomPercent(percent));
    }
    if spread {
        let _ = session.apply(Command::SetOrientation(Orientation::Spread));
    }
    if continuous {
        let _ = session.apply(Command::SetViewMode(ViewMode::Continuous));
    }

    let bitmap = match session.frame() {
        Frame::Page(Some(bitmap)) => bitmap.as_ref().clone(),
        Frame::Page(None) => bail!("page {page} could not be rendered"),
        Frame::Continuous(frames) if !frames.is_empty() => {
            stack_vertically(frames, CONTINUOUS_GAP_PX)
        }
        Frame::Continuous(_) => bail!("no page could be rendered"),
        Frame::Empty | Frame::Html { .. } => bail!("nothing to render"),
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    bitmap
        .save(output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;
    info!("Rendered page {page} to {output:?}");
    Ok(())
}

fn default_render_output(file: &Path, page: usize) -> PathBuf {
    let stem = file
        .file_stem()
        .and_then(|name| name.to_str())
        .unwrap_or("page");
    file.with_file_name(format!("{stem}-page-{page}.png"))
}

fn epub_page(session: &mut Session, page: usize) -> Result<String> {
    if session.navigator().kind() != DocumentKind::Epub {
        return Err(FolioError::invalid("page text is only available for EPUB documents").into());
    }
    check_page(session, page)?;
    let _ = session.apply(Command::GoToPage(page));
    match session.frame() {
        Frame::Html { markup, .. } => Ok(markup.to_string()),
        _ => bail!("page {page} has no content"),
    }
}

fn run_convert(cmd: &ConvertCommand, out: &mut dyn Write) -> Result<()> {
    let output = match cmd {
        ConvertCommand::TextPdf {
            input,
            output,
            encrypt,
        } => {
            convert::text_to_pdf(input, output, encrypt.as_deref())?;
            output
        }
        ConvertCommand::TextEpub { input, output } => {
            convert::text_to_epub(input, output)?;
            output
        }
        ConvertCommand::ImagesPdf {
            output,
            images,
            encrypt,
        } => {
            convert::images_to_pdf(images, output, encrypt.as_deref())?;
            output
        }
    };
    writeln!(out, "{}", output.display())?;
    Ok(())
}

fn run_bookmark(cli: &Cli, cmd: &BookmarkCommand, out: &mut dyn Write) -> Result<()> {
    let mut store = load_store(cli);
    match cmd {
        BookmarkCommand::Add {
            file,
            name,
            page,
            position,
        } => {
            if *page == 0 {
                bail!("--page is 1-based and must be >= 1");
            }
            store.set_bookmark(&document_title(file), name, page - 1, *position)?;
            writeln!(out, "{}", name.trim())?;
        }
        BookmarkCommand::List { file } => {
            let list: Vec<BookmarkOutput> = store
                .bookmarks(&document_title(file))
                .into_iter()
                .map(|(name, bookmark)| BookmarkOutput {
                    name,
                    page: bookmark.index + 1,
                    position: bookmark.position,
                    saved_at: bookmark.saved_at.map(|t| t.to_rfc3339()),
                })
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&list)?)?;
        }
        BookmarkCommand::Remove { file, name } => {
            if !store.remove_bookmark(&document_title(file), name) {
                bail!("no bookmark named {name:?}");
            }
        }
    }
    Ok(())
}

fn run_highlight(cli: &Cli, cmd: &HighlightCommand, out: &mut dyn Write) -> Result<()> {
    let mut store = load_store(cli);
    match cmd {
        HighlightCommand::Add {
            file,
            page,
            start,
            end,
        } => {
            if *page == 0 {
                bail!("--page is 1-based and must be >= 1");
            }
            let highlight = Highlight::new(*start, *end);
            store.add_highlight(&document_title(file), page - 1, highlight);
            writeln!(out, "{}-{}", highlight.start, highlight.end)?;
        }
        HighlightCommand::List { file, page } => {
            if *page == 0 {
                bail!("--page is 1-based and must be >= 1");
            }
            let list = store.highlights(&document_title(file), page - 1);
            writeln!(out, "{}", serde_json::to_string_pretty(&list)?)?;
        }
    }
    Ok(())
}

fn run_settings(cli: &Cli, cmd: &SettingsCommand, out: &mut dyn Write) -> Result<()> {
    let path = settings_path(cli);
    let mut settings = load_settings(cli);
    match cmd {
        SettingsCommand::Show => {
            for (key, value) in settings.entries() {
                writeln!(out, "{key} = {value}")?;
            }
        }
        SettingsCommand::Set { key, value } => {
            settings.set(key, value)?;
            let Some(path) = path else {
                bail!("no settings location; pass --config");
            };
            settings.save(&path)?;
            writeln!(out, "{key} = {}", value.trim())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    use crate::event_source::ScriptedEventSource;

    #[test]
    fn command_line_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "folio",
            "render",
            "book.pdf",
            "--page",
            "3",
            "--spread",
            "--password",
            "secret",
        ])
        .unwrap();
        assert_eq!(cli.password.as_deref(), Some("secret"));
        match cli.command {
            Commands::Render { page, spread, .. } => {
                assert_eq!(page, 3);
                assert!(spread);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn default_render_output_sits_next_to_input() {
        assert_eq!(
            default_render_output(Path::new("docs/report.pdf"), 2),
            PathBuf::from("docs/report-page-2.png")
        );
    }

    #[test]
    fn given_password_is_used_once() {
        let mut source = password_source(Some("pw".into()));
        assert_eq!(source().as_deref(), Some("pw"));
    }

    #[test]
    fn hidden_input_supports_backspace() {
        let mut events = ScriptedEventSource::typed("hunterx");
        events.push(ScriptedEventSource::key(KeyCode::Backspace));
        events.push(ScriptedEventSource::char_key('2'));
        events.push(ScriptedEventSource::key(KeyCode::Enter));
        let mut source = ScriptedEventSource::new(events);

        let line = collect_hidden_input(&mut source).unwrap();
        assert_eq!(line.as_deref(), Some("hunter2"));
    }

    #[test]
    fn hidden_input_cancels_on_escape() {
        let mut events = ScriptedEventSource::typed("abc");
        events.push(ScriptedEventSource::key(KeyCode::Esc));
        events.push(ScriptedEventSource::key(KeyCode::Enter));
        let mut source = ScriptedEventSource::new(events);

        assert_eq!(collect_hidden_input(&mut source).unwrap(), None);
        assert_eq!(source.remaining(), 1);
    }
}
