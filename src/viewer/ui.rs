use ratatui::Frame as TermFrame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use unicode_width::UnicodeWidthChar;

use super::halfblock::PageCanvas;
use super::theme::Palette;
use super::{App, Overlay, PromptKind};
use crate::bookmark::Highlight;
use crate::epub::html_to_text;
use crate::i18n::tr;
use crate::navigation::{DocumentKind, Orientation, ViewMode};
use crate::session::Frame;
use crate::settings::Language;

pub(super) fn draw(f: &mut TermFrame, app: &mut App) {
    let palette = Palette::for_theme(app.settings.theme);
    let language = app.settings.language;
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().bg(palette.background)),
        area,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_title_bar(f, app, chunks[0], &palette);
    render_content(f, app, chunks[1], &palette);
    render_status_bar(f, app, chunks[2], &palette);

    match app.overlay {
        Overlay::None => {}
        Overlay::Help => render_help(f, area, &palette, language),
        Overlay::Bookmarks => render_bookmarks(f, app, area, &palette),
    }
}

fn render_title_bar(f: &mut TermFrame, app: &App, area: Rect, palette: &Palette) {
    let language = app.settings.language;
    let style = Style::default().fg(palette.foreground).bg(palette.bar_background);
    let Some(doc) = app.session.document() else {
        f.render_widget(
            Paragraph::new(format!(" folio | {}", tr(language, "no_document"))).style(style),
            area,
        );
        return;
    };

    let nav = app.session.navigator();
    let page = nav.current_index() + 1;
    let pages = if nav.is_paired() && page < nav.page_count() {
        format!("{}-{}", page, page + 1)
    } else {
        page.to_string()
    };
    let name = doc.display_title.as_deref().unwrap_or(&doc.title);

    let mut spans = vec![
        Span::styled(format!(" {name} "), style.add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "| {} {pages}/{} | {} {} ",
            tr(language, "page"),
            nav.page_count(),
            tr(language, "zoom"),
            app.zoom_label()
        )),
    ];
    if doc.kind == DocumentKind::Pdf {
        let mode = match nav.view_mode() {
            ViewMode::Single => tr(language, "one_page"),
            ViewMode::Continuous => tr(language, "all_pages"),
        };
        let orientation = match nav.orientation() {
            Orientation::Vertical => tr(language, "vertical"),
            Orientation::Spread => tr(language, "horizontal"),
        };
        spans.push(Span::styled(
            format!("| {mode} / {orientation}"),
            Style::default().fg(palette.accent),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)).style(style), area);
}

fn render_content(f: &mut TermFrame, app: &mut App, area: Rect, palette: &Palette) {
    let language = app.settings.language;
    app.view_rows = u32::from(area.height);
    let index = app.session.navigator().current_index();
    let base = u32::from(app.session.navigator().base_font_size().max(1));

    let content_rows = match app.session.frame() {
        Frame::Empty => {
            render_message(f, area, palette, tr(language, "no_document"));
            0
        }
        Frame::Page(None) => {
            render_message(f, area, palette, tr(language, "render_failed"));
            0
        }
        Frame::Page(Some(bitmap)) => {
            let frames = [bitmap.as_ref()];
            let rows = PageCanvas::content_rows(&frames, 0);
            f.render_widget(
                PageCanvas::new(frames.to_vec())
                    .scroll(app.scroll, app.hscroll)
                    .paper(palette.paper)
                    .background(palette.background),
                area,
            );
            rows
        }
        Frame::Continuous(bitmaps) => {
            let frames: Vec<_> = bitmaps.iter().collect();
            let rows = PageCanvas::content_rows(&frames, 2);
            f.render_widget(
                PageCanvas::new(frames)
                    .scroll(app.scroll, app.hscroll)
                    .paper(palette.paper)
                    .background(palette.background),
                area,
            );
            rows
        }
        Frame::Html { markup, font_size } => {
            let text = match &app.text_cache {
                Some((cached, text)) if *cached == index => text.clone(),
                _ => {
                    let text = html_to_text(markup);
                    app.text_cache = Some((index, text.clone()));
                    text
                }
            };
            let columns = u32::from(area.width.saturating_sub(2)) * base / u32::from(font_size.max(1));
            let lines = wrap_text(&text, columns as usize);
            let rows = lines.len() as u32;

            let highlight = Style::default().bg(palette.highlight);
            let visible: Vec<Line> = lines
                .into_iter()
                .skip(app.scroll as usize)
                .take(usize::from(area.height))
                .map(|(start, line)| highlighted_line(start, &line, &app.highlights, highlight))
                .collect();
            f.render_widget(
                Paragraph::new(visible).style(
                    Style::default()
                        .fg(palette.foreground)
                        .bg(palette.background),
                ),
                area.inner(ratatui::layout::Margin::new(1, 0)),
            );
            rows
        }
    };

    app.content_rows = content_rows;
    app.clamp_scroll();
}

fn render_message(f: &mut TermFrame, area: Rect, palette: &Palette, message: &str) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);
    f.render_widget(
        Paragraph::new(message)
            .alignment(ratatui::layout::Alignment::Center)
            .style(Style::default().fg(palette.muted)),
        rows[1],
    );
}

fn render_status_bar(f: &mut TermFrame, app: &App, area: Rect, palette: &Palette) {
    let language = app.settings.language;
    let style = Style::default().fg(palette.foreground).bg(palette.bar_background);
    let text = if let Some(prompt) = &app.prompt {
        let label = match prompt.kind {
            PromptKind::GoTo => tr(language, "goto"),
            PromptKind::ZoomPercent => tr(language, "zoom"),
            PromptKind::Bookmark => tr(language, "bookmark_name"),
            PromptKind::Highlight => tr(language, "highlights"),
        };
        format!(" {label}: {}█  ESC: Cancel | Enter: Confirm", prompt.input)
    } else if let Some(status) = &app.status {
        format!(" {status} | ?: {}", tr(language, "help"))
    } else {
        format!(
            " h/l: {} / {} | g: {} | +/-: {} | ?: {} | q: {}",
            tr(language, "prev"),
            tr(language, "next"),
            tr(language, "goto"),
            tr(language, "zoom"),
            tr(language, "help"),
            tr(language, "exit"),
        )
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}

const HELP_LINES: &[(&str, &str)] = &[
    ("h l / arrows / space", "previous / next page"),
    ("j k / d u", "scroll line / half screen"),
    ("< >", "scroll sideways"),
    ("Home End g", "first, last, go to page"),
    ("+ - z", "zoom in, out, to percent"),
    ("v", "one page / all pages (PDF)"),
    ("o", "vertical / side by side (PDF)"),
    ("b B", "add bookmark, list bookmarks"),
    ("m", "highlight characters (EPUB)"),
    ("[ ]", "base font size"),
    ("t L", "theme, language"),
    ("q Esc", "quit"),
];

fn render_help(f: &mut TermFrame, area: Rect, palette: &Palette, language: Language) {
    let lines: Vec<Line> = HELP_LINES
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{keys:>22}  "), Style::default().fg(palette.accent)),
                Span::raw(*what),
            ])
        })
        .collect();
    render_popup(f, area, palette, tr(language, "view_help"), lines);
}

fn render_bookmarks(f: &mut TermFrame, app: &App, area: Rect, palette: &Palette) {
    let language = app.settings.language;
    let lines: Vec<Line> = match app.session.document() {
        Some(doc) => {
            let bookmarks = app.store.bookmarks(&doc.title);
            if bookmarks.is_empty() {
                vec![Line::from("-")]
            } else {
                bookmarks
                    .iter()
                    .take(9)
                    .enumerate()
                    .map(|(i, (name, bookmark))| {
                        Line::from(vec![
                            Span::styled(format!("{:>2}. ", i + 1), Style::default().fg(palette.accent)),
                            Span::raw(format!(
                                "{name}  ({} {})",
                                tr(language, "page"),
                                bookmark.index + 1
                            )),
                        ])
                    })
                    .collect()
            }
        }
        None => vec![Line::from(tr(language, "no_document"))],
    };
    render_popup(f, area, palette, tr(language, "bookmarks"), lines);
}

fn render_popup(f: &mut TermFrame, area: Rect, palette: &Palette, title: &str, lines: Vec<Line>) {
    let popup = centered_rect(70, 60, area);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {title} "))
                    .border_style(Style::default().fg(palette.accent)),
            )
            .style(
                Style::default()
                    .fg(palette.foreground)
                    .bg(palette.bar_background),
            ),
        popup,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Hard-wrap `text` at `width` display columns. Each line carries the char
/// offset of its first character in `text`, newlines included.
pub(super) fn wrap_text(text: &str, width: usize) -> Vec<(usize, String)> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in text.split('\n') {
        let mut start = offset;
        let mut current = String::new();
        let mut current_width = 0;
        for c in raw.chars() {
            let w = c.width().unwrap_or(0);
            if current_width + w > width && !current.is_empty() {
                let taken = current.chars().count();
                lines.push((start, std::mem::take(&mut current)));
                start += taken;
                current_width = 0;
            }
            current.push(c);
            current_width += w;
        }
        lines.push((start, current));
        offset += raw.chars().count() + 1;
    }
    lines
}

fn highlighted_line(
    start: usize,
    line: &str,
    highlights: &[Highlight],
    style: Style,
) -> Line<'static> {
    let covered = |i: usize| highlights.iter().any(|h| h.start <= i && i < h.end);
    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_marked = false;
    for (i, c) in line.chars().enumerate() {
        let marked = covered(start + i);
        if marked != run_marked && !run.is_empty() {
            spans.push(styled_run(std::mem::take(&mut run), run_marked, style));
        }
        run_marked = marked;
        run.push(c);
    }
    if !run.is_empty() {
        spans.push(styled_run(run, run_marked, style));
    }
    Line::from(spans)
}

fn styled_run(text: String, marked: bool, style: Style) -> Span<'static> {
    if marked {
        Span::styled(text, style)
    } else {
        Span::raw(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_tracks_char_offsets_across_newlines() {
        let lines = wrap_text("abcdef\ngh", 4);
        assert_eq!(
            lines,
            vec![
                (0, "abcd".to_string()),
                (4, "ef".to_string()),
                (7, "gh".to_string()),
            ]
        );
    }

    #[test]
    fn wide_characters_take_two_columns() {
        let lines = wrap_text("日本語", 4);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], (2, "語".to_string()));
    }

    #[test]
    fn highlight_splits_spans() {
        let style = Style::default().bg(ratatui::style::Color::Yellow);
        let line = highlighted_line(10, "hello", &[Highlight::new(11, 13)], style);
        let parts: Vec<_> = line.spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(parts, vec!["h", "el", "lo"]);
        assert_eq!(line.spans[1].style, style);
        assert_eq!(line.spans[0].style, Style::default());
    }
}
