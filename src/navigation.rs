//! Page index bookkeeping for the open document

use crate::pdf::{FontSize, Zoom};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Epub,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Single,
    Continuous,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Vertical,
    /// Two pages side by side, even index on the left
    Spread,
}

/// Commands that move through or re-scale the document
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Prev,
    Next,
    /// 1-based page number as typed by the user
    GoToPage(usize),
    SetViewMode(ViewMode),
    SetOrientation(Orientation),
    ZoomIn,
    ZoomOut,
    /// Zoom (PDF) or font size (EPUB) as a percentage
    SetZoomPercent(u32),
    /// New base font size from settings
    SetBaseFontSize(u16),
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// The visible page must be redrawn
    Redraw,
    /// The continuous layout must be rebuilt before it is shown again
    ContinuousStale,
    /// Highlights for the current page must be reloaded
    ReloadHighlights,
}

/// Navigation and scale state for one document
#[derive(Clone, Debug)]
pub struct Navigator {
    kind: DocumentKind,
    page_count: usize,
    current_index: usize,
    view_mode: ViewMode,
    orientation: Orientation,
    zoom: Zoom,
    font: FontSize,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(DocumentKind::Pdf, 0)
    }
}

impl Navigator {
    #[must_use]
    pub fn new(kind: DocumentKind, page_count: usize) -> Self {
        Self {
            kind,
            page_count,
            current_index: 0,
            view_mode: ViewMode::Single,
            orientation: Orientation::Vertical,
            zoom: Zoom::default(),
            font: FontSize::default(),
        }
    }

    /// Start over for a freshly loaded document. View mode and orientation go
    /// back to Single/Vertical; the font size returns to its base size.
    pub fn reset(&mut self, kind: DocumentKind, page_count: usize, zoom: f32) {
        let base = self.font.base();
        *self = Self::new(kind, page_count);
        self.zoom = Zoom::new(zoom);
        self.font = FontSize::new(base);
    }

    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.zoom.factor()
    }

    #[must_use]
    pub fn font_size(&self) -> u16 {
        self.font.current()
    }

    #[must_use]
    pub fn base_font_size(&self) -> u16 {
        self.font.base()
    }

    /// Zoom for PDF or font size for EPUB, relative to 100%
    #[must_use]
    pub fn zoom_percent(&self) -> u32 {
        match self.kind {
            DocumentKind::Pdf => self.zoom.percent(),
            DocumentKind::Epub => self.font.percent(),
        }
    }

    /// True when pages are shown in pairs one at a time
    #[must_use]
    pub fn is_paired(&self) -> bool {
        self.kind == DocumentKind::Pdf
            && self.view_mode == ViewMode::Single
            && self.orientation == Orientation::Spread
    }

    #[must_use]
    pub fn is_continuous(&self) -> bool {
        self.kind == DocumentKind::Pdf && self.view_mode == ViewMode::Continuous
    }

    /// Highest index `Next` may reach
    fn last_index(&self) -> usize {
        let last = self.page_count.saturating_sub(1);
        if self.is_paired() && self.page_count % 2 == 0 {
            last.saturating_sub(1)
        } else {
            last
        }
    }

    fn step(&self) -> usize {
        if self.is_paired() { 2 } else { 1 }
    }

    fn align_to_left_page(&mut self) {
        if self.is_paired() && self.current_index % 2 == 1 {
            self.current_index -= 1;
        }
    }

    fn moved_to(&mut self, index: usize) -> Vec<Effect> {
        if index == self.current_index {
            return vec![];
        }
        self.current_index = index;
        vec![Effect::Redraw]
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        if self.page_count == 0 {
            return vec![];
        }

        match cmd {
            Command::Prev => {
                let index = self.current_index.saturating_sub(self.step());
                self.moved_to(index)
            }

            Command::Next => {
                let index = (self.current_index + self.step()).min(self.last_index());
                self.moved_to(index)
            }

            Command::GoToPage(page) => {
                self.current_index = page.clamp(1, self.page_count) - 1;
                self.align_to_left_page();
                vec![Effect::Redraw, Effect::ReloadHighlights]
            }

            Command::SetViewMode(mode) => {
                if self.kind != DocumentKind::Pdf {
                    return vec![];
                }
                self.view_mode = mode;
                match mode {
                    ViewMode::Single => {
                        // odd pages are reachable while continuous
                        self.align_to_left_page();
                        vec![Effect::Redraw]
                    }
                    ViewMode::Continuous => vec![Effect::ContinuousStale, Effect::Redraw],
                }
            }

            Command::SetOrientation(orientation) => {
                self.orientation = orientation;
                if self.kind != DocumentKind::Pdf {
                    return vec![];
                }
                self.align_to_left_page();
                if self.view_mode == ViewMode::Continuous {
                    vec![Effect::ContinuousStale, Effect::Redraw]
                } else {
                    vec![Effect::Redraw]
                }
            }

            Command::ZoomIn | Command::ZoomOut | Command::SetZoomPercent(_) => {
                self.rescale(cmd);
                if self.is_continuous() {
                    vec![Effect::ContinuousStale, Effect::Redraw]
                } else {
                    vec![Effect::Redraw]
                }
            }

            Command::SetBaseFontSize(size) => {
                self.font.rebase(size);
                match self.kind {
                    DocumentKind::Epub => vec![Effect::Redraw],
                    DocumentKind::Pdf => vec![],
                }
            }
        }
    }

    fn rescale(&mut self, cmd: Command) {
        match (self.kind, cmd) {
            (DocumentKind::Pdf, Command::ZoomIn) => self.zoom.step_in(),
            (DocumentKind::Pdf, Command::ZoomOut) => self.zoom.step_out(),
            (DocumentKind::Pdf, Command::SetZoomPercent(pct)) => self.zoom.set_percent(pct),
            (DocumentKind::Epub, Command::ZoomIn) => self.font.step_in(),
            (DocumentKind::Epub, Command::ZoomOut) => self.font.step_out(),
            (DocumentKind::Epub, Command::SetZoomPercent(pct)) => self.font.set_percent(pct),
            _ => {}
        }
    }

    /// Change the base font size without a document being open
    pub fn set_base_font_size(&mut self, size: u16) {
        self.font.rebase(size);
    }
}
