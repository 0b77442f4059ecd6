//! Drawing page bitmaps with `▀` cells: the foreground colour paints the
//! upper half of a cell and the background colour the lower half.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Widget;

use crate::pdf::Bitmap;

/// Bitmap pixels covered by one cell horizontally
pub const CELL_WIDTH_PX: u32 = 8;
/// Bitmap pixels covered by one half cell vertically
pub const HALF_CELL_HEIGHT_PX: u32 = 8;

const UPPER_HALF: &str = "▀";

/// Pages stacked top to bottom, scrolled by whole cells
pub struct PageCanvas<'a> {
    frames: Vec<&'a Bitmap>,
    /// Blank half-cells between consecutive frames
    gap: u32,
    scroll_rows: u32,
    scroll_cols: u32,
    paper: (u8, u8, u8),
    background: Color,
}

impl<'a> PageCanvas<'a> {
    pub fn new(frames: Vec<&'a Bitmap>) -> Self {
        Self {
            frames,
            gap: 2,
            scroll_rows: 0,
            scroll_cols: 0,
            paper: (255, 255, 255),
            background: Color::Reset,
        }
    }

    pub fn scroll(mut self, rows: u32, cols: u32) -> Self {
        self.scroll_rows = rows;
        self.scroll_cols = cols;
        self
    }

    /// Colour transparent page areas are blended onto
    pub fn paper(mut self, rgb: (u8, u8, u8)) -> Self {
        self.paper = rgb;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Height of the whole strip in terminal rows
    pub fn content_rows(frames: &[&Bitmap], gap: u32) -> u32 {
        let dots = Self::layout(frames, gap).last().map_or(0, |(start, f)| {
            start + f.height().div_ceil(HALF_CELL_HEIGHT_PX)
        });
        dots.div_ceil(2)
    }

    /// Width of the widest frame in terminal columns
    pub fn content_cols(frames: &[&Bitmap]) -> u32 {
        frames
            .iter()
            .map(|f| f.width().div_ceil(CELL_WIDTH_PX))
            .max()
            .unwrap_or(0)
    }

    /// First half-cell row of every frame
    fn layout<'b>(frames: &[&'b Bitmap], gap: u32) -> Vec<(u32, &'b Bitmap)> {
        let mut next = 0;
        frames
            .iter()
            .map(|frame| {
                let start = next;
                next += frame.height().div_ceil(HALF_CELL_HEIGHT_PX) + gap;
                (start, *frame)
            })
            .collect()
    }

    fn sample(&self, frame: &Bitmap, dot_x: u32, dot_y: u32) -> Option<Color> {
        let x = dot_x * CELL_WIDTH_PX + CELL_WIDTH_PX / 2;
        let y = dot_y * HALF_CELL_HEIGHT_PX + HALF_CELL_HEIGHT_PX / 2;
        if dot_x * CELL_WIDTH_PX >= frame.width() || dot_y * HALF_CELL_HEIGHT_PX >= frame.height()
        {
            return None;
        }
        let pixel = frame.get_pixel(x.min(frame.width() - 1), y.min(frame.height() - 1));
        let [r, g, b, a] = pixel.0;
        let blend = |c: u8, p: u8| {
            ((u32::from(c) * u32::from(a) + u32::from(p) * (255 - u32::from(a))) / 255) as u8
        };
        Some(Color::Rgb(
            blend(r, self.paper.0),
            blend(g, self.paper.1),
            blend(b, self.paper.2),
        ))
    }
}

impl Widget for PageCanvas<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = Self::layout(&self.frames, self.gap);
        let strip_cols = Self::content_cols(&self.frames);
        let left_pad = u32::from(area.width).saturating_sub(strip_cols) / 2;

        let color_at = |col: u32, dot_y: u32| -> Color {
            let Some((start, frame)) = layout
                .iter()
                .rev()
                .find(|(start, _)| *start <= dot_y)
                .copied()
            else {
                return self.background;
            };
            let frame_cols = frame.width().div_ceil(CELL_WIDTH_PX);
            let frame_pad = left_pad + strip_cols.saturating_sub(frame_cols) / 2;
            let Some(dot_x) = (col + self.scroll_cols).checked_sub(frame_pad) else {
                return self.background;
            };
            self.sample(frame, dot_x, dot_y - start)
                .unwrap_or(self.background)
        };

        for row in 0..area.height {
            let top_dot = (self.scroll_rows + u32::from(row)) * 2;
            for col in 0..area.width {
                let top = color_at(u32::from(col), top_dot);
                let bottom = color_at(u32::from(col), top_dot + 1);
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_symbol(UPPER_HALF).set_fg(top).set_bg(bottom);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn strip_height_counts_gaps() {
        let a = RgbaImage::new(16, 32);
        let b = RgbaImage::new(16, 16);
        // 4 + 2 gap + 2 half-cells
        assert_eq!(PageCanvas::content_rows(&[&a, &b], 2), 4);
        assert_eq!(PageCanvas::content_cols(&[&a, &b]), 2);
    }

    #[test]
    fn renders_top_and_bottom_halves() {
        let mut page = RgbaImage::from_pixel(8, 16, Rgba([255, 0, 0, 255]));
        for x in 0..8 {
            for y in 8..16 {
                page.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let area = Rect::new(0, 0, 1, 1);
        let mut buf = Buffer::empty(area);
        PageCanvas::new(vec![&page]).render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), UPPER_HALF);
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }

    #[test]
    fn transparent_pixels_show_paper() {
        let page = RgbaImage::new(8, 16);
        let area = Rect::new(0, 0, 1, 1);
        let mut buf = Buffer::empty(area);
        PageCanvas::new(vec![&page])
            .paper((250, 240, 230))
            .render(area, &mut buf);
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(250, 240, 230));
    }
}
