use ratatui::style::Color;

use crate::settings::Theme;

/// Colours used by the viewer for one theme
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub accent: Color,
    pub bar_background: Color,
    pub highlight: Color,
    /// What transparent page areas are blended onto
    pub paper: (u8, u8, u8),
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                background: Color::Rgb(0xf2, 0xf2, 0xf2),
                foreground: Color::Rgb(0x20, 0x20, 0x20),
                muted: Color::Rgb(0x70, 0x70, 0x70),
                accent: Color::Rgb(0x1e, 0x66, 0xf5),
                bar_background: Color::Rgb(0xdc, 0xdc, 0xdc),
                highlight: Color::Rgb(0xff, 0xf1, 0x76),
                paper: (0xff, 0xff, 0xff),
            },
            Theme::Dark => Self {
                background: Color::Rgb(0x1b, 0x2b, 0x34),
                foreground: Color::Rgb(0xd8, 0xde, 0xe9),
                muted: Color::Rgb(0x65, 0x73, 0x7e),
                accent: Color::Rgb(0x66, 0x99, 0xcc),
                bar_background: Color::Rgb(0x34, 0x3d, 0x46),
                highlight: Color::Rgb(0x80, 0x70, 0x20),
                paper: (0xff, 0xff, 0xff),
            },
        }
    }
}
