//! Zoom factor for PDF pages and font size for EPUB text
//!
//! Both move in fixed steps and are clamped to a closed range. PDF zoom is
//! kept rounded to two decimals so repeated stepping does not accumulate
//! floating point drift.

/// Zoom state for PDF viewing
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    /// Current zoom factor (1.0 = 100%)
    factor: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl Zoom {
    /// Step applied by zoom in / zoom out
    pub const STEP: f32 = 0.10;
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f32 = 0.1;
    /// Maximum allowed zoom factor
    pub const MAX_SCALE: f32 = 5.0;

    /// Bounds used when the zoom is typed in as a percentage
    pub const MIN_PERCENT_SCALE: f32 = 0.5;
    pub const MAX_PERCENT_SCALE: f32 = 3.0;

    pub fn new(factor: f32) -> Self {
        Self {
            factor: Self::clamp_factor(factor),
        }
    }

    /// Returns the current zoom factor
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Zoom in by one step
    pub fn step_in(&mut self) {
        self.factor = Self::clamp_factor(round2(self.factor + Self::STEP));
    }

    /// Zoom out by one step
    pub fn step_out(&mut self) {
        self.factor = Self::clamp_factor(round2(self.factor - Self::STEP));
    }

    /// Set the zoom from a percentage (e.g. 150 for 150%)
    pub fn set_percent(&mut self, percent: u32) {
        let factor = percent as f32 / 100.0;
        self.factor = factor.clamp(Self::MIN_PERCENT_SCALE, Self::MAX_PERCENT_SCALE);
    }

    pub fn percent(&self) -> u32 {
        (self.factor * 100.0).round() as u32
    }

    /// Clamp factor to valid range, handling NaN/Inf
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            1.0
        } else {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        }
    }
}

/// Font size used to lay out EPUB pages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontSize {
    current: u16,
    base: u16,
}

impl FontSize {
    pub const STEP: u16 = 2;
    pub const MIN: u16 = 8;
    pub const MAX: u16 = 60;
    /// Upper bound when the size is derived from a typed-in percentage
    pub const MAX_FROM_PERCENT: u16 = 40;

    pub fn new(base: u16) -> Self {
        let base = base.clamp(Self::MIN, Self::MAX);
        Self {
            current: base,
            base,
        }
    }

    pub fn current(&self) -> u16 {
        self.current
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn step_in(&mut self) {
        self.current = (self.current + Self::STEP).min(Self::MAX);
    }

    pub fn step_out(&mut self) {
        self.current = self.current.saturating_sub(Self::STEP).max(Self::MIN);
    }

    /// Change the base size (from settings) and reset the current size to it
    pub fn rebase(&mut self, base: u16) {
        *self = Self::new(base);
    }

    pub fn set_percent(&mut self, percent: u32) {
        let size = (f32::from(self.base) * percent as f32 / 100.0) as u32;
        self.current = size.clamp(u32::from(Self::MIN), u32::from(Self::MAX_FROM_PERCENT)) as u16;
    }

    /// Current size relative to the base size, in percent
    pub fn percent(&self) -> u32 {
        if self.base == 0 {
            return 100;
        }
        (f32::from(self.current) / f32::from(self.base) * 100.0).round() as u32
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self::new(16)
    }
}

pub(crate) fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
