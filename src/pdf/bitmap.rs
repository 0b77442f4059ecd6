//! Bitmap helpers: conversion from rasterizer output, spread compositing
//! and vertical stacking for the continuous layout.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::engine::{EngineFault, PixelBuffer};

/// A displayable page (or spread) image
pub type Bitmap = RgbaImage;

/// Copy a possibly row-padded RGBA buffer into a tightly packed bitmap
pub fn from_pixel_buffer(buffer: &PixelBuffer) -> Result<Bitmap, EngineFault> {
    let width = buffer.width as usize;
    let height = buffer.height as usize;
    let row_bytes = width * 4;
    if buffer.stride < row_bytes || buffer.samples.len() < buffer.stride * height {
        return Err(EngineFault::generic(format!(
            "pixel buffer too small for {width}x{height} (stride {})",
            buffer.stride
        )));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height);
    for row in buffer.samples.chunks(buffer.stride).take(height) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }

    RgbaImage::from_raw(buffer.width, buffer.height, pixels)
        .ok_or_else(|| EngineFault::generic("pixel buffer length mismatch"))
}

/// Scale keeping the aspect ratio so the result is `target_height` tall
pub fn scale_to_height(bitmap: &Bitmap, target_height: u32) -> Bitmap {
    if bitmap.height() == target_height || bitmap.height() == 0 {
        return bitmap.clone();
    }
    let ratio = target_height as f32 / bitmap.height() as f32;
    let width = ((bitmap.width() as f32 * ratio).round() as u32).max(1);
    imageops::resize(bitmap, width, target_height, FilterType::CatmullRom)
}

/// Place two pages side by side, both scaled to the taller one's height,
/// on a transparent canvas.
pub fn compose_spread(left: &Bitmap, right: &Bitmap) -> Bitmap {
    let target_height = left.height().max(right.height());
    let left = scale_to_height(left, target_height);
    let right = scale_to_height(right, target_height);

    let mut spread = RgbaImage::from_pixel(
        left.width() + right.width(),
        target_height,
        Rgba([0, 0, 0, 0]),
    );
    imageops::replace(&mut spread, &left, 0, 0);
    imageops::replace(&mut spread, &right, i64::from(left.width()), 0);
    spread
}

/// Stack frames top to bottom, horizontally centred, separated by `gap` rows
pub fn stack_vertically(frames: &[Bitmap], gap: u32) -> Bitmap {
    let width = frames.iter().map(|f| f.width()).max().unwrap_or(0);
    let height = frames.iter().map(|f| f.height()).sum::<u32>()
        + gap * (frames.len().saturating_sub(1) as u32);

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    let mut y = 0u32;
    for frame in frames {
        let x = (width - frame.width()) / 2;
        imageops::replace(&mut canvas, frame, i64::from(x), i64::from(y));
        y += frame.height() + gap;
    }
    canvas
}
