//! Raster → canonical 28×28 digit normalization.
//!
//! Steps, in order:
//!
//! 1. decode and convert to 8-bit grayscale
//! 2. invert so ink is bright and background dark
//! 3. crop to the bounding box of non-zero pixels
//! 4. shrink (never enlarge) so the larger side fits in 20 px
//! 5. paste into a blank 28×28 canvas so the center of mass lands on (14, 14)
//!
//! Offsets use round-half-to-even so that a center of mass of exactly `x.5`
//! lands the same way every time.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};

use crate::domain::{NormalizedSample, SIDE};
use crate::error::AppError;
use crate::math::center_of_mass;

/// Largest side of the digit crop after scaling.
pub const FIT_BOX: u32 = 20;

/// Canvas coordinate the center of mass is moved to.
pub const CANVAS_CENTER: i64 = (SIDE / 2) as i64;

/// Decode encoded raster bytes (PNG, JPEG, BMP, GIF) and normalize them.
pub fn normalize_bytes(bytes: &[u8]) -> Result<NormalizedSample, AppError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| AppError::invalid_image(format!("Failed to decode image: {e}")))?;
    normalize_image(&img)
}

/// Normalize an already-decoded image of any color type.
pub fn normalize_image(img: &DynamicImage) -> Result<NormalizedSample, AppError> {
    normalize_gray(&img.to_luma8())
}

/// Normalize a grayscale image with dark ink on a light background.
pub fn normalize_gray(gray: &GrayImage) -> Result<NormalizedSample, AppError> {
    let mut inverted = gray.clone();
    imageops::invert(&mut inverted);

    let (x0, y0, w, h) = bounding_box(&inverted)
        .ok_or_else(|| AppError::invalid_image("Image has no content (empty bounding box)."))?;

    let crop = imageops::crop_imm(&inverted, x0, y0, w, h).to_image();
    let scaled = shrink_to_fit(crop, FIT_BOX);

    let (sw, sh) = (scaled.width() as usize, scaled.height() as usize);
    let (row, col) = center_of_mass(scaled.as_raw(), sw, sh)
        .ok_or_else(|| AppError::invalid_image("Digit vanished while scaling (zero mass)."))?;

    let off_y = CANVAS_CENTER - row.round_ties_even() as i64;
    let off_x = CANVAS_CENTER - col.round_ties_even() as i64;

    Ok(paste_centered(&scaled, off_x, off_y))
}

/// Tight bounding box of non-zero pixels as `(x, y, width, height)`.
pub fn bounding_box(img: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut any = false;

    for (x, y, px) in img.enumerate_pixels() {
        if px.0[0] == 0 {
            continue;
        }
        any = true;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    any.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Target size for shrinking `(w, h)` into a `limit × limit` box.
///
/// Returns `None` when the image already fits.
pub fn fit_size(w: u32, h: u32, limit: u32) -> Option<(u32, u32)> {
    if w <= limit && h <= limit {
        return None;
    }
    let scaled = |short: u32, long: u32| -> u32 {
        ((short as f64 * limit as f64 / long as f64).round() as u32).clamp(1, limit)
    };
    if w >= h {
        Some((limit, scaled(h, w)))
    } else {
        Some((scaled(w, h), limit))
    }
}

fn shrink_to_fit(crop: GrayImage, limit: u32) -> GrayImage {
    match fit_size(crop.width(), crop.height(), limit) {
        Some((nw, nh)) => imageops::resize(&crop, nw, nh, FilterType::CatmullRom),
        None => crop,
    }
}

fn paste_centered(digit: &GrayImage, off_x: i64, off_y: i64) -> NormalizedSample {
    let side = SIDE as i64;
    let mut canvas = vec![0u8; SIDE * SIDE];
    for (x, y, px) in digit.enumerate_pixels() {
        let cx = x as i64 + off_x;
        let cy = y as i64 + off_y;
        if (0..side).contains(&cx) && (0..side).contains(&cy) {
            canvas[cy as usize * SIDE + cx as usize] = px.0[0];
        }
    }
    NormalizedSample::from_canvas(canvas)
}
