//! ASCII rendering of a normalized sample for terminal output.
//!
//! This is intentionally "dumb" (fixed 28×28 grid, one character per pixel),
//! optimized for:
//! - quick visual sanity checks of the normalizer and deskew
//! - deterministic output (helpful for golden tests)

use crate::domain::{NormalizedSample, SIDE};

/// Intensity ramp from background to full ink.
const RAMP: &[u8] = b" .:-=+*#%@";

/// Render a sample as `SIDE` lines of `SIDE` characters, framed by a border.
pub fn render_sample(sample: &NormalizedSample) -> String {
    let mut out = String::with_capacity((SIDE + 3) * (SIDE + 2));
    let border = format!("+{}+\n", "-".repeat(SIDE));

    out.push_str(&border);
    for row in 0..SIDE {
        out.push('|');
        for col in 0..SIDE {
            out.push(shade(sample.get(row, col)));
        }
        out.push_str("|\n");
    }
    out.push_str(&border);
    out
}

fn shade(v: u8) -> char {
    let idx = (v as usize * (RAMP.len() - 1) + 127) / 255;
    RAMP[idx] as char
}
