//! Inverse-mapped affine warps with bilinear sampling.
//!
//! The matrix maps *destination* coordinates to *source* coordinates:
//!
//! ```text
//! src_x = a00 * x + a01 * y + a02
//! src_y = a10 * x + a11 * y + a12
//! ```
//!
//! Pixels sampled outside the source read as 0 (constant border).

/// A 2×3 affine matrix in row-major order.
pub type Affine2x3 = [[f64; 3]; 2];

/// Warp a row-major 8-bit grid onto a canvas of the same size.
///
/// Interpolated values are rounded half-to-even and saturated to `0..=255`.
///
/// # Panics
/// Panics if `src.len() != width * height`.
pub fn warp_affine_inverse(src: &[u8], width: usize, height: usize, m: &Affine2x3) -> Vec<u8> {
    assert_eq!(src.len(), width * height, "grid size mismatch");

    let sample = |x: i64, y: i64| -> f64 {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            0.0
        } else {
            src[y as usize * width + x as usize] as f64
        }
    };

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let (xf, yf) = (x as f64, y as f64);
            let sx = m[0][0] * xf + m[0][1] * yf + m[0][2];
            let sy = m[1][0] * xf + m[1][1] * yf + m[1][2];

            let x0 = sx.floor();
            let y0 = sy.floor();
            let fx = sx - x0;
            let fy = sy - y0;
            let (x0, y0) = (x0 as i64, y0 as i64);

            let top = sample(x0, y0) * (1.0 - fx) + sample(x0 + 1, y0) * fx;
            let bottom = sample(x0, y0 + 1) * (1.0 - fx) + sample(x0 + 1, y0 + 1) * fx;
            let v = top * (1.0 - fy) + bottom * fy;

            out.push(saturate_u8(v));
        }
    }
    out
}

/// Round half-to-even and clamp into the 8-bit range.
pub fn saturate_u8(v: f64) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    v.round_ties_even().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: Affine2x3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

    #[test]
    fn identity_warp_is_a_copy() {
        let src: Vec<u8> = (0..16).map(|v| (v * 10) as u8).collect();
        assert_eq!(warp_affine_inverse(&src, 4, 4, &IDENTITY), src);
    }

    #[test]
    fn integer_translation_moves_pixels_and_zero_fills() {
        let mut src = vec![0u8; 9];
        src[4] = 90; // center of 3x3
        // dst(x, y) = src(x - 1, y): content moves one column right.
        let m = [[1.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        let out = warp_affine_inverse(&src, 3, 3, &m);
        assert_eq!(out[5], 90);
        assert_eq!(out[4], 0);
    }

    #[test]
    fn half_pixel_shift_interpolates() {
        let src = vec![0, 100, 0, 0];
        let m = [[1.0, 0.0, 0.5], [0.0, 1.0, 0.0]];
        let out = warp_affine_inverse(&src, 2, 2, &m);
        assert_eq!(out[0], 50);
        assert_eq!(out[1], 50);
    }

    #[test]
    fn saturation_rounds_half_to_even() {
        assert_eq!(saturate_u8(2.5), 2);
        assert_eq!(saturate_u8(3.5), 4);
        assert_eq!(saturate_u8(-4.0), 0);
        assert_eq!(saturate_u8(300.0), 255);
    }
}
