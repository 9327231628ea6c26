//! Intensity moments of 8-bit grayscale grids.
//!
//! Conventions follow the usual image-moment notation:
//! - `x` is the column index, `y` the row index
//! - `m_pq = Σ x^p y^q I(x, y)` (raw moments)
//! - `mu_pq = Σ (x - x̄)^p (y - ȳ)^q I(x, y)` (central moments)

/// Raw mass plus the second-order central moments used for deskewing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
}

impl Moments {
    /// Centroid as `(x̄, ȳ)`, or `None` for an empty grid.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 > 0.0 {
            Some((self.m10 / self.m00, self.m01 / self.m00))
        } else {
            None
        }
    }
}

/// Compute moments of a row-major `width × height` grid.
///
/// # Panics
/// Panics if `values.len() != width * height`.
pub fn moments(values: &[u8], width: usize, height: usize) -> Moments {
    assert_eq!(values.len(), width * height, "grid size mismatch");

    let mut m00 = 0.0;
    let mut m10 = 0.0;
    let mut m01 = 0.0;
    for y in 0..height {
        for x in 0..width {
            let v = values[y * width + x] as f64;
            if v == 0.0 {
                continue;
            }
            m00 += v;
            m10 += x as f64 * v;
            m01 += y as f64 * v;
        }
    }

    if m00 == 0.0 {
        return Moments {
            m00,
            m10,
            m01,
            mu20: 0.0,
            mu11: 0.0,
            mu02: 0.0,
        };
    }

    // Second pass around the centroid avoids the cancellation of the
    // `m20 - x̄ m10` form on large grids.
    let xbar = m10 / m00;
    let ybar = m01 / m00;
    let mut mu20 = 0.0;
    let mut mu11 = 0.0;
    let mut mu02 = 0.0;
    for y in 0..height {
        let dy = y as f64 - ybar;
        for x in 0..width {
            let v = values[y * width + x] as f64;
            if v == 0.0 {
                continue;
            }
            let dx = x as f64 - xbar;
            mu20 += dx * dx * v;
            mu11 += dx * dy * v;
            mu02 += dy * dy * v;
        }
    }

    Moments {
        m00,
        m10,
        m01,
        mu20,
        mu11,
        mu02,
    }
}

/// Intensity-weighted center of mass as `(row, col)`.
///
/// Returns `None` when the grid carries no intensity at all.
pub fn center_of_mass(values: &[u8], width: usize, height: usize) -> Option<(f64, f64)> {
    moments(values, width, height)
        .centroid()
        .map(|(x, y)| (y, x))
}
