//! Equirectangular map projection fitted to a viewport.
//!
//! Both directions are needed: `project` to paint geometry, `invert` to turn
//! pointer positions back into geographic coordinates for hit-testing.

use std::f64::consts::TAU;

use crate::geometry::{GeoBounds, LonLat};

/// Fixed post-fit upscale so the map fills the frame a little past its
/// padded extent.
const UPSCALE: f64 = 1.06;
/// Symmetric viewport padding: at least 12px, else 2.8% of the smaller
/// viewport dimension.
const PADDING_MIN_PX: f64 = 12.0;
const PADDING_FRACTION: f64 = 0.028;

/// Linear lon/lat ↔ x/y mapping: `x = tx + scale·λ`, `y = ty − scale·φ`
/// with λ, φ in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Equirectangular {
    /// Geographic degrees → screen logical pixels.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            self.tx + lon.to_radians() * self.scale,
            self.ty - lat.to_radians() * self.scale,
        )
    }

    /// Screen logical pixels → geographic degrees.
    pub fn invert(&self, x: f64, y: f64) -> LonLat {
        (
            ((x - self.tx) / self.scale).to_degrees(),
            ((self.ty - y) / self.scale).to_degrees(),
        )
    }

    /// Fit the geographic bounds into the viewport with symmetric padding,
    /// centered, then upscaled by the fixed factor. `None` when the bounds
    /// or the viewport are degenerate — callers fall back to
    /// [`Equirectangular::fallback`].
    pub fn fit_extent(bounds: GeoBounds, width: f64, height: f64) -> Option<Self> {
        if !bounds.is_usable() || width <= 0.0 || height <= 0.0 {
            return None;
        }
        let padding = (width.min(height) * PADDING_FRACTION).max(PADDING_MIN_PX);
        let inner_w = width - 2.0 * padding;
        let inner_h = height - 2.0 * padding;
        if inner_w <= 0.0 || inner_h <= 0.0 {
            return None;
        }
        let span_lon = (bounds.max_lon - bounds.min_lon).to_radians();
        let span_lat = (bounds.max_lat - bounds.min_lat).to_radians();
        let scale = (inner_w / span_lon).min(inner_h / span_lat) * UPSCALE;
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }
        let (mid_lon, mid_lat) = bounds.mid();
        Some(Self {
            scale,
            tx: width / 2.0 - mid_lon.to_radians() * scale,
            ty: height / 2.0 + mid_lat.to_radians() * scale,
        })
    }

    /// Scale-by-width heuristic used when fitting fails: the full longitude
    /// range spans the viewport width, centered on (0°, 0°).
    pub fn fallback(width: f64, height: f64) -> Self {
        Self {
            scale: width / TAU * UPSCALE,
            tx: width / 2.0,
            ty: height / 2.0,
        }
    }
}
