//! Viewport scaling
//!
//! Computes the raster scale for a page, either fitted into the container or
//! from an explicit zoom factor.

use super::types::{ContainerSize, PageSize};

/// Minimum manual zoom factor
pub const MIN_SCALE: f32 = 0.4;
/// Maximum manual zoom factor
pub const MAX_SCALE: f32 = 4.0;
/// Conventional zoom in/out step
pub const ZOOM_STEP: f32 = 0.15;
/// Conventional padding around a fitted page, in CSS pixels
pub const FIT_PADDING: f32 = 18.0;

/// Scale that fits `page` inside `available`, minus `padding` on every side.
///
/// Available dimensions are floored at 1 so an unlaid-out container still
/// yields a positive, finite scale.
#[must_use]
pub fn fit_scale(page: PageSize, available: ContainerSize, padding: f32) -> f32 {
    let avail_width = (available.width - 2.0 * padding).max(1.0);
    let avail_height = (available.height - 2.0 * padding).max(1.0);

    let scale = (avail_width / page.width).min(avail_height / page.height);
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Apply `delta` to `current` and clamp into `[MIN_SCALE, MAX_SCALE]`
#[must_use]
pub fn manual_scale(current: f32, delta: f32) -> f32 {
    clamp_scale(current + delta)
}

/// Clamp a zoom factor to the valid range, handling NaN/Inf
#[must_use]
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        1.0
    } else {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }
}
