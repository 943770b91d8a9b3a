use crate::engine::{ContainerSize, PageSize};
use crate::state::FitMode;

/// Scale that fits a page into its container under `mode`.
///
/// `page` must already reflect the current rotation. Returns `None` for
/// [`FitMode::Custom`], where the caller uses its zoom level instead.
/// Degenerate page or container geometry falls back to `1.0`.
pub fn fit_scale(page: PageSize, container: ContainerSize, mode: FitMode) -> Option<f32> {
    let scale = match mode {
        FitMode::Custom => return None,
        FitMode::Actual => return Some(1.0),
        _ if !has_area(page.width, page.height) => return Some(1.0),
        FitMode::Width => container.width / page.width,
        FitMode::Page => (container.width / page.width).min(container.height / page.height),
    };

    if scale.is_finite() && scale > 0.0 {
        Some(scale)
    } else {
        Some(1.0)
    }
}

fn has_area(width: f32, height: f32) -> bool {
    width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0
}
