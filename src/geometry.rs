//! Page geometry and the exact row heights derived from it.

use crate::error::{LayoutError, LoadError};
use crate::scrollbar::ScrollbarSize;

/// Width of the list container, scrollbar included, when none is given.
pub const DEFAULT_WIDTH: f64 = 500.0;
/// Thickness of the separator drawn under every page.
pub const DEFAULT_BORDER: u32 = 1;

/// Intrinsic size of a page at scale 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    width: f64,
    height: f64,
}

impl PageViewport {
    /// Validates a viewport reported for the one-based `page`.
    ///
    /// A page without a positive, finite size can never be laid out, so it is
    /// rejected here instead of producing a non-finite row height later.
    pub fn new(page: u32, width: f64, height: f64) -> Result<Self, LoadError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(LoadError::DegenerateGeometry {
                page,
                width,
                height,
            });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// Size of the list container and the decorations that eat into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    pub container_width: f64,
    pub container_height: f64,
    pub border: u32,
    pub scrollbar: ScrollbarSize,
}

impl DisplayGeometry {
    pub fn new(container_width: f64, container_height: f64, border: u32) -> Self {
        Self {
            container_width,
            container_height,
            border,
            scrollbar: ScrollbarSize::ZERO,
        }
    }

    pub fn with_scrollbar(mut self, scrollbar: ScrollbarSize) -> Self {
        self.scrollbar = scrollbar;
        self
    }

    /// Width available to page content once the vertical scrollbar is drawn.
    /// Never below one pixel.
    pub fn effective_width(&self) -> f64 {
        (self.container_width - self.scrollbar.vertical_width).max(1.0)
    }

    /// Row estimate used before any page has been measured.
    pub fn default_row_estimate(&self) -> u32 {
        to_pixels(self.container_width * 1.5)
    }

    pub fn page_height(&self, index: usize, viewports: &[PageViewport]) -> Result<u32, LayoutError> {
        page_height(index, viewports, self.effective_width(), self.border)
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_WIDTH * 1.5, DEFAULT_BORDER)
    }
}

/// Height in whole pixels of the row showing page `index` at `effective_width`.
///
/// The scaled page height is floored before the border is added so that every
/// row is an integer number of pixels and offsets never drift.
pub fn page_height(
    index: usize,
    viewports: &[PageViewport],
    effective_width: f64,
    border: u32,
) -> Result<u32, LayoutError> {
    if viewports.is_empty() {
        return Err(LayoutError::NotReady);
    }
    let viewport = viewports.get(index).ok_or(LayoutError::PageOutOfRange {
        index,
        len: viewports.len(),
    })?;
    if !effective_width.is_finite() || effective_width <= 0.0 {
        return Err(LayoutError::DegenerateWidth(effective_width));
    }
    let scale = effective_width / viewport.width;
    Ok(to_pixels(viewport.height * scale).saturating_add(border))
}

fn to_pixels(v: f64) -> u32 {
    // float to int casts saturate, NaN maps to 0
    v.floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewports(sizes: &[(f64, f64)]) -> Vec<PageViewport> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| PageViewport::new(i as u32 + 1, w, h).unwrap())
            .collect()
    }

    #[test]
    fn mixed_pages_at_narrow_width() {
        let pages = viewports(&[(200.0, 300.0), (200.0, 600.0), (400.0, 300.0)]);
        let heights: Vec<u32> = (0..pages.len())
            .map(|i| page_height(i, &pages, 100.0, 1).unwrap())
            .collect();
        assert_eq!(heights, [151, 301, 76]);
    }

    #[test]
    fn native_width_keeps_floored_height() {
        let pages = viewports(&[(612.0, 792.7)]);
        assert_eq!(page_height(0, &pages, 612.0, 1).unwrap(), 793);
        assert_eq!(page_height(0, &pages, 612.0, 0).unwrap(), 792);
    }

    #[test]
    fn deterministic() {
        let pages = viewports(&[(595.0, 842.0)]);
        let a = page_height(0, &pages, 483.0, 1).unwrap();
        let b = page_height(0, &pages, 483.0, 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn total_grows_with_width_for_same_aspect() {
        let pages = viewports(&[(100.0, 140.0), (200.0, 280.0), (50.0, 70.0)]);
        let total = |w: f64| -> u32 {
            (0..pages.len())
                .map(|i| page_height(i, &pages, w, 1).unwrap())
                .sum()
        };
        let mut last = 0;
        for w in [10.0, 100.0, 250.0, 485.0, 1000.0] {
            let t = total(w);
            assert!(t >= last, "{t} < {last} at width {w}");
            last = t;
        }
    }

    #[test]
    fn empty_list_is_premature() {
        assert_eq!(page_height(0, &[], 100.0, 1), Err(LayoutError::NotReady));
    }

    #[test]
    fn index_past_end() {
        let pages = viewports(&[(100.0, 100.0)]);
        assert_eq!(
            page_height(1, &pages, 100.0, 1),
            Err(LayoutError::PageOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn degenerate_width_rejected() {
        let pages = viewports(&[(100.0, 100.0)]);
        assert!(matches!(
            page_height(0, &pages, 0.0, 1),
            Err(LayoutError::DegenerateWidth(_))
        ));
        assert!(matches!(
            page_height(0, &pages, f64::NAN, 1),
            Err(LayoutError::DegenerateWidth(_))
        ));
    }

    #[test]
    fn zero_width_page_rejected_at_ingestion() {
        assert!(matches!(
            PageViewport::new(3, 0.0, 100.0),
            Err(LoadError::DegenerateGeometry { page: 3, .. })
        ));
        assert!(PageViewport::new(1, 10.0, f64::INFINITY).is_err());
    }

    #[test]
    fn scrollbar_reduces_effective_width() {
        let geometry = DisplayGeometry::new(500.0, 750.0, 1).with_scrollbar(ScrollbarSize {
            vertical_width: 15.0,
            horizontal_height: 15.0,
        });
        assert_eq!(geometry.effective_width(), 485.0);
    }

    #[test]
    fn effective_width_clamped() {
        let geometry = DisplayGeometry::new(10.0, 10.0, 1).with_scrollbar(ScrollbarSize {
            vertical_width: 17.0,
            horizontal_height: 17.0,
        });
        assert_eq!(geometry.effective_width(), 1.0);
    }

    #[test]
    fn default_estimate_is_one_and_a_half_widths() {
        assert_eq!(DisplayGeometry::default().default_row_estimate(), 750);
    }
}
