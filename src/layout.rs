//! Layout planner – original-size placement of question images.
//!
//! Questions are placed at their natural converted size (`px × 72/300`,
//! times the theme's scale boost) or not at all: an image that does not
//! wholly fit the current column is deferred, never shrunk. A `None` from
//! [`place`] is a routing signal for the caller (try the next column, then
//! a new page), not an error.

use serde::{Deserialize, Serialize};

use crate::content_area::ContentArea;
use crate::theme::ThemeLayout;
use crate::units;

/// Fixed height of the fallback box drawn for questions that cannot be
/// placed or embedded.
pub const PLACEHOLDER_HEIGHT_PT: f32 = 60.0;

/// The computed placement of exactly one question on one page. Transient:
/// consumed by the renderer and the plan IR, never cached between builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionLayout {
    /// Left edge of the image, page-absolute points.
    pub x: f32,
    /// Top edge of the placement (the number label line; the image starts
    /// `NUMBER_RESERVE_PT` below).
    pub y: f32,
    /// Rendered image width in points.
    pub width: f32,
    /// Rendered image height in points.
    pub height: f32,
    /// Column the placement landed in.
    pub column: u8,
    pub px_width: u32,
    pub px_height: u32,
    /// Always 1.0 – placements are never scaled to fit available space.
    pub scale_factor: f32,
}

impl QuestionLayout {
    /// Total vertical extent including the number reserve.
    pub fn consumed_height(&self) -> f32 {
        self.height + units::NUMBER_RESERVE_PT
    }
}

/// Natural rendered size of a `w×h`-pixel crop under `layout`'s boost.
pub fn natural_size_pt(px_width: u32, px_height: u32, layout: &ThemeLayout) -> (f32, f32) {
    (
        units::px_to_pt(px_width) * layout.image_scale_boost,
        units::px_to_pt(px_height) * layout.image_scale_boost,
    )
}

/// Attempt to place a question in the current column of `area`.
///
/// Returns `None` when the boosted natural size exceeds the column width or
/// the remaining column height (minus the number reserve and spacing pads).
pub fn place(
    px_width: u32,
    px_height: u32,
    area: &ContentArea,
    spacing: f32,
    layout: &ThemeLayout,
) -> Option<QuestionLayout> {
    let (w, h) = natural_size_pt(px_width, px_height, layout);
    place_rect(w, h, px_width, px_height, area, spacing, layout)
}

/// Place an arbitrary `w×h`-point box with the same routing rules as
/// [`place`]. Used for question images and their fallback placeholders.
pub fn place_rect(
    w: f32,
    h: f32,
    px_width: u32,
    px_height: u32,
    area: &ContentArea,
    spacing: f32,
    layout: &ThemeLayout,
) -> Option<QuestionLayout> {
    let max_w = area.column_width - 2.0 * spacing;
    let max_h = area.remaining_height - units::NUMBER_RESERVE_PT - 2.0 * spacing;
    if w > max_w || h > max_h {
        return None;
    }

    let x = anchor_x(w, area, layout);
    let y = area.origin_y + area.used_height();

    Some(QuestionLayout {
        x,
        y,
        width: w,
        height: h,
        column: area.current_column,
        px_width,
        px_height,
        scale_factor: 1.0,
    })
}

/// Fallback box for a question that cannot fit any column of any page: as
/// wide as the column allows, fixed height. Always fits a fresh column.
pub fn place_fallback(
    px_width: u32,
    px_height: u32,
    area: &ContentArea,
    spacing: f32,
    layout: &ThemeLayout,
) -> Option<QuestionLayout> {
    let w = (area.column_width - 2.0 * spacing).max(1.0);
    place_rect(
        w,
        PLACEHOLDER_HEIGHT_PT,
        px_width,
        px_height,
        area,
        spacing,
        layout,
    )
}

/// Whether the question's natural size fits an *empty* column on a fresh
/// page – the termination guard for the placement loop.
pub fn fits_fresh_column(px_width: u32, px_height: u32, spacing: f32, layout: &ThemeLayout) -> bool {
    let fresh = ContentArea::open(units::content_top_pt(), layout.columns);
    let (w, h) = natural_size_pt(px_width, px_height, layout);
    w <= fresh.column_width - 2.0 * spacing
        && h <= fresh.height - units::NUMBER_RESERVE_PT - 2.0 * spacing
}

/// Horizontal anchor implementing the gutter-hugging read order: in
/// multi-column layouts the left column right-justifies toward the gutter
/// (minus the theme's inner pad) and the right column left-justifies toward
/// it; single columns center. The theme's global x-offset shifts the result.
fn anchor_x(w: f32, area: &ContentArea, layout: &ThemeLayout) -> f32 {
    let x = if area.max_columns == 1 {
        area.column_left() + (area.column_width - w) / 2.0
    } else if area.current_column == 0 {
        area.column_right() - w - layout.gutter_inner_pad
    } else {
        area.column_left() + layout.gutter_inner_pad
    };
    x + layout.image_x_offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ThemeLayout;

    fn two_col() -> ThemeLayout {
        ThemeLayout {
            columns: 2,
            ..ThemeLayout::default()
        }
    }

    fn fresh(columns: u8) -> ContentArea {
        ContentArea::open(units::content_top_pt(), columns)
    }

    #[test]
    fn placed_size_is_natural_size() {
        let layout = two_col();
        let area = fresh(2);
        let placed = place(500, 400, &area, 5.0, &layout).expect("fits");
        assert!((placed.width - 500.0 * units::PX_TO_PT).abs() < 1e-4);
        assert!((placed.height - 400.0 * units::PX_TO_PT).abs() < 1e-4);
        assert!((placed.scale_factor - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn boost_multiplies_natural_size() {
        let layout = ThemeLayout {
            columns: 2,
            image_scale_boost: 1.3,
            ..ThemeLayout::default()
        };
        let area = fresh(2);
        let placed = place(500, 200, &area, 5.0, &layout).expect("fits");
        assert!((placed.width - 500.0 * units::PX_TO_PT * 1.3).abs() < 1e-3);
    }

    #[test]
    fn too_wide_is_deferred_not_shrunk() {
        let layout = two_col();
        let area = fresh(2);
        // 2000 px -> 480 pt, far wider than a half-page column.
        assert!(place(2000, 100, &area, 5.0, &layout).is_none());
    }

    #[test]
    fn too_tall_for_remaining_space_is_deferred() {
        let layout = two_col();
        let area = fresh(2);
        let spent = area.consume(area.height - 50.0, 0.0);
        assert!(place(300, 400, &spent, 5.0, &layout).is_none());
    }

    #[test]
    fn left_column_hugs_gutter_from_the_left() {
        let layout = two_col();
        let area = fresh(2);
        let placed = place(400, 300, &area, 5.0, &layout).expect("fits");
        let expected =
            area.column_right() - placed.width - layout.gutter_inner_pad + layout.image_x_offset;
        assert!((placed.x - expected).abs() < 1e-4);
    }

    #[test]
    fn right_column_hugs_gutter_from_the_right() {
        let layout = two_col();
        let right = fresh(2).advance_column().unwrap();
        let placed = place(400, 300, &right, 5.0, &layout).expect("fits");
        let expected = right.column_left() + layout.gutter_inner_pad + layout.image_x_offset;
        assert!((placed.x - expected).abs() < 1e-4);
    }

    #[test]
    fn single_column_centers() {
        let layout = ThemeLayout {
            columns: 1,
            image_x_offset: 0.0,
            ..ThemeLayout::default()
        };
        let area = fresh(1);
        let placed = place(600, 300, &area, 5.0, &layout).expect("fits");
        let expected = area.column_left() + (area.column_width - placed.width) / 2.0;
        assert!((placed.x - expected).abs() < 1e-4);
    }

    #[test]
    fn oversized_crop_fails_fresh_column_guard() {
        // 4000x3000 px -> 960x720 pt; taller than a full single column too.
        let layout = ThemeLayout {
            columns: 1,
            ..ThemeLayout::default()
        };
        assert!(!fits_fresh_column(4000, 3000, 5.0, &layout));
        let area = fresh(1);
        let fallback = place_fallback(4000, 3000, &area, 5.0, &layout).expect("placeholder fits");
        assert!((fallback.height - PLACEHOLDER_HEIGHT_PT).abs() < 1e-4);
    }
}
