//! Page geometry and unit conversions.
//!
//! Everything downstream works in PDF points (1 pt = 1/72 inch) with the
//! origin at the *top-left* of the page; the renderer flips to PDF's
//! bottom-left origin at the last moment. Question images arrive with pixel
//! dimensions from a 300-DPI rasterization, so `72/300` is the only
//! supported pixel→point ratio – there is no dynamic DPI detection.

/// A4 page width in points (210 mm).
pub const PAGE_WIDTH_PT: f32 = 595.28;
/// A4 page height in points (297 mm).
pub const PAGE_HEIGHT_PT: f32 = 841.89;

/// Fixed pixel→point ratio for 300-DPI source rasters.
pub const PX_TO_PT: f32 = 72.0 / 300.0;

/// Left/right page margin (5 mm).
pub const MARGIN_X_MM: f32 = 5.0;
/// Top reserve for the header strip (10 mm).
pub const HEADER_RESERVE_MM: f32 = 10.0;
/// Bottom reserve for the footer strip.
pub const FOOTER_RESERVE_MM: f32 = 12.0;

/// Width of the inter-column divider region.
pub const COLUMN_GAP_PT: f32 = 10.0;

/// Vertical space reserved above each question image for its printed number.
pub const NUMBER_RESERVE_PT: f32 = 14.0;

/// Convert millimetres to points.
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Convert points to millimetres (printpdf pages are sized in `Mm`).
pub fn pt_to_mm(pt: f32) -> f32 {
    pt * 0.352_778
}

/// Convert source pixels to points at the fixed 300-DPI ratio.
pub fn px_to_pt(px: u32) -> f32 {
    px as f32 * PX_TO_PT
}

/// Top edge of the writable region, measured from the page top.
pub fn content_top_pt() -> f32 {
    mm_to_pt(HEADER_RESERVE_MM)
}

/// Height of the writable region between header and footer reserves.
pub fn content_height_pt() -> f32 {
    PAGE_HEIGHT_PT - mm_to_pt(HEADER_RESERVE_MM) - mm_to_pt(FOOTER_RESERVE_MM)
}

/// Width of the writable region between the side margins.
pub fn content_width_pt() -> f32 {
    PAGE_WIDTH_PT - 2.0 * mm_to_pt(MARGIN_X_MM)
}

/// Left edge of the writable region.
pub fn content_left_pt() -> f32 {
    mm_to_pt(MARGIN_X_MM)
}
