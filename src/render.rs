//! Page renderer – emits printpdf ops (v0.8 ops-based API) for page chrome,
//! question images, placeholders, and watermarks.
//!
//! All helpers take top-left-origin coordinates in points and flip to PDF's
//! bottom-left origin internally. Text uses the builtin Helvetica variants
//! with WinAnsi encoding; characters outside that encoding are
//! transliterated to close ASCII equivalents so exam metadata in extended
//! Latin alphabets prints instead of degrading to `?`.

use printpdf::*;

use crate::assets::ImageHandle;
use crate::content_area::ContentArea;
use crate::layout::QuestionLayout;
use crate::model::{ThemedMetadata, WatermarkKind, WatermarkPosition, WatermarkSpec};
use crate::theme::ThemeConfig;
use crate::units;

/// The renderer's view of one page.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// 1-based page number.
    pub number: usize,
    /// Total page count of the document (answer-key page included).
    pub count: usize,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
}

impl PageContext {
    pub fn is_first(&self) -> bool {
        self.number == 1
    }
}

// ---------------------------------------------------------------------------
// Text encoding
// ---------------------------------------------------------------------------

/// Map characters without a WinAnsi codepoint to a close Latin-1/ASCII
/// equivalent. Covers the Turkish letters common in the upstream metadata
/// plus a few typographic marks.
fn fold_unsupported(c: char) -> Option<char> {
    Some(match c {
        'ğ' => 'g',
        'Ğ' => 'G',
        'ş' => 's',
        'Ş' => 'S',
        'ı' => 'i',
        'İ' => 'I',
        '\u{2212}' => '-', // minus sign
        _ => return None,
    })
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
pub(crate) fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| fold_unsupported(c).unwrap_or(c))
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for the 0x80-0x9F range; printpdf
    // passes these bytes straight to the PDF stream, decoded by
    // WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

/// Transliterate a string to plain ASCII for the PDF info dictionary, whose
/// basic text encoding does not carry extended source alphabets reliably.
pub fn transliterate(s: &str) -> String {
    s.chars()
        .map(|c| fold_unsupported(c).unwrap_or(c))
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
            'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            '\u{2013}' | '\u{2014}' => '-',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

/// Approximate width of a builtin-font string. Average char width ≈ 0.5 ×
/// font size for proportional faces, bold ~10 % wider.
pub(crate) fn text_width(text: &str, font_size: f32, bold: bool) -> f32 {
    let avg = if bold { 0.55 } else { 0.5 };
    text.chars().count() as f32 * font_size * avg
}

// ---------------------------------------------------------------------------
// Low-level op helpers
// ---------------------------------------------------------------------------

fn rgb(color: [f32; 3]) -> Color {
    Color::Rgb(Rgb {
        r: color[0],
        g: color[1],
        b: color[2],
        icc_profile: None,
    })
}

/// Draw a single text run. `y_top` is the top of the line measured from the
/// page top; the baseline sits at ≈ 0.75 × font size below it.
pub(crate) fn text(
    ops: &mut Vec<Op>,
    s: &str,
    font: BuiltinFont,
    size: f32,
    color: [f32; 3],
    x: f32,
    y_top: f32,
    page_height: f32,
) {
    if s.is_empty() {
        return;
    }
    let baseline_y = page_height - y_top - size * 0.75;
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(x),
            y: Pt(baseline_y),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(s))],
        font,
    });
    ops.push(Op::EndTextSection);
}

fn rect_points(x: f32, y_top: f32, w: f32, h: f32, page_height: f32) -> [Point; 4] {
    let y2 = page_height - y_top;
    let y1 = y2 - h;
    [
        Point { x: Pt(x), y: Pt(y1) },
        Point {
            x: Pt(x + w),
            y: Pt(y1),
        },
        Point {
            x: Pt(x + w),
            y: Pt(y2),
        },
        Point { x: Pt(x), y: Pt(y2) },
    ]
}

/// Fill an axis-aligned rectangle given by its top-left corner.
pub(crate) fn fill_rect(
    ops: &mut Vec<Op>,
    x: f32,
    y_top: f32,
    w: f32,
    h: f32,
    color: [f32; 3],
    page_height: f32,
) {
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: rect_points(x, y_top, w, h, page_height)
                    .into_iter()
                    .map(|p| LinePoint {
                        p,
                        bezier: false,
                    })
                    .collect(),
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

/// Stroke an axis-aligned rectangle given by its top-left corner.
pub(crate) fn stroke_rect(
    ops: &mut Vec<Op>,
    x: f32,
    y_top: f32,
    w: f32,
    h: f32,
    color: [f32; 3],
    thickness: f32,
    page_height: f32,
) {
    ops.push(Op::SetOutlineColor { col: rgb(color) });
    ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
    ops.push(Op::DrawLine {
        line: Line {
            points: rect_points(x, y_top, w, h, page_height)
                .into_iter()
                .map(|p| LinePoint {
                    p,
                    bezier: false,
                })
                .collect(),
            is_closed: true,
        },
    });
}

/// Stroke a straight segment between two top-left-origin points.
pub(crate) fn line(
    ops: &mut Vec<Op>,
    x1: f32,
    y1_top: f32,
    x2: f32,
    y2_top: f32,
    color: [f32; 3],
    thickness: f32,
    page_height: f32,
) {
    ops.push(Op::SetOutlineColor { col: rgb(color) });
    ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![
                LinePoint {
                    p: Point {
                        x: Pt(x1),
                        y: Pt(page_height - y1_top),
                    },
                    bezier: false,
                },
                LinePoint {
                    p: Point {
                        x: Pt(x2),
                        y: Pt(page_height - y2_top),
                    },
                    bezier: false,
                },
            ],
            is_closed: false,
        },
    });
}

// ---------------------------------------------------------------------------
// Page chrome
// ---------------------------------------------------------------------------

/// Stretch the background asset across the whole page, behind everything
/// drawn later.
pub(crate) fn background(ops: &mut Vec<Op>, handle: &ImageHandle, page: &PageContext) {
    let scale_x = if handle.px_width > 0 {
        page.width / handle.px_width as f32
    } else {
        1.0
    };
    let scale_y = if handle.px_height > 0 {
        page.height / handle.px_height as f32
    } else {
        1.0
    };
    ops.push(Op::UseXobject {
        id: handle.xobj.clone(),
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            dpi: Some(72.0),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            rotate: None,
        },
    });
}

/// Default first-page header: a minimal single-line metadata strip with a
/// rule under the header reserve.
pub fn default_header(config: &ThemeConfig, page: &PageContext, meta: &ThemedMetadata) -> Vec<Op> {
    let mut ops = Vec::new();
    let left = units::content_left_pt();
    let right = left + units::content_width_pt();
    let palette = &config.palette;

    text(
        &mut ops,
        &meta.base.test_name,
        BuiltinFont::HelveticaBold,
        11.0,
        palette.primary,
        left,
        6.0,
        page.height,
    );

    let mut detail: Vec<&str> = Vec::new();
    for part in [
        meta.base.course_name.as_str(),
        meta.base.class_name.as_str(),
        meta.base.teacher_name.as_str(),
    ] {
        if !part.is_empty() {
            detail.push(part);
        }
    }
    let detail = detail.join("  /  ");
    let detail_w = text_width(&detail, 8.0, false);
    text(
        &mut ops,
        &detail,
        BuiltinFont::Helvetica,
        8.0,
        palette.muted,
        right - detail_w,
        8.0,
        page.height,
    );

    let rule_y = units::content_top_pt() - 3.0;
    line(&mut ops, left, rule_y, right, rule_y, palette.accent, 0.8, page.height);
    ops
}

/// Small continuation strip for pages after the first.
pub fn continuation_header(
    config: &ThemeConfig,
    page: &PageContext,
    meta: &ThemedMetadata,
) -> Vec<Op> {
    let mut ops = Vec::new();
    let left = units::content_left_pt();
    let right = left + units::content_width_pt();
    text(
        &mut ops,
        &format!("{} (continued)", meta.base.test_name),
        BuiltinFont::HelveticaOblique,
        8.0,
        config.palette.muted,
        left,
        8.0,
        page.height,
    );
    let rule_y = units::content_top_pt() - 3.0;
    line(
        &mut ops,
        left,
        rule_y,
        right,
        rule_y,
        config.palette.muted,
        0.5,
        page.height,
    );
    ops
}

/// Filled-band header used by themes that override the default: title on a
/// primary-colored band, visible metadata fields right-aligned beneath it.
pub fn banded_header(config: &ThemeConfig, page: &PageContext, meta: &ThemedMetadata) -> Vec<Op> {
    let mut ops = Vec::new();
    let band_h = units::content_top_pt() - 6.0;
    let left = units::content_left_pt();
    let right = left + units::content_width_pt();
    let palette = &config.palette;

    fill_rect(&mut ops, 0.0, 0.0, page.width, band_h, palette.primary, page.height);
    text(
        &mut ops,
        &meta.base.test_name,
        BuiltinFont::HelveticaBold,
        12.0,
        [1.0, 1.0, 1.0],
        left + 4.0,
        (band_h - 12.0) / 2.0,
        page.height,
    );

    let mut fields: Vec<String> = Vec::new();
    if let Some(school) = &meta.school_name {
        fields.push(school.clone());
    }
    if let Some(student) = &meta.student_name {
        fields.push(student.clone());
    }
    if let Some(code) = &meta.exam_code {
        fields.push(format!("Code {code}"));
    }
    if let Some(booklet) = &meta.booklet_number {
        fields.push(format!("Booklet {booklet}"));
    }
    let fields = fields.join("   ");
    let fields_w = text_width(&fields, 8.0, false);
    text(
        &mut ops,
        &fields,
        BuiltinFont::Helvetica,
        8.0,
        [1.0, 1.0, 1.0],
        right - fields_w - 4.0,
        (band_h - 8.0) / 2.0 + 2.0,
        page.height,
    );

    line(
        &mut ops,
        0.0,
        band_h + 1.5,
        page.width,
        band_h + 1.5,
        palette.accent,
        1.5,
        page.height,
    );
    ops
}

/// Default footer: right-aligned `page / count`.
pub fn default_footer(config: &ThemeConfig, page: &PageContext) -> Vec<Op> {
    let mut ops = Vec::new();
    let label = format!("{} / {}", page.number, page.count);
    let label_w = text_width(&label, 9.0, false);
    let right = units::content_left_pt() + units::content_width_pt();
    let y_top = page.height - units::mm_to_pt(units::FOOTER_RESERVE_MM) + 4.0;
    text(
        &mut ops,
        &label,
        BuiltinFont::Helvetica,
        9.0,
        config.palette.muted,
        right - label_w,
        y_top,
        page.height,
    );
    ops
}

/// Vertical rule centered in each inter-column gutter.
pub fn column_divider(columns: u8, page: &PageContext, color: [f32; 3]) -> Vec<Op> {
    let mut ops = Vec::new();
    if columns < 2 {
        return ops;
    }
    let area = ContentArea::open(units::content_top_pt(), columns);
    for gutter in 1..columns {
        let x = area.origin_x
            + gutter as f32 * area.column_width
            + (gutter as f32 - 0.5) * area.column_gap;
        line(
            &mut ops,
            x,
            area.origin_y,
            x,
            area.origin_y + area.height,
            color,
            0.5,
            page.height,
        );
    }
    ops
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// Printed question number, top-left of the placement.
pub(crate) fn question_number(
    ops: &mut Vec<Op>,
    number: u32,
    layout: &QuestionLayout,
    color: [f32; 3],
    page: &PageContext,
) {
    text(
        ops,
        &format!("{number}."),
        BuiltinFont::HelveticaBold,
        10.0,
        color,
        layout.x,
        layout.y,
        page.height,
    );
}

/// The question raster at its natural converted size. At dpi=72 printpdf
/// renders 1 px = 1 pt, so scale = desired_pt / px_dim.
pub(crate) fn question_image(
    ops: &mut Vec<Op>,
    layout: &QuestionLayout,
    handle: &ImageHandle,
    page: &PageContext,
) {
    let image_top = layout.y + units::NUMBER_RESERVE_PT;
    let image_bottom_y = page.height - image_top - layout.height;
    let scale_x = if handle.px_width > 0 {
        layout.width / handle.px_width as f32
    } else {
        1.0
    };
    let scale_y = if handle.px_height > 0 {
        layout.height / handle.px_height as f32
    } else {
        1.0
    };
    ops.push(Op::UseXobject {
        id: handle.xobj.clone(),
        transform: XObjectTransform {
            translate_x: Some(Pt(layout.x)),
            translate_y: Some(Pt(image_bottom_y)),
            dpi: Some(72.0),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            rotate: None,
        },
    });
}

/// Bordered fallback box drawn when a question image cannot be embedded or
/// cannot fit any column at natural size.
pub(crate) fn placeholder(
    ops: &mut Vec<Op>,
    layout: &QuestionLayout,
    message: &str,
    color: [f32; 3],
    page: &PageContext,
) {
    let image_top = layout.y + units::NUMBER_RESERVE_PT;
    stroke_rect(
        ops,
        layout.x,
        image_top,
        layout.width,
        layout.height,
        color,
        0.8,
        page.height,
    );
    let msg_w = text_width(message, 9.0, false);
    text(
        ops,
        message,
        BuiltinFont::HelveticaOblique,
        9.0,
        color,
        layout.x + (layout.width - msg_w) / 2.0,
        image_top + (layout.height - 9.0) / 2.0,
        page.height,
    );
}

/// Thin outline around the whole placement (number reserve included), used
/// by themes with an outlined box style.
pub fn question_outline(layout: &QuestionLayout, color: [f32; 3], page: &PageContext) -> Vec<Op> {
    let mut ops = Vec::new();
    let pad = 3.0;
    stroke_rect(
        &mut ops,
        layout.x - pad,
        layout.y - pad,
        layout.width + 2.0 * pad,
        layout.consumed_height() + 2.0 * pad,
        color,
        0.6,
        page.height,
    );
    ops
}

// ---------------------------------------------------------------------------
// Watermark
// ---------------------------------------------------------------------------

/// Simulate watermark transparency over paper by blending the fill color
/// toward white: `c' = 1 − a·(1 − c)`.
pub(crate) fn blend_toward_white(color: [f32; 3], alpha: f32) -> [f32; 3] {
    [
        1.0 - alpha * (1.0 - color[0]),
        1.0 - alpha * (1.0 - color[1]),
        1.0 - alpha * (1.0 - color[2]),
    ]
}

fn anchor(position: WatermarkPosition, w: f32, h: f32, page: &PageContext) -> (f32, f32) {
    let inset = 40.0;
    match position {
        WatermarkPosition::Center => ((page.width - w) / 2.0, (page.height - h) / 2.0),
        WatermarkPosition::TopLeft => (inset, inset),
        WatermarkPosition::TopRight => (page.width - w - inset, inset),
        WatermarkPosition::BottomLeft => (inset, page.height - h - inset),
        WatermarkPosition::BottomRight => (page.width - w - inset, page.height - h - inset),
    }
}

/// Generic watermark painter. Drawn after footers so it sits on top of the
/// page's z-order; the opacity clamp keeps underlying content legible.
pub fn watermark(page: &PageContext, spec: &WatermarkSpec, image: Option<&ImageHandle>) -> Vec<Op> {
    let mut ops = Vec::new();
    let alpha = spec.effective_opacity();

    match spec.kind {
        WatermarkKind::None => {}
        WatermarkKind::Text => {
            let content = match &spec.content {
                Some(c) if !c.is_empty() => c,
                _ => return ops,
            };
            let size = spec.size.max(6.0);
            let w = text_width(content, size, true);
            let (x, y_top) = anchor(spec.position, w, size, page);
            let color = blend_toward_white(spec.color.unwrap_or([0.2, 0.2, 0.2]), alpha);
            let baseline_y = page.height - y_top - size * 0.75;
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextMatrix {
                matrix: TextMatrix::TranslateRotate(
                    Pt(x),
                    Pt(baseline_y),
                    spec.rotation_degrees,
                ),
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(size),
                font: BuiltinFont::HelveticaBold,
            });
            ops.push(Op::SetFillColor { col: rgb(color) });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(to_winlatin(content))],
                font: BuiltinFont::HelveticaBold,
            });
            ops.push(Op::EndTextSection);
        }
        WatermarkKind::Image => {
            // The handle already carries the attenuated alpha channel.
            let Some(handle) = image else {
                return ops;
            };
            if handle.px_width == 0 || handle.px_height == 0 {
                return ops;
            }
            let w = spec.size.max(1.0);
            let h = w * handle.px_height as f32 / handle.px_width as f32;
            let (x, y_top) = anchor(spec.position, w, h, page);
            let scale = w / handle.px_width as f32;
            let rotate = if spec.rotation_degrees.abs() > f32::EPSILON {
                Some(XObjectRotation {
                    angle_ccw_degrees: spec.rotation_degrees,
                    rotation_center_x: Px((handle.px_width / 2) as usize),
                    rotation_center_y: Px((handle.px_height / 2) as usize),
                })
            } else {
                None
            };
            ops.push(Op::UseXobject {
                id: handle.xobj.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(x)),
                    translate_y: Some(Pt(page.height - y_top - h)),
                    dpi: Some(72.0),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    rotate,
                },
            });
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, ThemedMetadata, WatermarkSpec};
    use crate::theme::{ClassicTheme, ThemePlugin};

    fn page() -> PageContext {
        PageContext {
            number: 1,
            count: 3,
            width: units::PAGE_WIDTH_PT,
            height: units::PAGE_HEIGHT_PT,
        }
    }

    #[test]
    fn transliteration_is_ascii_safe() {
        let out = transliterate("Şeker Ağacı İlköğretim – Müdür Çelik");
        assert!(out.is_ascii());
        assert_eq!(out, "Seker Agaci Ilkogretim - Mudur Celik");
    }

    #[test]
    fn winlatin_folds_turkish_letters() {
        let s = to_winlatin("ığŞ");
        assert_eq!(s.as_bytes(), b"igS");
    }

    #[test]
    fn blend_is_identity_at_full_alpha() {
        let c = blend_toward_white([0.2, 0.4, 0.6], 1.0);
        assert!((c[0] - 0.2).abs() < 1e-6);
        let faint = blend_toward_white([0.0, 0.0, 0.0], 0.1);
        assert!(faint.iter().all(|&v| v > 0.85));
    }

    #[test]
    fn text_watermark_emits_ops() {
        let spec = WatermarkSpec::text("DRAFT");
        let ops = watermark(&page(), &spec, None);
        assert!(!ops.is_empty());
    }

    #[test]
    fn image_watermark_without_handle_is_silent() {
        let mut spec = WatermarkSpec::text("x");
        spec.kind = WatermarkKind::Image;
        let ops = watermark(&page(), &spec, None);
        assert!(ops.is_empty());
    }

    #[test]
    fn default_header_and_footer_emit_ops() {
        let theme = ClassicTheme::new();
        let meta = ThemedMetadata::augment(
            &Metadata {
                test_name: "Midterm".into(),
                course_name: "Algebra".into(),
                ..Default::default()
            },
            theme.config(),
            None,
        );
        assert!(!default_header(theme.config(), &page(), &meta).is_empty());
        assert!(!default_footer(theme.config(), &page()).is_empty());
    }
}
