//! Answer-key generator – a dedicated grid page of number→letter pairs, or
//! the hidden document-keyword form when the theme routes the key into
//! metadata instead of print.

use printpdf::Op;

use crate::assets::ImageHandle;
use crate::model::{AnswerLetter, Question, ThemedMetadata, WatermarkSpec};
use crate::render::{self, PageContext};
use crate::theme::ThemeConfig;
use crate::units;

/// Cells per grid row.
const CELLS_PER_ROW: usize = 10;
const CELL_HEIGHT: f32 = 22.0;
const ROW_GAP: f32 = 8.0;
const CELL_GAP: f32 = 4.0;
/// Offset of the drop-shadow behind each cell.
const SHADOW_OFFSET: f32 = 1.5;

/// Maximum watermark opacity on the answer-key page.
const FAINT_WATERMARK_MAX: f32 = 0.10;

/// `(printed number, answer)` pairs in ascending print order.
pub fn entries(questions: &[Question]) -> Vec<(u32, AnswerLetter)> {
    let mut pairs: Vec<(u32, AnswerLetter)> = questions
        .iter()
        .map(|q| (q.number(), q.correct_answer))
        .collect();
    pairs.sort_by_key(|(number, _)| *number);
    pairs
}

/// The hidden-metadata form: `AnswerKey:1:A,2:C,...`.
pub fn keyword_string(questions: &[Question]) -> String {
    let body: Vec<String> = entries(questions)
        .into_iter()
        .map(|(number, letter)| format!("{number}:{letter}"))
        .collect();
    format!("AnswerKey:{}", body.join(","))
}

/// Render the visible answer-key page: centered title block, then a
/// left-to-right top-to-bottom grid of `{number}.{letter}` cells, with a
/// faint version of the document watermark on top.
pub fn page_ops(
    questions: &[Question],
    meta: &ThemedMetadata,
    config: &ThemeConfig,
    watermark: Option<&WatermarkSpec>,
    watermark_image: Option<&ImageHandle>,
    page: &PageContext,
) -> Vec<Op> {
    let mut ops = Vec::new();
    let palette = &config.palette;
    let left = units::content_left_pt();
    let usable = units::content_width_pt();

    // Title block.
    let title = &meta.base.test_name;
    let title_w = render::text_width(title, 16.0, true);
    render::text(
        &mut ops,
        title,
        printpdf::BuiltinFont::HelveticaBold,
        16.0,
        palette.primary,
        left + (usable - title_w) / 2.0,
        70.0,
        page.height,
    );
    let subtitle = "Answer Key";
    let subtitle_w = render::text_width(subtitle, 11.0, false);
    render::text(
        &mut ops,
        subtitle,
        printpdf::BuiltinFont::Helvetica,
        11.0,
        palette.muted,
        left + (usable - subtitle_w) / 2.0,
        92.0,
        page.height,
    );
    render::line(
        &mut ops,
        left + usable * 0.25,
        112.0,
        left + usable * 0.75,
        112.0,
        palette.accent,
        0.8,
        page.height,
    );

    // Grid.
    let cell_pitch = usable / CELLS_PER_ROW as f32;
    let cell_w = cell_pitch - CELL_GAP;
    let grid_top = 132.0;
    for (i, (number, letter)) in entries(questions).into_iter().enumerate() {
        let row = i / CELLS_PER_ROW;
        let col = i % CELLS_PER_ROW;
        let x = left + col as f32 * cell_pitch + CELL_GAP / 2.0;
        let y = grid_top + row as f32 * (CELL_HEIGHT + ROW_GAP);

        // Drop shadow behind, then the cell face with a thin border.
        render::fill_rect(
            &mut ops,
            x + SHADOW_OFFSET,
            y + SHADOW_OFFSET,
            cell_w,
            CELL_HEIGHT,
            [0.85, 0.85, 0.85],
            page.height,
        );
        render::fill_rect(&mut ops, x, y, cell_w, CELL_HEIGHT, [1.0, 1.0, 1.0], page.height);
        render::stroke_rect(&mut ops, x, y, cell_w, CELL_HEIGHT, palette.muted, 0.5, page.height);

        let label = format!("{number}.{letter}");
        let label_w = render::text_width(&label, 9.0, true);
        render::text(
            &mut ops,
            &label,
            printpdf::BuiltinFont::HelveticaBold,
            9.0,
            palette.text,
            x + (cell_w - label_w) / 2.0,
            y + (CELL_HEIGHT - 9.0) / 2.0,
            page.height,
        );
    }

    if let Some(spec) = watermark {
        let faint = spec.attenuated(FAINT_WATERMARK_MAX);
        ops.extend(render::watermark(page, &faint, watermark_image));
    }

    ops
}
