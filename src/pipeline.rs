//! Document assembler – ties the allocator, planner, theme, asset cache,
//! renderer, and answer-key generator into a single build call.
//!
//! The build walks a fixed sequence of phases: open a page, place questions
//! (same column → next column → new page, retrying the same question),
//! then – once every question has a spot – draw footers, lay the watermark
//! on top, append the answer key, stamp sanitized metadata, and serialize.
//! Layout math is synchronous; the only awaits are asset fetches/decodes,
//! deliberately sequential because the in-progress `PdfDocument` is a
//! single unsynchronized resource.

use printpdf::{Mm, Op, PdfDocument, PdfPage, PdfSaveOptions};

use crate::answer_key;
use crate::assets::{self, AssetCache, AssetFetcher, ImageHandle};
use crate::content_area::ContentArea;
use crate::error::Result;
use crate::layout;
use crate::model::{GenerationOptions, Metadata, Question, ThemedMetadata, WatermarkKind, WatermarkSpec};
use crate::plan::{AnswerKeyMode, BookletPlan, PagePlan, Placement};
use crate::render::{self, PageContext};
use crate::theme::{ThemeConfig, ThemeRegistry};
use crate::units;

/// Compute the full placement plan for a question list under one theme.
///
/// Pure and synchronous – no assets are touched. The answer-key mode is
/// resolved here too: explicit option, else the theme default; a theme that
/// routes the key into metadata produces `Keywords` when no page was
/// requested.
pub fn plan_booklet(
    questions: &[Question],
    metadata: &Metadata,
    config: &ThemeConfig,
    options: &GenerationOptions,
) -> BookletPlan {
    let theme_layout = &config.layout;
    let spacing = config.effective_spacing(metadata);

    let mut order: Vec<usize> = (0..questions.len()).collect();
    order.sort_by_key(|&i| questions[i].order);

    let mut pages: Vec<PagePlan> = Vec::new();
    let mut placements: Vec<Placement> = Vec::new();
    let mut area = ContentArea::open(units::content_top_pt(), theme_layout.columns);

    for idx in order {
        let q = &questions[idx];
        let number = q.number();
        let oversized =
            !layout::fits_fresh_column(q.actual_width, q.actual_height, spacing, theme_layout);
        if oversized {
            log::warn!(
                "question {number} ({}x{} px) exceeds every column at natural size, \
                 placing a fallback box",
                q.actual_width,
                q.actual_height
            );
        }

        // Routing: current column, then the next column, then a new page.
        // The fresh-column guard above makes this loop terminate: whatever
        // survives it fits an empty column by construction.
        loop {
            let attempt = if oversized {
                layout::place_fallback(q.actual_width, q.actual_height, &area, spacing, theme_layout)
            } else {
                layout::place(q.actual_width, q.actual_height, &area, spacing, theme_layout)
            };
            if let Some(placed) = attempt {
                area = area.consume(placed.consumed_height(), spacing);
                placements.push(Placement {
                    question_index: idx,
                    number,
                    layout: placed,
                    oversized,
                });
                break;
            }
            if let Some(next) = area.advance_column() {
                area = next;
                continue;
            }
            pages.push(PagePlan {
                page_index: pages.len(),
                placements: std::mem::take(&mut placements),
            });
            area = ContentArea::open(units::content_top_pt(), theme_layout.columns);
        }
    }

    if !placements.is_empty() || pages.is_empty() {
        pages.push(PagePlan {
            page_index: pages.len(),
            placements,
        });
    }

    let include_key = options.include_answer_key.unwrap_or(config.include_answer_key);
    let answer_key = if include_key {
        AnswerKeyMode::Page
    } else if config.answer_key_in_metadata {
        AnswerKeyMode::Keywords
    } else {
        AnswerKeyMode::Off
    };

    BookletPlan {
        theme_id: config.id.clone(),
        page_width_pt: units::PAGE_WIDTH_PT,
        page_height_pt: units::PAGE_HEIGHT_PT,
        question_pages: pages,
        answer_key,
    }
}

/// Full pipeline: questions + metadata + options → PDF bytes.
///
/// Asset failures degrade (white background, placeholder boxes, skipped
/// watermark); only malformed metadata aborts. No partial buffer is ever
/// returned.
pub async fn build_booklet(
    metadata: &Metadata,
    questions: &[Question],
    options: &GenerationOptions,
    registry: &ThemeRegistry,
    fetcher: &dyn AssetFetcher,
) -> Result<Vec<u8>> {
    metadata.validate()?;

    let plugin = registry.get(&options.theme_id);
    let config = plugin.config();
    let themed = ThemedMetadata::augment(metadata, config, options.custom_fields.as_ref());
    let plan = plan_booklet(questions, metadata, config, options);
    let page_count = plan.total_pages();

    let title = render::transliterate(&metadata.test_name);
    let mut doc = PdfDocument::new(&title);

    // Cache scope = this build; dropping it at the end is the reset.
    let mut cache = AssetCache::new();

    // Watermark resolution: explicit option > theme default > none.
    let mut watermark_spec: Option<WatermarkSpec> = options
        .watermark
        .clone()
        .or_else(|| config.default_watermark.clone())
        .filter(|wm| wm.kind != WatermarkKind::None);

    // Image watermarks are embedded with their alpha channel attenuated;
    // the answer-key page gets its own fainter embed of the same bytes.
    let mut watermark_image: Option<ImageHandle> = None;
    let mut faint_watermark_image: Option<ImageHandle> = None;
    let image_spec = watermark_spec
        .clone()
        .filter(|wm| wm.kind == WatermarkKind::Image);
    if let Some(spec) = image_spec {
        match resolve_watermark_images(&spec, plan.answer_key, fetcher, &mut doc).await {
            Some((full, faint)) => {
                watermark_image = Some(full);
                faint_watermark_image = faint;
            }
            None => {
                // Decode/fetch failure skips the watermark silently.
                watermark_spec = None;
            }
        }
    }

    // Question pages: background, header, divider, questions.
    let mut page_ops: Vec<Vec<Op>> = Vec::with_capacity(page_count);
    let mut contexts: Vec<PageContext> = Vec::with_capacity(plan.question_pages.len());
    for page_plan in &plan.question_pages {
        let ctx = PageContext {
            number: page_plan.page_index + 1,
            count: page_count,
            width: plan.page_width_pt,
            height: plan.page_height_pt,
        };
        let mut ops: Vec<Op> = Vec::new();

        if let Some(bg) = cache.resolve(config, fetcher, &mut doc).await {
            render::background(&mut ops, &bg, &ctx);
        }

        if ctx.is_first() {
            ops.extend(plugin.render_header(&ctx, &themed));
        } else {
            ops.extend(render::continuation_header(config, &ctx, &themed));
        }
        ops.extend(plugin.render_column_divider(&ctx));

        for placement in &page_plan.placements {
            ops.extend(plugin.render_question_box(&placement.layout, &ctx));
            render::question_number(
                &mut ops,
                placement.number,
                &placement.layout,
                config.palette.text,
                &ctx,
            );
            if placement.oversized {
                render::placeholder(
                    &mut ops,
                    &placement.layout,
                    "image exceeds printable area",
                    config.palette.muted,
                    &ctx,
                );
                continue;
            }
            let question = &questions[placement.question_index];
            match assets::embed_image(&mut doc, &question.image_bytes) {
                Ok(handle) => render::question_image(&mut ops, &placement.layout, &handle, &ctx),
                Err(e) => {
                    log::warn!("question {} image unavailable: {e}", placement.number);
                    render::placeholder(
                        &mut ops,
                        &placement.layout,
                        "image unavailable",
                        config.palette.muted,
                        &ctx,
                    );
                }
            }
        }

        contexts.push(ctx);
        page_ops.push(ops);
    }

    // Footers for every question page, then the watermark above them.
    for (ops, ctx) in page_ops.iter_mut().zip(&contexts) {
        ops.extend(plugin.render_footer(ctx, &themed));
        if let Some(spec) = &watermark_spec {
            ops.extend(plugin.render_watermark(ctx, spec, watermark_image.as_ref()));
        }
    }

    // Answer key: a visible page, hidden keywords, or nothing.
    match plan.answer_key {
        AnswerKeyMode::Page => {
            let ctx = PageContext {
                number: page_count,
                count: page_count,
                width: plan.page_width_pt,
                height: plan.page_height_pt,
            };
            page_ops.push(answer_key::page_ops(
                questions,
                &themed,
                config,
                watermark_spec.as_ref(),
                faint_watermark_image.as_ref(),
                &ctx,
            ));
        }
        AnswerKeyMode::Keywords => {
            doc.metadata.info.keywords = vec![answer_key::keyword_string(questions)];
        }
        AnswerKeyMode::Off => {}
    }

    let page_w = Mm(units::pt_to_mm(plan.page_width_pt));
    let page_h = Mm(units::pt_to_mm(plan.page_height_pt));
    let pages: Vec<PdfPage> = page_ops
        .into_iter()
        .map(|ops| PdfPage::new(page_w, page_h, ops))
        .collect();
    doc.with_pages(pages);

    // Stamp sanitized document metadata.
    let subject: Vec<&str> = [metadata.course_name.as_str(), metadata.class_name.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    doc.metadata.info.document_title = title;
    doc.metadata.info.author = render::transliterate(&metadata.teacher_name);
    doc.metadata.info.subject = render::transliterate(&subject.join(" - "));
    doc.metadata.info.creator = "booklet-forge".to_string();
    doc.metadata.info.producer = format!("booklet-forge {}", env!("CARGO_PKG_VERSION"));

    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
    Ok(bytes)
}

/// Fetch the watermark image once and embed it at the clamped opacity, plus
/// a fainter variant for the answer-key page when one will be rendered.
/// `None` means the watermark should be skipped entirely.
async fn resolve_watermark_images(
    spec: &WatermarkSpec,
    answer_key: AnswerKeyMode,
    fetcher: &dyn AssetFetcher,
    doc: &mut PdfDocument,
) -> Option<(ImageHandle, Option<ImageHandle>)> {
    let source = spec.content.as_deref()?;
    let bytes = match fetcher.fetch(source).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::debug!("watermark image fetch failed: {e}");
            return None;
        }
    };
    let alpha = spec.effective_opacity();
    let full = match assets::embed_image_with_opacity(doc, &bytes, alpha) {
        Ok(handle) => handle,
        Err(e) => {
            log::debug!("watermark image embed failed: {e}");
            return None;
        }
    };
    let faint = if answer_key == AnswerKeyMode::Page {
        assets::embed_image_with_opacity(doc, &bytes, alpha.min(0.1)).ok()
    } else {
        None
    };
    Some((full, faint))
}
