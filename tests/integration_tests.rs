//! Integration tests for the booklet-forge pipeline.
//!
//! These tests validate:
//! - Placement plans honor the never-resize and monotonic-order invariants
//! - The answer key is produced in exactly one of its three forms
//! - Asset fetching is cached per build and degrades without aborting
//! - PDF output exists and has valid format

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use booklet_forge::assets::AssetFetcher;
use booklet_forge::pipeline::{build_booklet, plan_booklet};
use booklet_forge::plan::{AnswerKeyMode, BookletPlan};
use booklet_forge::samples;
use booklet_forge::theme::{ThemePlugin, ThemeRegistry};
use booklet_forge::units;
use booklet_forge::{
    AnswerLetter, Error, GenerationOptions, Metadata, Question, WatermarkKind, WatermarkSpec,
};

// =====================================================================
// Helpers
// =====================================================================

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Map-backed fetcher that counts every fetch call.
struct CountingFetcher {
    responses: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    fn empty() -> Self {
        Self {
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with(responses: HashMap<String, Vec<u8>>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for CountingFetcher {
    async fn fetch(&self, path: &str) -> booklet_forge::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| Error::AssetFetch {
                path: path.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn classic_config() -> booklet_forge::theme::ThemeConfig {
    ThemeRegistry::with_builtins().get("classic").config().clone()
}

fn all_placements(plan: &BookletPlan) -> Vec<booklet_forge::plan::Placement> {
    plan.question_pages
        .iter()
        .flat_map(|p| p.placements.iter().cloned())
        .collect()
}

// =====================================================================
// Plan invariants
// =====================================================================

#[test]
fn twenty_five_questions_two_columns() {
    let questions = samples::sample_questions(25);
    let metadata = samples::sample_metadata();
    let plan = plan_booklet(
        &questions,
        &metadata,
        &classic_config(),
        &samples::sample_options("classic"),
    );

    let placements = all_placements(&plan);
    assert_eq!(placements.len(), 25, "every question is placed exactly once");
    assert!(
        plan.question_pages.len() > 1,
        "25 questions should overflow a single two-column page"
    );
    assert_eq!(plan.answer_key, AnswerKeyMode::Page);

    // Printed numbers ascend 1..=25 across pages.
    let numbers: Vec<u32> = placements.iter().map(|p| p.number).collect();
    assert_eq!(numbers, (1..=25).collect::<Vec<u32>>());
}

#[test]
fn placements_never_resize() {
    let questions = samples::sample_questions(12);
    let metadata = samples::sample_metadata();
    let plan = plan_booklet(
        &questions,
        &metadata,
        &classic_config(),
        &samples::sample_options("classic"),
    );

    for placement in all_placements(&plan) {
        let q = &questions[placement.question_index];
        let expected_w = q.actual_width as f32 * units::PX_TO_PT;
        let expected_h = q.actual_height as f32 * units::PX_TO_PT;
        assert!(
            (placement.layout.width - expected_w).abs() < 0.01,
            "width {} != natural {}",
            placement.layout.width,
            expected_w
        );
        assert!((placement.layout.height - expected_h).abs() < 0.01);
        assert!((placement.layout.scale_factor - 1.0).abs() < f32::EPSILON);
    }
}

#[test]
fn modern_theme_boosts_every_placement() {
    let registry = ThemeRegistry::with_builtins();
    let config = registry.get("modern").config().clone();
    let questions = samples::sample_questions(6);
    let plan = plan_booklet(
        &questions,
        &samples::sample_metadata(),
        &config,
        &samples::sample_options("modern"),
    );

    for placement in all_placements(&plan) {
        let q = &questions[placement.question_index];
        let expected_w = q.actual_width as f32 * units::PX_TO_PT * 1.3;
        assert!((placement.layout.width - expected_w).abs() < 0.01);
    }
}

#[test]
fn oversized_question_terminates_and_degrades() {
    let registry = ThemeRegistry::with_builtins();
    let config = registry.get("compact").config().clone();
    let question = Question {
        id: "huge".into(),
        image_bytes: samples::sample_png(40, 30, 10),
        correct_answer: AnswerLetter::B,
        order: 0,
        source_document_id: None,
        // 4000x3000 px -> 960x720 pt, exceeding a full single column.
        actual_width: 4000,
        actual_height: 3000,
    };
    let plan = plan_booklet(
        &[question],
        &samples::sample_metadata(),
        &config,
        &samples::sample_options("compact"),
    );

    assert_eq!(plan.question_pages.len(), 1);
    let placements = all_placements(&plan);
    assert_eq!(placements.len(), 1);
    assert!(placements[0].oversized);
}

#[test]
fn plan_json_roundtrip() {
    let questions = samples::sample_questions(5);
    let plan = plan_booklet(
        &questions,
        &samples::sample_metadata(),
        &classic_config(),
        &samples::sample_options("classic"),
    );
    let parsed = BookletPlan::from_json(&plan.to_json()).unwrap();
    assert_eq!(parsed.question_pages.len(), plan.question_pages.len());
    assert_eq!(
        all_placements(&parsed).len(),
        all_placements(&plan).len()
    );
}

#[test]
fn identical_inputs_produce_identical_plans() {
    let questions = samples::sample_questions(15);
    let metadata = samples::sample_metadata();
    let options = samples::sample_options("classic");
    let a = plan_booklet(&questions, &metadata, &classic_config(), &options);
    let b = plan_booklet(&questions, &metadata, &classic_config(), &options);
    assert_eq!(a.to_json(), b.to_json());
}

// =====================================================================
// Answer-key exclusivity
// =====================================================================

#[test]
fn answer_key_modes_are_exclusive() {
    let registry = ThemeRegistry::with_builtins();
    let metadata = samples::sample_metadata();

    // (theme, explicit option, expected mode)
    let cases = [
        ("classic", None, AnswerKeyMode::Page),
        ("classic", Some(false), AnswerKeyMode::Off),
        ("compact", None, AnswerKeyMode::Keywords),
        ("compact", Some(true), AnswerKeyMode::Page),
        ("compact", Some(false), AnswerKeyMode::Keywords),
    ];
    for (theme_id, include, expected) in cases {
        let config = registry.get(theme_id).config().clone();
        let options = GenerationOptions {
            theme_id: theme_id.into(),
            include_answer_key: include,
            ..GenerationOptions::default()
        };
        let plan = plan_booklet(&[], &metadata, &config, &options);
        assert_eq!(
            plan.answer_key, expected,
            "theme={theme_id} include={include:?}"
        );
    }
}

#[test]
fn answer_key_grid_reads_in_ascending_order() {
    let questions = samples::sample_questions(25);
    let entries = booklet_forge::answer_key::entries(&questions);
    assert_eq!(entries.len(), 25);
    assert_eq!(entries[0], (1, AnswerLetter::A));
    for window in entries.windows(2) {
        assert!(window[0].0 < window[1].0);
    }
}

// =====================================================================
// Build: PDF generation
// =====================================================================

#[tokio::test]
async fn classic_build_produces_valid_pdf_without_fetching() {
    let registry = ThemeRegistry::with_builtins();
    let fetcher = CountingFetcher::empty();
    let bytes = build_booklet(
        &samples::sample_metadata(),
        &samples::sample_questions(10),
        &samples::sample_options("classic"),
        &registry,
        &fetcher,
    )
    .await
    .unwrap();

    assert_valid_pdf(&bytes);
    assert_eq!(fetcher.calls(), 0, "classic has no background asset");
}

#[tokio::test]
async fn background_failure_degrades_and_is_not_retried() {
    init_logging();
    let registry = ThemeRegistry::with_builtins();
    let fetcher = CountingFetcher::empty();
    let bytes = build_booklet(
        &samples::sample_metadata(),
        // Enough questions for several pages, so a retry-per-page bug would
        // multiply the fetch count.
        &samples::sample_questions(30),
        &samples::sample_options("modern"),
        &registry,
        &fetcher,
    )
    .await
    .unwrap();

    assert_valid_pdf(&bytes);
    let candidates = registry.get("modern").config().background_candidates().len();
    assert_eq!(
        fetcher.calls(),
        candidates,
        "every candidate tried once, none retried across pages"
    );
}

#[tokio::test]
async fn background_success_fetches_exactly_once() {
    let registry = ThemeRegistry::with_builtins();
    let config = registry.get("modern").config().clone();
    let path = config.background_path.clone().unwrap();
    let mut responses = HashMap::new();
    responses.insert(path, samples::sample_png(200, 280, 240));
    let fetcher = CountingFetcher::with(responses);

    let bytes = build_booklet(
        &samples::sample_metadata(),
        &samples::sample_questions(30),
        &samples::sample_options("modern"),
        &registry,
        &fetcher,
    )
    .await
    .unwrap();

    assert_valid_pdf(&bytes);
    assert_eq!(fetcher.calls(), 1, "later pages hit the cache");
}

#[tokio::test]
async fn fresh_build_fetches_again() {
    let registry = ThemeRegistry::with_builtins();
    let fetcher = CountingFetcher::empty();
    let metadata = samples::sample_metadata();
    let questions = samples::sample_questions(4);
    let options = samples::sample_options("modern");

    build_booklet(&metadata, &questions, &options, &registry, &fetcher)
        .await
        .unwrap();
    let after_first = fetcher.calls();
    build_booklet(&metadata, &questions, &options, &registry, &fetcher)
        .await
        .unwrap();

    assert_eq!(
        fetcher.calls(),
        after_first * 2,
        "the attempted set does not leak across builds"
    );
}

#[tokio::test]
async fn unknown_theme_falls_back_to_default() {
    let registry = ThemeRegistry::with_builtins();
    let fetcher = CountingFetcher::empty();
    let bytes = build_booklet(
        &samples::sample_metadata(),
        &samples::sample_questions(3),
        &samples::sample_options("no-such-theme"),
        &registry,
        &fetcher,
    )
    .await
    .unwrap();
    assert_valid_pdf(&bytes);
}

#[tokio::test]
async fn invalid_metadata_aborts_with_no_bytes() {
    let registry = ThemeRegistry::with_builtins();
    let fetcher = CountingFetcher::empty();
    let metadata = Metadata {
        test_name: "   ".into(),
        ..Metadata::default()
    };
    let result = build_booklet(
        &metadata,
        &samples::sample_questions(2),
        &samples::sample_options("classic"),
        &registry,
        &fetcher,
    )
    .await;
    assert!(matches!(result, Err(Error::InvalidMetadata(_))));
}

#[tokio::test]
async fn corrupt_question_image_becomes_placeholder_not_failure() {
    init_logging();
    let registry = ThemeRegistry::with_builtins();
    let fetcher = CountingFetcher::empty();
    let mut questions = samples::sample_questions(3);
    questions[1].image_bytes = b"not an image at all".to_vec();

    let bytes = build_booklet(
        &samples::sample_metadata(),
        &questions,
        &samples::sample_options("classic"),
        &registry,
        &fetcher,
    )
    .await
    .unwrap();
    assert_valid_pdf(&bytes);
}

// =====================================================================
// Watermarks
// =====================================================================

#[tokio::test]
async fn text_watermark_with_wild_opacity_builds() {
    let registry = ThemeRegistry::with_builtins();
    let fetcher = CountingFetcher::empty();
    let mut watermark = WatermarkSpec::text("DRAFT");
    watermark.opacity = 0.95;
    let options = GenerationOptions {
        theme_id: "classic".into(),
        watermark: Some(watermark),
        ..GenerationOptions::default()
    };

    let bytes = build_booklet(
        &samples::sample_metadata(),
        &samples::sample_questions(5),
        &options,
        &registry,
        &fetcher,
    )
    .await
    .unwrap();
    assert_valid_pdf(&bytes);
}

#[tokio::test]
async fn image_watermark_resolves_through_the_fetcher() {
    let registry = ThemeRegistry::with_builtins();
    let mut responses = HashMap::new();
    responses.insert("/assets/wm/logo.png".to_string(), samples::sample_png(64, 64, 80));
    let fetcher = CountingFetcher::with(responses);

    let options = GenerationOptions {
        theme_id: "classic".into(),
        watermark: Some(WatermarkSpec {
            kind: WatermarkKind::Image,
            content: Some("/assets/wm/logo.png".into()),
            ..WatermarkSpec::text("")
        }),
        ..GenerationOptions::default()
    };

    let bytes = build_booklet(
        &samples::sample_metadata(),
        &samples::sample_questions(4),
        &options,
        &registry,
        &fetcher,
    )
    .await
    .unwrap();
    assert_valid_pdf(&bytes);
    assert_eq!(fetcher.calls(), 1, "watermark bytes fetched once");
}

#[tokio::test]
async fn broken_image_watermark_is_skipped_silently() {
    let registry = ThemeRegistry::with_builtins();
    let fetcher = CountingFetcher::empty();
    let options = GenerationOptions {
        theme_id: "classic".into(),
        watermark: Some(WatermarkSpec {
            kind: WatermarkKind::Image,
            content: Some("/assets/wm/missing.png".into()),
            ..WatermarkSpec::text("")
        }),
        ..GenerationOptions::default()
    };

    let bytes = build_booklet(
        &samples::sample_metadata(),
        &samples::sample_questions(2),
        &options,
        &registry,
        &fetcher,
    )
    .await
    .unwrap();
    assert_valid_pdf(&bytes);
}

// =====================================================================
// Metadata sanitization
// =====================================================================

#[test]
fn metadata_strings_transliterate_to_ascii() {
    let sanitized = booklet_forge::render::transliterate("Öğretmen İpek Şahin");
    assert!(sanitized.is_ascii());
    assert_eq!(sanitized, "Ogretmen Ipek Sahin");
}

#[tokio::test]
async fn extended_latin_metadata_builds_cleanly() {
    let registry = ThemeRegistry::with_builtins();
    let fetcher = CountingFetcher::empty();
    let metadata = Metadata {
        test_name: "Dönem Sonu Sınavı".into(),
        course_name: "Türkçe".into(),
        class_name: "7-B".into(),
        teacher_name: "Gül Çetin".into(),
        question_spacing: 6,
        ..Metadata::default()
    };
    let bytes = build_booklet(
        &metadata,
        &samples::sample_questions(3),
        &samples::sample_options("modern"),
        &registry,
        &fetcher,
    )
    .await
    .unwrap();
    assert_valid_pdf(&bytes);
}
