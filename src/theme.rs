//! Theme plugins – named bundles of visual/layout policy.
//!
//! A [`ThemePlugin`] is a capability trait: every rendering hook has an
//! engine-supplied default, so a theme only overrides what it changes.
//! [`ThemeConfig`] is built fully populated at registration time – the hot
//! rendering path never checks whether a field is present. Unknown theme
//! identifiers fall back to the default theme rather than failing a build.

use std::collections::HashMap;
use std::sync::Arc;

use printpdf::Op;
use serde::{Deserialize, Serialize};

use crate::assets::ImageHandle;
use crate::layout::QuestionLayout;
use crate::model::{Metadata, ThemedMetadata, WatermarkSpec};
use crate::render::{self, PageContext};

/// RGB colors used by a theme's chrome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Palette {
    pub primary: [f32; 3],
    pub accent: [f32; 3],
    pub text: [f32; 3],
    pub muted: [f32; 3],
}

/// Decoration applied around each placed question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxStyle {
    /// Bare image and number only.
    Plain,
    /// Thin outline around the question region.
    Outlined,
}

/// Layout policy of a theme. The scale boost and the gutter offsets are
/// explicit configuration here – no ambient state influences layout math.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeLayout {
    /// Column count, `1..=2`.
    pub columns: u8,
    /// Default question spacing in points, used when the caller's metadata
    /// does not specify one.
    pub spacing: f32,
    pub box_style: BoxStyle,
    /// Per-theme legibility multiplier applied to every question image.
    pub image_scale_boost: f32,
    /// Inner pad between an image and the inter-column gutter.
    pub gutter_inner_pad: f32,
    /// Global horizontal shift applied to every placed image.
    pub image_x_offset: f32,
    /// Draw a vertical divider line in the gutter.
    pub divider: bool,
}

impl Default for ThemeLayout {
    fn default() -> Self {
        Self {
            columns: 2,
            spacing: 8.0,
            box_style: BoxStyle::Plain,
            image_scale_boost: 1.0,
            gutter_inner_pad: 6.0,
            image_x_offset: -4.0,
            divider: false,
        }
    }
}

/// Which augmented metadata fields the theme's chrome displays.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ThemeFields {
    pub school_name: bool,
    pub student_name: bool,
    pub exam_code: bool,
    pub booklet_number: bool,
}

/// Static, immutable per-theme configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub id: String,
    pub display_name: String,
    pub palette: Palette,
    pub layout: ThemeLayout,
    pub fields: ThemeFields,
    #[serde(default)]
    pub default_watermark: Option<WatermarkSpec>,
    /// Theme-specific background override, tried first.
    #[serde(default)]
    pub background_path: Option<String>,
    /// Theme-family defaults and the generic fallback, tried in order.
    #[serde(default)]
    pub background_fallbacks: Vec<String>,
    /// Answer-key default when the caller does not decide.
    pub include_answer_key: bool,
    /// Serialize the answer key as a hidden document keyword instead of a
    /// visible page when no page is requested.
    pub answer_key_in_metadata: bool,
}

impl ThemeConfig {
    /// Background candidates in fetch priority order.
    pub fn background_candidates(&self) -> Vec<&str> {
        self.background_path
            .iter()
            .map(String::as_str)
            .chain(self.background_fallbacks.iter().map(String::as_str))
            .collect()
    }

    /// Caller-specified spacing wins; zero defers to the theme default.
    pub fn effective_spacing(&self, metadata: &Metadata) -> f32 {
        if metadata.question_spacing > 0 {
            metadata.spacing_pt()
        } else {
            self.layout.spacing
        }
    }
}

/// A bundle of rendering strategies for one theme. Every hook has a default
/// the engine supplies; absent capabilities simply inherit it.
pub trait ThemePlugin: Send + Sync {
    fn config(&self) -> &ThemeConfig;

    /// First-page header. Default: minimal single-line metadata strip.
    fn render_header(&self, page: &PageContext, meta: &ThemedMetadata) -> Vec<Op> {
        render::default_header(self.config(), page, meta)
    }

    /// Per-page footer. Default: right-aligned page number.
    fn render_footer(&self, page: &PageContext, _meta: &ThemedMetadata) -> Vec<Op> {
        render::default_footer(self.config(), page)
    }

    /// Decoration behind/around one placed question. Default: none.
    fn render_question_box(&self, _layout: &QuestionLayout, _page: &PageContext) -> Vec<Op> {
        Vec::new()
    }

    /// Inter-column decoration. Default: none.
    fn render_column_divider(&self, _page: &PageContext) -> Vec<Op> {
        Vec::new()
    }

    /// Watermark painter. Default: the engine's generic clamped overlay.
    fn render_watermark(
        &self,
        page: &PageContext,
        spec: &WatermarkSpec,
        image: Option<&ImageHandle>,
    ) -> Vec<Op> {
        render::watermark(page, spec, image)
    }
}

// ---------------------------------------------------------------------------
// Built-in themes
// ---------------------------------------------------------------------------

/// Monochrome two-column default with a gutter divider line.
pub struct ClassicTheme {
    config: ThemeConfig,
}

impl ClassicTheme {
    pub fn new() -> Self {
        Self {
            config: ThemeConfig {
                id: "classic".into(),
                display_name: "Classic".into(),
                palette: Palette {
                    primary: [0.12, 0.12, 0.12],
                    accent: [0.30, 0.30, 0.30],
                    text: [0.0, 0.0, 0.0],
                    muted: [0.55, 0.55, 0.55],
                },
                layout: ThemeLayout {
                    divider: true,
                    ..ThemeLayout::default()
                },
                fields: ThemeFields {
                    school_name: true,
                    student_name: true,
                    exam_code: false,
                    booklet_number: false,
                },
                default_watermark: None,
                background_path: None,
                background_fallbacks: Vec::new(),
                include_answer_key: true,
                answer_key_in_metadata: false,
            },
        }
    }
}

impl Default for ClassicTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemePlugin for ClassicTheme {
    fn config(&self) -> &ThemeConfig {
        &self.config
    }

    fn render_column_divider(&self, page: &PageContext) -> Vec<Op> {
        if !self.config.layout.divider {
            return Vec::new();
        }
        render::column_divider(self.config.layout.columns, page, self.config.palette.muted)
    }
}

/// Colored two-column theme with a header band, outlined question boxes, a
/// 1.3× image boost for legibility, and a background asset.
pub struct ModernTheme {
    config: ThemeConfig,
}

impl ModernTheme {
    pub fn new() -> Self {
        Self {
            config: ThemeConfig {
                id: "modern".into(),
                display_name: "Modern".into(),
                palette: Palette {
                    primary: [0.11, 0.25, 0.47],
                    accent: [0.85, 0.56, 0.13],
                    text: [0.08, 0.08, 0.10],
                    muted: [0.45, 0.50, 0.58],
                },
                layout: ThemeLayout {
                    spacing: 10.0,
                    box_style: BoxStyle::Outlined,
                    image_scale_boost: 1.3,
                    ..ThemeLayout::default()
                },
                fields: ThemeFields {
                    school_name: true,
                    student_name: true,
                    exam_code: true,
                    booklet_number: true,
                },
                default_watermark: Some(WatermarkSpec::text("ORIGINAL")),
                background_path: Some("/assets/themes/modern/background.png".into()),
                background_fallbacks: vec![
                    "/assets/themes/modern-bg.png".into(),
                    "/assets/themes/default-bg.png".into(),
                ],
                include_answer_key: true,
                answer_key_in_metadata: false,
            },
        }
    }
}

impl Default for ModernTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemePlugin for ModernTheme {
    fn config(&self) -> &ThemeConfig {
        &self.config
    }

    fn render_header(&self, page: &PageContext, meta: &ThemedMetadata) -> Vec<Op> {
        render::banded_header(&self.config, page, meta)
    }

    fn render_question_box(&self, layout: &QuestionLayout, page: &PageContext) -> Vec<Op> {
        render::question_outline(layout, self.config.palette.muted, page)
    }
}

/// Single-column theme for short quizzes; the answer key travels as hidden
/// document keywords instead of a printed page.
pub struct CompactTheme {
    config: ThemeConfig,
}

impl CompactTheme {
    pub fn new() -> Self {
        Self {
            config: ThemeConfig {
                id: "compact".into(),
                display_name: "Compact".into(),
                palette: Palette {
                    primary: [0.15, 0.15, 0.15],
                    accent: [0.15, 0.35, 0.25],
                    text: [0.0, 0.0, 0.0],
                    muted: [0.60, 0.60, 0.60],
                },
                layout: ThemeLayout {
                    columns: 1,
                    spacing: 4.0,
                    gutter_inner_pad: 0.0,
                    image_x_offset: 0.0,
                    ..ThemeLayout::default()
                },
                fields: ThemeFields {
                    exam_code: true,
                    ..ThemeFields::default()
                },
                default_watermark: None,
                background_path: None,
                background_fallbacks: Vec::new(),
                include_answer_key: false,
                answer_key_in_metadata: true,
            },
        }
    }
}

impl Default for CompactTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemePlugin for CompactTheme {
    fn config(&self) -> &ThemeConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Identifier→plugin mapping populated at process start. The default theme
/// is always present, so lookups never fail a generation.
pub struct ThemeRegistry {
    plugins: HashMap<String, Arc<dyn ThemePlugin>>,
    default_id: String,
}

impl ThemeRegistry {
    /// A registry seeded with the built-in themes.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            plugins: HashMap::new(),
            default_id: "classic".into(),
        };
        registry.register(Arc::new(ClassicTheme::new()));
        registry.register(Arc::new(ModernTheme::new()));
        registry.register(Arc::new(CompactTheme::new()));
        registry
    }

    pub fn register(&mut self, plugin: Arc<dyn ThemePlugin>) {
        self.plugins.insert(plugin.config().id.clone(), plugin);
    }

    /// Look up a theme, falling back to the default for unknown ids.
    pub fn get(&self, theme_id: &str) -> Arc<dyn ThemePlugin> {
        match self.plugins.get(theme_id) {
            Some(plugin) => Arc::clone(plugin),
            None => {
                log::warn!("unknown theme '{theme_id}', falling back to default");
                self.get_default()
            }
        }
    }

    pub fn get_default(&self) -> Arc<dyn ThemePlugin> {
        Arc::clone(
            self.plugins
                .get(&self.default_id)
                .unwrap_or_else(|| panic!("default theme '{}' not registered", self.default_id)),
        )
    }

    pub fn theme_ids(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
