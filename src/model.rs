//! Input records handed to the engine by the (external) UI layer.
//!
//! `Question` carries pre-rasterized, losslessly encoded image bytes with
//! their real pixel dimensions attached; the engine performs no validation
//! of upstream cropping correctness. All records are immutable once handed
//! over – augmentation (e.g. [`ThemedMetadata`]) always copies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::theme::ThemeConfig;

/// The correct answer choice of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
    E,
}

impl AnswerLetter {
    pub fn as_char(self) -> char {
        match self {
            AnswerLetter::A => 'A',
            AnswerLetter::B => 'B',
            AnswerLetter::C => 'C',
            AnswerLetter::D => 'D',
            AnswerLetter::E => 'E',
        }
    }
}

impl std::fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One cropped question region, ready to embed.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: String,
    /// Losslessly encoded raster (PNG in practice), embedded as-is.
    pub image_bytes: Vec<u8>,
    pub correct_answer: AnswerLetter,
    /// Zero-based print sequence; the printed number is `order + 1`.
    pub order: u32,
    pub source_document_id: Option<String>,
    /// Real pixel width of the crop at its 300-DPI rasterization.
    pub actual_width: u32,
    /// Real pixel height of the crop at its 300-DPI rasterization.
    pub actual_height: u32,
}

impl Question {
    /// 1-based printed question number.
    pub fn number(&self) -> u32 {
        self.order + 1
    }
}

/// Document-level metadata supplied by the caller. Read-only input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub test_name: String,
    pub course_name: String,
    pub class_name: String,
    pub teacher_name: String,
    /// Vertical spacing between questions, in points.
    pub question_spacing: u32,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

impl Metadata {
    /// Fatal-error gate: the engine refuses to build without the required
    /// structure. Everything else degrades gracefully downstream.
    pub fn validate(&self) -> Result<()> {
        if self.test_name.trim().is_empty() {
            return Err(Error::InvalidMetadata("test name is empty".into()));
        }
        Ok(())
    }

    /// Question spacing clamped to a sane printable range.
    pub fn spacing_pt(&self) -> f32 {
        (self.question_spacing as f32).clamp(0.0, 72.0)
    }
}

/// [`Metadata`] augmented with the theme-specific fields the selected theme
/// displays. The base record is copied, never mutated.
#[derive(Debug, Clone)]
pub struct ThemedMetadata {
    pub base: Metadata,
    pub school_name: Option<String>,
    pub student_name: Option<String>,
    pub exam_code: Option<String>,
    pub booklet_number: Option<String>,
}

impl ThemedMetadata {
    /// Pull theme fields out of the custom-field map according to the
    /// theme's field-visibility flags. Extra custom fields from the
    /// generation options are merged over the metadata's own map first.
    pub fn augment(
        metadata: &Metadata,
        config: &ThemeConfig,
        extra_fields: Option<&BTreeMap<String, String>>,
    ) -> Self {
        let mut base = metadata.clone();
        if let Some(extra) = extra_fields {
            for (k, v) in extra {
                base.custom_fields.insert(k.clone(), v.clone());
            }
        }
        let field = |name: &str, shown: bool| {
            if shown {
                base.custom_fields.get(name).cloned()
            } else {
                None
            }
        };
        Self {
            school_name: field("school_name", config.fields.school_name),
            student_name: field("student_name", config.fields.student_name),
            exam_code: field("exam_code", config.fields.exam_code),
            booklet_number: field("booklet_number", config.fields.booklet_number),
            base,
        }
    }
}

/// Caller-facing knobs for one build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub theme_id: String,
    #[serde(default)]
    pub watermark: Option<WatermarkSpec>,
    /// `None` defers to the theme default.
    #[serde(default)]
    pub include_answer_key: Option<bool>,
    #[serde(default)]
    pub custom_fields: Option<BTreeMap<String, String>>,
}

/// Lower bound of the rendered watermark opacity.
pub const WATERMARK_OPACITY_MIN: f32 = 0.05;
/// Upper bound of the rendered watermark opacity, guaranteeing underlying
/// content stays legible in print.
pub const WATERMARK_OPACITY_MAX: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkKind {
    None,
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkPosition {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// A low-opacity text or image overlay drawn on every page. Value type:
/// attenuation and clamping always produce copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkSpec {
    pub kind: WatermarkKind,
    /// Text content, or an image source (URL or base64 data URI).
    #[serde(default)]
    pub content: Option<String>,
    /// Configured opacity in `[0, 1]`; clamped at render time.
    pub opacity: f32,
    pub position: WatermarkPosition,
    /// Font size for text watermarks, display width in points for images.
    pub size: f32,
    pub rotation_degrees: f32,
    #[serde(default)]
    pub color: Option<[f32; 3]>,
}

impl WatermarkSpec {
    pub fn text(content: &str) -> Self {
        Self {
            kind: WatermarkKind::Text,
            content: Some(content.to_string()),
            opacity: 0.1,
            position: WatermarkPosition::Center,
            size: 48.0,
            rotation_degrees: 45.0,
            color: None,
        }
    }

    /// Opacity clamped into the printable range, whatever was configured.
    pub fn effective_opacity(&self) -> f32 {
        self.opacity.clamp(WATERMARK_OPACITY_MIN, WATERMARK_OPACITY_MAX)
    }

    /// A copy with opacity capped at `max` (still subject to the lower
    /// clamp at render time). The answer-key page caps at 0.1.
    pub fn attenuated(&self, max: f32) -> Self {
        Self {
            opacity: self.opacity.min(max),
            ..self.clone()
        }
    }
}
