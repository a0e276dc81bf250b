//! Booklet plan – the intermediate representation between layout planning
//! and PDF rendering. This is the "frozen" structure that encodes exactly
//! which question lands where on which page, inspectable as JSON without
//! rendering a single byte of PDF.

use serde::{Deserialize, Serialize};

use crate::layout::QuestionLayout;

/// A complete booklet layout ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookletPlan {
    /// Theme the plan was computed under (its boost and gutter offsets are
    /// baked into the placements).
    pub theme_id: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    /// Height of each page in PDF points.
    pub page_height_pt: f32,
    /// Ordered list of question pages.
    pub question_pages: Vec<PagePlan>,
    /// How the answer key leaves the build.
    pub answer_key: AnswerKeyMode,
}

/// One page of placed questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagePlan {
    pub page_index: usize,
    pub placements: Vec<Placement>,
}

/// One question's spot on one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    /// Index into the caller's question list.
    pub question_index: usize,
    /// 1-based printed number (`order + 1`).
    pub number: u32,
    pub layout: QuestionLayout,
    /// The question's natural size fits no column of any page; the renderer
    /// draws a bordered placeholder in this spot instead of the image.
    pub oversized: bool,
}

/// Exactly one of these outcomes is produced per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKeyMode {
    /// A dedicated visible grid page appended after the questions.
    Page,
    /// A hidden `AnswerKey:1:A,...` document keyword, no visible page.
    Keywords,
    /// No answer key at all.
    Off,
}

impl BookletPlan {
    /// Total page count of the rendered document.
    pub fn total_pages(&self) -> usize {
        self.question_pages.len() + usize::from(self.answer_key == AnswerKeyMode::Page)
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_key_page_counts_toward_total() {
        let mut plan = BookletPlan {
            theme_id: "classic".into(),
            page_width_pt: 595.28,
            page_height_pt: 841.89,
            question_pages: vec![PagePlan {
                page_index: 0,
                placements: Vec::new(),
            }],
            answer_key: AnswerKeyMode::Page,
        };
        assert_eq!(plan.total_pages(), 2);
        plan.answer_key = AnswerKeyMode::Keywords;
        assert_eq!(plan.total_pages(), 1);
    }

    #[test]
    fn json_roundtrip() {
        let plan = BookletPlan {
            theme_id: "modern".into(),
            page_width_pt: 595.28,
            page_height_pt: 841.89,
            question_pages: Vec::new(),
            answer_key: AnswerKeyMode::Off,
        };
        let parsed = BookletPlan::from_json(&plan.to_json()).unwrap();
        assert_eq!(parsed.theme_id, "modern");
        assert_eq!(parsed.answer_key, AnswerKeyMode::Off);
    }
}
