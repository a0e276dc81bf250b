//! # booklet-forge – Themed exam-booklet PDF composition engine
//!
//! This crate composes print-ready exam booklets from pre-rasterized
//! question images. The pipeline stages are:
//!
//! 1. **Plan** – stream questions into pages/columns at their natural size
//!    ([`content_area`], [`layout`], [`pipeline::plan_booklet`])
//! 2. **Theme** – resolve a theme plugin and its rendering hooks ([`theme`])
//! 3. **Assets** – fetch and decode backgrounds/watermarks with per-build
//!    caching ([`assets`])
//! 4. **Render** – emit per-page ops via printpdf ([`render`],
//!    [`answer_key`])
//! 5. **Serialize** – stamp sanitized metadata and produce PDF bytes
//!    ([`pipeline::build_booklet`])
//!
//! Question images are never scaled down to fit: a question either fits a
//! column at its converted natural size or moves to the next column/page.

pub mod answer_key;
pub mod assets;
pub mod content_area;
pub mod error;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod plan;
pub mod render;
pub mod samples;
pub mod theme;
pub mod units;

// Re-exports for convenience
pub use error::{Error, Result};
pub use model::{
    AnswerLetter, GenerationOptions, Metadata, Question, ThemedMetadata, WatermarkKind,
    WatermarkPosition, WatermarkSpec,
};
pub use pipeline::{build_booklet, plan_booklet};
pub use theme::{ThemePlugin, ThemeRegistry};
