//! Sample inputs for testing and demonstration.
//!
//! The question fixtures carry real PNG bytes (solid-shade rasters encoded
//! in memory) with pixel dimensions typical of 300-DPI crops, so the full
//! embed path is exercised without any file or network I/O.

use std::io::Cursor;

use crate::model::{AnswerLetter, GenerationOptions, Metadata, Question};

/// A solid-shade PNG of the given pixel dimensions.
pub fn sample_png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = ::image::RgbImage::from_pixel(width, height, ::image::Rgb([shade, shade, shade]));
    let mut cursor = Cursor::new(Vec::new());
    ::image::DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ::image::ImageFormat::Png)
        .expect("in-memory PNG encoding");
    cursor.into_inner()
}

/// `count` questions with varied crop sizes and cycling answers, in order.
pub fn sample_questions(count: usize) -> Vec<Question> {
    let answers = [
        AnswerLetter::A,
        AnswerLetter::B,
        AnswerLetter::C,
        AnswerLetter::D,
        AnswerLetter::E,
    ];
    (0..count)
        .map(|i| {
            let width = 560 + (i as u32 % 4) * 40;
            let height = 300 + (i as u32 % 5) * 36;
            Question {
                id: format!("sample-{i}"),
                image_bytes: sample_png(width, height, 200 + (i as u8 % 5) * 10),
                correct_answer: answers[i % answers.len()],
                order: i as u32,
                source_document_id: Some("sample.pdf".into()),
                actual_width: width,
                actual_height: height,
            }
        })
        .collect()
}

/// Metadata with extended-Latin names, exercising the transliteration path.
pub fn sample_metadata() -> Metadata {
    let mut meta = Metadata {
        test_name: "Midterm Exam 1".into(),
        course_name: "Matematik".into(),
        class_name: "8-A".into(),
        teacher_name: "Ayşe Yılmaz".into(),
        question_spacing: 5,
        ..Metadata::default()
    };
    meta.custom_fields
        .insert("school_name".into(), "Cumhuriyet Ortaokulu".into());
    meta.custom_fields.insert("exam_code".into(), "MT-2024-1".into());
    meta
}

/// Options selecting a theme with the remaining knobs left to defaults.
pub fn sample_options(theme_id: &str) -> GenerationOptions {
    GenerationOptions {
        theme_id: theme_id.into(),
        ..GenerationOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_png_decodes_to_requested_size() {
        let bytes = sample_png(120, 80, 128);
        let img = ::image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (120, 80));
    }

    #[test]
    fn sample_questions_are_ordered() {
        let questions = sample_questions(7);
        assert_eq!(questions.len(), 7);
        for (i, q) in questions.iter().enumerate() {
            assert_eq!(q.order, i as u32);
            assert_eq!(q.number(), i as u32 + 1);
        }
    }
}
