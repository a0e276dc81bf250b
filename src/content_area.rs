//! Content-area allocator – tracks the writable region of one page.
//!
//! A [`ContentArea`] describes the current column of the current page:
//! where it starts, how wide it is, and how much vertical space remains.
//! Every operation returns a *new* value; callers re-bind their "current"
//! area instead of mutating shared state. A `None` from
//! [`ContentArea::advance_column`] means the page is exhausted and the
//! caller must open a fresh area on a new page.

use crate::units;

#[derive(Debug, Clone, PartialEq)]
pub struct ContentArea {
    /// Left edge of the writable region, from the page's left edge.
    pub origin_x: f32,
    /// Top edge of the writable region, from the page's top edge.
    pub origin_y: f32,
    /// Total writable width across all columns.
    pub width: f32,
    /// Full height of one column.
    pub height: f32,
    /// Unconsumed vertical space in the current column.
    pub remaining_height: f32,
    /// Zero-based index of the column being filled.
    pub current_column: u8,
    pub max_columns: u8,
    pub column_width: f32,
    pub column_gap: f32,
}

impl ContentArea {
    /// Open a fresh area at the top of a new page.
    ///
    /// `page_top_y` is where writable content may begin (below the header
    /// reserve); `columns` is clamped to the supported `1..=2` range.
    pub fn open(page_top_y: f32, columns: u8) -> Self {
        let columns = columns.clamp(1, 2);
        let width = units::content_width_pt();
        let height = (units::PAGE_HEIGHT_PT
            - page_top_y
            - units::mm_to_pt(units::FOOTER_RESERVE_MM))
        .max(1.0);
        let gap = if columns > 1 { units::COLUMN_GAP_PT } else { 0.0 };
        let column_width = (width - gap * (columns as f32 - 1.0)) / columns as f32;
        Self {
            origin_x: units::content_left_pt(),
            origin_y: page_top_y,
            width,
            height,
            remaining_height: height,
            current_column: 0,
            max_columns: columns,
            column_width,
            column_gap: gap,
        }
    }

    /// Move to the next column with a full `remaining_height`, or `None`
    /// when this was the last column (signal: start a new page).
    pub fn advance_column(&self) -> Option<Self> {
        if self.current_column + 1 >= self.max_columns {
            return None;
        }
        Some(Self {
            current_column: self.current_column + 1,
            remaining_height: self.height,
            ..self.clone()
        })
    }

    /// Account for `used_height` of placed content plus trailing `spacing`.
    pub fn consume(&self, used_height: f32, spacing: f32) -> Self {
        Self {
            remaining_height: (self.remaining_height - used_height - spacing).max(0.0),
            ..self.clone()
        }
    }

    /// Vertical space already consumed in the current column.
    pub fn used_height(&self) -> f32 {
        self.height - self.remaining_height
    }

    /// Left edge of the current column.
    pub fn column_left(&self) -> f32 {
        self.origin_x + self.current_column as f32 * (self.column_width + self.column_gap)
    }

    /// Right edge of the current column.
    pub fn column_right(&self) -> f32 {
        self.column_left() + self.column_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_columns_split_available_width() {
        let area = ContentArea::open(units::content_top_pt(), 2);
        let expected = (units::content_width_pt() - units::COLUMN_GAP_PT) / 2.0;
        assert!((area.column_width - expected).abs() < 0.01);
    }

    #[test]
    fn single_column_spans_full_width() {
        let area = ContentArea::open(units::content_top_pt(), 1);
        assert!((area.column_width - units::content_width_pt()).abs() < 0.01);
        assert_eq!(area.column_gap, 0.0);
    }

    #[test]
    fn advance_resets_remaining_height() {
        let area = ContentArea::open(units::content_top_pt(), 2);
        let spent = area.consume(200.0, 5.0);
        assert!(spent.remaining_height < area.height);

        let next = spent.advance_column().expect("second column available");
        assert_eq!(next.current_column, 1);
        assert!((next.remaining_height - next.height).abs() < 1e-6);

        assert!(next.advance_column().is_none(), "no third column");
    }

    #[test]
    fn consume_never_mutates_input() {
        let area = ContentArea::open(units::content_top_pt(), 2);
        let before = area.remaining_height;
        let _spent = area.consume(100.0, 5.0);
        assert!((area.remaining_height - before).abs() < 1e-6);
    }

    #[test]
    fn second_column_starts_after_gap() {
        let area = ContentArea::open(units::content_top_pt(), 2);
        let right = area.advance_column().unwrap();
        let expected = area.origin_x + area.column_width + area.column_gap;
        assert!((right.column_left() - expected).abs() < 0.01);
    }
}
