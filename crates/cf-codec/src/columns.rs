//! Column layout of a single card line.
//!
//! The card name occupies the first [`CARD_COLUMN`] characters. The first
//! value starts at that column; every following number is separated by a gap
//! that shrinks as the previous number grows wider, so that the decimal points
//! of typical values line up across cards. Text values snap to fixed
//! [`FIELD_WIDTH`] slots counted from the first value column.

use std::fmt;

pub const CARD_COLUMN: usize = 21;
pub const FIELD_WIDTH: usize = 11;
const BASE_GAP: usize = 3;
const BASE_WIDTH: usize = 8;

#[derive(Clone, Debug, PartialEq)]
pub enum CardValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl CardValue {
    pub fn quoted(text: &str) -> Self {
        CardValue::Text(format!("\"{text}\""))
    }
}

impl fmt::Display for CardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardValue::Int(v) => write!(f, "{v}"),
            CardValue::Float(v) => write!(f, "{v:.6}"),
            CardValue::Text(t) => f.write_str(t),
        }
    }
}

impl From<i64> for CardValue {
    fn from(v: i64) -> Self {
        CardValue::Int(v)
    }
}

impl From<usize> for CardValue {
    fn from(v: usize) -> Self {
        CardValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for CardValue {
    fn from(v: f64) -> Self {
        CardValue::Float(v)
    }
}

/// Spaces placed before a numeric value that follows one rendered with
/// `previous_width` characters.
pub fn numeric_gap(previous_width: usize) -> usize {
    let extra = previous_width.saturating_sub(BASE_WIDTH);
    BASE_GAP.saturating_sub(extra).max(1)
}

fn pad_to(line: &mut String, target: usize) {
    let current = line.chars().count();
    if current < target {
        line.extend(std::iter::repeat_n(' ', target - current));
    } else if current > target {
        line.push(' ');
    }
}

/// Render one card line (without the trailing newline).
pub fn format_card(name: &str, values: &[CardValue]) -> String {
    let mut line = String::with_capacity(64);
    line.push_str(name);
    if !name.is_empty() && name.len() < CARD_COLUMN {
        line.extend(std::iter::repeat_n(' ', CARD_COLUMN - name.len()));
    }
    if values.is_empty() {
        return line;
    }

    let mut numeric_count = 0usize;
    let mut previous_width = BASE_WIDTH;
    for value in values {
        let text = value.to_string();
        match value {
            CardValue::Int(_) | CardValue::Float(_) => {
                if numeric_count == 0 {
                    pad_to(&mut line, CARD_COLUMN);
                } else {
                    line.extend(std::iter::repeat_n(' ', numeric_gap(previous_width)));
                }
                previous_width = text.chars().count();
                numeric_count += 1;
            }
            CardValue::Text(_) => {
                pad_to(&mut line, CARD_COLUMN + numeric_count * FIELD_WIDTH);
            }
        }
        line.push_str(&text);
    }
    line
}
