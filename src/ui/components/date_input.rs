use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_MASK: &str = "ГГГГ-ММ-ДД";
const DATE_LEN: usize = 10;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

/// The part of a `YYYY-MM-DD` value the next digit lands in.
pub fn current_part(value: &str) -> DatePart {
    match value.len() {
        0..=4 => DatePart::Year,
        5..=7 => DatePart::Month,
        _ => DatePart::Day,
    }
}

/// Applies a key press to a date value held as text. Only digits are taken;
/// the separators are inserted as the year and month fill up, and a digit
/// typed over a complete date starts a new one.
pub fn handle_key(value: &mut String, key: KeyCode) {
    match key {
        KeyCode::Char(c) if c.is_ascii_digit() => {
            if value.len() >= DATE_LEN {
                value.clear();
            }
            if value.len() == 4 || value.len() == 7 {
                value.push('-');
            }
            value.push(c);
        }
        KeyCode::Char('-') if value.len() == 4 || value.len() == 7 => {
            value.push('-');
        }
        KeyCode::Backspace => {
            value.pop();
            if value.ends_with('-') {
                value.pop();
            }
        }
        KeyCode::Delete => value.clear(),
        _ => {}
    }
}

/// Empty, or a complete calendar date in a sane year range.
pub fn is_acceptable(value: &str) -> bool {
    value.is_empty() || parse(value).is_some()
}

pub fn parse(value: &str) -> Option<NaiveDate> {
    if value.len() != DATE_LEN {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .filter(|date| (1900..=2100).contains(&date.year()))
}

/// Reduces a stored date string to what the field can hold: the leading
/// `YYYY-MM-DD` when it names a valid date, otherwise nothing.
pub fn normalize(value: &str) -> String {
    value
        .get(..DATE_LEN)
        .filter(|head| parse(head).is_some())
        .map(str::to_string)
        .unwrap_or_default()
}

/// While editing, the unfilled remainder of the mask trails the typed digits.
pub fn display(value: &str, editing: bool) -> String {
    if !editing {
        return value.to_string();
    }
    let remainder: String = DATE_MASK.chars().skip(value.chars().count()).collect();
    format!("{value}{remainder}")
}
