use crate::constants::{CARD_SIZE, FIXED_VALUE_END, KEYWORD_LEN, NUMBER_WIDTH, STRING_MIN_END};
use crate::keyword::{std_keys, HIERARCH_PREFIX};

use super::{Card, CardValue};

pub(super) fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

/// Shortest round-tripping text for `value` that fits a 20-column field
pub(crate) fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let mut text = value.to_string();
    if !text.contains(['.', 'e', 'E']) {
        text.push_str(".0");
    }
    if text.len() <= NUMBER_WIDTH {
        return text;
    }
    let text = format!("{value:E}");
    if text.len() <= NUMBER_WIDTH {
        return text;
    }
    (0..16)
        .rev()
        .map(|precision| format!("{value:.precision$E}"))
        .find(|t| t.len() <= NUMBER_WIDTH)
        .unwrap_or(text)
}

fn scalar_text(card: &Card) -> Option<String> {
    match &card.value {
        CardValue::Float(f) => Some(format_float(*f)),
        _ => card.value_text(),
    }
}

fn pad_to(buf: &mut String, width: usize) {
    if buf.len() < width {
        let fill = width - buf.len();
        buf.extend(core::iter::repeat(' ').take(fill));
    }
}

pub(super) fn encode_string(card: &Card) -> String {
    let mut buf = String::with_capacity(CARD_SIZE);
    match &card.key {
        None => buf.push_str(card.comment.as_deref().unwrap_or("")),
        Some(key) if key.as_str().starts_with(HIERARCH_PREFIX) => encode_hierarch(card, key.as_str(), &mut buf),
        Some(key) => encode_fixed(card, key.as_str(), &mut buf),
    }

    let mut buf: String = buf.chars().map(|c| if c.is_ascii() { c } else { '?' }).collect();
    buf.truncate(CARD_SIZE);
    pad_to(&mut buf, CARD_SIZE);
    buf
}

pub(super) fn encode(card: &Card) -> [u8; CARD_SIZE] {
    let mut out = [b' '; CARD_SIZE];
    out.copy_from_slice(encode_string(card).as_bytes());
    out
}

fn encode_fixed(card: &Card, key: &str, buf: &mut String) {
    buf.push_str(key);
    pad_to(buf, KEYWORD_LEN);

    if card.is_keyed() {
        buf.push_str("= ");
        match scalar_text(card) {
            Some(text) if card.is_string => {
                buf.push('\'');
                buf.push_str(&escape(&text));
                pad_to(buf, STRING_MIN_END);
                buf.push('\'');
                pad_to(buf, FIXED_VALUE_END);
            }
            Some(text) => buf.push_str(&format!("{text:>width$}", width = NUMBER_WIDTH)),
            None => pad_to(buf, KEYWORD_LEN + 2 + NUMBER_WIDTH),
        }
        if let Some(comment) = &card.comment {
            buf.push_str(" / ");
            buf.push_str(comment);
        }
        return;
    }

    if let Some(comment) = &card.comment {
        if key == std_keys::CONTINUE || comment.starts_with("= ") {
            buf.push_str("  ");
        }
        buf.push_str(comment);
    }
}

fn encode_hierarch(card: &Card, key: &str, buf: &mut String) {
    buf.push_str(&key.replace('.', " "));

    if card.is_keyed() {
        buf.push_str(" = ");
        if let Some(text) = scalar_text(card) {
            if card.is_string {
                buf.push('\'');
                buf.push_str(&escape(&text));
                buf.push('\'');
            } else {
                buf.push_str(&text);
            }
        }
    }
    if let Some(comment) = &card.comment {
        buf.push_str(" / ");
        buf.push_str(comment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-0.25), "-0.25");
        assert_eq!(format_float(1e23), "1E23");
        assert_eq!(format_float(1.5e-30), "1.5E-30");
        let text = format_float(-1.2345678901234567e-300);
        assert!(text.len() <= 20);
        assert!(text.contains('E'));
    }
}
