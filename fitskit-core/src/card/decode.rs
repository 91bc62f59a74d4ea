use crate::constants::{CARD_SIZE, KEYWORD_LEN};
use crate::keyword::{is_commentary, KeywordRegistry, HIERARCH_PREFIX};
use crate::options::FitsOptions;

use super::{Card, CardValue};

/// Value, string flag, nullable flag and comment of a value region
struct ValueParts {
    value: CardValue,
    is_string: bool,
    nullable: bool,
    comment: Option<String>,
}

fn to_text(record: &[u8]) -> String {
    let mut text: String = record
        .iter()
        .take(CARD_SIZE)
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect();
    let len = text.len();
    text.extend(core::iter::repeat(' ').take(CARD_SIZE - len));
    text
}

/// Drop one blank after the comment separator and any trailing blanks
fn clean_comment(text: &str) -> Option<String> {
    let text = text.strip_prefix(' ').unwrap_or(text).trim_end();
    (!text.is_empty()).then(|| text.to_string())
}

fn trimmed_comment(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub(super) fn decode(record: &[u8], registry: &KeywordRegistry, options: &FitsOptions) -> Card {
    let text = to_text(record);

    if options.use_hierarch && text.starts_with("HIERARCH ") {
        return decode_hierarch(&text, registry);
    }

    let key_text = text[..KEYWORD_LEN].trim();
    let key = registry.resolve_or_create(key_text);

    if key_text.is_empty() {
        let comment = text[KEYWORD_LEN..].trim_end();
        return Card::commentary(key, comment);
    }

    if is_commentary(key_text) || &text[KEYWORD_LEN..KEYWORD_LEN + 2] != "= " {
        let mut card = Card::unchecked(key);
        card.comment = trimmed_comment(&text[KEYWORD_LEN..]);
        return card;
    }

    match decode_value(&text[KEYWORD_LEN + 2..]) {
        Some(parts) => assemble(Card::unchecked(key), parts),
        None => degrade(&text),
    }
}

fn assemble(mut card: Card, parts: ValueParts) -> Card {
    card.value = parts.value;
    card.is_string = parts.is_string;
    card.nullable = parts.nullable;
    card.comment = parts.comment;
    card
}

fn degrade(text: &str) -> Card {
    tracing::debug!(record = text.trim_end(), "unterminated string value, keeping record as text");
    Card::raw(text.trim_end())
}

fn decode_hierarch(text: &str, registry: &KeywordRegistry) -> Card {
    let body = &text["HIERARCH ".len()..];
    let eq = body.find('=');
    let slash = body.find('/');

    let (name, rest) = match (eq, slash) {
        (Some(e), Some(s)) if s < e => (&body[..s], None),
        (Some(e), _) => (&body[..e], Some(&body[e + 1..])),
        (None, Some(s)) => (&body[..s], None),
        (None, None) => (body, None),
    };

    let mut key_text = HIERARCH_PREFIX.to_string();
    key_text.push_str(&name.split_whitespace().collect::<Vec<_>>().join("."));
    let card = Card::unchecked(registry.resolve_or_create(&key_text));

    match rest {
        Some(rest) => match decode_value(rest) {
            Some(parts) => assemble(card, parts),
            None => degrade(text),
        },
        None => {
            let mut card = card;
            card.comment = slash.and_then(|s| clean_comment(&body[s + 1..]));
            card
        }
    }
}

/// Split the columns after `= ` into value and comment
///
/// Returns `None` when a quoted string is never closed.
fn decode_value(region: &str) -> Option<ValueParts> {
    let region = region.trim();
    if region.is_empty() {
        return Some(ValueParts {
            value: CardValue::None,
            is_string: false,
            nullable: true,
            comment: None,
        });
    }

    if let Some(quoted) = region.strip_prefix('\'') {
        let (value, consumed) = scan_quoted(quoted)?;
        let rest = quoted[consumed..].trim_start();
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        return Some(ValueParts {
            value: CardValue::Str(value.trim_end_matches(' ').to_string()),
            is_string: true,
            nullable: false,
            comment: clean_comment(rest),
        });
    }

    let (literal, comment) = match region.find('/') {
        Some(pos) => (region[..pos].trim(), clean_comment(&region[pos + 1..])),
        None => (region, None),
    };
    if literal.is_empty() {
        return Some(ValueParts {
            value: CardValue::None,
            is_string: false,
            nullable: true,
            comment,
        });
    }
    Some(ValueParts {
        value: infer_scalar(literal),
        is_string: false,
        nullable: false,
        comment,
    })
}

/// Unescape up to the closing quote; returns the text and bytes consumed
pub(super) fn scan_quoted(s: &str) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            return Some((out, i + 1));
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    None
}

fn is_digits(s: &str) -> bool {
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn looks_like_real(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E' | b'd' | b'D'))
}

fn infer_scalar(literal: &str) -> CardValue {
    match literal {
        "T" => return CardValue::Bool(true),
        "F" => return CardValue::Bool(false),
        "NaN" => return CardValue::Float(f64::NAN),
        "inf" => return CardValue::Float(f64::INFINITY),
        "-inf" => return CardValue::Float(f64::NEG_INFINITY),
        _ => {}
    }
    if let Ok(i) = literal.parse::<i64>() {
        return CardValue::Int(i);
    }
    if !is_digits(literal) && looks_like_real(literal) {
        if let Ok(f) = literal.replace(['d', 'D'], "E").parse::<f64>() {
            return CardValue::Float(f);
        }
    }
    CardValue::Str(literal.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_quoted() {
        assert_eq!(scan_quoted("abc' / x"), Some(("abc".to_string(), 4)));
        assert_eq!(scan_quoted("a''b'"), Some(("a'b".to_string(), 5)));
        assert_eq!(scan_quoted("''"), None);
        assert_eq!(scan_quoted("ab''"), None);
        assert_eq!(scan_quoted("'"), Some((String::new(), 1)));
    }

    #[test]
    fn test_infer_scalar() {
        assert_eq!(infer_scalar("T"), CardValue::Bool(true));
        assert_eq!(infer_scalar("+17"), CardValue::Int(17));
        assert_eq!(infer_scalar("-2.5E-3"), CardValue::Float(-2.5e-3));
        assert_eq!(infer_scalar("1D2"), CardValue::Float(100.0));
        assert_eq!(infer_scalar("99999999999999999999"), CardValue::Str("99999999999999999999".to_string()));
        assert_eq!(infer_scalar("Infinity"), CardValue::Str("Infinity".to_string()));
        assert_eq!(infer_scalar("1.2.3"), CardValue::Str("1.2.3".to_string()));
    }

    #[test]
    fn test_slash_inside_string_is_value() {
        let parts = decode_value("'a/b' / c").unwrap();
        assert_eq!(parts.value, CardValue::Str("a/b".to_string()));
        assert_eq!(parts.comment.as_deref(), Some("c"));
    }
}
