//! The CONTINUE long-string convention
//!
//! A string too long for one card is written as a primary card whose value
//! ends in `&`, followed by CONTINUE records holding further quoted
//! fragments, each ending in `&` except the last. The last fragment also
//! carries the comment of the whole value.

use crate::constants::{LONG_STRING_CHUNK, MAX_STRING_LEN};
use crate::keyword::{std_keys, KeyRef, KeywordRegistry};

use super::encode::escape;
use super::{escaped_len, Card, CardValue};

/// Byte offset into `s` covering at most `max` escaped columns
fn adjusted_length(s: &str, max: usize) -> usize {
    let mut size = 0;
    for (i, c) in s.char_indices() {
        let cost = if c == '\'' { 2 } else { 1 };
        if size + cost > max {
            return i;
        }
        size += cost;
    }
    s.len()
}

fn continue_card(key: &KeyRef, text: String) -> Card {
    Card::commentary(key.clone(), text)
}

/// Cards encoding `value` under `key`
///
/// A value that fits on one card and does not end in a blank or `&` is
/// returned as a single card. Otherwise the primary card is followed by
/// CONTINUE records, always ending with one that closes the value.
pub fn split_long_string(
    key: KeyRef,
    value: &str,
    comment: Option<&str>,
    registry: &KeywordRegistry,
) -> Vec<Card> {
    let mut primary = Card::unchecked(key);
    primary.is_string = true;

    if escaped_len(value) <= MAX_STRING_LEN && !value.ends_with([' ', '&']) {
        primary.value = CardValue::Str(value.to_string());
        primary.comment = comment.map(str::to_string);
        return vec![primary];
    }

    let continue_key = registry.resolve_or_create(std_keys::CONTINUE);
    let off = adjusted_length(value, LONG_STRING_CHUNK);
    primary.value = CardValue::Str(format!("{}&", &value[..off]));
    let mut cards = vec![primary];

    let mut rest = &value[off..];
    loop {
        let off = adjusted_length(rest, LONG_STRING_CHUNK);
        if off < rest.len() {
            cards.push(continue_card(&continue_key, format!("'{}&'", escape(&rest[..off]))));
            rest = &rest[off..];
        } else {
            let mut text = format!("'{}'", escape(rest));
            if let Some(comment) = comment {
                text.push_str(" / ");
                text.push_str(comment);
            }
            cards.push(continue_card(&continue_key, text));
            break;
        }
    }

    tracing::trace!(cards = cards.len(), "split long string");
    cards
}

/// Unescaped text between the quotes of a CONTINUE record's payload
pub fn continue_fragment(payload: &str) -> Option<String> {
    let payload = payload.trim().strip_prefix('\'')?;
    super::decode::scan_quoted(payload).map(|(text, _)| text)
}

/// Rebuild a long string from its primary value and the records after it
///
/// Stops at the first record that is not a CONTINUE or once a fragment no
/// longer ends in `&`.
pub fn reassemble_long_string<'a, I>(primary: &str, following: I) -> String
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut value = primary.to_string();
    if !value.ends_with('&') {
        return value;
    }
    for card in following {
        if !card.is_continue() {
            break;
        }
        let Some(fragment) = card.comment().and_then(continue_fragment) else {
            break;
        };
        value.pop();
        value.push_str(&fragment);
        if !fragment.ends_with('&') {
            break;
        }
    }
    value
}

/// Number of CONTINUE records after a primary value, as the reader sees them
pub fn continuation_count<'a, I>(primary: &str, following: I) -> usize
where
    I: IntoIterator<Item = &'a Card>,
{
    if !primary.ends_with('&') {
        return 0;
    }
    let mut count = 0;
    for card in following {
        if !card.is_continue() {
            break;
        }
        let Some(fragment) = card.comment().and_then(continue_fragment) else {
            break;
        };
        count += 1;
        if !fragment.ends_with('&') {
            break;
        }
    }
    count
}
