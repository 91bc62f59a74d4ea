//! Card images
//!
//! A [`Card`] is one 80-column record of a header: a keyword, an optional
//! value and an optional comment. Decoding never fails; a record whose
//! string value is not closed is kept as raw text. Encoding always yields
//! exactly 80 ASCII bytes, truncating anything that overflows.

mod decode;
mod encode;
mod long_string;

use core::fmt;

use crate::constants::{KEYWORD_LEN, MAX_STRING_LEN, MAX_VALUE_LEN};
use crate::error::{FitsError, Result};
use crate::keyword::{std_keys, KeyRef, KeywordRegistry, HIERARCH_PREFIX};
use crate::options::FitsOptions;

pub use long_string::{
    continuation_count, continue_fragment, reassemble_long_string, split_long_string,
};

/// Typed value of a card
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    None,
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl CardValue {
    pub fn is_none(&self) -> bool {
        matches!(self, CardValue::None)
    }
}

impl From<bool> for CardValue {
    fn from(v: bool) -> Self {
        CardValue::Bool(v)
    }
}

impl From<i64> for CardValue {
    fn from(v: i64) -> Self {
        CardValue::Int(v)
    }
}

impl From<i32> for CardValue {
    fn from(v: i32) -> Self {
        CardValue::Int(i64::from(v))
    }
}

impl From<f64> for CardValue {
    fn from(v: f64) -> Self {
        CardValue::Float(v)
    }
}

impl From<&str> for CardValue {
    fn from(v: &str) -> Self {
        CardValue::Str(v.to_string())
    }
}

/// One header record
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    key: Option<KeyRef>,
    value: CardValue,
    comment: Option<String>,
    is_string: bool,
    nullable: bool,
}

/// Length of `s` once single quotes are doubled
pub fn escaped_len(s: &str) -> usize {
    s.chars().map(|c| if c == '\'' { 2 } else { 1 }).sum()
}

/// Reject keywords longer than 8 characters unless HIERARCH is enabled
pub fn check_keyword(key: &str, options: &FitsOptions) -> Result<()> {
    if key.len() > KEYWORD_LEN && !(options.use_hierarch && key.starts_with(HIERARCH_PREFIX)) {
        return Err(FitsError::KeywordTooLong { key: key.to_string() });
    }
    Ok(())
}

impl Card {
    /// Empty card for `key` under the default options
    pub fn new(key: KeyRef) -> Result<Self> {
        Self::with_options(key, &FitsOptions::default())
    }

    /// Empty card for `key`, checking its length against `options`
    pub fn with_options(key: KeyRef, options: &FitsOptions) -> Result<Self> {
        check_keyword(key.as_str(), options)?;
        Ok(Self::unchecked(key))
    }

    pub(crate) fn unchecked(key: KeyRef) -> Self {
        Self {
            key: Some(key),
            value: CardValue::None,
            comment: None,
            is_string: false,
            nullable: false,
        }
    }

    /// Commentary card such as COMMENT or HISTORY
    ///
    /// Empty text leaves the card without a comment, as it decodes.
    pub fn commentary(key: KeyRef, text: impl Into<String>) -> Self {
        let mut card = Self::unchecked(key);
        let text = text.into();
        card.comment = (!text.is_empty()).then_some(text);
        card
    }

    /// Keyless record holding raw text
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            key: None,
            value: CardValue::None,
            comment: Some(text.into()),
            is_string: false,
            nullable: false,
        }
    }

    /// Decode a record; input shorter than 80 bytes is blank-padded
    pub fn from_bytes(record: &[u8], registry: &KeywordRegistry, options: &FitsOptions) -> Self {
        decode::decode(record, registry, options)
    }

    /// Encode as exactly 80 bytes
    pub fn to_bytes(&self) -> [u8; crate::constants::CARD_SIZE] {
        encode::encode(self)
    }

    /// Set a string value, trimming trailing blanks
    ///
    /// A literal wrapped in single quotes is unwrapped and trimmed first.
    pub fn with_str(mut self, value: &str) -> Result<Self> {
        let mut text = value.trim_end_matches(' ');
        if let Some(inner) = text.strip_prefix('\'') {
            text = inner.strip_suffix('\'').ok_or(FitsError::QuoteMismatch)?.trim();
        }
        if let Some(pos) = text.find(|c: char| !(' '..='~').contains(&c)) {
            return Err(FitsError::format("non-printable character in string value", pos));
        }
        let len = escaped_len(text);
        if len > MAX_STRING_LEN {
            return Err(FitsError::ValueTooLong { len, max: MAX_STRING_LEN });
        }
        self.value = CardValue::Str(text.to_string());
        self.is_string = true;
        Ok(self)
    }

    pub fn with_bool(mut self, value: bool) -> Self {
        self.value = CardValue::Bool(value);
        self.is_string = false;
        self
    }

    pub fn with_int(mut self, value: i64) -> Self {
        self.value = CardValue::Int(value);
        self.is_string = false;
        self
    }

    pub fn with_float(mut self, value: f64) -> Self {
        self.value = CardValue::Float(value);
        self.is_string = false;
        self
    }

    /// Set any value; strings go through [`Card::with_str`]
    pub fn with_value(self, value: impl Into<CardValue>) -> Result<Self> {
        match value.into() {
            CardValue::Str(s) => self.with_str(&s),
            CardValue::Bool(b) => Ok(self.with_bool(b)),
            CardValue::Int(i) => Ok(self.with_int(i)),
            CardValue::Float(f) => Ok(self.with_float(f)),
            CardValue::None => {
                let mut card = self;
                card.value = CardValue::None;
                card.is_string = false;
                Ok(card)
            }
        }
    }

    /// Keep an unquoted literal such as a complex pair as text
    pub fn with_literal(mut self, literal: &str) -> Result<Self> {
        let literal = literal.trim();
        if literal.len() > MAX_VALUE_LEN {
            return Err(FitsError::ValueTooLong { len: literal.len(), max: MAX_VALUE_LEN });
        }
        self.value = CardValue::Str(literal.to_string());
        self.is_string = false;
        Ok(self)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Emit `= ` with blank value columns when no value is set
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Replace the `n` placeholders of the keyword with `indices`
    pub fn indexed(mut self, registry: &KeywordRegistry, indices: &[usize]) -> Self {
        if let Some(key) = &self.key {
            self.key = Some(registry.indexed(key.as_str(), indices));
        }
        self
    }

    pub fn key(&self) -> Option<&KeyRef> {
        self.key.as_ref()
    }

    pub fn key_str(&self) -> Option<&str> {
        self.key.as_ref().map(KeyRef::as_str)
    }

    pub(crate) fn set_key(&mut self, key: KeyRef) {
        self.key = Some(key);
    }

    /// Rename the card, checking the new keyword against `options`
    pub fn rename(&mut self, key: KeyRef, options: &FitsOptions) -> Result<()> {
        check_keyword(key.as_str(), options)?;
        self.set_key(key);
        Ok(())
    }

    pub fn value(&self) -> &CardValue {
        &self.value
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// True when the value was, or will be, written in quotes
    pub fn is_string(&self) -> bool {
        self.is_string
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// True for a key/value record, false for commentary and raw text
    pub fn is_keyed(&self) -> bool {
        self.key.is_some() && (!self.value.is_none() || self.nullable)
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.key_str() == Some(name)
    }

    pub fn is_continue(&self) -> bool {
        self.is_key(std_keys::CONTINUE)
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            CardValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            CardValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Integer value, also accepting integral floats
    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            CardValue::Int(i) => Some(i),
            CardValue::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.value {
            CardValue::Float(f) => Some(f),
            CardValue::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    /// Value rendered the way it appears on the card, without quotes
    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            CardValue::None => None,
            CardValue::Str(s) => Some(s.clone()),
            CardValue::Bool(b) => Some(if *b { "T" } else { "F" }.to_string()),
            CardValue::Int(i) => Some(i.to_string()),
            CardValue::Float(f) => Some(encode::format_float(*f)),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode::encode_string(self))
    }
}
