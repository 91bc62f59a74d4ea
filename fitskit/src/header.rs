//! Headers
//!
//! A [`Header`] is the ordered list of cards that describes one header/data
//! unit. Cards with a value are indexed by keyword; commentary and CONTINUE
//! records are kept in place without a key. The header carries a cursor:
//! lookups such as [`Header::find_card`] move it, and additions are inserted
//! at it, so a run of `add_*` calls after a lookup lands right after the
//! card that was found.
//!
//! Headers read from a seekable medium remember their [`FileAnchor`] and
//! their original card count, which decide whether they can later be
//! rewritten in place.

use std::io::{Read, SeekFrom, Write};
use std::sync::Arc;

use fitskit_core::{
    check_keyword, continue_fragment, escaped_len, expand_indexed, padded_size,
    padding_for, reassemble_long_string, split_long_string, std_keys, ByteParser, Card, Cursor,
    FitsError, FitsOptions, KeyRef, KeyedList, KeywordRegistry, CARDS_PER_BLOCK, CARD_SIZE,
    HEADER_FILL, MAX_STRING_LEN,
};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::stream::{read_full, skip_bytes, write_fill, FileAnchor, RandomAccess};

/// Ordered cards of one header/data unit
#[derive(Debug, Clone)]
pub struct Header {
    cards: KeyedList<KeyRef, Card>,
    cursor: Cursor,
    original_count: usize,
    anchor: Option<FileAnchor>,
    long_strings: bool,
    duplicates: Vec<Card>,
    options: FitsOptions,
    registry: Arc<KeywordRegistry>,
}

fn list_key(card: &Card) -> Option<KeyRef> {
    if card.is_keyed() {
        card.key().cloned()
    } else {
        None
    }
}

fn is_long_primary(card: &Card) -> bool {
    card.is_string() && card.as_str().is_some_and(|v| v.ends_with('&'))
}

fn parse_long_text(text: &str, strict: bool) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    ByteParser::new(text.as_bytes())
        .with_fill_fields(strict)
        .parse_long(text.len())
        .ok()
}

fn parse_double_text(text: &str, strict: bool) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    ByteParser::new(text.as_bytes())
        .with_fill_fields(strict)
        .parse_double(text.len())
        .ok()
}

fn parse_bool_text(text: &str, strict: bool) -> Option<bool> {
    ByteParser::new(text.as_bytes())
        .with_fill_fields(strict)
        .parse_bool(text.len())
        .ok()
}

/// Trailing column number of an indexed keyword such as `TFORM12`
fn column_number(key: &str) -> Option<u32> {
    let stem = key.trim_end_matches(|c: char| c.is_ascii_digit());
    key[stem.len()..].parse().ok()
}

/// Axis number of `NAXISn`
fn axis_number(key: &str) -> Option<usize> {
    let digits = key.strip_prefix(std_keys::NAXIS)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Sort rank placing the mandatory keywords first and END last
fn canonical_rank(card: &Card) -> (u8, usize) {
    let Some(key) = card.key_str() else {
        return (8, 0);
    };
    match key {
        std_keys::SIMPLE | std_keys::XTENSION => (0, 0),
        std_keys::BITPIX => (1, 0),
        std_keys::NAXIS => (2, 0),
        std_keys::EXTEND => (4, 0),
        std_keys::PCOUNT => (5, 0),
        std_keys::GCOUNT => (6, 0),
        std_keys::TFIELDS => (7, 0),
        std_keys::END if !card.is_keyed() => (9, 0),
        _ => match axis_number(key) {
            Some(n) => (3, n),
            None => (8, 0),
        },
    }
}

fn describe(card: &Card) -> String {
    match card.key_str() {
        Some(key) => key.to_string(),
        None => card.comment().unwrap_or_default().trim().to_string(),
    }
}

fn structure_error(expected: &str, found: Option<&Card>, position: usize) -> Error {
    Error::Fits(FitsError::Structure {
        expected: expected.to_string(),
        found: found.map(describe),
        position,
    })
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl Header {
    /// Empty header using the shared keyword registry
    pub fn new() -> Self {
        Self::with_registry(KeywordRegistry::global(), FitsOptions::default())
    }

    pub fn with_options(options: FitsOptions) -> Self {
        Self::with_registry(KeywordRegistry::global(), options)
    }

    /// Empty header resolving keywords through `registry`
    pub fn with_registry(registry: Arc<KeywordRegistry>, options: FitsOptions) -> Self {
        Self {
            cards: KeyedList::new(),
            cursor: Cursor::default(),
            original_count: 0,
            anchor: None,
            long_strings: options.long_strings,
            duplicates: Vec::new(),
            options,
            registry,
        }
    }

    /// Build a header from card images, as if they had been read in order
    pub fn from_card_images<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut header = Self::new();
        for line in lines {
            let card = Card::from_bytes(line.as_ref().as_bytes(), &header.registry, &header.options);
            header.absorb(card)?;
        }
        header.original_count = header.cards.len();
        header.park_before_end();
        Ok(header)
    }

    /// Read one header from a sequential stream
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Self::read_with(reader, KeywordRegistry::global(), FitsOptions::default())
    }

    pub fn read_with<R: Read + ?Sized>(
        reader: &mut R,
        registry: Arc<KeywordRegistry>,
        options: FitsOptions,
    ) -> Result<Self> {
        Self::decode(reader, None, registry, options)
    }

    /// Read one header and remember where it came from
    pub fn read_anchored<R: RandomAccess + ?Sized>(reader: &mut R) -> Result<Self> {
        Self::read_anchored_with(reader, KeywordRegistry::global(), FitsOptions::default())
    }

    pub fn read_anchored_with<R: RandomAccess + ?Sized>(
        reader: &mut R,
        registry: Arc<KeywordRegistry>,
        options: FitsOptions,
    ) -> Result<Self> {
        let anchor = reader.anchor()?;
        Self::decode(reader, Some(anchor), registry, options)
    }

    fn decode<R: Read + ?Sized>(
        reader: &mut R,
        anchor: Option<FileAnchor>,
        registry: Arc<KeywordRegistry>,
        options: FitsOptions,
    ) -> Result<Self> {
        let mut header = Self::with_registry(registry, options);
        header.anchor = anchor;
        let base = anchor.map_or(0, |a| a.offset);
        let junk_allowed = base > 0 && options.allow_terminal_junk;

        let mut record = [0u8; CARD_SIZE];
        let mut count: u64 = 0;
        loop {
            let n = read_full(reader, &mut record)?;
            if n < CARD_SIZE {
                if count == 0 && (n == 0 || junk_allowed) {
                    return Err(Error::EndOfInput);
                }
                return Err(Error::TruncatedFile {
                    offset: base + count * CARD_SIZE as u64 + n as u64,
                });
            }

            let card = Card::from_bytes(&record, &header.registry, &header.options);
            if count == 0 && !(card.is_key(std_keys::SIMPLE) || card.is_key(std_keys::XTENSION)) {
                if junk_allowed {
                    debug!(offset = base, "no header after last unit, treating as end of input");
                    return Err(Error::EndOfInput);
                }
                return Err(Error::NotAStructure {
                    offset: base,
                    record: String::from_utf8_lossy(&record).trim_end().to_string(),
                });
            }
            count += 1;

            let is_end = card.is_key(std_keys::END) && !card.is_keyed();
            header.absorb(card)?;
            if is_end {
                break;
            }
        }

        header.original_count = count as usize;
        let used = count * CARD_SIZE as u64;
        let pad = padding_for(used);
        let skipped = skip_bytes(reader, pad)?;
        if skipped < pad {
            return Err(Error::TruncatedFile {
                offset: base + used + skipped,
            });
        }

        header.park_before_end();
        debug!(
            cards = count,
            duplicates = header.duplicates.len(),
            "read header"
        );
        Ok(header)
    }

    /// Append a card read from a stream, setting aside any card it supersedes
    fn absorb(&mut self, card: Card) -> Result<()> {
        self.note_long_strings(&card);
        match list_key(&card) {
            Some(key) => {
                if let Some(previous) = self.take_card(key.as_str()) {
                    warn!(keyword = %key, "duplicate keyword, keeping the later card");
                    self.duplicates.push(previous);
                }
                self.cards.push_keyed(key, card)?;
            }
            None => self.cards.push(card),
        }
        Ok(())
    }

    /// Leave the cursor before a trailing END so additions land ahead of it
    fn park_before_end(&mut self) {
        self.cursor = self.cards.cursor_end();
        let ends = self
            .cards
            .values()
            .last()
            .is_some_and(|c| c.is_key(std_keys::END) && !c.is_keyed());
        if ends {
            self.cards.prev(&mut self.cursor);
        }
    }

    fn note_long_strings(&mut self, card: &Card) {
        if !self.long_strings && card.is_key(std_keys::LONGSTRN) {
            debug!("long-string convention enabled");
            self.long_strings = true;
        }
    }

    pub fn options(&self) -> &FitsOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<KeywordRegistry> {
        &self.registry
    }

    pub fn anchor(&self) -> Option<FileAnchor> {
        self.anchor
    }

    /// Cards superseded by later cards with the same keyword, in read order
    pub fn duplicates(&self) -> &[Card] {
        &self.duplicates
    }

    pub fn had_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    pub fn long_strings_enabled(&self) -> bool {
        self.long_strings
    }

    pub fn set_long_strings(&mut self, enabled: bool) {
        self.long_strings = enabled;
    }

    pub fn number_of_cards(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> + '_ {
        self.cards.values()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.cards.contains_key(key)
    }

    /// Keyed card for `key`, without moving the cursor
    pub fn card(&self, key: &str) -> Option<&Card> {
        self.cards.get(key)
    }

    fn key_ref(&self, key: &str) -> Result<KeyRef> {
        check_keyword(key, &self.options)?;
        Ok(self.registry.resolve_or_create(key))
    }

    fn new_card(&self, key: &str) -> Result<Card> {
        Ok(Card::with_options(self.key_ref(key)?, &self.options)?)
    }

    // Cursor

    /// Move the cursor before `key`, or to the end when it is absent
    pub fn seek(&mut self, key: &str) {
        self.cursor = self.cards.seek(key);
    }

    pub fn seek_start(&mut self) {
        self.cursor = self.cards.cursor();
    }

    pub fn seek_end(&mut self) {
        self.cursor = self.cards.cursor_end();
    }

    /// Card after the cursor, advancing past it
    pub fn next_card(&mut self) -> Option<&Card> {
        self.cards.next(&mut self.cursor)
    }

    /// Find the keyed card for `key` and leave the cursor after it
    pub fn find_card(&mut self, key: &str) -> Option<&Card> {
        if !self.cards.contains_key(key) {
            return None;
        }
        self.cursor = self.cards.seek(key);
        self.cards.next(&mut self.cursor)
    }

    /// Leave the cursor after `key` and the cards that share its column number
    pub fn position_after(&mut self, key: &str) {
        self.cursor = self.cards.seek(key);
        let column = column_number(key);
        let mut overshot = false;
        while let Some(card) = self.cards.next(&mut self.cursor) {
            if column_number(card.key_str().unwrap_or_default()) != column {
                overshot = true;
                break;
            }
        }
        if overshot {
            self.cards.prev(&mut self.cursor);
        }
    }

    // Lookup

    pub fn get_long(&self, key: &str, default: i64) -> i64 {
        let strict = self.options.strict_fields;
        self.cards
            .get(key)
            .and_then(|card| {
                card.as_int()
                    .or_else(|| card.as_str().and_then(|t| parse_long_text(t, strict)))
            })
            .unwrap_or(default)
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        i32::try_from(self.get_long(key, i64::from(default))).unwrap_or(default)
    }

    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        let strict = self.options.strict_fields;
        self.cards
            .get(key)
            .and_then(|card| {
                card.as_float()
                    .or_else(|| card.as_str().and_then(|t| parse_double_text(t, strict)))
            })
            .unwrap_or(default)
    }

    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.get_double(key, f64::from(default)) as f32
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        let strict = self.options.strict_fields;
        self.cards
            .get(key)
            .and_then(|card| {
                card.as_bool()
                    .or_else(|| card.as_str().and_then(|t| parse_bool_text(t, strict)))
            })
            .unwrap_or(default)
    }

    /// String value of `key`, joining CONTINUE records in long-string mode
    pub fn get_string(&self, key: &str) -> Option<String> {
        let mut cursor = self.cards.seek(key);
        let card = self.cards.next(&mut cursor)?;
        if !card.is_string() {
            return None;
        }
        let value = card.as_str()?;
        if !self.long_strings {
            return Some(value.to_string());
        }
        let following = std::iter::from_fn(|| self.cards.next(&mut cursor));
        Some(reassemble_long_string(value, following))
    }

    // Additions

    /// Insert `card` at the cursor, replacing any card with the same keyword
    ///
    /// Commentary and other unkeyed cards are inserted without replacing anything.
    pub fn add_card(&mut self, card: Card) -> Result<()> {
        if let Some(key) = list_key(&card) {
            self.remove_card(key.as_str());
        }
        self.insert_here(card)
    }

    fn insert_here(&mut self, card: Card) -> Result<()> {
        self.note_long_strings(&card);
        match list_key(&card) {
            Some(key) => self.cards.insert_keyed(&mut self.cursor, key, card)?,
            None => self.cards.insert(&mut self.cursor, card),
        }
        Ok(())
    }

    pub fn add_bool(&mut self, key: &str, value: bool, comment: Option<&str>) -> Result<()> {
        let card = self.new_card(key)?.with_bool(value);
        self.add_card(attach(card, comment))
    }

    pub fn add_int(&mut self, key: &str, value: i64, comment: Option<&str>) -> Result<()> {
        let card = self.new_card(key)?.with_int(value);
        self.add_card(attach(card, comment))
    }

    pub fn add_float(&mut self, key: &str, value: f64, comment: Option<&str>) -> Result<()> {
        let card = self.new_card(key)?.with_float(value);
        self.add_card(attach(card, comment))
    }

    /// Add a string value, splitting it over CONTINUE records when long
    /// strings are enabled and the value does not fit on one card
    ///
    /// In long-string mode a value ending in a blank or `&` is split too, so
    /// [`Header::get_string`] returns it unchanged.
    pub fn add_str(&mut self, key: &str, value: &str, comment: Option<&str>) -> Result<()> {
        let split = escaped_len(value) > MAX_STRING_LEN || value.ends_with([' ', '&']);
        if self.long_strings && split {
            if let Some(offset) = value.find(|c: char| !(' '..='~').contains(&c)) {
                return Err(FitsError::Format {
                    reason: "non-printable character in string value",
                    offset,
                }
                .into());
            }
            let key = self.key_ref(key)?;
            let mut cards = split_long_string(key, value, comment, &self.registry).into_iter();
            if let Some(primary) = cards.next() {
                self.add_card(primary)?;
            }
            for card in cards {
                self.cards.insert(&mut self.cursor, card);
            }
            return Ok(());
        }
        let card = self.new_card(key)?.with_str(value)?;
        self.add_card(attach(card, comment))
    }

    /// Decode a card image and add it
    pub fn add_line(&mut self, line: &str) -> Result<()> {
        let card = Card::from_bytes(line.as_bytes(), &self.registry, &self.options);
        self.add_card(card)
    }

    /// Insert a commentary record at the cursor
    pub fn insert_commentary(&mut self, key: &str, text: &str) -> Result<()> {
        let card = Card::commentary(self.key_ref(key)?, text);
        self.cards.insert(&mut self.cursor, card);
        Ok(())
    }

    pub fn insert_comment(&mut self, text: &str) {
        let card = Card::commentary(self.registry.resolve_or_create(std_keys::COMMENT), text);
        self.cards.insert(&mut self.cursor, card);
    }

    pub fn insert_history(&mut self, text: &str) {
        let card = Card::commentary(self.registry.resolve_or_create(std_keys::HISTORY), text);
        self.cards.insert(&mut self.cursor, card);
    }

    /// Replace the card for `key` with `card`, keeping its position
    pub fn update_line(&mut self, key: &str, card: Card) -> Result<()> {
        self.remove_card(key);
        self.add_card(card)
    }

    /// Merge every card of `other` into this header
    pub fn update_lines(&mut self, other: &Header) -> Result<()> {
        for card in other.iter() {
            match card.key_str() {
                Some(std_keys::END) if !card.is_keyed() => {}
                Some(key) if card.is_keyed() => self.update_line(key, card.clone())?,
                _ => self.insert_here(card.clone())?,
            }
        }
        Ok(())
    }

    // Removal

    /// Remove the card for `key` together with its CONTINUE records
    pub fn remove_card(&mut self, key: &str) -> bool {
        self.take_card(key).is_some()
    }

    /// Remove and return the card for `key`, dropping its CONTINUE records
    /// in long-string mode; the cursor is left where the card was
    fn take_card(&mut self, key: &str) -> Option<Card> {
        if !self.cards.contains_key(key) {
            return None;
        }
        self.cursor = self.cards.seek(key);
        self.cards.next(&mut self.cursor)?;
        let card = self.cards.remove(&mut self.cursor)?;
        if self.long_strings && is_long_primary(&card) {
            self.remove_continuations();
        }
        Some(card)
    }

    fn remove_continuations(&mut self) {
        loop {
            let more = match self.cards.next(&mut self.cursor) {
                Some(card) if card.is_continue() => card
                    .comment()
                    .and_then(continue_fragment)
                    .map(|f| f.ends_with('&')),
                Some(_) => None,
                None => return,
            };
            match more {
                Some(more) => {
                    self.cards.remove(&mut self.cursor);
                    if !more {
                        return;
                    }
                }
                None => {
                    self.cards.prev(&mut self.cursor);
                    return;
                }
            }
        }
    }

    /// Remove exactly the card for `key`
    pub fn delete_key(&mut self, key: &str) -> bool {
        self.cursor = self.cards.seek(key);
        if self.cards.next(&mut self.cursor).is_none() {
            return false;
        }
        self.cards.remove(&mut self.cursor).is_some()
    }

    /// Rename the card for `old` to `new`
    pub fn replace_key(&mut self, old: &str, new: &str) -> Result<bool> {
        if !self.cards.contains_key(old) {
            return Ok(false);
        }
        let new_key = self.key_ref(new)?;
        self.cards.replace_key(old, new_key.clone())?;
        if let Some(card) = self.cards.get_mut(new) {
            card.rename(new_key, &self.options)?;
        }
        Ok(true)
    }

    // Structure

    fn axis_key(&self, axis: usize) -> String {
        expand_indexed(std_keys::NAXISN, &[axis])
    }

    /// Make this a primary header
    pub fn set_simple(&mut self, value: bool) -> Result<()> {
        self.delete_key(std_keys::SIMPLE);
        self.delete_key(std_keys::XTENSION);

        if self.cards.contains_key(std_keys::NAXIS) {
            let naxis = self.get_int(std_keys::NAXIS, 0).max(0) as usize;
            let last = if naxis > 0 {
                self.axis_key(naxis)
            } else {
                std_keys::NAXIS.to_string()
            };
            if self.cards.contains_key(last.as_str()) {
                self.remove_card(std_keys::EXTEND);
                self.find_card(&last);
                let extend = self
                    .new_card(std_keys::EXTEND)?
                    .with_bool(true)
                    .with_comment("FITS dataset may contain extensions");
                self.insert_here(extend)?;
            }
        }

        self.seek_start();
        let card = self
            .new_card(std_keys::SIMPLE)?
            .with_bool(value)
            .with_comment("conforms to FITS standard");
        self.insert_here(card)
    }

    /// Make this an extension header of type `xtension`
    pub fn set_xtension(&mut self, xtension: &str) -> Result<()> {
        self.delete_key(std_keys::SIMPLE);
        self.delete_key(std_keys::XTENSION);
        self.delete_key(std_keys::EXTEND);
        self.seek_start();
        let card = self
            .new_card(std_keys::XTENSION)?
            .with_str(xtension)?
            .with_comment("extension type");
        self.insert_here(card)
    }

    pub fn set_bitpix(&mut self, bitpix: i32) -> Result<()> {
        self.remove_card(std_keys::BITPIX);
        self.cursor = self.cards.cursor_at(1);
        let card = self
            .new_card(std_keys::BITPIX)?
            .with_int(i64::from(bitpix))
            .with_comment("number of bits per data pixel");
        self.insert_here(card)
    }

    pub fn set_naxes(&mut self, naxes: usize) -> Result<()> {
        self.remove_card(std_keys::NAXIS);
        self.seek(std_keys::BITPIX);
        self.next_card();
        let card = self
            .new_card(std_keys::NAXIS)?
            .with_int(naxes as i64)
            .with_comment("number of data axes");
        self.insert_here(card)
    }

    /// Set the length of axis `axis`, counting from 1
    pub fn set_naxis(&mut self, axis: usize, length: i64) -> Result<()> {
        if axis == 0 {
            return Ok(());
        }
        let key = self.axis_key(axis);
        self.remove_card(&key);
        let after = if axis == 1 {
            std_keys::NAXIS.to_string()
        } else {
            self.axis_key(axis - 1)
        };
        self.seek(&after);
        self.next_card();
        let card = self
            .new_card(&key)?
            .with_int(length)
            .with_comment(format!("length of data axis {axis}"));
        self.insert_here(card)
    }

    /// Check the mandatory keyword sequence at the start of the header
    pub fn check_structure(&self) -> Result<()> {
        let mut cards = self.cards.values();
        let Some(first) = cards.next() else {
            return Err(structure_error("SIMPLE or XTENSION", None, 0));
        };

        let (extension, table) = if first.is_key(std_keys::SIMPLE) {
            (false, false)
        } else if first.is_key(std_keys::XTENSION) {
            let kind = first
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| structure_error("XTENSION value", Some(first), 0))?;
            (true, matches!(kind, "BINTABLE" | "A3DTABLE" | "TABLE"))
        } else {
            return Err(structure_error("SIMPLE or XTENSION", Some(first), 0));
        };

        let naxis = self.get_int(std_keys::NAXIS, 0).max(0) as usize;
        let mut expected = vec![std_keys::BITPIX.to_string(), std_keys::NAXIS.to_string()];
        expected.extend((1..=naxis).map(|axis| self.axis_key(axis)));
        if extension {
            expected.push(std_keys::PCOUNT.to_string());
            expected.push(std_keys::GCOUNT.to_string());
            if table {
                expected.push(std_keys::TFIELDS.to_string());
            }
        }

        for (i, name) in expected.iter().enumerate() {
            match cards.next() {
                Some(card) if card.is_key(name) => {}
                found => return Err(structure_error(name, found, i + 1)),
            }
        }
        Ok(())
    }

    /// Make END the single last card
    pub fn check_end(&mut self) {
        let mut cursor = self.cards.cursor();
        while let Some(card) = self.cards.next(&mut cursor) {
            if card.is_key(std_keys::END) && !card.is_keyed() {
                self.cards.remove(&mut cursor);
            }
        }
        let end = Card::commentary(self.registry.resolve_or_create(std_keys::END), "");
        self.cards.push(end);
        self.cursor = self.cards.cursor_end();
    }

    /// Starts with a root keyword, BITPIX and NAXIS, and ends with END
    pub fn is_valid(&self) -> bool {
        if self.cards.len() < 4 {
            return false;
        }
        let mut cards = self.cards.values();
        let root = cards
            .next()
            .is_some_and(|c| c.is_key(std_keys::SIMPLE) || c.is_key(std_keys::XTENSION));
        let bitpix = cards.next().is_some_and(|c| c.is_key(std_keys::BITPIX));
        let naxis = cards.next().is_some_and(|c| c.is_key(std_keys::NAXIS));
        let end = cards.last().is_some_and(|c| c.is_key(std_keys::END));
        root && bitpix && naxis && end
    }

    /// Reorder so the mandatory keywords come first and END last
    pub fn sort_canonical(&mut self) {
        self.cards
            .sort_by(|a, b| canonical_rank(a).cmp(&canonical_rank(b)));
        self.cursor = self.cards.cursor_end();
    }

    // Sizes

    /// Size of the data segment in bytes, before block padding
    pub fn true_data_size(&self) -> u64 {
        if !self.is_valid() {
            return 0;
        }
        let naxis = self.get_int(std_keys::NAXIS, 0).max(0) as usize;
        if naxis == 0 {
            return 0;
        }
        let axes: Vec<i64> = (1..=naxis)
            .map(|axis| self.get_long(&self.axis_key(axis), 0))
            .collect();
        let groups = self.get_bool(std_keys::GROUPS, false);
        let pcount = self.get_long(std_keys::PCOUNT, 0);
        let gcount = self.get_long(std_keys::GCOUNT, 1);
        let start = usize::from(groups && naxis > 1 && axes[0] == 0);

        let elements = axes[start..].iter().fold(1i64, |acc, &n| acc.saturating_mul(n));
        let bytes_per_element = i64::from(self.get_int(std_keys::BITPIX, 0).unsigned_abs() / 8);
        let size = elements
            .saturating_add(pcount)
            .saturating_mul(gcount)
            .saturating_mul(bytes_per_element);
        u64::try_from(size).unwrap_or(0)
    }

    /// Size of the data segment including block padding
    pub fn data_size(&self) -> u64 {
        padded_size(self.true_data_size())
    }

    /// Size of the header on disk, or 0 for an invalid header
    pub fn size(&self) -> u64 {
        if !self.is_valid() {
            return 0;
        }
        padded_size((self.cards.len() * CARD_SIZE) as u64)
    }

    /// Size the header occupied when it was read
    pub fn original_size(&self) -> u64 {
        padded_size((self.original_count * CARD_SIZE) as u64)
    }

    /// Take the current card count as the on-disk size
    pub fn reset_original_size(&mut self) {
        self.original_count = self.cards.len();
    }

    // Output

    /// True when the header can be written back over its original location
    pub fn can_rewrite(&self) -> bool {
        let blocks = |count: usize| count.saturating_sub(1) / CARDS_PER_BLOCK;
        self.anchor.is_some_and(|a| a.writable)
            && blocks(self.cards.len()) == blocks(self.original_count)
    }

    /// Write the header with END and block padding
    pub fn write<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        self.sort_canonical();
        self.check_end();
        self.check_structure()?;

        for card in self.cards.values() {
            out.write_all(&card.to_bytes())?;
        }
        let used = (self.cards.len() * CARD_SIZE) as u64;
        write_fill(out, HEADER_FILL, padding_for(used))?;
        out.flush()?;
        Ok(())
    }

    /// Write the header and remember where it went
    pub fn write_anchored<S: RandomAccess + Write + ?Sized>(&mut self, out: &mut S) -> Result<()> {
        let anchor = out.anchor()?;
        self.write(out)?;
        self.anchor = Some(anchor);
        self.original_count = self.cards.len();
        Ok(())
    }

    /// Overwrite the header at its anchor
    pub fn rewrite<S: RandomAccess + Write + ?Sized>(&mut self, out: &mut S) -> Result<()> {
        self.check_end();
        let anchor = match self.anchor {
            Some(anchor) if self.can_rewrite() => anchor,
            _ => return Err(Error::RewriteNotEligible { element: "header" }),
        };
        out.seek(SeekFrom::Start(anchor.offset))?;
        self.write(out)?;
        debug!(offset = anchor.offset, cards = self.cards.len(), "rewrote header in place");
        Ok(())
    }
}

fn attach(card: Card, comment: Option<&str>) -> Card {
    match comment {
        Some(comment) => card.with_comment(comment),
        None => card,
    }
}
