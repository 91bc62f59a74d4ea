//! Fixed-width ASCII field parsing
//!
//! [`ByteParser`] walks a byte buffer and decodes one logical, integer,
//! floating point or raw string field at a time. Each call consumes at most
//! `max_len` bytes, records how many it used in [`ByteParser::number_length`],
//! and leaves the offset untouched when it fails.

use crate::error::{FitsError, Result};

/// Cursor over a byte buffer holding fixed-width fields
#[derive(Debug, Clone)]
pub struct ByteParser<'a> {
    input: &'a [u8],
    offset: usize,
    number_length: usize,
    fill_fields: bool,
}

#[inline]
fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

impl<'a> ByteParser<'a> {
    /// Create a lenient parser positioned at the start of `input`
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            number_length: 0,
            fill_fields: false,
        }
    }

    /// Require the rest of every field to be blank after the value
    pub fn with_fill_fields(mut self, fill_fields: bool) -> Self {
        self.fill_fields = fill_fields;
        self
    }

    pub fn set_fill_fields(&mut self, fill_fields: bool) {
        self.fill_fields = fill_fields;
    }

    /// Replace the buffer and rewind to its start
    pub fn set_buffer(&mut self, input: &'a [u8]) {
        self.input = input;
        self.offset = 0;
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.input
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset.min(self.input.len());
    }

    /// Bytes consumed by the last parse
    pub fn number_length(&self) -> usize {
        self.number_length
    }

    /// Bytes left after the offset
    pub fn remaining(&self) -> usize {
        self.input.len() - self.offset
    }

    pub fn skip(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.input.len());
    }

    /// Skip blanks within the next `len` bytes, returning how many were skipped
    pub fn skip_white(&mut self, len: usize) -> usize {
        let len = len.min(self.remaining());
        let skipped = self.input[self.offset..self.offset + len]
            .iter()
            .take_while(|&&b| is_blank(b))
            .count();
        self.offset += skipped;
        skipped
    }

    fn is_white(&self, len: usize) -> bool {
        let len = len.min(self.remaining());
        self.input[self.offset..self.offset + len]
            .iter()
            .all(|&b| is_blank(b))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.offset).copied()
    }

    /// Consume an optional sign, returning `(sign, found)`
    fn check_sign(&mut self) -> (i8, bool) {
        match self.peek() {
            Some(b'+') => {
                self.offset += 1;
                (1, true)
            }
            Some(b'-') => {
                self.offset += 1;
                (-1, true)
            }
            _ => (1, false),
        }
    }

    /// Accumulate a run of digits in floating point, returning `(value, digits)`
    fn bare_integer(&mut self, len: usize) -> (f64, usize) {
        let mut number = 0.0f64;
        let mut digits = 0;
        while digits < len {
            match self.peek() {
                Some(b) if b.is_ascii_digit() => {
                    number = number * 10.0 + f64::from(b - b'0');
                    self.offset += 1;
                    digits += 1;
                }
                _ => break,
            }
        }
        (number, digits)
    }

    fn matches_ignore_case(&self, token: &[u8]) -> bool {
        self.input
            .get(self.offset..self.offset + token.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(token))
    }

    /// Enforce blank fill over the `left` bytes after a value
    fn finish_field(&mut self, start: usize, left: usize, reason: &'static str) -> Result<()> {
        if self.fill_fields && left > 0 {
            if self.is_white(left) {
                self.offset += left.min(self.remaining());
            } else {
                return Err(self.fail(start, reason));
            }
        }
        self.number_length = self.offset - start;
        Ok(())
    }

    fn fail(&mut self, start: usize, reason: &'static str) -> FitsError {
        self.offset = start;
        self.number_length = 0;
        FitsError::format(reason, start)
    }

    /// Parse a `T`/`F` logical from the next `max_len` bytes
    pub fn parse_bool(&mut self, max_len: usize) -> Result<bool> {
        let start = self.offset;
        let mut len = max_len.min(self.remaining());
        len -= self.skip_white(len);
        if len == 0 {
            return Err(self.fail(start, "blank logical field"));
        }

        let value = match self.peek() {
            Some(b'T' | b't') => true,
            Some(b'F' | b'f') => false,
            _ => return Err(self.fail(start, "invalid logical value")),
        };
        self.offset += 1;
        len -= 1;

        self.finish_field(start, len, "non-blank after logical")?;
        Ok(value)
    }

    /// Parse a signed integer of at most `max_len` bytes into an `i64`
    pub fn parse_long(&mut self, max_len: usize) -> Result<i64> {
        let start = self.offset;
        let mut len = max_len.min(self.remaining());
        len -= self.skip_white(len);
        if len == 0 {
            self.number_length = self.offset - start;
            return Ok(0);
        }

        let (sign, found) = self.check_sign();
        if found {
            len -= 1;
        }

        // Accumulated as a negative magnitude so i64::MIN fits
        let mut number: i64 = 0;
        let mut digits = 0;
        while digits < len {
            let Some(b) = self.peek().filter(u8::is_ascii_digit) else {
                break;
            };
            let digit = i64::from(b - b'0');
            number = match number
                .checked_mul(10)
                .and_then(|n| n.checked_sub(digit))
            {
                Some(n) => n,
                None => return Err(self.fail(start, "integer overflow")),
            };
            self.offset += 1;
            digits += 1;
        }
        if digits == 0 {
            return Err(self.fail(start, "invalid integer"));
        }
        len -= digits;

        let value = if sign < 0 { Some(number) } else { number.checked_neg() };
        let Some(value) = value else {
            return Err(self.fail(start, "integer overflow"));
        };
        self.finish_field(start, len, "non-blank after integer")?;
        Ok(value)
    }

    /// Parse a signed integer of at most `max_len` bytes into an `i32`
    pub fn parse_int(&mut self, max_len: usize) -> Result<i32> {
        let start = self.offset;
        let value = self.parse_long(max_len)?;
        i32::try_from(value).map_err(|_| self.fail(start, "integer overflow"))
    }

    /// Parse a real number of at most `max_len` bytes
    ///
    /// Accepts `NaN`, `Inf` and `Infinity` in any case, and `e`, `E`, `d` or
    /// `D` as the exponent marker.
    pub fn parse_double(&mut self, max_len: usize) -> Result<f64> {
        let start = self.offset;
        let mut len = max_len.min(self.remaining());
        len -= self.skip_white(len);
        if len == 0 {
            self.number_length = self.offset - start;
            return Ok(0.0);
        }

        let (sign, found) = self.check_sign();
        if found {
            len -= 1;
        }

        let number;
        if len >= 3 && self.matches_ignore_case(b"nan") {
            number = f64::NAN;
            self.offset += 3;
            len -= 3;
        } else if len >= 8 && self.matches_ignore_case(b"infinity") {
            number = f64::INFINITY;
            self.offset += 8;
            len -= 8;
        } else if len >= 3 && self.matches_ignore_case(b"inf") {
            number = f64::INFINITY;
            self.offset += 3;
            len -= 3;
        } else {
            let (mut mantissa, int_digits) = self.bare_integer(len);
            len -= int_digits;
            let mut any_digits = int_digits > 0;

            if len > 0 && self.peek() == Some(b'.') {
                self.offset += 1;
                len -= 1;
                let (fraction, frac_digits) = self.bare_integer(len);
                if fraction > 0.0 {
                    mantissa += fraction / 10f64.powi(frac_digits as i32);
                }
                len -= frac_digits;
                any_digits |= frac_digits > 0;
            }

            if !any_digits {
                return Err(self.fail(start, "invalid real field"));
            }

            if len > 0 && matches!(self.peek(), Some(b'e' | b'E' | b'd' | b'D')) {
                self.offset += 1;
                len -= 1;
                if len > 0 {
                    let (exp_sign, found) = self.check_sign();
                    if found {
                        len -= 1;
                    }
                    let (exp, exp_digits) = self.bare_integer(len);
                    len -= exp_digits;
                    let exponent = (exp as i32).saturating_mul(i32::from(exp_sign));
                    if exponent > -300 {
                        mantissa *= 10f64.powi(exponent);
                    } else {
                        mantissa = 1.0e-300 * (mantissa * 10f64.powi(exponent + 300));
                    }
                }
            }
            number = mantissa;
        }

        self.finish_field(start, len, "non-blank after real")?;
        Ok(f64::from(sign) * number)
    }

    /// Parse a real number of at most `max_len` bytes, narrowed to `f32`
    pub fn parse_float(&mut self, max_len: usize) -> Result<f32> {
        self.parse_double(max_len).map(|v| v as f32)
    }

    /// Take exactly `len` bytes as text, without trimming
    pub fn read_string(&mut self, len: usize) -> String {
        let len = len.min(self.remaining());
        let text = String::from_utf8_lossy(&self.input[self.offset..self.offset + len]).into_owned();
        self.offset += len;
        self.number_length = len;
        text
    }
}
