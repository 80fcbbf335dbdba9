// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! The [`Reader`] structure.
//!
//! See the [`zone_file` module-level documentation](`super`) for
//! implementation details about how the [`Reader`] is used.

use std::str::{self, FromStr};

use crate::grammar::{Error, ErrorKind, Position, Result};

////////////////////////////////////////////////////////////////////////
// STRUCTURES                                                         //
////////////////////////////////////////////////////////////////////////

/// Performs low-level reading of a zone file held in memory.
///
/// The [`Reader`] implements basic operations for reading data and
/// moving between fields and lines in a zone file. This includes
/// processing comments and parentheses for line extension.
pub(super) struct Reader<'a> {
    data: &'a [u8],
    start: usize,
    in_parens: bool,
    position: Position,
}

/// Indicates whether certain operations stopped at the next field on
/// a line, or at a line ending.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum FieldOrEol {
    Field,
    Eol,
}

////////////////////////////////////////////////////////////////////////
// READER IMPLEMENTATION                                              //
////////////////////////////////////////////////////////////////////////

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            start: 0,
            in_parens: false,
            position: Position::START,
        }
    }

    /// Returns the current [`Position`].
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn at_eof(&self) -> bool {
        self.start >= self.data.len()
    }

    ////////////////////////////////////////////////////////////////////
    // PEEKING AND READING OF RAW DATA                                //
    ////////////////////////////////////////////////////////////////////

    /// Returns the octet at `index` (where `0` is the first unconsumed
    /// octet), or `None` if it is beyond the end of the data.
    fn peek_octet_at(&self, index: usize) -> Option<u8> {
        self.data.get(self.start + index).copied()
    }

    pub fn peek_octet(&self) -> Option<u8> {
        self.peek_octet_at(0)
    }

    /// Consumes and returns the next octet, or returns `None` at
    /// end-of-file. Newlines update the line/column position.
    pub fn read_octet(&mut self) -> Option<u8> {
        let octet = self.peek_octet()?;
        self.start += 1;
        if octet == b'\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(octet)
    }

    /// Consumes `len` octets that are known not to contain newlines.
    fn advance(&mut self, len: usize) {
        self.start += len;
        self.position.column += len;
    }

    ////////////////////////////////////////////////////////////////////
    // EOL DETECTION                                                  //
    ////////////////////////////////////////////////////////////////////

    /// Detects a line ending at `index`. The length of the line ending
    /// is returned: `0` for end-of-file, `1` for a newline, or `2` for
    /// a carriage return plus newline. If `index` is not the start of a
    /// line ending, `None` is returned.
    fn get_eol_at(&self, index: usize) -> Option<usize> {
        match (self.peek_octet_at(index), self.peek_octet_at(index + 1)) {
            (None, _) => Some(0),
            (Some(b'\n'), _) => Some(1),
            (Some(b'\r'), Some(b'\n')) => Some(2),
            _ => None,
        }
    }

    fn get_eol(&self) -> Option<usize> {
        self.get_eol_at(0)
    }

    /// Consumes a line ending of length `eol_len`.
    fn consume_eol(&mut self, eol_len: usize) {
        if eol_len > 0 {
            self.start += eol_len;
            self.position.line += 1;
            self.position.column = 1;
        }
    }

    ////////////////////////////////////////////////////////////////////
    // READING OF FIELDS                                              //
    ////////////////////////////////////////////////////////////////////

    /// Returns whether `index` marks the end of a zone file field: an
    /// end of line or a field-ending character (see [`ends_field`]).
    fn at_field_end_at(&self, index: usize) -> bool {
        self.get_eol_at(index).is_some()
            || self.peek_octet_at(index).map_or(true, ends_field)
    }

    pub fn at_field_end(&self) -> bool {
        self.at_field_end_at(0)
    }

    /// Returns the length of the field at the current position.
    /// Backslash escapes are skipped over, so that an escaped space
    /// does not end the field.
    fn field_len(&self) -> usize {
        let mut len = 0;
        while !self.at_field_end_at(len) {
            if self.peek_octet_at(len) == Some(b'\\') && self.get_eol_at(len + 1).is_none() {
                len += 1;
            }
            len += 1;
        }
        len
    }

    /// Returns the raw text of the field at the current position
    /// without consuming it.
    pub fn peek_field(&self) -> &'a [u8] {
        &self.data[self.start..self.start + self.field_len()]
    }

    /// Consumes the field at the current position and returns its raw
    /// text.
    pub fn read_raw_field(&mut self) -> &'a [u8] {
        let raw = self.peek_field();
        self.advance(raw.len());
        raw
    }

    /// Checks whether the next field is exactly (bitwise) equal to
    /// `field`. If equal, the field is consumed.
    pub fn expect_field(&mut self, field: &[u8]) -> bool {
        if self.peek_field() == field {
            self.advance(field.len());
            true
        } else {
            false
        }
    }

    /// Checks whether the next field is case-insensitively equal (in
    /// ASCII) to `field`. If equal, the field is consumed.
    pub fn expect_field_case_insensitive(&mut self, field: &[u8]) -> bool {
        if self.peek_field().eq_ignore_ascii_case(field) {
            self.advance(field.len());
            true
        } else {
            false
        }
    }

    /// Consumes a field, converting it to UTF-8 and then parsing it
    /// into a value of type `T`. If parsing fails, nothing is consumed.
    /// The parameter `or_else` converts `<T as FromStr>::Err` into an
    /// [`ErrorKind`].
    pub fn read_field<T, F>(&mut self, or_else: F) -> Result<T>
    where
        T: FromStr,
        F: FnOnce(T::Err) -> ErrorKind,
    {
        let raw = self.peek_field();
        let utf8 = str::from_utf8(raw)
            .map_err(|e| Error::new(self.position, ErrorKind::BadUtf8(e)))?;
        match utf8.parse() {
            Ok(value) => {
                // Fields read this way are ASCII in practice, so the
                // length in octets is the number of columns.
                self.advance(raw.len());
                Ok(value)
            }
            Err(e) => Err(Error::new(self.position, or_else(e)).with_token(utf8)),
        }
    }

    /// Returns `None` at a field end, and otherwise consumes and
    /// returns the next octet.
    pub fn read_field_octet(&mut self) -> Option<u8> {
        if self.at_field_end() {
            None
        } else {
            self.read_octet()
        }
    }

    ////////////////////////////////////////////////////////////////////
    // "NAVIGATION" AMONG FIELDS AND LINES                            //
    ////////////////////////////////////////////////////////////////////

    /// Consumes whitespace (excluding newlines). Returns whether any
    /// whitespace was consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.peek_octet().map_or(false, is_whitespace) {
            skipped = true;
            self.advance(1);
        }
        skipped
    }

    /// Consumes data up to the next line ending, and the line ending
    /// itself if `through_eol` is set.
    fn skip_line(&mut self, through_eol: bool) {
        loop {
            if let Some(eol_len) = self.get_eol() {
                if through_eol {
                    self.consume_eol(eol_len);
                }
                return;
            }
            self.advance(1);
        }
    }

    /// The underlying implementation for the `skip_to_next_field_*`
    /// methods.
    fn field_or_eol_skipping_impl(&mut self, through_eol: bool) -> Result<FieldOrEol> {
        loop {
            self.skip_whitespace();
            if let Some(eol_len) = self.get_eol() {
                if self.in_parens {
                    if eol_len == 0 {
                        return Err(Error::new(self.position, ErrorKind::EofBeforeCloseParen));
                    }
                    self.consume_eol(eol_len);
                } else {
                    if through_eol {
                        self.consume_eol(eol_len);
                    }
                    return Ok(FieldOrEol::Eol);
                }
            } else {
                match self.peek_octet() {
                    Some(b';') => {
                        if self.in_parens {
                            self.skip_line(true);
                        } else {
                            self.skip_line(through_eol);
                            return Ok(FieldOrEol::Eol);
                        }
                    }
                    Some(b'(') => {
                        if self.in_parens {
                            return Err(Error::new(self.position, ErrorKind::NestedParens));
                        }
                        self.in_parens = true;
                        self.advance(1);
                    }
                    Some(b')') => {
                        if !self.in_parens {
                            return Err(Error::new(self.position, ErrorKind::UnmatchedCloseParen));
                        }
                        self.in_parens = false;
                        self.advance(1);
                    }
                    _ => return Ok(FieldOrEol::Field),
                }
            }
        }
    }

    /// Consumes data until the next field, or until and including the
    /// next line ending (whichever comes first). Newlines within
    /// parentheses are not line endings.
    pub fn skip_to_next_field_or_through_eol(&mut self) -> Result<FieldOrEol> {
        self.field_or_eol_skipping_impl(true)
    }

    /// Like [`Reader::skip_to_next_field_or_through_eol`], except that
    /// it does not consume the line ending if it comes first.
    pub fn skip_to_next_field_or_to_eol(&mut self) -> Result<FieldOrEol> {
        self.field_or_eol_skipping_impl(false)
    }

    /// Consumes data until the next field on the same logical line. If
    /// a line ending is found first, an error of kind `error_on_eol` is
    /// raised.
    pub fn skip_to_next_field(&mut self, error_on_eol: ErrorKind) -> Result<()> {
        if self.skip_to_next_field_or_to_eol()? != FieldOrEol::Field {
            Err(Error::new(self.position, error_on_eol))
        } else {
            Ok(())
        }
    }

    /// Skips through the end of a line, returning an error of kind
    /// [`ErrorKind::ExpectedEol`] if another field is reached first.
    pub fn expect_eol(&mut self) -> Result<()> {
        if self.skip_to_next_field_or_through_eol()? != FieldOrEol::Eol {
            let token = String::from_utf8_lossy(self.peek_field()).into_owned();
            Err(Error::new(self.position, ErrorKind::ExpectedEol).with_token(&token))
        } else {
            Ok(())
        }
    }
}

/// Returns whether `c` is considered whitespace in a zone file.
fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// Returns whether `c` ends a field in a zone file.
fn ends_field(c: u8) -> bool {
    is_whitespace(c) || c == b'(' || c == b')' || c == b';'
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_end_at_whitespace_and_specials() {
        let reader = Reader::new(b"abc def");
        assert_eq!(reader.peek_field(), b"abc");
        assert_eq!(Reader::new(b"abc(def").peek_field(), b"abc");
        assert_eq!(Reader::new(b"abc;comment").peek_field(), b"abc");
        assert_eq!(Reader::new(b"abc\r\n").peek_field(), b"abc");
    }

    #[test]
    fn escaped_whitespace_does_not_end_fields() {
        assert_eq!(Reader::new(b"a\\ b c").peek_field(), b"a\\ b");
    }

    #[test]
    fn read_field_consumes_only_on_success() {
        let mut reader = Reader::new(b"1234 rest");
        assert!(reader.read_field::<u8, _>(ErrorKind::InvalidInt).is_err());
        assert_eq!(reader.position(), Position::START);
        assert_eq!(reader.read_field::<u16, _>(ErrorKind::InvalidInt).unwrap(), 1234);
        assert_eq!(reader.position(), Position { line: 1, column: 5 });
    }

    #[test]
    fn parentheses_join_lines() {
        let mut reader = Reader::new(b"a ( b\n c ) d\ne");
        let mut fields = Vec::new();
        while reader.skip_to_next_field_or_through_eol().unwrap() == FieldOrEol::Field {
            fields.push(reader.peek_field().to_vec());
            reader.advance(reader.field_len());
        }
        assert_eq!(fields, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
        assert_eq!(reader.position(), Position { line: 3, column: 1 });
    }

    #[test]
    fn comments_inside_parentheses_are_skipped() {
        let mut reader = Reader::new(b"( ; comment\n x )");
        reader.skip_to_next_field(ErrorKind::ExpectedName).unwrap();
        assert_eq!(reader.peek_field(), b"x");
    }

    #[test]
    fn paren_errors_are_detected() {
        assert!(matches!(
            Reader::new(b"( a ( b )").skip_to_next_field_or_through_eol(),
            Ok(FieldOrEol::Field),
        ));
        let mut nested = Reader::new(b"((");
        assert!(matches!(
            nested.skip_to_next_field_or_through_eol(),
            Err(Error::Syntax(details)) if details.kind() == &ErrorKind::NestedParens,
        ));
        let mut unmatched = Reader::new(b")");
        assert!(matches!(
            unmatched.skip_to_next_field_or_through_eol(),
            Err(Error::Syntax(details)) if details.kind() == &ErrorKind::UnmatchedCloseParen,
        ));
        let mut unclosed = Reader::new(b"( a");
        unclosed.skip_to_next_field_or_through_eol().unwrap();
        unclosed.advance(1);
        assert!(matches!(
            unclosed.skip_to_next_field_or_through_eol(),
            Err(Error::Syntax(details)) if details.kind() == &ErrorKind::EofBeforeCloseParen,
        ));
    }

    #[test]
    fn expect_eol_rejects_extra_fields() {
        let mut reader = Reader::new(b"  extra\n");
        assert!(matches!(
            reader.expect_eol(),
            Err(Error::Syntax(details))
                if details.kind() == &ErrorKind::ExpectedEol && details.token() == Some("extra"),
        ));
        assert!(Reader::new(b"  ; only a comment\n").expect_eol().is_ok());
    }
}
