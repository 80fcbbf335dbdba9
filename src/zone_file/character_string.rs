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

//! Parsing of `<character-string>`s.

use arrayvec::ArrayVec;

use super::Parser;
use crate::grammar::{Error, ErrorKind, Position, Result};

/// The longest `<character-string>` allowed on the wire.
const MAX_CHARACTER_STRING_LEN: usize = 255;

type CharacterString = ArrayVec<u8, MAX_CHARACTER_STRING_LEN>;

impl Parser<'_, '_> {
    /// Parses an [RFC 1035 § 3.3] `<character-string>`, which may be
    /// quoted or unquoted ([RFC 1035 § 5.1]). The caller should skip to
    /// the next field first.
    ///
    /// [RFC 1035 § 3.3]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3
    /// [RFC 1035 § 5.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.1
    pub(super) fn parse_character_string(&mut self) -> Result<Vec<u8>> {
        if self.reader.peek_octet() == Some(b'"') {
            self.parse_quoted_character_string()
        } else {
            self.parse_unquoted_character_string()
        }
    }

    /// Parses a quoted `<character-string>`. The caller is expected to
    /// have seen, but not consumed, the opening `"`.
    fn parse_quoted_character_string(&mut self) -> Result<Vec<u8>> {
        let start_position = self.reader.position();
        self.reader.read_octet();
        let mut character_string = CharacterString::new();
        loop {
            let character_position = self.reader.position();
            match self.reader.read_octet() {
                Some(b'\\') => {
                    let escaped = self.parse_escape()?;
                    push(&mut character_string, escaped, start_position)?;
                }
                // As in BIND, the closing quote ends the field even if
                // no whitespace follows it.
                Some(b'"') => break,
                Some(octet) => push(&mut character_string, octet, start_position)?,
                None => {
                    return Err(Error::new(
                        character_position,
                        ErrorKind::EofInQuotedCharacterString,
                    ))
                }
            }
        }
        Ok(character_string.to_vec())
    }

    fn parse_unquoted_character_string(&mut self) -> Result<Vec<u8>> {
        let start_position = self.reader.position();
        let mut character_string = CharacterString::new();
        while let Some(octet) = self.reader.read_field_octet() {
            let octet = if octet == b'\\' {
                self.parse_escape()?
            } else {
                octet
            };
            push(&mut character_string, octet, start_position)?;
        }
        Ok(character_string.to_vec())
    }
}

fn push(character_string: &mut CharacterString, octet: u8, start_position: Position) -> Result<()> {
    character_string
        .try_push(octet)
        .map_err(|_| Error::new(start_position, ErrorKind::CharacterStringTooLong))
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
