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

//! Parsing of escape sequences.

use super::Parser;
use crate::grammar::{Error, ErrorKind, Position, Result};

impl Parser<'_, '_> {
    /// Parses an escape sequence (see [RFC 1035 § 5.1] and [RFC 4343 §
    /// 2.1]). This assumes that the caller has already seen and
    /// discarded the leading `\`.
    ///
    /// [RFC 1035 § 5.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.1
    /// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
    pub(super) fn parse_escape(&mut self) -> Result<u8> {
        let start_position = self.reader.position();
        match self.reader.read_octet() {
            Some(first) if first.is_ascii_digit() => {
                self.parse_decimal_escape(first, start_position)
            }
            Some(first) => Ok(first),
            None => Err(Error::new(start_position, ErrorKind::EofInEscape)),
        }
    }

    /// Parses a three-decimal-digit escape sequence after the caller
    /// has already read the first digit.
    fn parse_decimal_escape(&mut self, first: u8, start_position: Position) -> Result<u8> {
        let mut value = (first - b'0') as usize;
        for _ in 0..2 {
            match self.reader.read_octet() {
                Some(digit) if digit.is_ascii_digit() => {
                    value = 10 * value + (digit - b'0') as usize;
                }
                Some(_) => {
                    return Err(Error::new(
                        start_position,
                        ErrorKind::EscapeNeedsThreeDigits,
                    ))
                }
                None => return Err(Error::new(start_position, ErrorKind::EofInEscape)),
            }
        }
        u8::try_from(value)
            .map_err(|_| Error::new(start_position, ErrorKind::EscapeValueOutOfRange))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
