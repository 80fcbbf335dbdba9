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

//! The [`Fields`] cursor handed to record matchers.

use std::net::{Ipv4Addr, Ipv6Addr};

use super::{FieldOrEol, Parser};
use crate::grammar::{Error, ErrorKind, Position, Result};
use crate::name::NameRef;
use crate::time::TimeLiteral;

/// A cursor over the RDATA fields of one record.
///
/// Each method skips to the next field on the logical line and parses
/// it, failing with an "expected ..." error if the line has ended.
/// After the [`RecordMatcher`](crate::grammar::RecordMatcher) returns,
/// the parser requires that every field was consumed.
pub struct Fields<'p, 'a, 'g> {
    parser: &'p mut Parser<'a, 'g>,
}

impl<'p, 'a, 'g> Fields<'p, 'a, 'g> {
    pub(super) fn new(parser: &'p mut Parser<'a, 'g>) -> Self {
        Self { parser }
    }

    /// Returns the position of the next unconsumed data.
    pub fn position(&self) -> Position {
        self.parser.reader.position()
    }

    /// Returns whether all fields of the line have been consumed.
    pub fn at_end(&mut self) -> Result<bool> {
        Ok(self.parser.reader.skip_to_next_field_or_to_eol()? == FieldOrEol::Eol)
    }

    pub fn name(&mut self) -> Result<NameRef> {
        self.parser.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
        self.parser.parse_name()
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.parser.reader.skip_to_next_field(ErrorKind::ExpectedU16)?;
        self.parser.reader.read_field(ErrorKind::InvalidInt)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.parser.reader.skip_to_next_field(ErrorKind::ExpectedU32)?;
        self.parser.reader.read_field(ErrorKind::InvalidInt)
    }

    /// Reads a duration, which BIND accepts wherever RDATA has a
    /// 32-bit count of seconds (e.g. the SOA timers).
    pub fn time(&mut self) -> Result<TimeLiteral> {
        self.parser.reader.skip_to_next_field(ErrorKind::ExpectedU32)?;
        self.parser.reader.read_field(ErrorKind::InvalidTime)
    }

    pub fn ipv4(&mut self) -> Result<Ipv4Addr> {
        self.parser.reader.skip_to_next_field(ErrorKind::ExpectedIpv4)?;
        self.parser.reader.read_field(ErrorKind::InvalidIpv4)
    }

    pub fn ipv6(&mut self) -> Result<Ipv6Addr> {
        self.parser.reader.skip_to_next_field(ErrorKind::ExpectedIpv6)?;
        self.parser.reader.read_field(ErrorKind::InvalidIpv6)
    }

    /// Reads a quoted or unquoted `<character-string>`.
    pub fn character_string(&mut self) -> Result<Vec<u8>> {
        self.parser
            .reader
            .skip_to_next_field(ErrorKind::ExpectedCharacterString)?;
        self.parser.parse_character_string()
    }

    /// Reads the next field as raw presentation text. A quoted field is
    /// returned with its quotes; escapes are left as written.
    pub fn word(&mut self) -> Result<String> {
        let reader = &mut self.parser.reader;
        reader.skip_to_next_field(ErrorKind::MissingArgument("RDATA field"))?;
        let start_position = reader.position();
        let raw = if reader.peek_octet() == Some(b'"') {
            let mut raw = vec![b'"'];
            reader.read_octet();
            loop {
                let character_position = reader.position();
                match reader.read_octet() {
                    Some(b'\\') => {
                        raw.push(b'\\');
                        raw.extend(reader.read_octet());
                    }
                    Some(b'"') => break,
                    Some(octet) => raw.push(octet),
                    None => {
                        return Err(Error::new(
                            character_position,
                            ErrorKind::EofInQuotedCharacterString,
                        ))
                    }
                }
            }
            raw.push(b'"');
            raw
        } else {
            reader.read_raw_field().to_vec()
        };
        String::from_utf8(raw)
            .map_err(|e| Error::new(start_position, ErrorKind::BadUtf8(e.utf8_error())))
    }

    /// Reads every remaining field with [`Fields::word`].
    pub fn rest(&mut self) -> Result<Vec<String>> {
        let mut words = Vec::new();
        while !self.at_end()? {
            words.push(self.word()?);
        }
        Ok(words)
    }
}
