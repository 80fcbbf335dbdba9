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

//! Parsing of resource records.

use std::str;

use super::{FieldOrEol, Fields, Owner, Parser, RecordStatement, ZoneStatement};
use crate::class::Class;
use crate::grammar::{Error, ErrorKind, Result};
use crate::name::NameRef;
use crate::rr::{Rdata, Type};
use crate::time::TimeLiteral;
use crate::util::ascii_hex_digit_to_nibble;

impl Parser<'_, '_> {
    ////////////////////////////////////////////////////////////////////
    // PARSING OF RESOURCE RECORDS (OR EMPTY LINES)                   //
    ////////////////////////////////////////////////////////////////////

    /// Parses a resource record or an empty line.
    pub(super) fn parse_record_or_empty(&mut self) -> Result<Option<ZoneStatement>> {
        let start_of_line = self.reader.position();
        let leading_whitespace = self.reader.skip_whitespace();
        if self.reader.skip_to_next_field_or_through_eol()? == FieldOrEol::Eol {
            return Ok(None);
        }

        // Leading whitespace is significant: the owner is the previous
        // record's owner.
        let owner = if leading_whitespace {
            if !self.seen_owner {
                return Err(Error::new(
                    start_of_line,
                    ErrorKind::EmptyOwnerWithNoPrevious,
                ));
            }
            Owner::Inherit
        } else {
            Owner::Name(self.parse_name()?)
        };

        self.reader.skip_to_next_field(ErrorKind::ExpectedType)?;
        let (ttl, class) = self.parse_ttl_and_class()?;
        let (rr_type, rdata) = self.parse_type_and_rdata()?;
        self.seen_owner = true;

        Ok(Some(ZoneStatement::Record(RecordStatement {
            line: start_of_line.line,
            owner,
            ttl,
            class,
            rr_type,
            rdata,
        })))
    }

    ////////////////////////////////////////////////////////////////////
    // RESOURCE RECORD PARSING HELPERS                                //
    ////////////////////////////////////////////////////////////////////

    /// Parses the optional TTL and CLASS fields of a record, which may
    /// appear in either order. As noted in RFC 1035 § 5.1, TTLs,
    /// classes, and types are disjoint, so trying each in turn gives a
    /// unique parse. [`super::Reader::read_field`] consumes nothing
    /// when it fails, so a failed attempt can simply be retried as
    /// something else.
    fn parse_ttl_and_class(&mut self) -> Result<(Option<TimeLiteral>, Option<Class>)> {
        let mut ttl = None;
        let mut class = None;
        loop {
            if ttl.is_none() {
                if let Ok(value) = self.reader.read_field(ErrorKind::InvalidTime) {
                    ttl = Some(value);
                    self.reader.skip_to_next_field(ErrorKind::ExpectedType)?;
                    continue;
                }
            }
            if class.is_none() {
                if let Ok(value) = self.reader.read_field(ErrorKind::InvalidClass) {
                    class = Some(value);
                    self.reader.skip_to_next_field(ErrorKind::ExpectedType)?;
                    continue;
                }
            }
            return Ok((ttl, class));
        }
    }

    /// Parses the type field and then the RDATA, through the end of the
    /// line. The record matcher is chosen by mnemonic first, then by
    /// type code (for the `TYPEnnn` form). RDATA in the generic `\#`
    /// form of [RFC 3597 § 5] is accepted for any type.
    ///
    /// [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5
    fn parse_type_and_rdata(&mut self) -> Result<(Type, Rdata<NameRef>)> {
        let type_position = self.reader.position();
        let mnemonic = str::from_utf8(self.reader.peek_field())
            .map_err(|e| Error::new(type_position, ErrorKind::BadUtf8(e)))?;
        let grammar = self.grammar;
        let (rr_type, matcher) = match grammar.record_matcher(mnemonic) {
            Some(matcher) => {
                self.reader.read_raw_field();
                (matcher.rr_type(), Some(matcher))
            }
            None => {
                let rr_type: Type = self.reader.read_field(ErrorKind::InvalidType)?;
                (rr_type, grammar.record_matcher_for_type(rr_type))
            }
        };

        let rdata_position = self.reader.position();
        let has_rdata = self.reader.skip_to_next_field_or_to_eol()? == FieldOrEol::Field;
        let rdata = if has_rdata && self.reader.expect_field(b"\\#") {
            self.parse_unknown_rdata()?
        } else if let Some(matcher) = matcher {
            matcher.parse_rdata(&mut Fields::new(self))?
        } else {
            return Err(Error::new(rdata_position, ErrorKind::ExpectedBackslashHash));
        };
        self.reader.expect_eol()?;
        Ok((rr_type, rdata))
    }

    ////////////////////////////////////////////////////////////////////
    // GENERIC RDATA                                                  //
    ////////////////////////////////////////////////////////////////////

    /// Parses RDATA in the `\#` format. This expects that the caller
    /// has already consumed the `\#` marker. The hexadecimal digits may
    /// be split into several fields.
    fn parse_unknown_rdata(&mut self) -> Result<Rdata<NameRef>> {
        self.reader.skip_to_next_field(ErrorKind::ExpectedRdataLen)?;
        let len: u16 = self.reader.read_field(ErrorKind::InvalidRdataLen)?;
        let len = len as usize;
        let mut octets = Vec::with_capacity(len);
        if len > 0 {
            self.reader.skip_to_next_field(ErrorKind::ExpectedHexRdata)?;
        }
        while octets.len() < len {
            let high = self.parse_ascii_hex_digit()?;
            let low = self.parse_ascii_hex_digit()?;
            octets.push((high << 4) | low);
            if self.reader.at_field_end() && octets.len() < len {
                self.reader
                    .skip_to_next_field(ErrorKind::UnexpectedEndOfHexRdata)?;
            }
        }
        if self.reader.skip_to_next_field_or_to_eol()? == FieldOrEol::Field {
            return Err(Error::new(self.reader.position(), ErrorKind::RdataLenMismatch));
        }
        Ok(Rdata::Unknown(octets))
    }

    /// Parses a single ASCII hexadecimal digit.
    fn parse_ascii_hex_digit(&mut self) -> Result<u8> {
        let position = self.reader.position();
        match self.reader.read_field_octet() {
            Some(digit) => ascii_hex_digit_to_nibble(digit)
                .ok_or_else(|| Error::new(position, ErrorKind::InvalidHexDigit)),
            None => Err(Error::new(position, ErrorKind::UnexpectedEndOfHexRdata)),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::tests::make_parser;
    use super::*;

    fn record(data: &[u8]) -> RecordStatement {
        match make_parser(data).parse_record_or_empty() {
            Ok(Some(ZoneStatement::Record(record))) => record,
            other => panic!("unexpected result {:?}", other),
        }
    }

    fn error_kind(data: &[u8]) -> ErrorKind {
        match make_parser(data).parse_record_or_empty() {
            Err(Error::Syntax(details)) => details.kind().clone(),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn ttl_and_class_may_appear_in_either_order() {
        let a = record(b"host 1h IN A 192.0.2.1\n");
        let b = record(b"host IN 1h A 192.0.2.1\n");
        assert_eq!(a.ttl, b.ttl);
        assert_eq!(a.class, Some(Class::IN));
        assert_eq!(b.class, Some(Class::IN));
        assert_eq!(a.ttl.unwrap().seconds(), 3600);
    }

    #[test]
    fn ttl_and_class_may_be_omitted() {
        let record = record(b"host A 192.0.2.1\n");
        assert_eq!(record.ttl, None);
        assert_eq!(record.class, None);
        assert_eq!(record.rr_type, Type::A);
    }

    #[test]
    fn type_mnemonics_are_case_insensitive() {
        assert_eq!(record(b"host cname other\n").rr_type, Type::CNAME);
    }

    #[test]
    fn generic_rdata_works() {
        let record = record(b"host TYPE65280 \\# 4 0a00 0001\n");
        assert_eq!(record.rr_type, Type::from(65280));
        assert_eq!(record.rdata, Rdata::Unknown(vec![10, 0, 0, 1]));
    }

    #[test]
    fn generic_rdata_is_accepted_for_known_types() {
        assert_eq!(record(b"h A \\# 0\n").rdata, Rdata::Unknown(vec![]));
        assert_eq!(
            record(b"h A \\# 4 c0000201\n").rdata,
            Rdata::Unknown(vec![192, 0, 2, 1]),
        );
    }

    #[test]
    fn generic_rdata_length_must_match() {
        assert_eq!(
            error_kind(b"host TYPE65280 \\# 4 0a0000\n"),
            ErrorKind::UnexpectedEndOfHexRdata,
        );
        assert_eq!(
            error_kind(b"host TYPE65280 \\# 1 0a00\n"),
            ErrorKind::RdataLenMismatch,
        );
        assert_eq!(
            error_kind(b"host TYPE65280 \\# 1 zz\n"),
            ErrorKind::InvalidHexDigit,
        );
    }

    #[test]
    fn types_without_matchers_need_generic_rdata() {
        assert_eq!(
            error_kind(b"host CAA 0 issue \"ca.example\"\n"),
            ErrorKind::ExpectedBackslashHash,
        );
    }

    #[test]
    fn unknown_mnemonics_are_rejected() {
        assert!(matches!(
            error_kind(b"host FROB data\n"),
            ErrorKind::InvalidType(_),
        ));
    }

    #[test]
    fn extra_fields_are_rejected() {
        assert_eq!(
            error_kind(b"host A 192.0.2.1 192.0.2.2\n"),
            ErrorKind::ExpectedEol,
        );
    }

    #[test]
    fn missing_type_is_rejected() {
        assert_eq!(error_kind(b"host 3600 IN\n"), ErrorKind::ExpectedType);
    }
}
