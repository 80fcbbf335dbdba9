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

//! Parsing of the [RFC 1035 § 5] zone file format.
//!
//! This module provides the [`Parser`] structure, which reads a zone
//! file held in memory and can be iterated over to produce
//! [`ZoneStatement`]s: records and `$ORIGIN`, `$TTL`, and `$INCLUDE`
//! directives. The parser records what the file *says*. Owners and
//! RDATA names are kept unresolved ([`NameRef`]), and omitted TTLs and
//! classes stay omitted, so the AST of a file does not depend on the
//! zone or `$INCLUDE` that brings it in. The database builder resolves
//! everything.
//!
//! ```
//! use bindscope::grammar::Grammar;
//! use bindscope::rr::Type;
//! use bindscope::zone_file::{self, ZoneStatement};
//!
//! const ZONE_FILE: &[u8] = br#"
//! $TTL 1d
//! @   IN SOA ns1 admin (
//!     123     ; SERIAL
//!     1h      ; REFRESH
//!     15m     ; RETRY
//!     1w      ; EXPIRE
//!     1h      ; MINIMUM
//! )
//!     IN NS ns1
//! ns1 IN A 192.0.2.1
//! "#;
//!
//! let statements = zone_file::parse(ZONE_FILE, &Grammar::default()).unwrap();
//! assert!(matches!(statements[0], ZoneStatement::Ttl { .. }));
//! assert!(matches!(&statements[1], ZoneStatement::Record(r) if r.rr_type == Type::SOA));
//! assert!(matches!(&statements[3], ZoneStatement::Record(r) if r.rr_type == Type::A));
//! ```
//!
//! # A note about the implementation
//!
//! It is very difficult to write a clean lexer for DNS zone files.
//! Parentheses extend a record across lines, leading whitespace is
//! significant, escaping applies to names and `<character-string>`s but
//! not to the `\#` token of [RFC 3597 § 5], and the TTL and class may
//! be omitted or appear in either order. So there is no separate
//! tokenizer: an internal `Reader` implements moving between fields and
//! lines (including comments and parentheses), and the [`Parser`] uses
//! it to parse each construct in context.
//!
//! [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5
//! [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5

use serde::{Deserialize, Serialize};

use crate::class::Class;
use crate::grammar::{Grammar, Result};
use crate::name::NameRef;
use crate::rr::{Rdata, Type};
use crate::time::TimeLiteral;

mod character_string;
mod directive;
mod escape;
mod fields;
mod name;
mod rdata;
mod reader;
mod record;

pub use fields::Fields;
pub(crate) use rdata::builtin_matchers;
use reader::{FieldOrEol, Reader};

////////////////////////////////////////////////////////////////////////
// AST                                                                //
////////////////////////////////////////////////////////////////////////

/// A statement of a zone file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ZoneStatement {
    /// `$ORIGIN`. A relative origin is relative to the origin in
    /// effect.
    Origin { origin: NameRef, line: usize },

    /// `$TTL`, the default TTL for following records.
    Ttl { ttl: TimeLiteral, line: usize },

    /// `$INCLUDE file [origin]`.
    Include {
        path: String,
        origin: Option<NameRef>,
        line: usize,
    },

    /// A resource record.
    Record(RecordStatement),
}

/// A resource record as written in a zone file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RecordStatement {
    pub line: usize,
    pub owner: Owner,
    pub ttl: Option<TimeLiteral>,
    pub class: Option<Class>,
    pub rr_type: Type,
    pub rdata: Rdata<NameRef>,
}

/// The owner field of a record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Owner {
    Name(NameRef),

    /// The line started with whitespace, so the owner is that of the
    /// previous record.
    Inherit,
}

////////////////////////////////////////////////////////////////////////
// PARSER                                                             //
////////////////////////////////////////////////////////////////////////

/// A parser for [RFC 1035 § 5] DNS zone files.
///
/// See the [module-level documentation](`self`) for details.
///
/// [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5
pub struct Parser<'a, 'g> {
    error: bool,
    reader: Reader<'a>,
    grammar: &'g Grammar,
    seen_owner: bool,
}

/// Parses a whole zone file.
pub fn parse(data: &[u8], grammar: &Grammar) -> Result<Vec<ZoneStatement>> {
    Parser::new(data, grammar).collect()
}

impl<'a, 'g> Parser<'a, 'g> {
    /// Creates a new [`Parser`] over `data`, using the record matchers
    /// of `grammar`.
    pub fn new(data: &'a [u8], grammar: &'g Grammar) -> Self {
        Self {
            error: false,
            reader: Reader::new(data),
            grammar,
            seen_owner: false,
        }
    }

    /// Parses a single logical line.
    fn parse_line(&mut self) -> Result<Option<ZoneStatement>> {
        if self.reader.peek_octet() == Some(b'$') {
            self.parse_directive().map(Some)
        } else {
            self.parse_record_or_empty()
        }
    }

    /// Parses lines until one with a statement is found.
    fn parse_lines_until_statement_found(&mut self) -> Result<Option<ZoneStatement>> {
        while !self.reader.at_eof() {
            if let Some(statement) = self.parse_line()? {
                return Ok(Some(statement));
            }
        }
        Ok(None)
    }
}

impl Iterator for Parser<'_, '_> {
    type Item = Result<ZoneStatement>;

    fn next(&mut self) -> Option<Self::Item> {
        // Internal state is not consistent after an error, so iteration
        // stops at the first one.
        if self.error {
            return None;
        }

        match self.parse_lines_until_statement_found() {
            Ok(Some(statement)) => Some(Ok(statement)),
            Ok(None) => None,
            Err(e) => {
                self.error = true;
                Some(Err(e))
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;
    use crate::grammar::{Error, ErrorKind};

    lazy_static! {
        pub(super) static ref GRAMMAR: Grammar = Grammar::default();
    }

    /// A helper used throughout the [`zone_file`](`super`) module's
    /// tests.
    pub(super) fn make_parser(data: &[u8]) -> Parser<'_, 'static> {
        Parser::new(data, &GRAMMAR)
    }

    fn records(data: &[u8]) -> Vec<RecordStatement> {
        parse(data, &GRAMMAR)
            .unwrap()
            .into_iter()
            .filter_map(|statement| match statement {
                ZoneStatement::Record(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn records_keep_names_unresolved() {
        let records = records(b"www 300 IN CNAME @\nmail MX 10 mx.example.net.\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].owner, Owner::Name("www".parse().unwrap()));
        assert_eq!(records[0].rdata, Rdata::Cname(NameRef::Origin));
        assert_eq!(records[0].ttl.map(|ttl| ttl.seconds()), Some(300));
        assert_eq!(records[1].class, None);
        assert_eq!(records[1].ttl, None);
        assert_eq!(records[1].line, 2);
    }

    #[test]
    fn leading_whitespace_inherits_owner() {
        let records = records(b"host A 192.0.2.1\n     AAAA 2001:db8::1\n");
        assert_eq!(records[1].owner, Owner::Inherit);
        assert_eq!(records[1].rr_type, Type::AAAA);
    }

    #[test]
    fn inherited_owner_needs_a_previous_record() {
        assert!(matches!(
            parse(b"  A 192.0.2.1\n", &GRAMMAR),
            Err(Error::Syntax(details)) if details.kind() == &ErrorKind::EmptyOwnerWithNoPrevious,
        ));
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let statements = parse(b"\n   \n; comment\n\t; indented comment\n", &GRAMMAR).unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn iteration_stops_after_an_error() {
        let mut parser = make_parser(b"a A not-an-address\nb A 192.0.2.1\n");
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }
}
