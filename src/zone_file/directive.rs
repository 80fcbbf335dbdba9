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

//! Parsing of zone file `$`-directives.

use super::{FieldOrEol, Parser, ZoneStatement};
use crate::grammar::{Error, ErrorKind, Result};

impl Parser<'_, '_> {
    /// Parses a zone file directive. This expects that the caller has
    /// already detected, but not consumed, the leading `$`. When
    /// successful, this method reads through the end of the line.
    pub(super) fn parse_directive(&mut self) -> Result<ZoneStatement> {
        let line = self.reader.position().line;
        if self.reader.expect_field_case_insensitive(b"$ORIGIN") {
            self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
            let origin = self.parse_name()?;
            self.reader.expect_eol()?;
            Ok(ZoneStatement::Origin { origin, line })
        } else if self.reader.expect_field_case_insensitive(b"$TTL") {
            self.reader
                .skip_to_next_field(ErrorKind::MissingArgument("TTL"))?;
            let ttl = self.reader.read_field(ErrorKind::InvalidTime)?;
            self.reader.expect_eol()?;
            Ok(ZoneStatement::Ttl { ttl, line })
        } else if self.reader.expect_field_case_insensitive(b"$INCLUDE") {
            self.reader
                .skip_to_next_field(ErrorKind::MissingArgument("include path"))?;
            let path = self.parse_include_path()?;
            let origin = if self.reader.skip_to_next_field_or_through_eol()? == FieldOrEol::Eol {
                None
            } else {
                let origin = self.parse_name()?;
                self.reader.expect_eol()?;
                Some(origin)
            };
            Ok(ZoneStatement::Include { path, origin, line })
        } else {
            let token = String::from_utf8_lossy(self.reader.peek_field()).into_owned();
            Err(Error::new(self.reader.position(), ErrorKind::UnknownDirective).with_token(&token))
        }
    }

    /// Parses the path of an `$INCLUDE` directive. Like BIND, we accept
    /// a quoted or unquoted path with the escapes of a
    /// `<character-string>`, but without its length limit.
    fn parse_include_path(&mut self) -> Result<String> {
        let start_position = self.reader.position();
        let mut path = Vec::new();
        if self.reader.peek_octet() == Some(b'"') {
            self.reader.read_octet();
            loop {
                let character_position = self.reader.position();
                match self.reader.read_octet() {
                    Some(b'\\') => path.push(self.parse_escape()?),
                    Some(b'"') => break,
                    Some(octet) => path.push(octet),
                    None => {
                        return Err(Error::new(
                            character_position,
                            ErrorKind::EofInQuotedCharacterString,
                        ))
                    }
                }
            }
        } else {
            while let Some(octet) = self.reader.read_field_octet() {
                if octet == b'\\' {
                    path.push(self.parse_escape()?);
                } else {
                    path.push(octet);
                }
            }
        }
        String::from_utf8(path)
            .map_err(|e| Error::new(start_position, ErrorKind::BadUtf8(e.utf8_error())))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::tests::make_parser;
    use super::*;
    use crate::name::NameRef;

    #[test]
    fn origin_directive_works() {
        assert_eq!(
            make_parser(b"$ORIGIN sub\n").parse_directive().unwrap(),
            ZoneStatement::Origin {
                origin: NameRef::Relative("sub".parse().unwrap()),
                line: 1,
            },
        );
    }

    #[test]
    fn ttl_directive_accepts_time_literals() {
        match make_parser(b"$ttl 1h30m ; comment\n").parse_directive().unwrap() {
            ZoneStatement::Ttl { ttl, .. } => assert_eq!(ttl.seconds(), 5400),
            other => panic!("unexpected statement {:?}", other),
        }
        assert!(matches!(
            make_parser(b"$TTL 99999999999\n").parse_directive(),
            Err(Error::Syntax(details)) if matches!(details.kind(), ErrorKind::InvalidTime(_)),
        ));
    }

    #[test]
    fn include_directive_works() {
        assert_eq!(
            make_parser(b"$INCLUDE \"hosts file.db\" sub.example.test.\n")
                .parse_directive()
                .unwrap(),
            ZoneStatement::Include {
                path: "hosts file.db".to_owned(),
                origin: Some(NameRef::Absolute("sub.example.test.".parse().unwrap())),
                line: 1,
            },
        );
        assert_eq!(
            make_parser(b"$INCLUDE hosts\\032b.db").parse_directive().unwrap(),
            ZoneStatement::Include {
                path: "hosts b.db".to_owned(),
                origin: None,
                line: 1,
            },
        );
    }

    #[test]
    fn unknown_directives_are_rejected() {
        assert!(matches!(
            make_parser(b"$GENERATE 1-10 host$ A 192.0.2.$\n").parse_directive(),
            Err(Error::Syntax(details))
                if details.kind() == &ErrorKind::UnknownDirective
                    && details.token() == Some("$GENERATE"),
        ));
    }
}
