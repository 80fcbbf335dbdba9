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

//! Parsing of domain names.

use super::Parser;
use crate::grammar::{Error, ErrorKind, Result};
use crate::name::{Name, NameBuilder, NameRef};

impl Parser<'_, '_> {
    /// Parses a domain name as written: `@` for the current origin, a
    /// fully qualified name, or a name relative to the origin. The
    /// caller should skip to the next field first.
    pub(super) fn parse_name(&mut self) -> Result<NameRef> {
        let start_position = self.reader.position();
        if self.reader.peek_octet() == Some(b'"') {
            return Err(Error::new(start_position, ErrorKind::QuotedNotAllowed));
        } else if self.reader.expect_field(b"@") {
            return Ok(NameRef::Origin);
        } else if self.reader.expect_field(b".") {
            return Ok(NameRef::Absolute(Name::root()));
        } else if self.reader.at_field_end() {
            return Err(Error::new(start_position, ErrorKind::ExpectedName));
        }

        let token = String::from_utf8_lossy(self.reader.peek_field()).into_owned();
        let invalid = |e| Error::new(start_position, ErrorKind::InvalidName(e)).with_token(&token);
        let mut builder = NameBuilder::new();
        while let Some(octet) = self.reader.read_field_octet() {
            match octet {
                b'\\' => {
                    let escaped = self.parse_escape()?;
                    builder.try_push(escaped).map_err(invalid)?;
                }
                b'.' => builder.next_label().map_err(invalid)?,
                _ => builder.try_push(octet).map_err(invalid)?,
            }
        }

        if builder.is_fully_qualified() {
            builder.finish().map(NameRef::Absolute).map_err(invalid)
        } else {
            builder.finish_relative().map(NameRef::Relative).map_err(invalid)
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
    use crate::name;

    #[test]
    fn parsing_works() {
        assert_eq!(
            make_parser(b"Example.TEST. extra data").parse_name().unwrap(),
            NameRef::Absolute("example.test.".parse().unwrap()),
        );
        assert_eq!(
            make_parser(b"www.corp").parse_name().unwrap(),
            NameRef::Relative("www.corp".parse().unwrap()),
        );
    }

    #[test]
    fn escaping_works() {
        assert_eq!(
            make_parser(b"test\\.with.a.dot.").parse_name().unwrap(),
            NameRef::Absolute("test\\.with.a.dot.".parse().unwrap()),
        );
        assert_eq!(
            make_parser(b"test\\032space.").parse_name().unwrap(),
            NameRef::Absolute("test\\ space.".parse().unwrap()),
        );
    }

    #[test]
    fn shorthands_work() {
        assert_eq!(make_parser(b"@ extra").parse_name().unwrap(), NameRef::Origin);
        assert_eq!(
            make_parser(b". extra").parse_name().unwrap(),
            NameRef::Absolute(Name::root()),
        );
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert!(matches!(
            make_parser(b"a..b").parse_name(),
            Err(Error::Syntax(details))
                if details.kind() == &ErrorKind::InvalidName(name::Error::NullNonTerminal),
        ));
        assert!(matches!(
            make_parser(b"\"quoted\"").parse_name(),
            Err(Error::Syntax(details)) if details.kind() == &ErrorKind::QuotedNotAllowed,
        ));
    }
}
