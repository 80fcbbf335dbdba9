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

//! Error types for configuration and zone file parsing.
//!
//! In order to maintain consistency in error messages (and to avoid
//! unnecessary allocation of strings), all syntax errors are recorded
//! with an [`ErrorKind`] value that can be used by calling code to get
//! an appropriate error message.

use std::fmt;
use std::io;
use std::net::AddrParseError;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::Utf8Error;

use crate::name;
use crate::time;

////////////////////////////////////////////////////////////////////////
// POSITIONS                                                          //
////////////////////////////////////////////////////////////////////////

/// Records a human-readable position (line and column) in a file.
/// Both are counted from one.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// The position of the first character of a file.
    pub const START: Self = Self { line: 1, column: 1 };
}

////////////////////////////////////////////////////////////////////////
// ERROR STRUCTURE                                                    //
////////////////////////////////////////////////////////////////////////

/// Represents errors that may occur while reading and parsing a
/// configuration or zone file.
#[derive(Debug)]
pub enum Error {
    /// I/O errors encountered while reading a file.
    Io(PathBuf, io::Error),

    /// Syntax errors.
    Syntax(ErrorDetails),
}

impl Error {
    /// Constructs a new [`Error`] of the [`Syntax`](`Error::Syntax`)
    /// variant with provided information.
    pub(crate) fn new(position: Position, kind: ErrorKind) -> Self {
        Self::Syntax(ErrorDetails {
            path: None,
            position,
            token: None,
            kind,
        })
    }

    /// Records the offending token on a syntax error.
    pub(crate) fn with_token(mut self, token: &str) -> Self {
        if let Self::Syntax(ref mut details) = self {
            details.token = Some(token.to_owned());
        }
        self
    }

    /// Records the file in which a syntax error occurred, unless one
    /// was recorded already (e.g. for an error in an included file).
    pub(crate) fn in_file(mut self, path: &Path) -> Self {
        if let Self::Syntax(ref mut details) = self {
            details.path.get_or_insert_with(|| path.to_owned());
        }
        self
    }

    /// Returns the syntax error details, if this is a syntax error.
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            Self::Io(..) => None,
            Self::Syntax(details) => Some(details),
        }
    }

    /// Returns the file in which the error occurred, if known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io(path, _) => Some(path),
            Self::Syntax(details) => details.path.as_deref(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(path, io_error) => {
                write!(f, "I/O error reading {}: {}", path.display(), io_error)
            }
            Self::Syntax(details) => details.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(_, io_error) => Some(io_error),
            Self::Syntax(_) => None,
        }
    }
}

/// A result type for parsing.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// SYNTAX ERROR DETAILS                                               //
////////////////////////////////////////////////////////////////////////

/// Provides information about the position and kind of syntax errors.
#[derive(Debug)]
pub struct ErrorDetails {
    path: Option<PathBuf>,
    position: Position,
    token: Option<String>,
    kind: ErrorKind,
}

impl ErrorDetails {
    /// Returns the line in the file at which the error occurred.
    pub fn line(&self) -> usize {
        self.position.line
    }

    /// Returns the column in the file at which the error occurred.
    pub fn column(&self) -> usize {
        self.position.column
    }

    /// Returns the offending token, if there was one.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the kind of syntax error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: ", path.display())?;
        }
        write!(
            f,
            "{} at line {} column {}",
            self.kind, self.position.line, self.position.column,
        )?;
        if let Some(ref token) = self.token {
            write!(f, " (near {:?})", token)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////
// SYNTAX ERROR KINDS                                                 //
////////////////////////////////////////////////////////////////////////

/// Kinds of syntax errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    // Shared.
    BadUtf8(Utf8Error),
    IncludeCycle,
    IncludeTooDeep,
    InvalidName(name::Error),
    InvalidTime(time::Error),

    // Configuration files.
    ExpectedSemicolon,
    InvalidArgument(&'static str),
    InvalidZoneType,
    MisplacedInclude,
    MissingArgument(&'static str),
    MissingBlock,
    UnexpectedEof,
    UnknownStatement,
    UnmatchedCloseBrace,
    UnterminatedComment,
    UnterminatedString,

    // Zone files.
    CharacterStringTooLong,
    EmptyOwnerWithNoPrevious,
    EofBeforeCloseParen,
    EofInEscape,
    EofInQuotedCharacterString,
    EscapeNeedsThreeDigits,
    EscapeValueOutOfRange,
    ExpectedBackslashHash,
    ExpectedCharacterString,
    ExpectedEol,
    ExpectedHexRdata,
    ExpectedIpv4,
    ExpectedIpv6,
    ExpectedName,
    ExpectedRdataLen,
    ExpectedType,
    ExpectedU16,
    ExpectedU32,
    InvalidClass(&'static str),
    InvalidHexDigit,
    InvalidInt(ParseIntError),
    InvalidIpv4(AddrParseError),
    InvalidIpv6(AddrParseError),
    InvalidRdataLen(ParseIntError),
    InvalidType(&'static str),
    NestedParens,
    QuotedNotAllowed,
    RdataLenMismatch,
    UnexpectedEndOfHexRdata,
    UnknownDirective,
    UnmatchedCloseParen,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::BadUtf8(utf8_err) => utf8_err.fmt(f),
            Self::IncludeCycle => f.write_str("the file includes itself"),
            Self::IncludeTooDeep => f.write_str("includes are nested too deeply"),
            Self::InvalidName(name_err) => write!(f, "invalid name: {}", name_err),
            Self::InvalidTime(time_err) => write!(f, "invalid duration: {}", time_err),
            Self::ExpectedSemicolon => f.write_str("expected ;"),
            Self::InvalidArgument(what) => write!(f, "invalid {}", what),
            Self::InvalidZoneType => f.write_str("unknown zone type"),
            Self::MisplacedInclude => {
                f.write_str("included file contains statements not allowed here")
            }
            Self::MissingArgument(what) => write!(f, "missing {}", what),
            Self::MissingBlock => f.write_str("expected a { ... } block"),
            Self::UnexpectedEof => f.write_str("unexpected end of file"),
            Self::UnknownStatement => f.write_str("unknown statement"),
            Self::UnmatchedCloseBrace => f.write_str("unmatched close brace"),
            Self::UnterminatedComment => f.write_str("unterminated comment"),
            Self::UnterminatedString => f.write_str("unterminated quoted string"),
            Self::CharacterStringTooLong => f.write_str("<character-string> is too long"),
            Self::EmptyOwnerWithNoPrevious => {
                f.write_str("the owner cannot be empty when no previous owner is available")
            }
            Self::EofBeforeCloseParen => {
                f.write_str("reached end of file before close parenthesis")
            }
            Self::EofInEscape => f.write_str("reached end of field in escape sequence"),
            Self::EofInQuotedCharacterString => {
                f.write_str("reached end of file in quoted <character-string>")
            }
            Self::EscapeNeedsThreeDigits => {
                f.write_str("invalid escape sequence: expected three decimal digits")
            }
            Self::EscapeValueOutOfRange => {
                f.write_str("invalid escape sequence: escaped octet value is out of range")
            }
            Self::ExpectedBackslashHash => f.write_str("expected \\# for an RR type without a known format"),
            Self::ExpectedCharacterString => f.write_str("expected a <character-string>"),
            Self::ExpectedEol => f.write_str("expected the end of the line"),
            Self::ExpectedHexRdata => f.write_str("expected hexadecimal RDATA"),
            Self::ExpectedIpv4 => f.write_str("expected an IPv4 address"),
            Self::ExpectedIpv6 => f.write_str("expected an IPv6 address"),
            Self::ExpectedName => f.write_str("expected a domain name"),
            Self::ExpectedRdataLen => f.write_str("expected RDATA length"),
            Self::ExpectedType => f.write_str("expected an RR type"),
            Self::ExpectedU16 => f.write_str("expected an unsigned 16-bit integer"),
            Self::ExpectedU32 => f.write_str("expected an unsigned 32-bit integer"),
            Self::InvalidClass(class_err) => class_err.fmt(f),
            Self::InvalidHexDigit => f.write_str("invalid hexadecimal digit"),
            Self::InvalidInt(ref int_err) => int_err.fmt(f),
            Self::InvalidIpv4(ref addr_err) => addr_err.fmt(f),
            Self::InvalidIpv6(ref addr_err) => addr_err.fmt(f),
            Self::InvalidRdataLen(ref int_err) => write!(f, "invalid RDATA length: {}", int_err),
            Self::InvalidType(type_err) => type_err.fmt(f),
            Self::NestedParens => f.write_str("nested parentheses"),
            Self::QuotedNotAllowed => f.write_str("a quoted string is not allowed here"),
            Self::RdataLenMismatch => {
                f.write_str("the RDATA length does not match the hexadecimal RDATA")
            }
            Self::UnexpectedEndOfHexRdata => f.write_str("unexpected end of hexadecimal RDATA"),
            Self::UnknownDirective => f.write_str("unknown directive"),
            Self::UnmatchedCloseParen => f.write_str("unmatched close parenthesis"),
        }
    }
}
