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

//! Tokenization of configuration files.
//!
//! Tokens are words, quoted strings, `{`, `}`, and `;`. Comments in
//! the C (`/* ... */`), C++ (`// ...`), and shell (`# ...`) styles are
//! skipped.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::grammar::{Error, ErrorKind, Position, Result};

////////////////////////////////////////////////////////////////////////
// TOKENS                                                             //
////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) enum TokenKind {
    Word,
    Quoted,
    OpenBrace,
    CloseBrace,
    Semicolon,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

////////////////////////////////////////////////////////////////////////
// LEXER                                                              //
////////////////////////////////////////////////////////////////////////

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    text: &'a str,
    position: Position,
}

/// Splits configuration text into tokens.
pub(super) fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer {
        chars: text.char_indices().peekable(),
        text,
        position: Position::START,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

impl Lexer<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Returns the character after the next one.
    fn peek_second(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next().map(|(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(c)
    }

    /// Skips whitespace and comments. Returns an error for an
    /// unterminated `/* ... */` comment.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('#'), _) | (Some('/'), Some('/')) => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.position;
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => (),
                            None => {
                                return Err(Error::new(start, ErrorKind::UnterminatedComment))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_trivia()?;
        let position = self.position;
        let single = |kind, text: &str| Token {
            kind,
            text: text.to_owned(),
            position,
        };
        let token = match self.peek() {
            None => return Ok(None),
            Some('{') => single(TokenKind::OpenBrace, "{"),
            Some('}') => single(TokenKind::CloseBrace, "}"),
            Some(';') => single(TokenKind::Semicolon, ";"),
            Some('"') => return self.quoted(position).map(Some),
            Some(_) => return Ok(Some(self.word(position))),
        };
        self.bump();
        Ok(Some(token))
    }

    /// Reads a quoted string. `\"` and `\\` are unescaped; other
    /// backslashes are kept as written.
    fn quoted(&mut self, position: Position) -> Result<Token> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.peek() {
                    Some(c @ ('"' | '\\')) => {
                        self.bump();
                        text.push(c);
                    }
                    _ => text.push('\\'),
                },
                Some(c) => text.push(c),
                None => return Err(Error::new(position, ErrorKind::UnterminatedString)),
            }
        }
        Ok(Token {
            kind: TokenKind::Quoted,
            text,
            position,
        })
    }

    /// Reads a bare word, which ends at whitespace, a special character,
    /// or the start of a comment.
    fn word(&mut self, position: Position) -> Token {
        let start = self.chars.peek().map_or(self.text.len(), |&(i, _)| i);
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            let comment = c == '/' && matches!(self.peek_second(), Some('/' | '*'));
            if c.is_whitespace() || matches!(c, '{' | '}' | ';' | '"') || comment {
                break;
            }
            end = i + c.len_utf8();
            self.bump();
        }
        Token {
            kind: TokenKind::Word,
            text: self.text[start..end].to_owned(),
            position,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
