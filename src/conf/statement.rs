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

//! Raw statements and the recursive-descent parser that builds them.

use std::fmt;

use super::lexer::{Token, TokenKind};
use crate::grammar::{Error, ErrorKind, Position, Result};

////////////////////////////////////////////////////////////////////////
// STRUCTURES                                                         //
////////////////////////////////////////////////////////////////////////

/// A raw configuration statement: `word* [ { statement* } ] ;`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Statement {
    pub words: Vec<Word>,
    pub block: Option<Vec<Statement>>,
    pub position: Position,
}

/// A word of a [`Statement`], bare or quoted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Word {
    pub text: String,
    pub quoted: bool,
    pub position: Position,
}

impl Statement {
    /// Returns the first word, or `""` for a statement that is only a
    /// block (as in nested address match lists).
    pub fn keyword(&self) -> &str {
        self.words.first().map_or("", |word| word.text.as_str())
    }

    /// Returns whether the keyword is `keyword`.
    pub fn is(&self, keyword: &str) -> bool {
        self.words
            .first()
            .map_or(false, |word| !word.quoted && word.text.eq_ignore_ascii_case(keyword))
    }

    /// Returns the words after the keyword.
    pub fn args(&self) -> &[Word] {
        self.words.get(1..).unwrap_or_default()
    }

    /// Returns argument `index` (counting from zero after the keyword),
    /// or an error naming `what` is missing.
    pub fn expect_arg(&self, index: usize, what: &'static str) -> Result<&Word> {
        self.args()
            .get(index)
            .ok_or_else(|| self.error(ErrorKind::MissingArgument(what)))
    }

    /// Returns the nested statements, or an error if there is no block.
    pub fn expect_block(&self) -> Result<&[Statement]> {
        self.block
            .as_deref()
            .ok_or_else(|| self.error(ErrorKind::MissingBlock))
    }

    /// Builds a syntax error at this statement.
    pub fn error(&self, kind: ErrorKind) -> Error {
        Error::new(self.position, kind).with_token(self.keyword())
    }
}

impl Word {
    /// Builds a syntax error at this word.
    pub fn error(&self, kind: ErrorKind) -> Error {
        Error::new(self.position, kind).with_token(&self.text)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.quoted {
            write!(f, "{:?}", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            word.fmt(f)?;
        }
        if let Some(ref block) = self.block {
            if !self.words.is_empty() {
                f.write_str(" ")?;
            }
            f.write_str("{")?;
            for statement in block {
                write!(f, " {};", statement)?;
            }
            f.write_str(" }")?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////
// PARSER                                                             //
////////////////////////////////////////////////////////////////////////

/// Parses a token stream into top-level statements.
pub(super) fn parse_statements(tokens: &[Token]) -> Result<Vec<Statement>> {
    let mut parser = Parser { tokens, index: 0 };
    parser.statements(None)
}

struct Parser<'a> {
    tokens: &'a [Token],
    index: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    /// Parses statements until the end of the input (at the top level)
    /// or until the `}` closing the block opened at `open`.
    fn statements(&mut self, open: Option<Position>) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return match open {
                        Some(position) => Err(Error::new(position, ErrorKind::UnexpectedEof)),
                        None => Ok(statements),
                    }
                }
                Some(token) if token.kind == TokenKind::CloseBrace => {
                    if open.is_some() {
                        self.index += 1;
                        return Ok(statements);
                    }
                    return Err(Error::new(token.position, ErrorKind::UnmatchedCloseBrace));
                }
                Some(token) if token.kind == TokenKind::Semicolon => {
                    // Empty statement.
                    self.index += 1;
                }
                Some(_) => statements.push(self.statement()?),
            }
        }
    }

    fn statement(&mut self) -> Result<Statement> {
        let mut words = Vec::new();
        let mut block = None;
        let mut position = None;
        while let Some(token) = self.peek() {
            position.get_or_insert(token.position);
            match token.kind {
                TokenKind::Word | TokenKind::Quoted => {
                    words.push(Word {
                        text: token.text.clone(),
                        quoted: token.kind == TokenKind::Quoted,
                        position: token.position,
                    });
                    self.index += 1;
                }
                TokenKind::OpenBrace if block.is_none() => {
                    let open = token.position;
                    self.index += 1;
                    block = Some(self.statements(Some(open))?);
                }
                TokenKind::Semicolon => {
                    self.index += 1;
                    return Ok(Statement {
                        words,
                        block,
                        position: position.unwrap_or(Position::START),
                    });
                }
                TokenKind::OpenBrace | TokenKind::CloseBrace => {
                    return Err(Error::new(token.position, ErrorKind::ExpectedSemicolon)
                        .with_token(&token.text))
                }
            }
        }
        let position = self
            .tokens
            .last()
            .map_or(Position::START, |token| token.position);
        Err(Error::new(position, ErrorKind::ExpectedSemicolon))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
