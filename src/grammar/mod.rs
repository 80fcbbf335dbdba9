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

//! The registrable grammar shared by the configuration and zone file
//! parsers.
//!
//! Configuration files have the generic statement shape
//! `keyword arg* [ { statement* } ] ;`. The [`conf`](crate::conf)
//! parser turns text into raw [`Statement`]s, and a [`Grammar`] holds
//! the ordered table of [`StatementMatcher`]s that turn raw statements
//! into [`ConfNode`]s. Likewise, the [`zone_file`](crate::zone_file)
//! parser reads the owner, TTL, class, and type of each record and
//! delegates the RDATA to the [`RecordMatcher`] registered for the
//! type's mnemonic.
//!
//! Matchers added by an embedder are consulted before the built-in
//! ones, so they may extend or override the default grammar:
//!
//! ```
//! use bindscope::conf::{ConfNode, Statement};
//! use bindscope::grammar::{self, Grammar, Match, MatchContext, Scope, StatementMatcher};
//!
//! struct Plugin;
//!
//! impl StatementMatcher for Plugin {
//!     fn name(&self) -> &str {
//!         "plugin"
//!     }
//!
//!     fn match_statement(
//!         &self,
//!         statement: &Statement,
//!         scope: Scope,
//!         _cx: &mut MatchContext,
//!     ) -> grammar::Result<Match> {
//!         if statement.is("plugin") {
//!             Ok(Match::Node(ConfNode::benign(statement, scope)))
//!         } else {
//!             Ok(Match::NotMine)
//!         }
//!     }
//! }
//!
//! let grammar = Grammar::default().with_statement_matcher(Plugin);
//! assert!(grammar.signature().contains("plugin"));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conf::{self, ConfNode, Statement};
use crate::name::NameRef;
use crate::rr::{Rdata, Type};
use crate::zone_file::{self, Fields};

mod error;
pub use error::{Error, ErrorDetails, ErrorKind, Position, Result};

////////////////////////////////////////////////////////////////////////
// MATCHER TRAITS                                                     //
////////////////////////////////////////////////////////////////////////

/// Turns raw configuration [`Statement`]s into [`ConfNode`]s.
pub trait StatementMatcher: Send + Sync {
    /// A short, stable name for the matcher. The names of all matchers
    /// of a [`Grammar`] make up its [signature](Grammar::signature).
    fn name(&self) -> &str;

    /// Tries to match `statement`, which appears in `scope`. A matcher
    /// that does not recognize the statement returns
    /// [`Match::NotMine`]; one that recognizes it but finds it
    /// malformed returns an error.
    fn match_statement(
        &self,
        statement: &Statement,
        scope: Scope,
        cx: &mut MatchContext,
    ) -> Result<Match>;
}

/// The result of a [`StatementMatcher`].
#[derive(Debug)]
pub enum Match {
    Node(ConfNode),
    NotMine,
}

/// Parses the RDATA of one record type in zone files.
pub trait RecordMatcher: Send + Sync {
    /// The mnemonic that selects this matcher, e.g. `MX`. Mnemonics are
    /// matched case-insensitively.
    fn mnemonic(&self) -> &str;

    /// The type of the records this matcher produces.
    fn rr_type(&self) -> Type;

    /// Parses the RDATA fields of a record. Names are returned as
    /// written; the database builder resolves them.
    fn parse_rdata(&self, fields: &mut Fields) -> Result<Rdata<NameRef>>;
}

/// Where a configuration statement appears.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Scope {
    TopLevel,
    Options,
    View,
    Zone,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::TopLevel => "top level",
            Self::Options => "options",
            Self::View => "view",
            Self::Zone => "zone",
        })
    }
}

/// What to do with statements that no matcher claims inside a
/// recognized block. (Unknown top-level statements are always errors.)
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum UnknownStatementPolicy {
    /// Keep going, recording a [`ConfNode::Ignored`] node.
    #[default]
    Note,

    /// Fail with [`ErrorKind::UnknownStatement`].
    Reject,
}

////////////////////////////////////////////////////////////////////////
// MATCH CONTEXT                                                      //
////////////////////////////////////////////////////////////////////////

/// State passed to [`StatementMatcher`]s so that block statements can
/// match their nested statements through the same grammar.
pub struct MatchContext<'g> {
    grammar: &'g Grammar,
    noted: Vec<ConfNode>,
}

impl<'g> MatchContext<'g> {
    pub(crate) fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            noted: Vec::new(),
        }
    }

    /// Returns the grammar in use.
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Matches a nested statement against the grammar's statement
    /// matchers, returning `None` if no matcher claims it.
    pub fn match_nested(&mut self, statement: &Statement, scope: Scope) -> Result<Option<ConfNode>> {
        self.grammar.match_statement(statement, scope, self)
    }

    /// Applies the [`UnknownStatementPolicy`] to a nested statement
    /// that nothing recognized.
    pub fn unknown_nested(&mut self, statement: &Statement, scope: Scope) -> Result<()> {
        match self.grammar.unknown_statements {
            UnknownStatementPolicy::Note => {
                self.note(ConfNode::unknown(statement, scope));
                Ok(())
            }
            UnknownStatementPolicy::Reject => Err(statement.error(ErrorKind::UnknownStatement)),
        }
    }

    /// Records a node to be emitted after the top-level node currently
    /// being matched. Block matchers use this for nested nodes that
    /// have no place in their own node, such as ignored statements.
    pub fn note(&mut self, node: ConfNode) {
        self.noted.push(node);
    }

    /// Takes the nodes recorded by [`MatchContext::note`].
    pub(crate) fn take_noted(&mut self) -> Vec<ConfNode> {
        std::mem::take(&mut self.noted)
    }
}

////////////////////////////////////////////////////////////////////////
// GRAMMAR                                                            //
////////////////////////////////////////////////////////////////////////

/// Bumped whenever the built-in grammar changes the ASTs it produces.
const GRAMMAR_VERSION: u32 = 1;

/// The ordered matcher tables used by the parsers.
pub struct Grammar {
    extra_statement_matchers: Vec<Box<dyn StatementMatcher>>,
    statement_matchers: Vec<Box<dyn StatementMatcher>>,
    extra_record_matchers: Vec<Box<dyn RecordMatcher>>,
    record_matchers: Vec<Box<dyn RecordMatcher>>,
    unknown_statements: UnknownStatementPolicy,
}

impl Grammar {
    /// Registers an additional statement matcher. It is consulted after
    /// previously registered extra matchers and before the built-ins.
    pub fn with_statement_matcher(mut self, matcher: impl StatementMatcher + 'static) -> Self {
        self.extra_statement_matchers.push(Box::new(matcher));
        self
    }

    /// Registers an additional record matcher. It takes precedence over
    /// built-in matchers with the same mnemonic or type.
    pub fn with_record_matcher(mut self, matcher: impl RecordMatcher + 'static) -> Self {
        self.extra_record_matchers.push(Box::new(matcher));
        self
    }

    /// Sets the [`UnknownStatementPolicy`].
    pub fn with_unknown_statement_policy(mut self, policy: UnknownStatementPolicy) -> Self {
        self.unknown_statements = policy;
        self
    }

    pub fn unknown_statement_policy(&self) -> UnknownStatementPolicy {
        self.unknown_statements
    }

    /// Returns the statement matchers in the order they are consulted.
    pub fn statement_matchers(&self) -> impl Iterator<Item = &dyn StatementMatcher> {
        self.extra_statement_matchers
            .iter()
            .chain(self.statement_matchers.iter())
            .map(Box::as_ref)
    }

    /// Returns the record matchers in the order they are consulted.
    pub fn record_matchers(&self) -> impl Iterator<Item = &dyn RecordMatcher> {
        self.extra_record_matchers
            .iter()
            .chain(self.record_matchers.iter())
            .map(Box::as_ref)
    }

    /// Finds the record matcher for a mnemonic.
    pub fn record_matcher(&self, mnemonic: &str) -> Option<&dyn RecordMatcher> {
        self.record_matchers()
            .find(|matcher| matcher.mnemonic().eq_ignore_ascii_case(mnemonic))
    }

    /// Finds the record matcher for a type (e.g. when it is written in
    /// the `TYPEnnn` form).
    pub fn record_matcher_for_type(&self, rr_type: Type) -> Option<&dyn RecordMatcher> {
        self.record_matchers()
            .find(|matcher| matcher.rr_type() == rr_type)
    }

    /// Runs the statement matchers over `statement` in order, returning
    /// the first node produced.
    pub fn match_statement(
        &self,
        statement: &Statement,
        scope: Scope,
        cx: &mut MatchContext,
    ) -> Result<Option<ConfNode>> {
        for matcher in self.statement_matchers() {
            if let Match::Node(node) = matcher.match_statement(statement, scope, cx)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Returns a string identifying everything about this grammar that
    /// affects the ASTs it produces. Cached ASTs are only reused by a
    /// grammar with the same signature.
    pub fn signature(&self) -> String {
        let statements: Vec<&str> = self.statement_matchers().map(|m| m.name()).collect();
        let records: Vec<String> = self
            .record_matchers()
            .map(|m| format!("{}={}", m.mnemonic().to_ascii_uppercase(), u16::from(m.rr_type())))
            .collect();
        format!(
            "v{};statements:{};records:{};unknown:{:?}",
            GRAMMAR_VERSION,
            statements.join(","),
            records.join(","),
            self.unknown_statements,
        )
    }
}

impl Default for Grammar {
    /// Creates the built-in BIND grammar.
    fn default() -> Self {
        Self {
            extra_statement_matchers: Vec::new(),
            statement_matchers: conf::builtin_matchers(),
            extra_record_matchers: Vec::new(),
            record_matchers: zone_file::builtin_matchers(),
            unknown_statements: UnknownStatementPolicy::default(),
        }
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("signature", &self.signature())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    struct Loc;

    impl RecordMatcher for Loc {
        fn mnemonic(&self) -> &str {
            "LOC"
        }

        fn rr_type(&self) -> Type {
            Type::from(29)
        }

        fn parse_rdata(&self, fields: &mut Fields) -> Result<Rdata<NameRef>> {
            fields.rest().map(Rdata::Fields)
        }
    }

    #[test]
    fn extra_record_matchers_are_found_first() {
        let grammar = Grammar::default().with_record_matcher(Loc);
        assert_eq!(grammar.record_matcher("loc").unwrap().mnemonic(), "LOC");
        assert_eq!(grammar.record_matcher("mx").unwrap().rr_type(), Type::MX);
        assert!(grammar.record_matcher_for_type(Type::from(29)).is_some());
        assert!(Grammar::default().record_matcher("LOC").is_none());
    }

    #[test]
    fn signature_tracks_matchers_and_policy() {
        let default = Grammar::default().signature();
        assert_eq!(default, Grammar::default().signature());
        assert_ne!(default, Grammar::default().with_record_matcher(Loc).signature());
        assert_ne!(
            default,
            Grammar::default()
                .with_unknown_statement_policy(UnknownStatementPolicy::Reject)
                .signature(),
        );
    }
}
