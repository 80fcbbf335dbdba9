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

//! Parsing of BIND `named.conf`-style configuration files.
//!
//! Parsing happens in two passes. First the text is split into raw
//! [`Statement`]s of the shape `keyword arg* [ { statement* } ] ;`.
//! Then each top-level statement is handed to the
//! [`StatementMatcher`]s of a [`Grammar`], which produce the typed
//! [`ConfNode`]s. Like zone file ASTs, configuration ASTs only record
//! what a file says: included files are not read and zone files are not
//! opened.
//!
//! ```
//! use bindscope::conf::{self, ConfNode, ZoneData};
//! use bindscope::grammar::Grammar;
//!
//! const CONF: &[u8] = br#"
//! options { directory "/var/cache/bind"; };
//! zone "example.com" {
//!     type master;
//!     file "db.example.com";
//! };
//! "#;
//!
//! let nodes = conf::parse(CONF, &Grammar::default()).unwrap();
//! assert!(matches!(nodes[0], ConfNode::Options(_)));
//! assert!(matches!(
//!     &nodes[1],
//!     ConfNode::Zone(zone) if zone.data == ZoneData::File("db.example.com".into()),
//! ));
//! ```

use std::fmt;
use std::str;

use serde::{Deserialize, Serialize};

use crate::class::Class;
use crate::grammar::{Error, ErrorKind, Grammar, MatchContext, Position, Result, Scope, StatementMatcher};
use crate::name::Name;
use crate::time::TimeLiteral;
use crate::zone_file::ZoneStatement;

mod lexer;
mod matchers;
mod path;
mod statement;

pub use path::PathResolver;
pub use statement::{Statement, Word};

////////////////////////////////////////////////////////////////////////
// AST                                                                //
////////////////////////////////////////////////////////////////////////

/// A typed configuration statement.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConfNode {
    View(View),
    Zone(Zone),
    Acl(Acl),
    Options(Options),
    Include(Include),
    Ignored(Ignored),
}

/// A `view` statement.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub class: Class,

    /// The `match-clients` list, or `None` if the view has none (BIND
    /// then matches any client).
    pub match_clients: Option<Vec<AclElement>>,
    pub zones: Vec<Zone>,

    /// `include` statements inside the view body. The included files
    /// may only declare zones.
    pub includes: Vec<Include>,
    pub settings: Vec<Setting>,
    pub line: usize,
}

/// A `zone` statement.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub apex: Name,

    /// The class, if given. It defaults to that of the enclosing view.
    pub class: Option<Class>,

    /// The zone type. It may only be omitted when `in-view` is given.
    pub zone_type: Option<ZoneType>,

    /// The `in-view` option: the zone is the one declared in that view.
    pub in_view: Option<String>,
    pub data: ZoneData,
    pub settings: Vec<Setting>,
    pub line: usize,
}

/// Where the records of a [`Zone`] come from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ZoneData {
    /// A zone file, as written in the `file` option.
    File(String),

    /// Records supplied directly, e.g. by an embedder that builds
    /// configuration ASTs itself.
    Inline(Vec<ZoneStatement>),

    /// The zone has no local data (e.g. a forward zone).
    None,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ZoneType {
    Primary,
    Secondary,
    Stub,
    StaticStub,
    Forward,
    Hint,
    Redirect,
    Mirror,
    DelegationOnly,
}

impl ZoneType {
    /// Returns whether zones of this type are expected to have an SOA
    /// record when they have data.
    pub fn requires_soa(self) -> bool {
        !matches!(self, Self::Hint | Self::Forward | Self::DelegationOnly)
    }

    /// Returns whether zones of this type only get data from a zone
    /// file of their own.
    pub fn needs_file(self) -> bool {
        matches!(self, Self::Primary)
    }
}

impl str::FromStr for ZoneType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" | "master" => Ok(Self::Primary),
            "secondary" | "slave" => Ok(Self::Secondary),
            "stub" => Ok(Self::Stub),
            "static-stub" => Ok(Self::StaticStub),
            "forward" => Ok(Self::Forward),
            "hint" => Ok(Self::Hint),
            "redirect" => Ok(Self::Redirect),
            "mirror" => Ok(Self::Mirror),
            "delegation-only" => Ok(Self::DelegationOnly),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Stub => "stub",
            Self::StaticStub => "static-stub",
            Self::Forward => "forward",
            Self::Hint => "hint",
            Self::Redirect => "redirect",
            Self::Mirror => "mirror",
            Self::DelegationOnly => "delegation-only",
        })
    }
}

/// An `acl` statement.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Acl {
    pub name: String,
    pub elements: Vec<AclElement>,
    pub line: usize,
}

/// An element of an address match list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AclElement {
    pub negated: bool,
    pub kind: AclElementKind,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AclElementKind {
    /// An address or prefix such as `10.0.0.0/8`.
    Address(String),

    /// `key <name>`.
    Key(String),

    /// The name of an ACL (built-in or declared).
    Reference(String),

    /// A nested `{ ... }` list.
    Nested(Vec<AclElement>),
}

/// An `options` statement.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Options {
    pub settings: Vec<Setting>,
    pub line: usize,
}

impl Options {
    /// Finds a setting by keyword.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        find_setting(&self.settings, key)
    }
}

/// An option set inside `options`, `view`, or `zone`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: OptionValue,
}

/// The value of a [`Setting`], classified by shape.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    /// The keyword alone.
    Flag,
    Bool(bool),
    Number(u64),
    Duration(TimeLiteral),
    Text(String),

    /// Several bare arguments, e.g. `listen-on port 53`.
    Words(Vec<String>),

    /// A block, e.g. `forwarders { 192.0.2.1; }`. The nested statements
    /// are kept as text.
    List { args: Vec<String>, items: Vec<String> },
}

impl OptionValue {
    /// Returns the value as text if it is a single word or string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

pub(crate) fn find_setting<'a>(settings: &'a [Setting], key: &str) -> Option<&'a OptionValue> {
    settings
        .iter()
        .find(|setting| setting.key.eq_ignore_ascii_case(key))
        .map(|setting| &setting.value)
}

/// An `include` statement.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Include {
    pub path: String,
    pub line: usize,
}

/// A statement that was recognized but not interpreted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Ignored {
    pub keyword: String,
    pub scope: Scope,
    pub line: usize,
    pub reason: IgnoreReason,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// A known statement with no bearing on the database (e.g.
    /// `logging`).
    Benign,

    /// A statement no matcher recognized, kept under
    /// [`UnknownStatementPolicy::Note`](crate::grammar::UnknownStatementPolicy::Note).
    Unknown,
}

impl ConfNode {
    /// Creates an [`Ignored`] node for a known statement that has no
    /// bearing on the database.
    pub fn benign(statement: &Statement, scope: Scope) -> Self {
        Self::ignored(statement, scope, IgnoreReason::Benign)
    }

    /// Creates an [`Ignored`] node for a statement nothing recognized.
    pub fn unknown(statement: &Statement, scope: Scope) -> Self {
        Self::ignored(statement, scope, IgnoreReason::Unknown)
    }

    fn ignored(statement: &Statement, scope: Scope, reason: IgnoreReason) -> Self {
        Self::Ignored(Ignored {
            keyword: statement.keyword().to_owned(),
            scope,
            line: statement.position.line,
            reason,
        })
    }
}

////////////////////////////////////////////////////////////////////////
// PARSING                                                            //
////////////////////////////////////////////////////////////////////////

/// Parses a whole configuration file into [`ConfNode`]s, in file
/// order. Statements noted by the [`UnknownStatementPolicy`] follow the
/// node of the block they appeared in.
///
/// [`UnknownStatementPolicy`]: crate::grammar::UnknownStatementPolicy
pub fn parse(data: &[u8], grammar: &Grammar) -> Result<Vec<ConfNode>> {
    let text = str::from_utf8(data).map_err(|e| {
        let position = position_of_offset(data, e.valid_up_to());
        Error::new(position, ErrorKind::BadUtf8(e))
    })?;
    let tokens = lexer::tokenize(text)?;
    let statements = statement::parse_statements(&tokens)?;

    let mut cx = MatchContext::new(grammar);
    let mut nodes = Vec::with_capacity(statements.len());
    for statement in &statements {
        match grammar.match_statement(statement, Scope::TopLevel, &mut cx)? {
            Some(node) => nodes.push(node),
            None => return Err(statement.error(ErrorKind::UnknownStatement)),
        }
        nodes.append(&mut cx.take_noted());
    }
    Ok(nodes)
}

/// Computes the line and column of a byte offset.
fn position_of_offset(data: &[u8], offset: usize) -> Position {
    let before = &data[..offset.min(data.len())];
    let line = before.iter().filter(|&&octet| octet == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&octet| octet == b'\n')
        .map_or(0, |i| i + 1);
    Position {
        line,
        column: offset - line_start + 1,
    }
}

/// Returns the statement matchers of the default grammar, in the order
/// they are consulted.
pub(crate) fn builtin_matchers() -> Vec<Box<dyn StatementMatcher>> {
    matchers::builtin()
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
