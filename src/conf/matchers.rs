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

//! The built-in statement matchers.

use std::net::IpAddr;

use super::{
    Acl, AclElement, AclElementKind, ConfNode, Include, OptionValue, Options, Setting, Statement,
    View, Word, Zone, ZoneData, ZoneType,
};
use crate::class::Class;
use crate::grammar::{ErrorKind, Match, MatchContext, Result, Scope, StatementMatcher};
use crate::name::Name;
use crate::time::TimeLiteral;

/// Returns the built-in statement matchers in the order they are
/// consulted.
pub(super) fn builtin() -> Vec<Box<dyn StatementMatcher>> {
    vec![
        Box::new(ViewMatcher),
        Box::new(ZoneMatcher),
        Box::new(AclMatcher),
        Box::new(OptionsMatcher),
        Box::new(IncludeMatcher),
        Box::new(BenignMatcher),
    ]
}

////////////////////////////////////////////////////////////////////////
// KEYWORD TABLES                                                     //
////////////////////////////////////////////////////////////////////////

/// Options recognized in `options` and `view` blocks (and, since many
/// may be set per zone, in `zone` blocks).
const OPTION_KEYWORDS: &[&str] = &[
    "allow-notify",
    "allow-query",
    "allow-query-cache",
    "allow-query-cache-on",
    "allow-query-on",
    "allow-recursion",
    "allow-recursion-on",
    "allow-transfer",
    "allow-update",
    "allow-update-forwarding",
    "also-notify",
    "auth-nxdomain",
    "bindkeys-file",
    "blackhole",
    "check-names",
    "clients-per-query",
    "directory",
    "dnssec-enable",
    "dnssec-lookaside",
    "dnssec-validation",
    "dual-stack-servers",
    "dump-file",
    "edns-udp-size",
    "empty-zones-enable",
    "forward",
    "forwarders",
    "geoip-directory",
    "hostname",
    "ixfr-from-differences",
    "key-directory",
    "lame-ttl",
    "listen-on",
    "listen-on-v6",
    "managed-keys-directory",
    "masterfile-format",
    "match-mapped-addresses",
    "max-cache-size",
    "max-cache-ttl",
    "max-clients-per-query",
    "max-ncache-ttl",
    "max-transfer-time-in",
    "max-transfer-time-out",
    "max-udp-size",
    "memstatistics-file",
    "minimal-responses",
    "notify",
    "notify-delay",
    "notify-source",
    "notify-source-v6",
    "pid-file",
    "prefetch",
    "provide-ixfr",
    "qname-minimization",
    "query-source",
    "query-source-v6",
    "querylog",
    "rate-limit",
    "recursion",
    "recursive-clients",
    "request-ixfr",
    "response-policy",
    "rrset-order",
    "serial-query-rate",
    "server-id",
    "session-keyfile",
    "sortlist",
    "statistics-file",
    "tcp-clients",
    "transfer-source",
    "transfer-source-v6",
    "transfers-in",
    "transfers-out",
    "transfers-per-ns",
    "version",
    "zone-statistics",
];

/// Options that only make sense inside a `view` block.
const VIEW_KEYWORDS: &[&str] = &["match-destinations", "match-recursive-only"];

/// Options that only make sense inside a `zone` block (apart from
/// `type`, `file`, and `in-view`, which are interpreted).
const ZONE_KEYWORDS: &[&str] = &[
    "auto-dnssec",
    "database",
    "dialup",
    "dnssec-policy",
    "inline-signing",
    "journal",
    "masters",
    "max-journal-size",
    "primaries",
    "serial-update-method",
    "server-addresses",
    "server-names",
    "sig-validity-interval",
    "update-policy",
];

/// Top-level statements (and the scopes they may appear in) that are
/// recognized but have no bearing on the database.
const BENIGN_STATEMENTS: &[(&str, &[Scope])] = &[
    ("controls", &[Scope::TopLevel]),
    ("dnssec-policy", &[Scope::TopLevel]),
    ("dlz", &[Scope::TopLevel, Scope::View]),
    ("dyndb", &[Scope::TopLevel, Scope::View]),
    ("http", &[Scope::TopLevel]),
    ("key", &[Scope::TopLevel, Scope::View]),
    ("logging", &[Scope::TopLevel]),
    ("managed-keys", &[Scope::TopLevel, Scope::View]),
    ("masters", &[Scope::TopLevel]),
    ("primaries", &[Scope::TopLevel]),
    ("server", &[Scope::TopLevel, Scope::View]),
    ("statistics-channels", &[Scope::TopLevel]),
    ("tls", &[Scope::TopLevel]),
    ("trust-anchors", &[Scope::TopLevel, Scope::View]),
    ("trusted-keys", &[Scope::TopLevel, Scope::View]),
];

fn is_keyword_in(statement: &Statement, table: &[&str]) -> bool {
    table.iter().any(|keyword| statement.is(keyword))
}

////////////////////////////////////////////////////////////////////////
// VIEW                                                               //
////////////////////////////////////////////////////////////////////////

/// Matches `view "name" [class] { ... };` at the top level.
struct ViewMatcher;

impl StatementMatcher for ViewMatcher {
    fn name(&self) -> &str {
        "view"
    }

    fn match_statement(
        &self,
        statement: &Statement,
        scope: Scope,
        cx: &mut MatchContext,
    ) -> Result<Match> {
        if scope != Scope::TopLevel || !statement.is("view") {
            return Ok(Match::NotMine);
        }
        let name = statement.expect_arg(0, "view name")?.text.clone();
        let class = optional_class(statement, 1)?.unwrap_or(Class::IN);
        let body = statement.expect_block()?;

        let mut view = View {
            name,
            class,
            match_clients: None,
            zones: Vec::new(),
            includes: Vec::new(),
            settings: Vec::new(),
            line: statement.position.line,
        };
        for nested in body {
            if nested.is("match-clients") {
                view.match_clients = Some(acl_elements(nested.expect_block()?)?);
            } else if let Some(node) = cx.match_nested(nested, Scope::View)? {
                match node {
                    ConfNode::Zone(zone) => view.zones.push(zone),
                    ConfNode::Include(include) => view.includes.push(include),
                    other => cx.note(other),
                }
            } else if is_keyword_in(nested, OPTION_KEYWORDS) || is_keyword_in(nested, VIEW_KEYWORDS) {
                view.settings.push(setting(nested));
            } else {
                cx.unknown_nested(nested, Scope::View)?;
            }
        }
        Ok(Match::Node(ConfNode::View(view)))
    }
}

////////////////////////////////////////////////////////////////////////
// ZONE                                                               //
////////////////////////////////////////////////////////////////////////

/// Matches `zone "name" [class] { ... };` at the top level and in
/// views.
struct ZoneMatcher;

impl StatementMatcher for ZoneMatcher {
    fn name(&self) -> &str {
        "zone"
    }

    fn match_statement(
        &self,
        statement: &Statement,
        scope: Scope,
        cx: &mut MatchContext,
    ) -> Result<Match> {
        if !matches!(scope, Scope::TopLevel | Scope::View) || !statement.is("zone") {
            return Ok(Match::NotMine);
        }
        let name_word = statement.expect_arg(0, "zone name")?;
        let apex: Name = name_word
            .text
            .parse()
            .map_err(|e| name_word.error(ErrorKind::InvalidName(e)))?;
        let class = optional_class(statement, 1)?;
        let body = statement.expect_block()?;

        let mut zone = Zone {
            apex,
            class,
            zone_type: None,
            in_view: None,
            data: ZoneData::None,
            settings: Vec::new(),
            line: statement.position.line,
        };
        for nested in body {
            if nested.is("type") {
                let word = single_arg(nested, "zone type")?;
                let zone_type: ZoneType = word
                    .text
                    .parse()
                    .map_err(|_| word.error(ErrorKind::InvalidZoneType))?;
                zone.zone_type = Some(zone_type);
            } else if nested.is("file") {
                zone.data = ZoneData::File(single_arg(nested, "file name")?.text.clone());
            } else if nested.is("in-view") {
                zone.in_view = Some(single_arg(nested, "view name")?.text.clone());
            } else if let Some(node) = cx.match_nested(nested, Scope::Zone)? {
                cx.note(node);
            } else if is_keyword_in(nested, ZONE_KEYWORDS) || is_keyword_in(nested, OPTION_KEYWORDS) {
                zone.settings.push(setting(nested));
            } else {
                cx.unknown_nested(nested, Scope::Zone)?;
            }
        }
        if zone.zone_type.is_none() && zone.in_view.is_none() {
            return Err(statement.error(ErrorKind::MissingArgument("zone type")));
        }
        Ok(Match::Node(ConfNode::Zone(zone)))
    }
}

////////////////////////////////////////////////////////////////////////
// ACL                                                                //
////////////////////////////////////////////////////////////////////////

/// Matches `acl name { ... };` at the top level.
struct AclMatcher;

impl StatementMatcher for AclMatcher {
    fn name(&self) -> &str {
        "acl"
    }

    fn match_statement(
        &self,
        statement: &Statement,
        scope: Scope,
        _cx: &mut MatchContext,
    ) -> Result<Match> {
        if scope != Scope::TopLevel || !statement.is("acl") {
            return Ok(Match::NotMine);
        }
        Ok(Match::Node(ConfNode::Acl(Acl {
            name: single_arg(statement, "ACL name")?.text.clone(),
            elements: acl_elements(statement.expect_block()?)?,
            line: statement.position.line,
        })))
    }
}

/// Parses the elements of an address match list.
fn acl_elements(statements: &[Statement]) -> Result<Vec<AclElement>> {
    statements.iter().map(acl_element).collect()
}

fn acl_element(statement: &Statement) -> Result<AclElement> {
    let mut negated = false;
    let mut texts = Vec::with_capacity(statement.words.len());
    for (i, word) in statement.words.iter().enumerate() {
        let mut text = word.text.as_str();
        if i == 0 && !word.quoted {
            if let Some(rest) = text.strip_prefix('!') {
                negated = true;
                text = rest;
            }
        }
        if !text.is_empty() {
            texts.push(text);
        }
    }

    let kind = match (texts.as_slice(), &statement.block) {
        ([], Some(block)) => AclElementKind::Nested(acl_elements(block)?),
        ([text], None) => acl_token(text),
        ([key, name], None) if key.eq_ignore_ascii_case("key") => {
            AclElementKind::Key((*name).to_owned())
        }
        _ => {
            return Err(statement.error(ErrorKind::InvalidArgument(
                "address match list element",
            )))
        }
    };
    Ok(AclElement { negated, kind })
}

/// Classifies a single-word element as an address (or prefix) or as a
/// reference to a named ACL.
fn acl_token(text: &str) -> AclElementKind {
    let address = text.split_once('/').map_or(text, |(address, _)| address);
    let looks_numeric =
        !address.is_empty() && address.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    if looks_numeric || address.parse::<IpAddr>().is_ok() {
        AclElementKind::Address(text.to_owned())
    } else {
        AclElementKind::Reference(text.to_owned())
    }
}

////////////////////////////////////////////////////////////////////////
// OPTIONS                                                            //
////////////////////////////////////////////////////////////////////////

/// Matches `options { ... };` at the top level.
struct OptionsMatcher;

impl StatementMatcher for OptionsMatcher {
    fn name(&self) -> &str {
        "options"
    }

    fn match_statement(
        &self,
        statement: &Statement,
        scope: Scope,
        cx: &mut MatchContext,
    ) -> Result<Match> {
        if scope != Scope::TopLevel || !statement.is("options") {
            return Ok(Match::NotMine);
        }
        let mut settings = Vec::new();
        for nested in statement.expect_block()? {
            if let Some(node) = cx.match_nested(nested, Scope::Options)? {
                cx.note(node);
            } else if is_keyword_in(nested, OPTION_KEYWORDS) {
                settings.push(setting(nested));
            } else {
                cx.unknown_nested(nested, Scope::Options)?;
            }
        }
        Ok(Match::Node(ConfNode::Options(Options {
            settings,
            line: statement.position.line,
        })))
    }
}

/// Classifies an option statement's value by its shape.
fn setting(statement: &Statement) -> Setting {
    let value = match (&statement.block, statement.args()) {
        (Some(block), args) => OptionValue::List {
            args: texts(args),
            items: block.iter().map(ToString::to_string).collect(),
        },
        (None, []) => OptionValue::Flag,
        (None, [word]) => scalar(word),
        (None, args) => OptionValue::Words(texts(args)),
    };
    Setting {
        key: statement.keyword().to_ascii_lowercase(),
        value,
    }
}

fn texts(words: &[Word]) -> Vec<String> {
    words.iter().map(|word| word.text.clone()).collect()
}

fn scalar(word: &Word) -> OptionValue {
    if word.quoted {
        return OptionValue::Text(word.text.clone());
    }
    match word.text.to_ascii_lowercase().as_str() {
        "yes" | "true" => return OptionValue::Bool(true),
        "no" | "false" => return OptionValue::Bool(false),
        _ => (),
    }
    if let Ok(number) = word.text.parse() {
        OptionValue::Number(number)
    } else if let Ok(duration) = word.text.parse::<TimeLiteral>() {
        OptionValue::Duration(duration)
    } else {
        OptionValue::Text(word.text.clone())
    }
}

////////////////////////////////////////////////////////////////////////
// INCLUDE AND BENIGN STATEMENTS                                      //
////////////////////////////////////////////////////////////////////////

/// Matches `include "path";` at the top level and in views.
struct IncludeMatcher;

impl StatementMatcher for IncludeMatcher {
    fn name(&self) -> &str {
        "include"
    }

    fn match_statement(
        &self,
        statement: &Statement,
        scope: Scope,
        _cx: &mut MatchContext,
    ) -> Result<Match> {
        if !matches!(scope, Scope::TopLevel | Scope::View) || !statement.is("include") {
            return Ok(Match::NotMine);
        }
        if statement.block.is_some() {
            return Err(statement.error(ErrorKind::InvalidArgument("include path")));
        }
        Ok(Match::Node(ConfNode::Include(Include {
            path: single_arg(statement, "include path")?.text.clone(),
            line: statement.position.line,
        })))
    }
}

/// Notes well-known statements that do not affect the database.
struct BenignMatcher;

impl StatementMatcher for BenignMatcher {
    fn name(&self) -> &str {
        "benign"
    }

    fn match_statement(
        &self,
        statement: &Statement,
        scope: Scope,
        _cx: &mut MatchContext,
    ) -> Result<Match> {
        let known = BENIGN_STATEMENTS
            .iter()
            .any(|(keyword, scopes)| statement.is(keyword) && scopes.contains(&scope));
        if known {
            Ok(Match::Node(ConfNode::benign(statement, scope)))
        } else {
            Ok(Match::NotMine)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// HELPERS                                                            //
////////////////////////////////////////////////////////////////////////

/// Returns the only argument of `statement`.
fn single_arg<'s>(statement: &'s Statement, what: &'static str) -> Result<&'s Word> {
    let word = statement.expect_arg(0, what)?;
    match statement.args().get(1) {
        Some(extra) => Err(extra.error(ErrorKind::InvalidArgument(what))),
        None => Ok(word),
    }
}

/// Parses the optional class argument at `index`, after which there
/// must be no more arguments.
fn optional_class(statement: &Statement, index: usize) -> Result<Option<Class>> {
    let args = statement.args();
    if let Some(extra) = args.get(index + 1) {
        return Err(extra.error(ErrorKind::InvalidArgument("class")));
    }
    match args.get(index) {
        Some(word) => word
            .text
            .parse()
            .map(Some)
            .map_err(|e| word.error(ErrorKind::InvalidClass(e))),
        None => Ok(None),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::super::{parse, IgnoreReason};
    use super::*;
    use crate::grammar::{Error, Grammar};

    lazy_static! {
        static ref GRAMMAR: Grammar = Grammar::default();
    }

    fn parse_one(text: &str) -> ConfNode {
        let mut nodes = parse(text.as_bytes(), &GRAMMAR).unwrap();
        assert_eq!(nodes.len(), 1, "{:?}", nodes);
        nodes.remove(0)
    }

    fn error_kind(text: &str) -> ErrorKind {
        match parse(text.as_bytes(), &GRAMMAR) {
            Err(Error::Syntax(details)) => details.kind().clone(),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn views_collect_zones_and_clients() {
        let node = parse_one(
            "view \"internal\" IN {\n\
                 match-clients { !192.0.2.9; 10.0.0.0/8; trusted; key tsig-key; };\n\
                 recursion yes;\n\
                 zone \"example.com\" { type master; file \"internal/db.example\"; };\n\
                 include \"/etc/bind/internal-zones.conf\";\n\
             };",
        );
        let view = match node {
            ConfNode::View(view) => view,
            other => panic!("unexpected node {:?}", other),
        };
        assert_eq!(view.name, "internal");
        assert_eq!(view.class, Class::IN);
        let clients = view.match_clients.unwrap();
        assert_eq!(
            clients,
            vec![
                AclElement {
                    negated: true,
                    kind: AclElementKind::Address("192.0.2.9".into()),
                },
                AclElement {
                    negated: false,
                    kind: AclElementKind::Address("10.0.0.0/8".into()),
                },
                AclElement {
                    negated: false,
                    kind: AclElementKind::Reference("trusted".into()),
                },
                AclElement {
                    negated: false,
                    kind: AclElementKind::Key("tsig-key".into()),
                },
            ],
        );
        assert_eq!(view.zones.len(), 1);
        assert_eq!(view.zones[0].apex, "example.com.".parse().unwrap());
        assert_eq!(view.includes[0].path, "/etc/bind/internal-zones.conf");
        assert_eq!(
            view.settings,
            vec![Setting {
                key: "recursion".into(),
                value: OptionValue::Bool(true),
            }],
        );
    }

    #[test]
    fn views_without_match_clients_record_none() {
        match parse_one("view v { };") {
            ConfNode::View(view) => assert_eq!(view.match_clients, None),
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn nested_acl_lists_parse() {
        match parse_one("acl mixed { ! { any; }; localhost; 2001:db8::/32; };") {
            ConfNode::Acl(acl) => {
                assert_eq!(acl.name, "mixed");
                assert!(acl.elements[0].negated);
                assert!(matches!(acl.elements[0].kind, AclElementKind::Nested(ref inner) if inner.len() == 1));
                assert_eq!(acl.elements[2].kind, AclElementKind::Address("2001:db8::/32".into()));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn zones_interpret_type_file_and_in_view() {
        match parse_one("zone \"Example.COM.\" { type slave; masters { 192.0.2.1; }; in-view \"ext\"; };") {
            ConfNode::Zone(zone) => {
                assert_eq!(zone.apex.to_string(), "example.com.");
                assert_eq!(zone.zone_type, Some(ZoneType::Secondary));
                assert_eq!(zone.in_view.as_deref(), Some("ext"));
                assert_eq!(zone.data, ZoneData::None);
                assert!(matches!(
                    &zone.settings[0].value,
                    OptionValue::List { items, .. } if items == &["192.0.2.1"],
                ));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn zone_errors_are_reported() {
        assert_eq!(error_kind("zone \"a\" { type bogus; };"), ErrorKind::InvalidZoneType);
        assert_eq!(
            error_kind("zone \"a\" { file \"db.a\"; };"),
            ErrorKind::MissingArgument("zone type"),
        );
        assert_eq!(error_kind("zone \"a\";"), ErrorKind::MissingBlock);
        assert!(matches!(
            error_kind("zone \"a..b\" { type master; };"),
            ErrorKind::InvalidName(_),
        ));
        assert!(matches!(
            error_kind("zone \"a\" NOPE { type master; };"),
            ErrorKind::InvalidClass(_),
        ));
    }

    #[test]
    fn options_values_are_classified() {
        let options = match parse_one(
            "options {\n\
                 directory \"/var/cache/bind\";\n\
                 max-cache-ttl 1w;\n\
                 transfers-in 10;\n\
                 listen-on port 53 { any; };\n\
                 auth-nxdomain no;\n\
             };",
        ) {
            ConfNode::Options(options) => options,
            other => panic!("unexpected node {:?}", other),
        };
        assert_eq!(options.get("directory").and_then(OptionValue::as_text), Some("/var/cache/bind"));
        assert!(matches!(options.get("max-cache-ttl"), Some(OptionValue::Duration(d)) if d.seconds() == 604800));
        assert_eq!(options.get("transfers-in"), Some(&OptionValue::Number(10)));
        assert_eq!(options.get("auth-nxdomain"), Some(&OptionValue::Bool(false)));
        assert_eq!(
            options.get("listen-on"),
            Some(&OptionValue::List {
                args: vec!["port".into(), "53".into()],
                items: vec!["any".into()],
            }),
        );
    }

    #[test]
    fn view_scoped_benign_statements_are_noted() {
        let nodes = parse(b"view v { key k { secret \"x\"; }; };", &GRAMMAR).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(matches!(
            &nodes[1],
            ConfNode::Ignored(ignored)
                if ignored.scope == Scope::View && ignored.reason == IgnoreReason::Benign,
        ));
    }

    #[test]
    fn top_level_only_statements_are_not_nested() {
        let nodes = parse(b"view v { acl a { any; }; };", &GRAMMAR).unwrap();
        assert!(matches!(
            &nodes[1],
            ConfNode::Ignored(ignored) if ignored.keyword == "acl" && ignored.reason == IgnoreReason::Unknown,
        ));
    }

    #[test]
    fn include_needs_one_path() {
        assert_eq!(
            error_kind("include \"a\" \"b\";"),
            ErrorKind::InvalidArgument("include path"),
        );
        assert_eq!(
            error_kind("include;"),
            ErrorKind::MissingArgument("include path"),
        );
    }
}
