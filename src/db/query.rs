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

//! The query engine.
//!
//! Queries never fail and never modify the [`Database`]. A name that
//! cannot be parsed, or that is not in any zone, gives no answers.
//! Answers are ordered by view (in declaration order), then by zone
//! (per the database's [`ZonePrecedence`]), then by record (in the order
//! the records were defined).
//!
//! Queries never follow CNAMEs or other references. To resolve a chain,
//! query each target in turn:
//!
//! ```
//! # use bindscope::db::{Database, Filter};
//! # use bindscope::rr::{Rdata, Type};
//! fn resolve_a(db: &Database, name: &str) -> Vec<String> {
//!     let filter = Filter::new().rr_type(Type::A).rr_type(Type::CNAME);
//!     let mut addresses = Vec::new();
//!     for answer in db.query(name, &filter) {
//!         match answer.rdata() {
//!             Rdata::A(address) => addresses.push(address.to_string()),
//!             Rdata::Cname(target) if target != answer.owner() => {
//!                 addresses.extend(resolve_a(db, &target.to_string()));
//!             }
//!             _ => (),
//!         }
//!     }
//!     addresses
//! }
//! ```
//!
//! (That sketch loops forever on a CNAME cycle longer than one name;
//! real callers should bound the depth.)

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use regex::{Regex, RegexBuilder};

use super::{Database, View, Zone, ZonePrecedence};
use crate::class::Class;
use crate::name::Name;
use crate::rr::{Rdata, Record, Ttl, Type};

////////////////////////////////////////////////////////////////////////
// FILTERS AND ANSWERS                                                //
////////////////////////////////////////////////////////////////////////

/// Restricts the views and record types a query returns. An empty set
/// means "all".
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Filter {
    views: HashSet<String>,
    types: HashSet<Type>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.views.insert(view.into());
        self
    }

    pub fn views<I, S>(mut self, views: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.views.extend(views.into_iter().map(Into::into));
        self
    }

    pub fn rr_type(mut self, rr_type: Type) -> Self {
        self.types.insert(rr_type);
        self
    }

    pub fn types(mut self, types: impl IntoIterator<Item = Type>) -> Self {
        self.types.extend(types);
        self
    }

    pub fn accepts_view(&self, view: &str) -> bool {
        self.views.is_empty() || self.views.contains(view)
    }

    pub fn accepts_type(&self, rr_type: Type) -> bool {
        self.types.is_empty() || self.types.contains(&rr_type)
    }
}

/// A record found by a query, with the view and zone it was found in.
#[derive(Clone, Copy, Debug)]
pub struct Answer<'a> {
    view: &'a View,
    zone: &'a Zone,
    record: &'a Record,
}

impl<'a> Answer<'a> {
    pub(crate) fn new(view: &'a View, zone: &'a Zone, record: &'a Record) -> Self {
        Self { view, zone, record }
    }

    /// The name of the view the record was found in. For zones shared
    /// with `in-view`, this is the view that was searched, which may
    /// differ from [`Zone::view`].
    pub fn view(&self) -> &'a str {
        self.view.name()
    }

    pub fn zone(&self) -> &'a Zone {
        self.zone
    }

    pub fn record(&self) -> &'a Record {
        self.record
    }

    pub fn owner(&self) -> &'a Name {
        &self.record.owner
    }

    pub fn ttl(&self) -> Ttl {
        self.record.ttl
    }

    pub fn class(&self) -> Class {
        self.record.class
    }

    pub fn rr_type(&self) -> Type {
        self.record.rr_type
    }

    pub fn rdata(&self) -> &'a Rdata {
        &self.record.rdata
    }

    /// The file the record was defined in.
    pub fn path(&self) -> &'a Path {
        &self.record.source.path
    }
}

impl PartialEq for Answer<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.view.name() == other.view.name()
            && self.zone.apex() == other.zone.apex()
            && self.record == other.record
    }
}

impl Eq for Answer<'_> {}

impl fmt::Display for Answer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.view(), self.zone.apex(), self.record)
    }
}

////////////////////////////////////////////////////////////////////////
// QUERIES                                                            //
////////////////////////////////////////////////////////////////////////

impl Database {
    /// Returns the records owned by exactly `name`.
    pub fn query(&self, name: &str, filter: &Filter) -> Vec<Answer> {
        match name.parse::<Name>() {
            Ok(name) => self.query_name(&name, filter),
            Err(_) => Vec::new(),
        }
    }

    /// Like [`Database::query`], for an already parsed name.
    pub fn query_name(&self, name: &Name, filter: &Filter) -> Vec<Answer> {
        self.collect(name, filter, |zone| zone.indices_at(name))
    }

    /// An inexact query. Surrounding whitespace is ignored, and wildcard
    /// owners match names that do not exist, following the closest
    /// encloser rules of RFC 4592. If `pattern`
    /// contains `*` or `?`, it is instead a glob matched against every
    /// owner name (see [`Database::glob`]).
    pub fn iquery(&self, pattern: &str, filter: &Filter) -> Vec<Answer> {
        let pattern = pattern.trim();
        if pattern.contains(&['*', '?'][..]) {
            return self.glob(pattern, filter);
        }
        match pattern.parse::<Name>() {
            Ok(name) => self.iquery_name(&name, filter),
            Err(_) => Vec::new(),
        }
    }

    /// Like [`Database::iquery`] without globbing, for an already parsed
    /// name.
    pub fn iquery_name(&self, name: &Name, filter: &Filter) -> Vec<Answer> {
        self.collect(name, filter, |zone| zone.lookup(name).indices())
    }

    /// Returns the records whose owner matches a shell-style glob: `*`
    /// matches any run of characters (dots included) and `?` any single
    /// character. Matching is case-insensitive against owners in
    /// presentation format, and a missing trailing dot is added to the
    /// pattern. Answers are ordered by view, then zone declaration, then
    /// record.
    pub fn glob(&self, pattern: &str, filter: &Filter) -> Vec<Answer> {
        let regex = match glob_to_regex(pattern.trim()) {
            Some(regex) => regex,
            None => return Vec::new(),
        };
        let mut answers = Vec::new();
        for view in self.views().filter(|v| filter.accepts_view(v.name())) {
            for zone in self.zones_of(view) {
                answers.extend(
                    zone.records()
                        .filter(|r| filter.accepts_type(r.rr_type))
                        .filter(|r| regex.is_match(&r.owner.to_string()))
                        .map(|r| Answer::new(view, zone, r)),
                );
            }
        }
        answers
    }

    fn collect<'a, F>(&'a self, name: &Name, filter: &Filter, mut indices: F) -> Vec<Answer<'a>>
    where
        F: FnMut(&'a Zone) -> &'a [usize],
    {
        let mut answers = Vec::new();
        for view in self.views().filter(|v| filter.accepts_view(v.name())) {
            for zone in self.zones_containing(view, name) {
                answers.extend(
                    indices(zone)
                        .iter()
                        .map(|&i| zone.record(i))
                        .filter(|r| filter.accepts_type(r.rr_type))
                        .map(|r| Answer::new(view, zone, r)),
                );
            }
        }
        answers
    }

    /// Returns the zones of `view` whose apex is `name` or one of its
    /// ancestors, ordered per the database's [`ZonePrecedence`].
    pub fn zones_containing<'a>(&'a self, view: &'a View, name: &Name) -> Vec<&'a Zone> {
        let mut zones: Vec<&Zone> = name
            .ancestors()
            .filter_map(|apex| view.zone_id(&apex))
            .map(|id| &self.zones[id])
            .collect();
        if self.precedence == ZonePrecedence::DeclarationOrder {
            zones.sort_by_key(|zone| zone.ordinal());
        }
        zones
    }
}

/// Whether `name` is equal to, or a subdomain of, any of `domains`.
pub fn domain_in<'a, I>(name: &Name, domains: I) -> bool
where
    I: IntoIterator<Item = &'a Name>,
{
    domains.into_iter().any(|domain| name.eq_or_subdomain_of(domain))
}

fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut regex = String::with_capacity(pattern.len() * 2 + 3);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    if !pattern.ends_with('.') {
        regex.push_str("\\.");
    }
    regex.push('$');
    RegexBuilder::new(&regex).case_insensitive(true).build().ok()
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;
    use crate::db::tests::{build, database};
    use crate::db::{BuildOptions, ZonePrecedence};
    use crate::rr::Rdata;

    #[test]
    fn globs_translate_to_anchored_regexes() {
        let regex = glob_to_regex("*.Example.com").unwrap();
        assert!(regex.is_match("www.example.com."));
        assert!(regex.is_match("a.b.example.com."));
        assert!(!regex.is_match("example.com."));
        assert!(!regex.is_match("www.example.com.au."));

        let regex = glob_to_regex("host?.example.com.").unwrap();
        assert!(regex.is_match("host1.example.com."));
        assert!(!regex.is_match("host10.example.com."));
        assert!(!regex.is_match("hostXexampleXcom."));
    }

    #[test]
    fn domain_in_is_a_suffix_match_on_labels() {
        let domains: Vec<Name> = vec!["example.com.".parse().unwrap(), "in-addr.arpa.".parse().unwrap()];
        let is_in = |s: &str| domain_in(&s.parse().unwrap(), &domains);
        assert!(is_in("example.com."));
        assert!(is_in("www.example.com."));
        assert!(is_in("1.2.0.192.in-addr.arpa."));
        assert!(!is_in("badexample.com."));
        assert!(!is_in("com."));
    }

    #[test]
    fn empty_filters_accept_everything() {
        let filter = Filter::new();
        assert!(filter.accepts_view("anything"));
        assert!(filter.accepts_type(Type::MX));
        let filter = Filter::new().view("public").rr_type(Type::A);
        assert!(filter.accepts_view("public"));
        assert!(!filter.accepts_view("private"));
        assert!(!filter.accepts_type(Type::AAAA));
    }

    const VIEWS: &str = "view public { match-clients { any; }; \
                             zone \"example.com\" { type master; file \"db.public\"; }; };\n\
                         view private { match-clients { 10.0.0.0/8; }; \
                             zone \"example.org\" { type master; file \"db.private\"; }; \
                             zone \"sub.example.org\" { type master; file \"db.sub\"; }; };";

    lazy_static! {
        static ref DATABASE: Database = database(
            VIEWS,
            &[
                (
                    "db.public",
                    "@ 300 SOA ns1 hostmaster 1 3600 600 86400 300\n\
                     @ NS ns1.example.com.\n\
                     www CNAME example.com.\n\
                     @ A 192.0.2.1\n\
                     *.wild A 192.0.2.2\n\
                     host.wild A 192.0.2.3\n\
                     a.b.wild TXT \"deep\"\n",
                ),
                (
                    "db.private",
                    "@ 300 SOA ns hostmaster 1 3600 600 86400 300\n\
                     sub NS ns.sub\n\
                     ns.sub A 10.0.0.53\n",
                ),
                (
                    "db.sub",
                    "@ 300 SOA ns hostmaster 1 3600 600 86400 300\n\
                     ns A 10.0.0.54\n",
                ),
            ],
        );
    }

    fn owners(answers: &[Answer]) -> Vec<String> {
        answers.iter().map(|a| a.owner().to_string()).collect()
    }

    #[test]
    fn sample_query() {
        let filter = Filter::new().view("public").rr_type(Type::CNAME);
        let answers = DATABASE.query("www.example.com", &filter);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].view(), "public");
        assert_eq!(answers[0].rdata(), &Rdata::Cname("example.com.".parse().unwrap()));
        assert!(DATABASE.query("www.example.com", &Filter::new().rr_type(Type::A)).is_empty());
    }

    #[test]
    fn recursion_is_up_to_the_caller() {
        let a = Filter::new().rr_type(Type::A);
        assert!(DATABASE.query("www.example.com.", &a).is_empty());
        let target = match DATABASE.query("www.example.com.", &Filter::new().rr_type(Type::CNAME))[0].rdata() {
            Rdata::Cname(target) => target.clone(),
            other => panic!("unexpected rdata {:?}", other),
        };
        let answers = DATABASE.query_name(&target, &a);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].rdata(), &Rdata::A("192.0.2.1".parse().unwrap()));
    }

    #[test]
    fn unknown_and_malformed_names_yield_nothing() {
        assert!(DATABASE.query("nowhere.example.com.", &Filter::new()).is_empty());
        assert!(DATABASE.query("a..b", &Filter::new()).is_empty());
        assert!(DATABASE.query("www.example.com.", &Filter::new().view("nope")).is_empty());
        assert!(DATABASE.iquery("a..b", &Filter::new()).is_empty());
    }

    #[test]
    fn iquery_is_lenient_and_follows_wildcards() {
        let filter = Filter::new();
        assert_eq!(owners(&DATABASE.iquery("  WWW.Example.COM ", &filter)), ["www.example.com."]);

        // Wildcards answer for names that do not exist.
        let answers = DATABASE.iquery("other.wild.example.com", &filter);
        assert_eq!(owners(&answers), ["*.wild.example.com."]);
        assert_eq!(answers[0].rdata(), &Rdata::A("192.0.2.2".parse().unwrap()));

        // An exact match, or an existing empty non-terminal, blocks them.
        assert_eq!(owners(&DATABASE.iquery("host.wild.example.com", &filter)), ["host.wild.example.com."]);
        assert!(DATABASE.iquery("b.wild.example.com", &filter).is_empty());
        assert!(DATABASE.iquery("x.b.wild.example.com", &filter).is_empty());

        // query never expands wildcards.
        assert!(DATABASE.query("other.wild.example.com", &filter).is_empty());
    }

    #[test]
    fn iquery_globs() {
        let answers = DATABASE.iquery("*.wild.example.com", &Filter::new());
        assert_eq!(
            owners(&answers),
            ["*.wild.example.com.", "host.wild.example.com.", "a.b.wild.example.com."],
        );
        assert_eq!(DATABASE.glob("ns?.sub.example.org", &Filter::new()).len(), 0);
        assert_eq!(owners(&DATABASE.glob("ns.sub.example.org", &Filter::new())), [
            "ns.sub.example.org.",
            "ns.sub.example.org.",
        ]);
    }

    #[test]
    fn nested_zones_follow_precedence() {
        let filter = Filter::new().rr_type(Type::A);
        let answers = DATABASE.query("ns.sub.example.org.", &filter);
        let apexes: Vec<String> = answers.iter().map(|a| a.zone().apex().to_string()).collect();
        assert_eq!(apexes, ["sub.example.org.", "example.org."]);

        let options = BuildOptions {
            precedence: ZonePrecedence::DeclarationOrder,
            ..BuildOptions::default()
        };
        let database = build(
            VIEWS,
            &[
                ("db.public", "@ 300 SOA ns1 hostmaster 1 3600 600 86400 300\n"),
                ("db.private", "@ 300 SOA ns hostmaster 1 3600 600 86400 300\nns.sub A 10.0.0.53\n"),
                ("db.sub", "@ 300 SOA ns hostmaster 1 3600 600 86400 300\nns A 10.0.0.54\n"),
            ],
            options,
        );
        let answers = database.query("ns.sub.example.org.", &filter);
        let apexes: Vec<String> = answers.iter().map(|a| a.zone().apex().to_string()).collect();
        assert_eq!(apexes, ["example.org.", "sub.example.org."]);
    }

    #[test]
    fn queries_are_deterministic() {
        let all = Filter::new();
        let public_a = Filter::new().view("public").rr_type(Type::A);
        let run = || {
            let mut answers = Vec::new();
            for name in ["example.com", "www.example.com.", "ns.sub.example.org", "nowhere.example.com"] {
                answers.push(DATABASE.query(name, &all));
                answers.push(DATABASE.query(name, &public_a));
            }
            for pattern in ["other.wild.example.com", "*.example.org", "host?.wild.example.com"] {
                answers.push(DATABASE.iquery(pattern, &all));
            }
            answers
        };
        let first = run();
        assert!(first.iter().any(|answers| answers.len() > 1));
        for _ in 0..10 {
            assert_eq!(run(), first);
        }
    }
}
