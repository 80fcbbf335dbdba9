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

//! The semantic database of a configuration.
//!
//! A [`Database`] is an immutable snapshot of the views, zones, and
//! records a configuration defines. It is produced by a
//! [`Builder`](builder::Builder) and read through the query engine
//! ([`Database::query`], [`Database::iquery`]) and the enumeration
//! methods below. There is no global database: callers own it and pass
//! it around explicitly. A `Database` is `Send + Sync`, so any number
//! of threads may query it at once; to pick up changes to the
//! configuration, build a new one.
//!
//! The database is organized in two tiers, as a name server's would
//! be. Each [`View`] maps zone apexes to [`Zone`]s, and each zone maps
//! owner names to records. A zone belongs to exactly one view, although
//! other views may share it through `in-view`. When a configuration
//! declares no views, every zone belongs to the implicit view
//! [`DEFAULT_VIEW`].

use std::collections::{HashMap, HashSet};

use crate::class::Class;
use crate::conf::Setting;
use crate::name::Name;
use crate::rr::{Source, Type};

mod acl;
pub mod builder;
mod diagnostics;
mod error;
mod lookup;
mod query;
mod zone;
pub use acl::{ClientSet, ClientToken, BUILTIN_ACLS};
pub use builder::{BuildMode, BuildOptions, BuildOutput, Builder, GrammarPolicy, ZonePrecedence};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{BuildError, SemanticError};
pub use query::{domain_in, Answer, Filter};
pub use zone::Zone;

/// The name of the view that holds every zone of a configuration that
/// declares no views.
pub const DEFAULT_VIEW: &str = "_default";

////////////////////////////////////////////////////////////////////////
// VIEWS                                                              //
////////////////////////////////////////////////////////////////////////

/// A view of a [`Database`].
#[derive(Debug)]
pub struct View {
    name: String,
    class: Class,
    clients: ClientSet,
    settings: Vec<Setting>,
    declared_at: Option<Source>,
    zones: Vec<usize>,
    by_apex: HashMap<Name, usize>,
}

impl View {
    pub(crate) fn new(
        name: String,
        class: Class,
        clients: ClientSet,
        settings: Vec<Setting>,
        declared_at: Option<Source>,
    ) -> Self {
        Self {
            name,
            class,
            clients,
            settings,
            declared_at,
            zones: Vec::new(),
            by_apex: HashMap::new(),
        }
    }

    /// Makes the zone with index `id` visible in this view. Returns
    /// `false` if the view already has a zone with the same apex.
    pub(crate) fn insert_zone(&mut self, apex: &Name, id: usize) -> bool {
        if self.by_apex.contains_key(apex) {
            return false;
        }
        self.by_apex.insert(apex.clone(), id);
        self.zones.push(id);
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> Class {
        self.class
    }

    /// The resolved `match-clients` list.
    pub fn clients(&self) -> &ClientSet {
        &self.clients
    }

    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// Where the `view` statement is. This is `None` for the implicit
    /// [`DEFAULT_VIEW`].
    pub fn declared_at(&self) -> Option<&Source> {
        self.declared_at.as_ref()
    }

    pub fn is_implicit(&self) -> bool {
        self.declared_at.is_none()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub(crate) fn zone_id(&self, apex: &Name) -> Option<usize> {
        self.by_apex.get(apex).copied()
    }
}

////////////////////////////////////////////////////////////////////////
// THE DATABASE                                                       //
////////////////////////////////////////////////////////////////////////

/// The immutable result of a build. See the [module-level
/// documentation](self).
#[derive(Debug)]
pub struct Database {
    views: Vec<View>,
    zones: Vec<Zone>,
    options: Vec<Setting>,
    precedence: ZonePrecedence,
}

impl Database {
    pub(crate) fn new(
        views: Vec<View>,
        zones: Vec<Zone>,
        options: Vec<Setting>,
        precedence: ZonePrecedence,
    ) -> Self {
        Self {
            views,
            zones,
            options,
            precedence,
        }
    }

    /// Iterates over the views in declaration order.
    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.iter()
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|view| view.name == name)
    }

    /// Iterates over every zone once, grouped by owning view in view
    /// declaration order.
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    /// Iterates over the zones visible in `view`, including those it
    /// shares through `in-view`, in declaration order.
    pub fn zones_of<'a>(&'a self, view: &'a View) -> impl Iterator<Item = &'a Zone> {
        view.zones.iter().map(move |&id| &self.zones[id])
    }

    /// Returns the zone of `view` with apex `apex`.
    pub fn zone(&self, view: &str, apex: &Name) -> Option<&Zone> {
        self.view(view)?.zone_id(apex).map(|id| &self.zones[id])
    }

    /// The settings of the top-level `options` statements.
    pub fn options(&self) -> &[Setting] {
        &self.options
    }

    pub fn precedence(&self) -> ZonePrecedence {
        self.precedence
    }

    /// Returns every record of every view.
    pub fn records(&self) -> Vec<Answer> {
        self.records_where(|_| true)
    }

    /// Returns every record of type `rr_type`.
    pub fn records_of_type(&self, rr_type: Type) -> Vec<Answer> {
        self.records_where(|t| t == rr_type)
    }

    fn records_where(&self, mut accept: impl FnMut(Type) -> bool) -> Vec<Answer> {
        let mut answers = Vec::new();
        for view in &self.views {
            for zone in self.zones_of(view) {
                answers.extend(
                    zone.records()
                        .filter(|r| accept(r.rr_type))
                        .map(|r| Answer::new(view, zone, r)),
                );
            }
        }
        answers
    }

    /// Returns the apexes of the zones that have an SOA record, each
    /// once, in zone order.
    pub fn soa_owners(&self) -> Vec<&Name> {
        let mut seen = HashSet::new();
        self.zones
            .iter()
            .filter(|zone| zone.soa().is_some())
            .map(Zone::apex)
            .filter(|apex| seen.insert(*apex))
            .collect()
    }

    /// The total number of records.
    pub fn record_count(&self) -> usize {
        self.zones.iter().map(Zone::len).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    use super::*;
    use crate::conf::PathResolver;
    use crate::grammar::Grammar;
    use crate::source::{SourceFile, SourceKind};

    const ROOT: &str = "/bindscope-test";

    /// Builds a database from a configuration and zone files that exist
    /// only in memory.
    pub(crate) fn database(conf: &str, files: &[(&str, &str)]) -> Database {
        build(conf, files, BuildOptions::default())
    }

    pub(crate) fn build(conf: &str, files: &[(&str, &str)], options: BuildOptions) -> Database {
        let grammar = Grammar::default();
        let root = Path::new(ROOT);
        let mut sources = vec![
            SourceFile::parse_bytes(&root.join("named.conf"), conf.as_bytes(), SourceKind::Conf, &grammar)
                .unwrap(),
        ];
        for (name, text) in files {
            sources.push(
                SourceFile::parse_bytes(&root.join(name), text.as_bytes(), SourceKind::Zone, &grammar)
                    .unwrap(),
            );
        }
        Builder::new(&grammar, PathResolver::new(root))
            .with_options(options)
            .build_sources(sources)
            .unwrap()
            .database
    }

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn database_is_send_and_sync() {
        assert_send_sync::<Database>();
    }

    #[test]
    fn enumeration() {
        let database = database(
            "zone \"example.com\" { type master; file \"db.example\"; };\n\
             zone \"sub.example.com\" { type master; file \"db.sub\"; };\n\
             zone \"example.net\" { type forward; };",
            &[
                (
                    "db.example",
                    "@ 300 SOA ns hostmaster 1 3600 600 86400 300\n\
                     @ NS ns\n\
                     ns A 192.0.2.1\n",
                ),
                (
                    "db.sub",
                    "@ 300 SOA ns hostmaster 1 3600 600 86400 300\n\
                     host A 192.0.2.2\n",
                ),
            ],
        );
        assert_eq!(database.views().count(), 1);
        assert_eq!(database.zones().count(), 3);
        assert_eq!(database.record_count(), 5);
        assert_eq!(database.records().len(), 5);
        let owners: Vec<_> = database
            .records_of_type(Type::A)
            .iter()
            .map(|a| a.owner().to_string())
            .collect();
        assert_eq!(owners, ["ns.example.com.", "host.sub.example.com."]);
        assert_eq!(
            database.soa_owners(),
            [&name("example.com."), &name("sub.example.com.")],
        );
        assert!(database.zone(DEFAULT_VIEW, &name("example.net.")).unwrap().is_empty());
    }
}
