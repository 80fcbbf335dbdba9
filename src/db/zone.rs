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

//! The [`Zone`] type.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use super::SemanticError;
use crate::class::Class;
use crate::conf::{Setting, ZoneType};
use crate::name::Name;
use crate::rr::{Record, Source, Type};

/// A zone of a [`Database`](super::Database) and its records.
///
/// Records are kept in the order they were defined. Every owner lies at
/// or below the apex. Besides the owners themselves, the zone tracks
/// every name between an owner and the apex, so that empty
/// non-terminals are known to exist when matching wildcards.
#[derive(Debug)]
pub struct Zone {
    apex: Name,
    class: Class,
    zone_type: Option<ZoneType>,
    view: String,
    file: Option<Arc<Path>>,
    declared_at: Source,
    settings: Vec<Setting>,
    records: Vec<Record>,
    by_owner: HashMap<Name, Vec<usize>>,
    nodes: HashSet<Name>,
    flags: Vec<SemanticError>,
    ordinal: usize,
}

/// How a zone was declared, gathered by the builder.
pub(crate) struct ZoneDecl {
    pub apex: Name,
    pub class: Class,
    pub zone_type: Option<ZoneType>,
    pub view: String,
    pub file: Option<Arc<Path>>,
    pub declared_at: Source,
    pub settings: Vec<Setting>,
    pub ordinal: usize,
}

impl Zone {
    pub(crate) fn new(decl: ZoneDecl) -> Self {
        let mut nodes = HashSet::new();
        nodes.insert(decl.apex.clone());
        Self {
            apex: decl.apex,
            class: decl.class,
            zone_type: decl.zone_type,
            view: decl.view,
            file: decl.file,
            declared_at: decl.declared_at,
            settings: decl.settings,
            records: Vec::new(),
            by_owner: HashMap::new(),
            nodes,
            flags: Vec::new(),
            ordinal: decl.ordinal,
        }
    }

    /// Adds a record. The owner must be at or below the apex.
    pub(crate) fn push(&mut self, record: Record) {
        debug_assert!(record.owner.eq_or_subdomain_of(&self.apex));
        for ancestor in record.owner.ancestors() {
            // The apex is always present, which stops the walk.
            if !self.nodes.insert(ancestor) {
                break;
            }
        }
        self.by_owner
            .entry(record.owner.clone())
            .or_default()
            .push(self.records.len());
        self.records.push(record);
    }

    /// Marks the zone as kept despite `error`.
    pub(crate) fn flag(&mut self, error: SemanticError) {
        self.flags.push(error);
    }

    pub fn apex(&self) -> &Name {
        &self.apex
    }

    pub fn class(&self) -> Class {
        self.class
    }

    /// The declared type. It is `None` only for zones declared with
    /// `in-view` and no `type`.
    pub fn zone_type(&self) -> Option<ZoneType> {
        self.zone_type
    }

    /// The name of the view the zone belongs to.
    pub fn view(&self) -> &str {
        &self.view
    }

    /// The zone file the records were loaded from, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Where the `zone` statement is.
    pub fn declared_at(&self) -> &Source {
        &self.declared_at
    }

    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// The errors a best-effort build kept this zone in spite of.
    pub fn flags(&self) -> &[SemanticError] {
        &self.flags
    }

    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    /// The position of the zone in declaration order.
    pub(crate) fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Iterates over all records in the order they were defined.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Iterates over the records owned by `owner`.
    pub fn records_at<'a>(&'a self, owner: &Name) -> impl Iterator<Item = &'a Record> {
        self.indices_at(owner).iter().map(move |&i| &self.records[i])
    }

    pub(crate) fn indices_at(&self, owner: &Name) -> &[usize] {
        self.by_owner.get(owner).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn record(&self, index: usize) -> &Record {
        &self.records[index]
    }

    /// Whether `name` exists in the zone: it owns records or lies
    /// between an owner and the apex.
    pub fn has_node(&self, name: &Name) -> bool {
        self.nodes.contains(name)
    }

    /// Returns the SOA record at the apex, if there is one.
    pub fn soa(&self) -> Option<&Record> {
        self.records_at(&self.apex).find(|r| r.rr_type == Type::SOA)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rr::{Rdata, Ttl};

    pub(crate) fn make_zone(apex: &str) -> Zone {
        Zone::new(ZoneDecl {
            apex: apex.parse().unwrap(),
            class: Class::IN,
            zone_type: Some(ZoneType::Primary),
            view: "_default".to_owned(),
            file: None,
            declared_at: source(1),
            settings: Vec::new(),
            ordinal: 0,
        })
    }

    pub(crate) fn source(line: usize) -> Source {
        Source {
            path: Arc::from(Path::new("/test/db.zone")),
            line,
        }
    }

    pub(crate) fn record(owner: &str, rdata: Rdata) -> Record {
        let rr_type = match rdata {
            Rdata::A(_) => Type::A,
            Rdata::Cname(_) => Type::CNAME,
            Rdata::Ns(_) => Type::NS,
            Rdata::Txt(_) => Type::TXT,
            _ => unimplemented!(),
        };
        Record {
            owner: owner.parse().unwrap(),
            ttl: Ttl::from(300u32),
            class: Class::IN,
            rr_type,
            rdata,
            source: source(1),
        }
    }

    #[test]
    fn push_tracks_empty_non_terminals() {
        let mut zone = make_zone("example.com.");
        zone.push(record("a.b.c.example.com.", Rdata::A("192.0.2.1".parse().unwrap())));
        for name in ["a.b.c.example.com.", "b.c.example.com.", "c.example.com.", "example.com."] {
            assert!(zone.has_node(&name.parse().unwrap()), "{}", name);
        }
        assert!(!zone.has_node(&"d.example.com.".parse().unwrap()));
        assert_eq!(zone.records_at(&"b.c.example.com.".parse().unwrap()).count(), 0);
    }

    #[test]
    fn records_keep_definition_order() {
        let mut zone = make_zone("example.com.");
        zone.push(record("b.example.com.", Rdata::A("192.0.2.2".parse().unwrap())));
        zone.push(record("a.example.com.", Rdata::A("192.0.2.1".parse().unwrap())));
        zone.push(record("b.example.com.", Rdata::A("192.0.2.3".parse().unwrap())));
        let owners: Vec<String> = zone.records().map(|r| r.owner.to_string()).collect();
        assert_eq!(owners, ["b.example.com.", "a.example.com.", "b.example.com."]);
        let at_b: Vec<&Rdata> = zone
            .records_at(&"b.example.com.".parse().unwrap())
            .map(|r| &r.rdata)
            .collect();
        assert_eq!(
            at_b,
            [
                &Rdata::A("192.0.2.2".parse().unwrap()),
                &Rdata::A("192.0.2.3".parse().unwrap()),
            ],
        );
    }
}
