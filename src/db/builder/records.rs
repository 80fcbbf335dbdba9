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

//! Expansion of zone-file statements into [`Record`]s, and the checks
//! run on the records of each zone.
//!
//! Names in a zone-file AST are kept as written. Expansion resolves
//! them against the origin in effect, which starts out as the zone
//! apex and is changed by `$ORIGIN`. `$INCLUDE` reads another file with
//! its own origin (the one given, or else the current one); afterwards
//! the origin and the current owner revert to what they were, as
//! [RFC 1035 § 5.1] requires.
//!
//! A record without a TTL takes the `$TTL` default if one is in
//! effect, or else the MINIMUM field of the zone's SOA record, or else
//! the TTL of the previous record, or else one day.
//!
//! [RFC 1035 § 5.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.1

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::loader::Loader;
use super::Checker;
use crate::class::Class;
use crate::conf::PathResolver;
use crate::db::{BuildError, Diagnostics, SemanticError};
use crate::grammar::{Error, ErrorKind, Position};
use crate::name::{Name, NameRef};
use crate::rr::{Record, Source, Ttl, Type};
use crate::source::{Ast, SourceFile, SourceKind};
use crate::zone_file::{Owner, RecordStatement, ZoneStatement};

////////////////////////////////////////////////////////////////////////
// EXPANSION                                                          //
////////////////////////////////////////////////////////////////////////

/// Shared state for reading the zone files of one build.
pub(super) struct Files<'r, 'l> {
    pub loader: &'r Loader<'l>,
    pub resolver: &'r PathResolver,
    pub max_depth: usize,

    /// Files read through `$INCLUDE`, which are often shared.
    pub includes: &'r mut HashMap<PathBuf, Arc<SourceFile>>,
}

/// Reads the records of one zone.
pub(super) struct ZoneReader<'z, 'r, 'l> {
    files: Files<'r, 'l>,
    checker: &'z mut Checker,
    apex: &'z Name,
    class: Class,
    stack: Vec<PathBuf>,
    default_ttl: Option<Ttl>,
    soa_minimum: Option<Ttl>,
    last_ttl: Option<Ttl>,
    last_owner: Option<Name>,
    records: Vec<Record>,
}

impl<'z, 'r, 'l> ZoneReader<'z, 'r, 'l> {
    pub fn new(files: Files<'r, 'l>, checker: &'z mut Checker, apex: &'z Name, class: Class) -> Self {
        Self {
            files,
            checker,
            apex,
            class,
            stack: Vec::new(),
            default_ttl: None,
            soa_minimum: None,
            last_ttl: None,
            last_owner: None,
            records: Vec::new(),
        }
    }

    /// Expands `statements`, read from `path`, into records.
    pub fn read(mut self, statements: &[ZoneStatement], path: &Arc<Path>) -> Result<Vec<Record>, BuildError> {
        self.stack.push(path.to_path_buf());
        self.statements(statements, path, self.apex.clone())?;
        Ok(self.records)
    }

    fn statements(
        &mut self,
        statements: &[ZoneStatement],
        path: &Arc<Path>,
        mut origin: Name,
    ) -> Result<(), BuildError> {
        for statement in statements {
            match statement {
                ZoneStatement::Origin { origin: new, line } => {
                    if let Some(new) = self.resolve(new, &origin, &source(path, *line))? {
                        origin = new;
                    }
                }
                ZoneStatement::Ttl { ttl, .. } => self.default_ttl = Some(Ttl::from(*ttl)),
                ZoneStatement::Include {
                    path: included,
                    origin: include_origin,
                    line,
                } => {
                    let include_origin = match include_origin {
                        Some(o) => match self.resolve(o, &origin, &source(path, *line))? {
                            Some(o) => o,
                            None => continue,
                        },
                        None => origin.clone(),
                    };
                    let owner = self.last_owner.clone();
                    self.include(included, *line, path, include_origin)?;
                    self.last_owner = owner;
                }
                ZoneStatement::Record(record) => self.record(record, &origin, path)?,
            }
        }
        Ok(())
    }

    fn include(&mut self, included: &str, line: usize, path: &Path, origin: Name) -> Result<(), BuildError> {
        let target = self.files.resolver.resolve(included, path);
        let fail = |kind: ErrorKind| {
            Err(BuildError::Grammar(
                Error::new(Position { line, column: 1 }, kind)
                    .with_token(included)
                    .in_file(path),
            ))
        };
        if self.stack.contains(&target) {
            return fail(ErrorKind::IncludeCycle);
        } else if self.stack.len() > self.files.max_depth {
            return fail(ErrorKind::IncludeTooDeep);
        }

        let file = match self.files.includes.get(&target) {
            Some(file) => file.clone(),
            None => {
                let file = Arc::new(self.files.loader.load(&target, SourceKind::Zone)?);
                self.files.includes.insert(target.clone(), file.clone());
                file
            }
        };
        let statements = match file.ast {
            Ast::Zone(ref statements) => statements.as_slice(),
            Ast::Conf(_) => &[],
        };
        self.stack.push(target.clone());
        self.statements(statements, &Arc::from(target), origin)?;
        self.stack.pop();
        Ok(())
    }

    fn record(&mut self, statement: &RecordStatement, origin: &Name, path: &Arc<Path>) -> Result<(), BuildError> {
        let source = source(path, statement.line);
        let owner = match statement.owner {
            Owner::Name(ref name) => match self.resolve(name, origin, &source)? {
                Some(owner) => owner,
                None => return Ok(()),
            },
            Owner::Inherit => self.last_owner.clone().unwrap_or_else(|| origin.clone()),
        };
        self.last_owner = Some(owner.clone());

        let class = statement.class.unwrap_or(self.class);
        if class != self.class {
            return self.drop_record(SemanticError::ClassMismatch {
                zone: self.apex.clone(),
                expected: self.class,
                found: class,
                source,
            });
        } else if !owner.eq_or_subdomain_of(self.apex) {
            return self.drop_record(SemanticError::OutOfZone {
                zone: self.apex.clone(),
                owner,
                source,
            });
        }

        let rdata = match statement.rdata.try_map_names(|name| name.resolve(origin)) {
            Ok(rdata) => rdata,
            Err(error) => {
                return self.drop_record(SemanticError::InvalidName {
                    zone: self.apex.clone(),
                    error,
                    source,
                })
            }
        };
        if let Some(soa) = rdata.soa() {
            self.soa_minimum.get_or_insert(Ttl::from(soa.minimum));
        }
        let ttl = statement
            .ttl
            .map(Ttl::from)
            .or(self.default_ttl)
            .or(self.soa_minimum)
            .or(self.last_ttl)
            .unwrap_or(Ttl::DEFAULT);
        self.last_ttl = Some(ttl);

        self.records.push(Record {
            owner,
            ttl,
            class,
            rr_type: statement.rr_type,
            rdata,
            source,
        });
        Ok(())
    }

    /// Resolves a name against `origin`. `None` means the name was too
    /// long and a best-effort build dropped the statement.
    fn resolve(&mut self, name: &NameRef, origin: &Name, source: &Source) -> Result<Option<Name>, BuildError> {
        match name.resolve(origin) {
            Ok(name) => Ok(Some(name)),
            Err(error) => {
                self.drop_record(SemanticError::InvalidName {
                    zone: self.apex.clone(),
                    error,
                    source: source.clone(),
                })?;
                Ok(None)
            }
        }
    }

    fn drop_record(&mut self, error: SemanticError) -> Result<(), BuildError> {
        self.checker.fail(error).map_err(Into::into)
    }
}

fn source(path: &Arc<Path>, line: usize) -> Source {
    Source {
        path: path.clone(),
        line,
    }
}

////////////////////////////////////////////////////////////////////////
// CHECKS                                                             //
////////////////////////////////////////////////////////////////////////

/// Removes duplicate (owner, type, RDATA) records, keeping the first of
/// each.
pub(super) fn dedup(records: Vec<Record>, diagnostics: &mut Diagnostics) -> Vec<Record> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert((record.owner.clone(), record.rr_type, record.rdata.clone())) {
            kept.push(record);
        } else {
            diagnostics.warn(Some(&record.source), format_args!("duplicate record {} ignored", record));
        }
    }
    kept
}

/// Checks that there is exactly one SOA record, at the apex.
pub(super) fn check_soa(apex: &Name, records: &[Record]) -> Vec<SemanticError> {
    let mut errors = Vec::new();
    let mut at_apex = 0;
    for record in records.iter().filter(|r| r.rr_type == Type::SOA) {
        if record.owner == *apex {
            at_apex += 1;
        } else {
            errors.push(SemanticError::SoaNotAtApex {
                zone: apex.clone(),
                owner: record.owner.clone(),
                source: record.source.clone(),
            });
        }
    }
    match at_apex {
        0 => errors.push(SemanticError::MissingSoa { zone: apex.clone() }),
        1 => (),
        count => errors.push(SemanticError::MultipleSoa {
            zone: apex.clone(),
            count,
        }),
    }
    errors
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::db::BuildMode;
    use crate::grammar::Grammar;
    use crate::rr::Rdata;
    use crate::zone_file;

    struct Fixture {
        dir: tempfile::TempDir,
        grammar: Grammar,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                grammar: Grammar::default(),
            }
        }

        fn write(&self, name: &str, text: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, text).unwrap();
            path
        }

        fn read(&self, apex: &str, text: &str, mode: BuildMode) -> (Result<Vec<Record>, BuildError>, Checker) {
            let path = self.write("db.zone", text);
            let statements = zone_file::parse(text.as_bytes(), &self.grammar).unwrap();
            let loader = Loader::new(&self.grammar, None, 1);
            let resolver = PathResolver::new(self.dir.path());
            let mut includes = HashMap::new();
            let mut checker = Checker::new(mode);
            let apex: Name = apex.parse().unwrap();
            let files = Files {
                loader: &loader,
                resolver: &resolver,
                max_depth: 8,
                includes: &mut includes,
            };
            let result = ZoneReader::new(files, &mut checker, &apex, Class::IN)
                .read(&statements, &Arc::from(path));
            (result, checker)
        }
    }

    fn owners(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r.owner.to_string()).collect()
    }

    #[test]
    fn names_resolve_against_the_origin_in_effect() {
        let fixture = Fixture::new();
        let (records, _) = fixture.read(
            "example.com.",
            "@ 300 IN A 192.0.2.1\n\
             www CNAME @\n\
             $ORIGIN sub\n\
             host A 192.0.2.2\n\
             \tAAAA 2001:db8::1\n\
             other.net. A 192.0.2.3\n",
            BuildMode::BestEffort,
        );
        let records = records.unwrap();
        assert_eq!(
            owners(&records),
            ["example.com.", "www.example.com.", "host.sub.example.com.", "host.sub.example.com."],
        );
        assert_eq!(records[1].rdata, Rdata::Cname("example.com.".parse().unwrap()));
    }

    #[test]
    fn out_of_zone_records_fail_strict_builds() {
        let fixture = Fixture::new();
        let (result, _) = fixture.read("example.com.", "other.net. A 192.0.2.3\n", BuildMode::Strict);
        assert!(matches!(
            result,
            Err(BuildError::Semantic(SemanticError::OutOfZone { ref owner, ref source, .. }))
                if owner.to_string() == "other.net." && source.line == 1,
        ));
    }

    #[test]
    fn out_of_zone_records_are_dropped_and_flagged() {
        let fixture = Fixture::new();
        let (result, checker) = fixture.read(
            "example.com.",
            "other.net. A 192.0.2.3\nwww A 192.0.2.4\n",
            BuildMode::BestEffort,
        );
        assert_eq!(owners(&result.unwrap()), ["www.example.com."]);
        assert_eq!(checker.diagnostics.errors().count(), 1);
    }

    #[test]
    fn ttls_are_inherited() {
        let fixture = Fixture::new();
        let (records, _) = fixture.read(
            "example.com.",
            "@ SOA ns hostmaster 1 3600 600 86400 120\n\
             a A 192.0.2.1\n\
             $TTL 1h\n\
             b A 192.0.2.2\n\
             c 60 A 192.0.2.3\n",
            BuildMode::Strict,
        );
        let ttls: Vec<u32> = records.unwrap().iter().map(|r| r.ttl.seconds()).collect();
        assert_eq!(ttls, [120, 120, 3600, 60]);
    }

    #[test]
    fn ttl_falls_back_to_previous_record_and_default() {
        let fixture = Fixture::new();
        let (records, _) = fixture.read(
            "example.com.",
            "a A 192.0.2.1\nb 30 A 192.0.2.2\nc A 192.0.2.3\n",
            BuildMode::Strict,
        );
        let ttls: Vec<u32> = records.unwrap().iter().map(|r| r.ttl.seconds()).collect();
        assert_eq!(ttls, [86400, 30, 30]);
    }

    #[test]
    fn includes_use_their_own_origin_and_restore_state() {
        let fixture = Fixture::new();
        fixture.write("hosts.inc", "alpha A 192.0.2.10\n\tTXT \"in include\"\n");
        let (records, _) = fixture.read(
            "example.com.",
            "top A 192.0.2.1\n\
             $INCLUDE hosts.inc lab\n\
             \tTXT \"after include\"\n",
            BuildMode::Strict,
        );
        let records = records.unwrap();
        assert_eq!(
            owners(&records),
            ["top.example.com.", "alpha.lab.example.com.", "alpha.lab.example.com.", "top.example.com."],
        );
        assert!(records[1].source.path.ends_with("hosts.inc"));
    }

    #[test]
    fn include_cycles_are_errors() {
        let fixture = Fixture::new();
        fixture.write("loop.inc", "$INCLUDE loop.inc\n");
        let (result, _) = fixture.read("example.com.", "$INCLUDE loop.inc\n", BuildMode::Strict);
        assert!(matches!(
            result,
            Err(BuildError::Grammar(ref e))
                if e.details().map(|d| d.kind()) == Some(&ErrorKind::IncludeCycle),
        ));
    }

    #[test]
    fn class_mismatches_are_errors() {
        let fixture = Fixture::new();
        let (result, _) = fixture.read("example.com.", "www CH A 192.0.2.1\n", BuildMode::Strict);
        assert!(matches!(
            result,
            Err(BuildError::Semantic(SemanticError::ClassMismatch { found: Class::CH, .. })),
        ));
    }

    #[test]
    fn duplicates_are_removed_with_a_warning() {
        let fixture = Fixture::new();
        let (records, _) = fixture.read(
            "example.com.",
            "www A 192.0.2.1\nWWW A 192.0.2.1\nwww A 192.0.2.2\n",
            BuildMode::Strict,
        );
        let mut diagnostics = Diagnostics::default();
        let records = dedup(records.unwrap(), &mut diagnostics);
        assert_eq!(records.len(), 2);
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn soa_checks() {
        let apex: Name = "example.com.".parse().unwrap();
        let fixture = Fixture::new();
        let (records, _) = fixture.read(
            "example.com.",
            "@ SOA ns hostmaster 1 2 3 4 5\n\
             @ SOA ns hostmaster 2 2 3 4 5\n\
             sub SOA ns hostmaster 1 2 3 4 5\n",
            BuildMode::Strict,
        );
        let errors = check_soa(&apex, &records.unwrap());
        assert!(matches!(errors[0], SemanticError::SoaNotAtApex { .. }));
        assert!(matches!(errors[1], SemanticError::MultipleSoa { count: 2, .. }));
        assert_eq!(check_soa(&apex, &[]), [SemanticError::MissingSoa { zone: apex.clone() }]);
    }
}
