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

//! Building a [`Database`] from configuration ASTs.
//!
//! A build runs in these steps:
//!
//! 1. The view, ACL, zone, and options statements of the configuration
//!    are collected, following `include` statements. A `directory`
//!    option changes how later relative paths are resolved.
//! 2. The `match-clients` list of each view is resolved against the
//!    declared and built-in ACLs.
//! 3. Each zone is assigned to a view. Among the views that declare a
//!    zone (with the same class), the first one whose client set is not
//!    empty gets it; later declarations are shadowed. A zone declared
//!    with `in-view` is shared with the view it names.
//! 4. The zone files of the assigned zones are loaded, distinct files
//!    in parallel, and expanded into records, which are then checked.
//! 5. The result is frozen into a [`Database`].
//!
//! In [`BuildMode::Strict`] (the default) the first [`SemanticError`]
//! fails the build. In [`BuildMode::BestEffort`], semantic errors become
//! [`Diagnostics`] and the offending entry is dropped (out-of-zone
//! records, zones no view matches, references to unknown ACLs) or kept
//! and flagged (zones with SOA problems). Zone files that fail to parse
//! fail the build under [`GrammarPolicy::Abort`] and cause the zone to
//! be skipped under [`GrammarPolicy::SkipFile`]. Configuration files
//! that fail to parse always fail the build.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use log::{debug, info, log_enabled, Level};

use super::zone::ZoneDecl;
use super::{
    BuildError, ClientSet, Database, Diagnostics, SemanticError, View, Zone, DEFAULT_VIEW,
};
use crate::cache::AstCache;
use crate::class::Class;
use crate::conf::{self, PathResolver, ZoneData, ZoneType};
use crate::grammar::{self, Grammar};
use crate::name::Name;
use crate::rr::Record;
use crate::source::{Ast, SourceFile, SourceKind};
use crate::zone_file::ZoneStatement;

mod acls;
mod collect;
mod loader;
mod records;
use acls::AclTable;
use collect::{Collected, Collector, Located};
use loader::Loader;
use records::{Files, ZoneReader};

////////////////////////////////////////////////////////////////////////
// OPTIONS                                                            //
////////////////////////////////////////////////////////////////////////

/// The default limit on nested `include` and `$INCLUDE` files.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 8;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BuildMode {
    /// Fail on the first semantic error.
    #[default]
    Strict,

    /// Record semantic errors as diagnostics and keep going.
    BestEffort,
}

/// What to do when a zone file cannot be read or parsed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GrammarPolicy {
    #[default]
    Abort,

    /// Leave the zone out of the database, with a diagnostic.
    SkipFile,
}

/// How answers from nested zones of one view are ordered, e.g. for a
/// name that is both in `example.com` and `sub.example.com`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ZonePrecedence {
    /// The zone with the longest apex comes first.
    #[default]
    LongestApexFirst,

    /// Zones come in the order they were declared.
    DeclarationOrder,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildOptions {
    pub mode: BuildMode,
    pub grammar_policy: GrammarPolicy,
    pub precedence: ZonePrecedence,
    pub max_include_depth: usize,

    /// The number of threads used to parse files. `None` means the
    /// available parallelism.
    pub parallelism: Option<NonZeroUsize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            mode: BuildMode::default(),
            grammar_policy: GrammarPolicy::default(),
            precedence: ZonePrecedence::default(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            parallelism: None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// THE BUILDER                                                        //
////////////////////////////////////////////////////////////////////////

/// Builds [`Database`]s. See the [module-level documentation](self).
pub struct Builder<'a> {
    grammar: &'a Grammar,
    resolver: PathResolver,
    cache: Option<&'a AstCache>,
    options: BuildOptions,
}

/// A successful build.
#[derive(Debug)]
pub struct BuildOutput {
    pub database: Database,
    pub diagnostics: Diagnostics,
}

impl<'a> Builder<'a> {
    pub fn new(grammar: &'a Grammar, resolver: PathResolver) -> Self {
        Self {
            grammar,
            resolver,
            cache: None,
            options: BuildOptions::default(),
        }
    }

    /// Loads files through `cache` instead of always parsing them.
    pub fn with_cache(mut self, cache: &'a AstCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Loads the configuration files `roots` and builds a database from
    /// them.
    pub fn build<P: AsRef<Path>>(&self, roots: &[P]) -> Result<BuildOutput, BuildError> {
        let loader = self.loader();
        let sources = roots
            .iter()
            .map(|root| loader.load(root.as_ref(), SourceKind::Conf))
            .collect::<grammar::Result<Vec<_>>>()?;
        self.build_sources(sources)
    }

    /// Builds a database from already loaded files. Configuration files
    /// are processed in order. Zone files among `sources` are used in
    /// place of reading the files at the same paths.
    pub fn build_sources(&self, sources: Vec<SourceFile>) -> Result<BuildOutput, BuildError> {
        let loader = self.loader();
        let mut checker = Checker::new(self.options.mode);
        let (collected, resolver) = Collector::new(
            &loader,
            self.resolver.clone(),
            self.options.max_include_depth,
            &mut checker.diagnostics,
        )
        .collect(sources)?;

        let run = Run {
            options: &self.options,
            loader: &loader,
            resolver,
            checker,
            includes: HashMap::new(),
        };
        let output = run.finish(collected)?;

        if let Some(cache) = self.cache {
            debug!("AST cache: {:?}", cache.stats());
        }
        Ok(output)
    }

    fn loader(&self) -> Loader {
        let parallelism = self
            .options
            .parallelism
            .or_else(|| thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get);
        Loader::new(self.grammar, self.cache, parallelism)
    }
}

/// Decides what becomes of semantic errors, per the [`BuildMode`].
pub(super) struct Checker {
    mode: BuildMode,
    pub diagnostics: Diagnostics,
}

impl Checker {
    fn new(mode: BuildMode) -> Self {
        Self {
            mode,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Fails with `error` in a strict build, and records it otherwise.
    /// The caller drops or flags the offending entry when this returns
    /// `Ok`.
    pub fn fail(&mut self, error: SemanticError) -> Result<(), SemanticError> {
        match self.mode {
            BuildMode::Strict => Err(error),
            BuildMode::BestEffort => {
                self.diagnostics.flag(error);
                Ok(())
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
// VIEWS AND ZONES                                                    //
////////////////////////////////////////////////////////////////////////

/// A zone declaration that is not `in-view`, with its resolved class.
struct Candidate<'c> {
    view: usize,
    zone: &'c Located<conf::Zone>,
    class: Class,
}

impl Candidate<'_> {
    fn key(&self) -> (Name, Class) {
        (self.zone.node.apex.clone(), self.class)
    }
}

/// The state of one build after collection.
struct Run<'b, 'l> {
    options: &'b BuildOptions,
    loader: &'b Loader<'l>,
    resolver: PathResolver,
    checker: Checker,
    includes: HashMap<PathBuf, Arc<SourceFile>>,
}

/// What happened when loading a zone file.
enum Loaded {
    Ok,
    Missing,
    Skip,
    Abort,
}

impl Run<'_, '_> {
    fn finish(mut self, collected: Collected) -> Result<BuildOutput, BuildError> {
        let Collected {
            views: view_decls,
            acls,
            zones: top_level,
            options,
            preloaded,
        } = collected;
        let acl_table = AclTable::new(&acls, &mut self.checker)?;

        // Views, and the zones each declares.
        let mut views = Vec::new();
        let mut declared = Vec::new();
        let implicit = view_decls.is_empty();
        if implicit {
            views.push(View::new(
                DEFAULT_VIEW.to_owned(),
                Class::IN,
                ClientSet::any(),
                Vec::new(),
                None,
            ));
            declared.extend(top_level.iter().map(|zone| (0, zone)));
        } else {
            for zone in &top_level {
                self.checker.fail(SemanticError::ZoneOutsideView {
                    zone: zone.node.apex.clone(),
                    source: zone.at(zone.node.line),
                })?;
            }
            let mut names = HashSet::new();
            for decl in &view_decls {
                let view = &decl.view.node;
                let source = decl.view.at(view.line);
                if !names.insert(view.name.as_str()) {
                    self.checker.fail(SemanticError::DuplicateView {
                        view: view.name.clone(),
                        source,
                    })?;
                    continue;
                }
                let clients = match view.match_clients {
                    Some(ref elements) => acl_table.resolve(elements, &source, &mut self.checker)?,
                    None => ClientSet::any(),
                };
                if clients.is_empty() {
                    self.checker
                        .diagnostics
                        .warn(Some(&source), format_args!("view {} matches no clients", view.name));
                }
                let index = views.len();
                views.push(View::new(
                    view.name.clone(),
                    view.class,
                    clients,
                    view.settings.clone(),
                    Some(source),
                ));
                declared.extend(decl.zones.iter().map(|zone| (index, zone)));
            }
        }

        // Per-view checks, separating zones shared with in-view.
        let mut seen = HashSet::new();
        let mut owned = Vec::new();
        let mut shared = Vec::new();
        for (view, zone) in declared {
            let node = &zone.node;
            let source = zone.at(node.line);
            let view_class = views[view].class();
            let class = node.class.unwrap_or(view_class);
            if !implicit && class != view_class {
                self.checker.fail(SemanticError::ClassMismatch {
                    zone: node.apex.clone(),
                    expected: view_class,
                    found: class,
                    source,
                })?;
            } else if !seen.insert((view, node.apex.clone())) {
                self.checker.fail(SemanticError::DuplicateZone {
                    zone: node.apex.clone(),
                    view: views[view].name().to_owned(),
                    source,
                })?;
            } else if let Some(ref target) = node.in_view {
                shared.push((view, zone, class, target));
            } else {
                owned.push(Candidate { view, zone, class });
            }
        }

        // Assignment: the first view with a non-empty client set wins.
        let mut winners: HashMap<(Name, Class), usize> = HashMap::new();
        for (i, candidate) in owned.iter().enumerate() {
            let key = candidate.key();
            if let Some(&winner) = winners.get(&key) {
                self.checker.diagnostics.warn(
                    Some(&candidate.zone.at(candidate.zone.node.line)),
                    format_args!(
                        "zone {} in view {} is shadowed by view {}",
                        key.0,
                        views[candidate.view].name(),
                        views[owned[winner].view].name(),
                    ),
                );
            } else if !views[candidate.view].clients().is_empty() {
                winners.insert(key, i);
            }
        }
        let mut unmatched = HashSet::new();
        for candidate in &owned {
            let key = candidate.key();
            if !winners.contains_key(&key) && unmatched.insert(key) {
                self.checker.fail(SemanticError::ZoneUnmatched {
                    zone: candidate.zone.node.apex.clone(),
                    source: candidate.zone.at(candidate.zone.node.line),
                })?;
            }
        }
        let chosen: Vec<(usize, &Candidate)> = owned
            .iter()
            .enumerate()
            .filter(|&(i, candidate)| winners.get(&candidate.key()) == Some(&i))
            .collect();

        // Zone files, loaded in parallel.
        let mut files: HashMap<PathBuf, grammar::Result<SourceFile>> =
            preloaded.into_iter().map(|(path, file)| (path, Ok(file))).collect();
        let mut wanted: Vec<PathBuf> = Vec::new();
        for (_, candidate) in &chosen {
            if let ZoneData::File(ref file) = candidate.zone.node.data {
                let path = self.resolver.resolve(file, &candidate.zone.path);
                if !files.contains_key(&path) && !wanted.contains(&path) {
                    wanted.push(path);
                }
            }
        }
        files.extend(self.loader.load_all(&wanted, SourceKind::Zone));

        // Records.
        let mut zones = Vec::with_capacity(chosen.len());
        let mut zone_ids = HashMap::new();
        for (ordinal, candidate) in chosen {
            let node = &candidate.zone.node;
            let (path, statements): (Arc<Path>, &[ZoneStatement]) = match node.data {
                ZoneData::File(ref file) => {
                    let path = self.resolver.resolve(file, &candidate.zone.path);
                    match self.check_loaded(&files, &path, node) {
                        Loaded::Ok => (),
                        Loaded::Missing => {
                            self.push_zone(&mut views, &mut zones, &mut zone_ids, candidate, ordinal, None, Vec::new(), false)?;
                            continue;
                        }
                        Loaded::Skip => continue,
                        Loaded::Abort => match files.remove(&path) {
                            Some(Err(e)) => return Err(e.into()),
                            _ => continue,
                        },
                    }
                    let statements = match files.get(&path) {
                        Some(Ok(SourceFile {
                            ast: Ast::Zone(statements),
                            ..
                        })) => statements.as_slice(),
                        _ => &[],
                    };
                    (Arc::from(path), statements)
                }
                ZoneData::Inline(ref statements) => (candidate.zone.path.clone(), statements.as_slice()),
                ZoneData::None => {
                    let check_soa = node.zone_type.map_or(true, ZoneType::needs_file);
                    self.push_zone(&mut views, &mut zones, &mut zone_ids, candidate, ordinal, None, Vec::new(), check_soa)?;
                    continue;
                }
            };

            let files = Files {
                loader: self.loader,
                resolver: &self.resolver,
                max_depth: self.options.max_include_depth,
                includes: &mut self.includes,
            };
            let reader = ZoneReader::new(files, &mut self.checker, &node.apex, candidate.class);
            let records = match reader.read(statements, &path) {
                Ok(records) => records,
                Err(BuildError::Grammar(e)) if self.options.grammar_policy == GrammarPolicy::SkipFile => {
                    self.checker.diagnostics.skipped(&e, format_args!("zone {}", node.apex));
                    continue;
                }
                Err(e) => return Err(e),
            };
            let records = records::dedup(records, &mut self.checker.diagnostics);
            let check_soa = node.zone_type.map_or(true, ZoneType::requires_soa);
            self.push_zone(&mut views, &mut zones, &mut zone_ids, candidate, ordinal, Some(path), records, check_soa)?;
        }

        // Zones shared through in-view.
        for (view, zone, class, target) in shared {
            let node = &zone.node;
            let source = zone.at(node.line);
            let target_view = views.iter().position(|v| v.name() == target.as_str());
            let declares = |t: usize| owned.iter().any(|c| c.view == t && c.zone.node.apex == node.apex);
            match target_view {
                None => self.checker.fail(SemanticError::UnknownView {
                    zone: node.apex.clone(),
                    view: target.clone(),
                    source,
                })?,
                Some(t) if !declares(t) => self.checker.fail(SemanticError::InViewZoneMissing {
                    zone: node.apex.clone(),
                    view: target.clone(),
                    source,
                })?,
                Some(_) => {
                    if let Some(&id) = zone_ids.get(&(node.apex.clone(), class)) {
                        views[view].insert_zone(&node.apex, id);
                    }
                }
            }
        }

        let database = Database::new(views, zones, options, self.options.precedence);
        info!(
            "Built database: {} views, {} zones, {} records, {} diagnostics",
            database.views().count(),
            database.zones().count(),
            database.record_count(),
            self.checker.diagnostics.len(),
        );
        if log_enabled!(Level::Debug) {
            for view in database.views() {
                debug!("View {} serves {} zones", view.name(), view.zone_count());
            }
        }
        Ok(BuildOutput {
            database,
            diagnostics: self.checker.diagnostics,
        })
    }

    /// Decides what to do with the zone file at `path`.
    fn check_loaded(
        &mut self,
        files: &HashMap<PathBuf, grammar::Result<SourceFile>>,
        path: &Path,
        zone: &conf::Zone,
    ) -> Loaded {
        match files.get(path) {
            Some(Ok(_)) => Loaded::Ok,
            Some(Err(e)) if is_transferred(zone.zone_type) && is_not_found(e) => {
                self.checker.diagnostics.warn(
                    None,
                    format_args!(
                        "zone file {} of {} zone {} does not exist",
                        path.display(),
                        zone.zone_type.map_or(String::new(), |t| t.to_string()),
                        zone.apex,
                    ),
                );
                Loaded::Missing
            }
            Some(Err(e)) if self.options.grammar_policy == GrammarPolicy::SkipFile => {
                self.checker.diagnostics.skipped(e, format_args!("zone {}", zone.apex));
                Loaded::Skip
            }
            Some(Err(_)) => Loaded::Abort,
            None => Loaded::Missing,
        }
    }

    /// Checks the records of a zone, adds it to the zone list and its
    /// view. `file` is `None` for zones without local data. The SOA
    /// check only runs when `check_soa` is set.
    #[allow(clippy::too_many_arguments)]
    fn push_zone(
        &mut self,
        views: &mut [View],
        zones: &mut Vec<Zone>,
        zone_ids: &mut HashMap<(Name, Class), usize>,
        candidate: &Candidate,
        ordinal: usize,
        file: Option<Arc<Path>>,
        records: Vec<Record>,
        check_soa: bool,
    ) -> Result<(), SemanticError> {
        let node = &candidate.zone.node;
        let mut zone = Zone::new(ZoneDecl {
            apex: node.apex.clone(),
            class: candidate.class,
            zone_type: node.zone_type,
            view: views[candidate.view].name().to_owned(),
            file: match node.data {
                ZoneData::File(_) => file,
                _ => None,
            },
            declared_at: candidate.zone.at(node.line),
            settings: node.settings.clone(),
            ordinal,
        });
        if check_soa {
            for error in records::check_soa(&node.apex, &records) {
                self.checker.fail(error.clone())?;
                zone.flag(error);
            }
        }
        debug!("Zone {} has {} records", node.apex, records.len());
        for record in records {
            zone.push(record);
        }

        let id = zones.len();
        views[candidate.view].insert_zone(&node.apex, id);
        zone_ids.insert(candidate.key(), id);
        zones.push(zone);
        Ok(())
    }
}

/// Whether zones of this type get their data by transfer, so that a
/// missing zone file is expected before the first one.
fn is_transferred(zone_type: Option<ZoneType>) -> bool {
    matches!(
        zone_type,
        Some(ZoneType::Secondary | ZoneType::Stub | ZoneType::Mirror)
    )
}

fn is_not_found(error: &grammar::Error) -> bool {
    matches!(error, grammar::Error::Io(_, e) if e.kind() == io::ErrorKind::NotFound)
}

impl fmt::Debug for Builder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Builder")
            .field("grammar", &self.grammar.signature())
            .field("resolver", &self.resolver)
            .field("cache", &self.cache.map(AstCache::directory))
            .field("options", &self.options)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
