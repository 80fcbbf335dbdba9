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

//! The first step of a build: gathering the views, ACLs, zones, and
//! options of a configuration, following `include` statements.

use std::collections::HashMap;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use super::loader::Loader;
use crate::conf::{self, ConfNode, IgnoreReason, Ignored, Include, OptionValue, PathResolver, Setting};
use crate::db::Diagnostics;
use crate::grammar::{Error, ErrorKind, Position, Result};
use crate::rr::Source;
use crate::source::{SourceFile, SourceKind};

/// A node together with the file it was read from.
pub(super) struct Located<T> {
    pub node: T,
    pub path: Arc<Path>,
}

impl<T> Located<T> {
    fn new(node: T, path: &Arc<Path>) -> Self {
        Self {
            node,
            path: path.clone(),
        }
    }

    pub fn at(&self, line: usize) -> Source {
        Source {
            path: self.path.clone(),
            line,
        }
    }
}

/// A `view` statement with the zones of its body and of any files it
/// includes.
pub(super) struct ViewDecl {
    pub view: Located<conf::View>,
    pub zones: Vec<Located<conf::Zone>>,
}

#[derive(Default)]
pub(super) struct Collected {
    pub views: Vec<ViewDecl>,
    pub acls: Vec<Located<conf::Acl>>,
    pub zones: Vec<Located<conf::Zone>>,
    pub options: Vec<Setting>,

    /// Zone-file ASTs that were passed to the build directly.
    pub preloaded: HashMap<PathBuf, SourceFile>,
}

pub(super) struct Collector<'a, 'l> {
    loader: &'a Loader<'l>,
    resolver: PathResolver,
    max_depth: usize,
    stack: Vec<PathBuf>,
    diagnostics: &'a mut Diagnostics,
    out: Collected,
}

impl<'a, 'l> Collector<'a, 'l> {
    pub fn new(
        loader: &'a Loader<'l>,
        resolver: PathResolver,
        max_depth: usize,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            loader,
            resolver,
            max_depth,
            stack: Vec::new(),
            diagnostics,
            out: Collected::default(),
        }
    }

    /// Collects the nodes of `sources`. The returned resolver takes the
    /// `directory` option into account.
    pub fn collect(mut self, sources: Vec<SourceFile>) -> Result<(Collected, PathResolver)> {
        for source in sources {
            if source.ast.kind() == SourceKind::Zone {
                self.out.preloaded.insert(source.path.clone(), source);
                continue;
            }
            let nodes = source.ast.into_conf().unwrap_or_default();
            self.stack.push(source.path.clone());
            self.nodes(nodes, &Arc::from(source.path))?;
            self.stack.pop();
        }
        Ok((self.out, self.resolver))
    }

    fn nodes(&mut self, nodes: Vec<ConfNode>, path: &Arc<Path>) -> Result<()> {
        for node in nodes {
            match node {
                ConfNode::View(view) => self.view(view, path)?,
                ConfNode::Zone(zone) => self.out.zones.push(Located::new(zone, path)),
                ConfNode::Acl(acl) => self.out.acls.push(Located::new(acl, path)),
                ConfNode::Options(options) => {
                    if let Some(directory) = options.get("directory").and_then(OptionValue::as_text) {
                        debug!("Using directory {}", directory);
                        self.resolver = self.resolver.clone().with_directory(directory);
                    }
                    self.out.options.extend(options.settings);
                }
                ConfNode::Include(include) => {
                    let (nodes, included) = self.enter(&include, path)?;
                    self.nodes(nodes, &included)?;
                    self.stack.pop();
                }
                ConfNode::Ignored(ignored) => self.ignored(&ignored, path),
            }
        }
        Ok(())
    }

    fn view(&mut self, mut view: conf::View, path: &Arc<Path>) -> Result<()> {
        let mut zones: Vec<_> = view.zones.drain(..).map(|zone| Located::new(zone, path)).collect();
        for include in mem::take(&mut view.includes) {
            self.view_include(&include, path, &mut zones)?;
        }
        self.out.views.push(ViewDecl {
            view: Located::new(view, path),
            zones,
        });
        Ok(())
    }

    /// Follows an `include` inside a view body. The file may only
    /// declare zones (and include further files that do).
    fn view_include(
        &mut self,
        include: &Include,
        path: &Arc<Path>,
        zones: &mut Vec<Located<conf::Zone>>,
    ) -> Result<()> {
        let (nodes, included) = self.enter(include, path)?;
        for node in nodes {
            let (line, keyword) = match node {
                ConfNode::Zone(zone) => {
                    zones.push(Located::new(zone, &included));
                    continue;
                }
                ConfNode::Include(inner) => {
                    self.view_include(&inner, &included, zones)?;
                    continue;
                }
                ConfNode::Ignored(ignored) => {
                    self.ignored(&ignored, &included);
                    continue;
                }
                ConfNode::View(view) => (view.line, "view"),
                ConfNode::Acl(acl) => (acl.line, "acl"),
                ConfNode::Options(options) => (options.line, "options"),
            };
            return Err(Error::new(Position { line, column: 1 }, ErrorKind::MisplacedInclude)
                .with_token(keyword)
                .in_file(&included));
        }
        self.stack.pop();
        Ok(())
    }

    /// Loads the file named by `include`, written in `path`, and pushes
    /// it onto the include stack.
    fn enter(&mut self, include: &Include, path: &Path) -> Result<(Vec<ConfNode>, Arc<Path>)> {
        let target = self.resolver.resolve(&include.path, path);
        let fail = |kind: ErrorKind| {
            Err(Error::new(Position { line: include.line, column: 1 }, kind)
                .with_token(&include.path)
                .in_file(path))
        };
        if self.stack.contains(&target) {
            return fail(ErrorKind::IncludeCycle);
        } else if self.stack.len() > self.max_depth {
            return fail(ErrorKind::IncludeTooDeep);
        }

        debug!("{} includes {}", path.display(), target.display());
        let nodes = self
            .loader
            .load(&target, SourceKind::Conf)?
            .ast
            .into_conf()
            .unwrap_or_default();
        self.stack.push(target.clone());
        Ok((nodes, Arc::from(target)))
    }

    fn ignored(&mut self, ignored: &Ignored, path: &Path) {
        match ignored.reason {
            IgnoreReason::Benign => debug!(
                "{}:{}: ignoring {} statement",
                path.display(),
                ignored.line,
                ignored.keyword,
            ),
            IgnoreReason::Unknown => self.diagnostics.note(format!(
                "{}:{}: unknown statement {} in {} ignored",
                path.display(),
                ignored.line,
                ignored.keyword,
                ignored.scope,
            )),
        }
    }
}
