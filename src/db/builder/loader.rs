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

//! Reading and parsing of source files, through the AST cache when one
//! is configured.

use std::collections::HashMap;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use log::debug;

use crate::cache::AstCache;
use crate::grammar::{Grammar, Result};
use crate::source::{SourceFile, SourceKind};

pub(super) struct Loader<'a> {
    grammar: &'a Grammar,
    cache: Option<&'a AstCache>,
    parallelism: usize,
}

impl<'a> Loader<'a> {
    pub fn new(grammar: &'a Grammar, cache: Option<&'a AstCache>, parallelism: usize) -> Self {
        Self {
            grammar,
            cache,
            parallelism,
        }
    }

    pub fn load(&self, path: &Path, kind: SourceKind) -> Result<SourceFile> {
        match self.cache {
            Some(cache) => cache.load_or_parse(path, kind, self.grammar),
            None => SourceFile::parse(path, kind, self.grammar),
        }
    }

    /// Loads every file in `paths`, which should be distinct, with up to
    /// the configured number of threads.
    pub fn load_all(&self, paths: &[PathBuf], kind: SourceKind) -> HashMap<PathBuf, Result<SourceFile>> {
        let workers = self.parallelism.min(paths.len());
        if workers <= 1 {
            return paths
                .iter()
                .map(|path| (path.clone(), self.load(path, kind)))
                .collect();
        }

        debug!("Loading {} files with {} threads", paths.len(), workers);
        let next = AtomicUsize::new(0);
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut loaded = Vec::new();
                        while let Some(path) = paths.get(next.fetch_add(1, Ordering::Relaxed)) {
                            loaded.push((path.clone(), self.load(path, kind)));
                        }
                        loaded
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::source::Ast;

    #[test]
    fn load_all_loads_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..10)
            .map(|i| {
                let path = dir.path().join(format!("db.{}", i));
                fs::write(&path, format!("host{} A 192.0.2.{}\n", i, i)).unwrap();
                path
            })
            .collect();
        let missing = dir.path().join("db.missing");
        let mut all = paths.clone();
        all.push(missing.clone());

        let grammar = Grammar::default();
        let loader = Loader::new(&grammar, None, 4);
        let loaded = loader.load_all(&all, SourceKind::Zone);
        assert_eq!(loaded.len(), 11);
        for path in &paths {
            assert!(matches!(
                loaded[path],
                Ok(SourceFile { ast: Ast::Zone(ref statements), .. }) if statements.len() == 1,
            ));
        }
        assert!(loaded[&missing].is_err());
    }
}
