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

//! Persistence of parsed ASTs across runs.
//!
//! The [`AstCache`] keeps one entry per source file in a directory. An
//! entry file is named after the SHA-256 digest of the source path and
//! holds an eight-octet magic tag, a little-endian format version, and
//! then a [bincode] encoding of the grammar signature and the
//! [`SourceFile`]. An entry is only used if its path, content
//! fingerprint, kind, and grammar signature all match; otherwise it is
//! *stale* and the file is reparsed. Entries that cannot be read are
//! *corrupt*: they are removed, the problem is logged, and the file is
//! reparsed. Cache problems never fail a load.
//!
//! Entries are written to a uniquely named temporary file, synced, and
//! renamed over the old entry, so readers (including other processes)
//! see either the old entry or the new one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bincode::config;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::grammar::{self, Grammar};
use crate::source::{self, Fingerprint, SourceFile, SourceKind};

mod error;
pub use error::Error;

/// Identifies entry files.
const MAGIC: &[u8; 8] = b"BSCOPE\x00\x01";

/// Bumped whenever the layout of entries changes. Entries of other
/// versions are misses.
const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = MAGIC.len() + 4;

////////////////////////////////////////////////////////////////////////
// ENTRIES                                                            //
////////////////////////////////////////////////////////////////////////

#[derive(Serialize)]
struct EntryRef<'a> {
    signature: &'a str,
    file: &'a SourceFile,
}

#[derive(Deserialize)]
struct Entry {
    signature: String,
    file: SourceFile,
}

/// The outcome of looking a file up.
enum Lookup {
    Hit(SourceFile),
    Miss,
    Stale,
}

////////////////////////////////////////////////////////////////////////
// STATISTICS                                                         //
////////////////////////////////////////////////////////////////////////

/// Counters describing what an [`AstCache`] has done.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
    pub corrupt: u64,
    pub writes: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    corrupt: AtomicU64,
    writes: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

////////////////////////////////////////////////////////////////////////
// THE CACHE                                                          //
////////////////////////////////////////////////////////////////////////

/// A directory of cached ASTs. It may be shared between threads.
pub struct AstCache {
    directory: PathBuf,
    counters: Counters,
}

impl AstCache {
    /// Creates a cache in `directory`, which is created when the first
    /// entry is written.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            counters: Counters::default(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the AST of the file at `path`, from the cache if a valid
    /// entry exists and by parsing (and then storing the result)
    /// otherwise. Only reading or parsing the file itself can fail.
    pub fn load_or_parse(
        &self,
        path: &Path,
        kind: SourceKind,
        grammar: &Grammar,
    ) -> grammar::Result<SourceFile> {
        let data = source::read(path)?;
        let fingerprint = Fingerprint::of(&data);
        let signature = grammar.signature();
        let entry_path = self.entry_path(path);

        match self.lookup(&entry_path, path, fingerprint, kind, &signature) {
            Ok(Lookup::Hit(file)) => {
                bump(&self.counters.hits);
                debug!("AST cache hit for {}", path.display());
                return Ok(file);
            }
            Ok(Lookup::Miss) => bump(&self.counters.misses),
            Ok(Lookup::Stale) => {
                bump(&self.counters.stale);
                debug!("AST cache entry for {} is stale", path.display());
            }
            Err(e) => {
                bump(&self.counters.corrupt);
                warn!("{}; reparsing {}", e, path.display());
                if let Err(e) = fs::remove_file(&entry_path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!("failed to remove {}: {}", entry_path.display(), e);
                    }
                }
            }
        }

        let file = SourceFile::parse_bytes(path, &data, kind, grammar)?;
        if let Err(e) = self.write_entry(&entry_path, &file, &signature) {
            warn!("{}", e);
        }
        Ok(file)
    }

    /// Stores the AST of a parsed file, replacing any existing entry.
    pub fn store(&self, file: &SourceFile, grammar: &Grammar) -> Result<(), Error> {
        self.write_entry(&self.entry_path(&file.path), file, &grammar.signature())
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CacheStats {
            hits: load(&self.counters.hits),
            misses: load(&self.counters.misses),
            stale: load(&self.counters.stale),
            corrupt: load(&self.counters.corrupt),
            writes: load(&self.counters.writes),
        }
    }

    /// Returns the path of the entry for the source file at `path`.
    pub fn entry_path(&self, path: &Path) -> PathBuf {
        let key = Fingerprint::of(path.to_string_lossy().as_bytes());
        self.directory.join(format!("{}.ast", key))
    }

    fn lookup(
        &self,
        entry_path: &Path,
        path: &Path,
        fingerprint: Fingerprint,
        kind: SourceKind,
        signature: &str,
    ) -> Result<Lookup, Error> {
        let data = match fs::read(entry_path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Lookup::Miss),
            Err(e) => return Err(Error::Io(entry_path.to_owned(), e)),
        };
        if data.len() < HEADER_LEN || !data.starts_with(MAGIC) {
            return Err(Error::BadMagic(entry_path.to_owned()));
        }
        let (header, payload) = data.split_at(HEADER_LEN);
        let version = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
        if version != FORMAT_VERSION {
            return Ok(Lookup::Miss);
        }

        let (entry, _): (Entry, usize) =
            bincode::serde::decode_from_slice(payload, config::standard())
                .map_err(|e| Error::Decode(entry_path.to_owned(), e))?;
        if entry.file.path != path {
            // Two paths with the same digest.
            Ok(Lookup::Miss)
        } else if entry.file.fingerprint != fingerprint
            || entry.file.ast.kind() != kind
            || entry.signature != signature
        {
            Ok(Lookup::Stale)
        } else {
            Ok(Lookup::Hit(entry.file))
        }
    }

    fn write_entry(&self, entry_path: &Path, file: &SourceFile, signature: &str) -> Result<(), Error> {
        let mut data = Vec::with_capacity(4096);
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        let entry = EntryRef { signature, file };
        let payload =
            bincode::serde::encode_to_vec(&entry, config::standard()).map_err(Error::Encode)?;
        data.extend_from_slice(&payload);

        fs::create_dir_all(&self.directory)
            .map_err(|e| Error::Io(self.directory.clone(), e))?;
        let temp_path = self.directory.join(format!(
            ".{:016x}.tmp",
            rand::random::<u64>(),
        ));
        if let Err(e) = write_synced(&temp_path, &data).and_then(|()| fs::rename(&temp_path, entry_path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(Error::Io(entry_path.to_owned(), e));
        }
        bump(&self.counters.writes);
        debug!("Cached AST of {} in {}", file.path.display(), entry_path.display());
        Ok(())
    }
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;
    use crate::grammar::UnknownStatementPolicy;
    use crate::source::Ast;

    lazy_static! {
        static ref GRAMMAR: Grammar = Grammar::default();
    }

    const ZONE: &str = "$TTL 1h\n@ SOA ns1 admin 1 1h 15m 1w 1h\n  NS ns1\nns1 A 192.0.2.1\n";

    struct Fixture {
        _dir: tempfile::TempDir,
        source: PathBuf,
        cache: AstCache,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("db.example");
        fs::write(&source, ZONE).unwrap();
        let cache = AstCache::new(dir.path().join("cache"));
        Fixture {
            _dir: dir,
            source,
            cache,
        }
    }

    #[test]
    fn second_load_is_a_hit() {
        let f = fixture();
        let first = f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        let second = f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            f.cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                writes: 1,
                ..CacheStats::default()
            },
        );
    }

    #[test]
    fn changed_contents_are_stale() {
        let f = fixture();
        f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        fs::write(&f.source, format!("{}www A 192.0.2.2\n", ZONE)).unwrap();
        let file = f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        assert!(matches!(file.ast, Ast::Zone(ref statements) if statements.len() == 5));
        assert_eq!(f.cache.stats().stale, 1);
    }

    #[test]
    fn other_grammars_do_not_share_entries() {
        let f = fixture();
        f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        let strict = Grammar::default().with_unknown_statement_policy(UnknownStatementPolicy::Reject);
        f.cache.load_or_parse(&f.source, SourceKind::Zone, &strict).unwrap();
        assert_eq!(f.cache.stats().stale, 1);
        assert_eq!(f.cache.stats().hits, 0);
    }

    #[test]
    fn corrupt_entries_are_replaced() {
        let f = fixture();
        let expected = f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        let entry = f.cache.entry_path(&f.source);
        let mut data = fs::read(&entry).unwrap();
        data.truncate(HEADER_LEN + 3);
        fs::write(&entry, &data).unwrap();

        let reparsed = f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        assert_eq!(reparsed.ast, expected.ast);
        assert_eq!(f.cache.stats().corrupt, 1);

        // The entry was rewritten and is good again.
        f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        assert_eq!(f.cache.stats().hits, 1);
    }

    #[test]
    fn out_of_range_durations_are_corrupt() {
        let f = fixture();
        fs::write(&f.source, format!("$TTL 7000w\n{}", ZONE)).unwrap();
        let expected = f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();

        // 7000 weeks is the varint FB 58 1B followed by the Weeks index.
        let entry = f.cache.entry_path(&f.source);
        let mut data = fs::read(&entry).unwrap();
        let at = data
            .windows(4)
            .position(|window| window == [0xfb, 0x58, 0x1b, 4])
            .unwrap();
        data[at + 1..at + 3].copy_from_slice(&[0xff, 0xff]);
        fs::write(&entry, &data).unwrap();

        let reparsed = f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        assert_eq!(reparsed.ast, expected.ast);
        let stats = f.cache.stats();
        assert_eq!((stats.hits, stats.corrupt), (0, 1));
    }

    #[test]
    fn garbage_entries_are_corrupt() {
        let f = fixture();
        fs::create_dir_all(f.cache.directory()).unwrap();
        fs::write(f.cache.entry_path(&f.source), b"not a cache entry").unwrap();
        f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        assert_eq!(f.cache.stats().corrupt, 1);
    }

    #[test]
    fn other_format_versions_are_misses() {
        let f = fixture();
        f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        let entry = f.cache.entry_path(&f.source);
        let mut data = fs::read(&entry).unwrap();
        data[MAGIC.len()..HEADER_LEN].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        fs::write(&entry, &data).unwrap();

        f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        let stats = f.cache.stats();
        assert_eq!((stats.misses, stats.corrupt), (2, 0));
    }

    #[test]
    fn parse_errors_are_not_cached() {
        let f = fixture();
        fs::write(&f.source, "@ A bogus\n").unwrap();
        assert!(f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).is_err());
        assert!(!f.cache.entry_path(&f.source).exists());
    }

    #[test]
    fn store_writes_an_entry() {
        let f = fixture();
        let file = SourceFile::parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        f.cache.store(&file, &GRAMMAR).unwrap();
        f.cache.load_or_parse(&f.source, SourceKind::Zone, &GRAMMAR).unwrap();
        assert_eq!(f.cache.stats().hits, 1);
    }
}
