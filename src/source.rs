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

//! Parsed source files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::conf::{self, ConfNode};
use crate::grammar::{Error, Grammar, Result};
use crate::zone_file::{self, ZoneStatement};

/// Which grammar a source file is parsed with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum SourceKind {
    Conf,
    Zone,
}

/// The AST of a source file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Ast {
    Conf(Vec<ConfNode>),
    Zone(Vec<ZoneStatement>),
}

impl Ast {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Conf(_) => SourceKind::Conf,
            Self::Zone(_) => SourceKind::Zone,
        }
    }

    pub fn into_conf(self) -> Option<Vec<ConfNode>> {
        match self {
            Self::Conf(nodes) => Some(nodes),
            Self::Zone(_) => None,
        }
    }

    pub fn into_zone(self) -> Option<Vec<ZoneStatement>> {
        match self {
            Self::Zone(statements) => Some(statements),
            Self::Conf(_) => None,
        }
    }
}

/// The SHA-256 digest of a file's contents.
#[derive(Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for octet in self.0 {
            write!(f, "{:02x}", octet)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

/// A parsed file: its identity, the fingerprint of the contents that
/// were parsed, when, and the resulting AST.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    pub parsed_at: SystemTime,
    pub ast: Ast,
}

impl SourceFile {
    /// Reads and parses the file at `path`.
    pub fn parse(path: &Path, kind: SourceKind, grammar: &Grammar) -> Result<Self> {
        let data = read(path)?;
        Self::parse_bytes(path, &data, kind, grammar)
    }

    /// Parses `data`, which was read from `path`.
    pub fn parse_bytes(path: &Path, data: &[u8], kind: SourceKind, grammar: &Grammar) -> Result<Self> {
        debug!("Parsing {} as {:?}", path.display(), kind);
        let ast = match kind {
            SourceKind::Conf => Ast::Conf(conf::parse(data, grammar).map_err(|e| e.in_file(path))?),
            SourceKind::Zone => {
                Ast::Zone(zone_file::parse(data, grammar).map_err(|e| e.in_file(path))?)
            }
        };
        Ok(Self {
            path: path.to_owned(),
            fingerprint: Fingerprint::of(data),
            parsed_at: SystemTime::now(),
            ast,
        })
    }
}

/// Reads a whole source file.
pub(crate) fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::Io(path.to_owned(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprints_are_hex_sha256() {
        assert_eq!(
            Fingerprint::of(b"").to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        );
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let result = SourceFile::parse_bytes(
            Path::new("/zones/db.bad"),
            b"@ A not-an-address\n",
            SourceKind::Zone,
            &Grammar::default(),
        );
        assert!(matches!(
            result,
            Err(ref e) if e.path() == Some(Path::new("/zones/db.bad")),
        ));
    }

    #[test]
    fn missing_files_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.conf");
        assert!(matches!(
            SourceFile::parse(&missing, SourceKind::Conf, &Grammar::default()),
            Err(Error::Io(path, _)) if path == missing,
        ));
    }
}
