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

use std::fmt;
use std::io;
use std::path::PathBuf;

use bincode::error::{DecodeError, EncodeError};

/// Errors from reading or writing cache entries. These are never
/// returned from [`AstCache::load_or_parse`](super::AstCache::load_or_parse);
/// the cache logs them and falls back to parsing.
#[derive(Debug)]
pub enum Error {
    Io(PathBuf, io::Error),
    BadMagic(PathBuf),
    Encode(EncodeError),
    Decode(PathBuf, DecodeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "cache I/O error on {}: {}", path.display(), e),
            Self::BadMagic(path) => write!(f, "{} is not a cache entry", path.display()),
            Self::Encode(e) => write!(f, "failed to encode cache entry: {}", e),
            Self::Decode(path, e) => write!(f, "failed to decode {}: {}", path.display(), e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(_, e) => Some(e),
            Self::BadMagic(_) => None,
            Self::Encode(e) => Some(e),
            Self::Decode(_, e) => Some(e),
        }
    }
}
