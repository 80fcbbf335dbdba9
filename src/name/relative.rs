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

//! Unresolved names: [`RelativeName`] and [`NameRef`].

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::{parse_into_builder, write_labels, Error, Labels, Name, MAX_WIRE_LEN};

/// A domain name that is not terminated by the root, such as `www` or
/// `mail.corp`. It becomes a [`Name`] once it is completed with an
/// origin through [`RelativeName::resolve`].
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct RelativeName {
    /// The wire representation of the labels, without the null label.
    pub(super) wire: Box<[u8]>,
}

impl RelativeName {
    /// Returns an iterator over the labels of this name.
    pub fn labels(&self) -> Labels {
        Labels {
            wire: &self.wire,
            position: 0,
        }
    }

    /// Completes this name with `origin`.
    pub fn resolve(&self, origin: &Name) -> Result<Name, Error> {
        if self.wire.len() + origin.wire.len() > MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        }
        let mut wire = Vec::with_capacity(self.wire.len() + origin.wire.len());
        wire.extend_from_slice(&self.wire);
        wire.extend_from_slice(&origin.wire);
        Ok(Name { wire: wire.into() })
    }
}

impl FromStr for RelativeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_into_builder(s)?.finish_relative()
    }
}

impl fmt::Display for RelativeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_labels(f, self.labels())
    }
}

impl fmt::Debug for RelativeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl Serialize for RelativeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RelativeName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// A domain name as written in a configuration or zone file, before
/// the origin it is relative to is known.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum NameRef {
    /// The `@` shorthand for the current origin.
    Origin,

    /// A fully qualified name (written with a trailing dot).
    Absolute(Name),

    /// A name to be completed with the current origin.
    Relative(RelativeName),
}

impl NameRef {
    /// Resolves this reference against `origin`.
    pub fn resolve(&self, origin: &Name) -> Result<Name, Error> {
        match self {
            Self::Origin => Ok(origin.clone()),
            Self::Absolute(name) => Ok(name.clone()),
            Self::Relative(relative) => relative.resolve(origin),
        }
    }

    /// Returns whether resolving this reference requires an origin.
    pub fn needs_origin(&self) -> bool {
        !matches!(self, Self::Absolute(_))
    }
}

impl FromStr for NameRef {
    type Err = Error;

    /// Parses zone-file name syntax: `@`, a name with a trailing dot,
    /// or a relative name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "@" {
            Ok(Self::Origin)
        } else if s == "." {
            Ok(Self::Absolute(Name::root()))
        } else {
            let builder = parse_into_builder(s)?;
            if builder.is_fully_qualified() {
                builder.finish().map(Self::Absolute)
            } else {
                builder.finish_relative().map(Self::Relative)
            }
        }
    }
}

impl fmt::Display for NameRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Origin => f.write_str("@"),
            Self::Absolute(name) => name.fmt(f),
            Self::Relative(relative) => relative.fmt(f),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
