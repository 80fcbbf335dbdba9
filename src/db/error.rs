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

use crate::class::Class;
use crate::grammar;
use crate::name::{self, Name};
use crate::rr::Source;

/// A structural problem found while building a
/// [`Database`](super::Database). Each variant names the view, zone,
/// or record at fault.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SemanticError {
    DuplicateView {
        view: String,
        source: Source,
    },
    DuplicateAcl {
        acl: String,
        source: Source,
    },
    UnknownAcl {
        acl: String,
        source: Source,
    },
    AclCycle {
        acl: String,
        source: Source,
    },

    /// A zone was declared at the top level of a configuration that
    /// declares views.
    ZoneOutsideView {
        zone: Name,
        source: Source,
    },

    /// An `in-view` option names a view that is not declared.
    UnknownView {
        zone: Name,
        view: String,
        source: Source,
    },

    /// An `in-view` option names a view that does not itself declare
    /// the zone.
    InViewZoneMissing {
        zone: Name,
        view: String,
        source: Source,
    },

    DuplicateZone {
        zone: Name,
        view: String,
        source: Source,
    },

    /// No view that declares the zone can match any client.
    ZoneUnmatched {
        zone: Name,
        source: Source,
    },

    MissingSoa {
        zone: Name,
    },
    MultipleSoa {
        zone: Name,
        count: usize,
    },
    SoaNotAtApex {
        zone: Name,
        owner: Name,
        source: Source,
    },
    OutOfZone {
        zone: Name,
        owner: Name,
        source: Source,
    },

    /// A record, or a zone declared in a view, has a class other than
    /// that of its zone or view.
    ClassMismatch {
        zone: Name,
        expected: Class,
        found: Class,
        source: Source,
    },

    /// A name became invalid (too long) once resolved against the
    /// origin in effect.
    InvalidName {
        zone: Name,
        error: name::Error,
        source: Source,
    },
}

impl SemanticError {
    /// Returns the zone the error concerns, if any.
    pub fn zone(&self) -> Option<&Name> {
        match self {
            Self::ZoneOutsideView { zone, .. }
            | Self::UnknownView { zone, .. }
            | Self::InViewZoneMissing { zone, .. }
            | Self::DuplicateZone { zone, .. }
            | Self::ZoneUnmatched { zone, .. }
            | Self::MissingSoa { zone }
            | Self::MultipleSoa { zone, .. }
            | Self::SoaNotAtApex { zone, .. }
            | Self::OutOfZone { zone, .. }
            | Self::ClassMismatch { zone, .. }
            | Self::InvalidName { zone, .. } => Some(zone),
            _ => None,
        }
    }

    /// Returns the file and line the error was found at, if any.
    pub fn source(&self) -> Option<&Source> {
        match self {
            Self::MissingSoa { .. } | Self::MultipleSoa { .. } => None,
            Self::DuplicateView { source, .. }
            | Self::DuplicateAcl { source, .. }
            | Self::UnknownAcl { source, .. }
            | Self::AclCycle { source, .. }
            | Self::ZoneOutsideView { source, .. }
            | Self::UnknownView { source, .. }
            | Self::InViewZoneMissing { source, .. }
            | Self::DuplicateZone { source, .. }
            | Self::ZoneUnmatched { source, .. }
            | Self::SoaNotAtApex { source, .. }
            | Self::OutOfZone { source, .. }
            | Self::ClassMismatch { source, .. }
            | Self::InvalidName { source, .. } => Some(source),
        }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DuplicateView { view, source } => {
                write!(f, "{}: view {} is declared more than once", source, view)
            }
            Self::DuplicateAcl { acl, source } => {
                write!(f, "{}: acl {} is declared more than once", source, acl)
            }
            Self::UnknownAcl { acl, source } => write!(f, "{}: unknown acl {}", source, acl),
            Self::AclCycle { acl, source } => {
                write!(f, "{}: acl {} refers to itself", source, acl)
            }
            Self::ZoneOutsideView { zone, source } => write!(
                f,
                "{}: zone {} is declared outside of a view, but views are in use",
                source, zone,
            ),
            Self::UnknownView { zone, view, source } => write!(
                f,
                "{}: zone {} is in-view {}, which is not declared",
                source, zone, view,
            ),
            Self::InViewZoneMissing { zone, view, source } => write!(
                f,
                "{}: zone {} is in-view {}, which does not declare it",
                source, zone, view,
            ),
            Self::DuplicateZone { zone, view, source } => write!(
                f,
                "{}: zone {} is declared more than once in view {}",
                source, zone, view,
            ),
            Self::ZoneUnmatched { zone, source } => write!(
                f,
                "{}: zone {} is not served by any view that matches clients",
                source, zone,
            ),
            Self::MissingSoa { zone } => write!(f, "zone {} has no SOA record", zone),
            Self::MultipleSoa { zone, count } => {
                write!(f, "zone {} has {} SOA records", zone, count)
            }
            Self::SoaNotAtApex {
                zone,
                owner,
                source,
            } => write!(
                f,
                "{}: SOA record at {} is not at the apex of zone {}",
                source, owner, zone,
            ),
            Self::OutOfZone {
                zone,
                owner,
                source,
            } => write!(f, "{}: {} is outside of zone {}", source, owner, zone),
            Self::ClassMismatch {
                zone,
                expected,
                found,
                source,
            } => write!(
                f,
                "{}: class {} does not match class {} of zone {}",
                source, found, expected, zone,
            ),
            Self::InvalidName {
                zone,
                error,
                source,
            } => write!(f, "{}: invalid name in zone {}: {}", source, zone, error),
        }
    }
}

impl std::error::Error for SemanticError {}

/// The reason a build failed.
#[derive(Debug)]
pub enum BuildError {
    Grammar(grammar::Error),
    Semantic(SemanticError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Grammar(e) => e.fmt(f),
            Self::Semantic(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Grammar(e) => Some(e),
            Self::Semantic(e) => Some(e),
        }
    }
}

impl From<grammar::Error> for BuildError {
    fn from(e: grammar::Error) -> Self {
        Self::Grammar(e)
    }
}

impl From<SemanticError> for BuildError {
    fn from(e: SemanticError) -> Self {
        Self::Semantic(e)
    }
}
