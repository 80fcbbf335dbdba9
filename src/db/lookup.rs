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

//! Name lookup within a zone, including the wildcard matching rules of
//! [RFC 4592].
//!
//! [`Zone::lookup`] finds the records that answer for a name the way an
//! authoritative server would: if the name exists in the zone (it owns
//! records, or is an empty non-terminal), only its own records answer.
//! Otherwise, the deepest existing ancestor of the name is the *closest
//! encloser* ([RFC 4592 § 3.3.1]); if the closest encloser has a `*`
//! child, that wildcard's records answer. There is no backtracking: a
//! wildcard higher up the tree never matches once a closer existing
//! name has been found.
//!
//! Unlike a name server, the lookup does not stop at zone cuts or
//! follow CNAMEs. Callers that want to chase a CNAME issue another
//! lookup for its target.
//!
//! [RFC 4592]: https://datatracker.ietf.org/doc/html/rfc4592
//! [RFC 4592 § 3.3.1]: https://datatracker.ietf.org/doc/html/rfc4592#section-3.3.1

use crate::name::Name;

use super::Zone;

/// The records that answer for a name in a zone.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lookup<'a> {
    /// The name exists. The slice may be empty for empty non-terminals.
    Exact(&'a [usize]),

    /// The name does not exist, but a wildcard matches it.
    Wildcard(&'a [usize]),

    /// The name does not exist and no wildcard matches.
    NxDomain,

    /// The name is not at or below the apex.
    WrongZone,
}

impl<'a> Lookup<'a> {
    /// Returns the indices of the answering records.
    pub(crate) fn indices(self) -> &'a [usize] {
        match self {
            Self::Exact(indices) | Self::Wildcard(indices) => indices,
            Self::NxDomain | Self::WrongZone => &[],
        }
    }
}

impl Zone {
    pub(crate) fn lookup(&self, name: &Name) -> Lookup {
        if !name.eq_or_subdomain_of(self.apex()) {
            return Lookup::WrongZone;
        }
        if self.has_node(name) {
            return Lookup::Exact(self.indices_at(name));
        }

        // The apex always exists, so a closest encloser is found before
        // leaving the zone.
        let closest_encloser = name.ancestors().skip(1).find(|n| self.has_node(n));
        let source_of_synthesis = closest_encloser.and_then(|n| n.wildcard_child().ok());
        match source_of_synthesis {
            Some(wildcard) if self.has_node(&wildcard) => {
                Lookup::Wildcard(self.indices_at(&wildcard))
            }
            _ => Lookup::NxDomain,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
