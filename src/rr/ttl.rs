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

//! Provides the [`Ttl`] structure for DNS RR TTLs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::time::{self, TimeLiteral};

////////////////////////////////////////////////////////////////////////
// TTLS                                                               //
////////////////////////////////////////////////////////////////////////

/// The time to live (TTL) of a DNS record, in seconds.
///
/// [RFC 2181 § 8] clarified that TTL values are unsigned integers
/// between 0 and 2³¹ - 1, inclusive. A larger value is interpreted as
/// zero, and `Ttl::from(u32)` applies that rule.
///
/// In configuration text, TTLs are written as time literals (see
/// [`crate::time`]), so `1h30m` and `5400` parse to the same `Ttl`.
///
/// [RFC 2181 § 8]: https://datatracker.ietf.org/doc/html/rfc2181#section-8
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ttl(u32);

impl Ttl {
    /// The TTL assumed when a zone gives no other indication (no
    /// `$TTL`, no SOA, and no previous record).
    pub const DEFAULT: Ttl = Ttl(86400);

    /// Returns the TTL in seconds.
    pub fn seconds(self) -> u32 {
        self.0
    }
}

impl From<u32> for Ttl {
    fn from(raw: u32) -> Self {
        if raw > i32::MAX as u32 {
            Self(0)
        } else {
            Self(raw)
        }
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

impl From<TimeLiteral> for Ttl {
    fn from(literal: TimeLiteral) -> Self {
        Self::from(literal.seconds())
    }
}

impl FromStr for Ttl {
    type Err = time::Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        text.parse::<TimeLiteral>().map(Self::from)
    }
}

impl fmt::Debug for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
