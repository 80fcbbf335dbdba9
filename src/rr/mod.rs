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

//! Types for DNS resource records.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::class::Class;
use crate::name::Name;

pub mod rdata;
mod rr_type;
mod ttl;
pub use rdata::{Rdata, Soa};
pub use rr_type::Type;
pub use ttl::Ttl;

/// A resource record as stored in a
/// [`Database`](crate::db::Database), with all names resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub owner: Name,
    pub ttl: Ttl,
    pub class: Class,
    pub rr_type: Type,
    pub rdata: Rdata,
    pub source: Source,
}

/// Where a [`Record`] was defined.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Source {
    /// The zone file (or configuration file, for inline zones).
    pub path: Arc<Path>,

    /// The line on which the record starts.
    pub line: usize,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.owner, self.ttl, self.class, self.rr_type, self.rdata,
        )
    }
}
