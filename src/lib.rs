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

//! Offline analysis of BIND-style name server configurations.
//!
//! A configuration (`named.conf` and the zone files it names) is parsed
//! with a [`Grammar`](grammar::Grammar) into ASTs, which an
//! [`AstCache`](cache::AstCache) can keep across runs. A
//! [`Builder`](db::Builder) turns the ASTs into a [`Database`] of views,
//! zones, and records, which is then queried directly or checked by
//! [`suite`]s:
//!
//! ```no_run
//! use bindscope::conf::PathResolver;
//! use bindscope::db::{Builder, Filter};
//! use bindscope::grammar::Grammar;
//! use bindscope::rr::Type;
//!
//! let grammar = Grammar::default();
//! let output = Builder::new(&grammar, PathResolver::new("/srv/bind-copy"))
//!     .build(&["/srv/bind-copy/named.conf"])
//!     .unwrap();
//! let filter = Filter::new().view("public").rr_type(Type::CNAME);
//! for answer in output.database.query("www.example.com", &filter) {
//!     println!("{}", answer);
//! }
//! ```
//!
//! [`Database`]: db::Database

pub mod cache;
pub mod class;
pub mod conf;
pub mod db;
pub mod grammar;
pub mod name;
pub mod rr;
pub mod source;
pub mod suite;
pub mod time;
mod util;
pub mod zone_file;
