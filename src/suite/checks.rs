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

//! The built-in consistency checks.
//!
//! Each check only looks at names inside zones that have an SOA record,
//! since records pointing elsewhere cannot be verified offline. A name
//! covered by a wildcard counts as existing.

use std::net::IpAddr;

use log::debug;

use super::{Reporter, Suite};
use crate::db::{domain_in, Database, Filter};
use crate::name::Name;
use crate::rr::{Rdata, Type};

/// Checks that CNAME targets exist.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckCname;

impl Suite for CheckCname {
    fn name(&self) -> &str {
        "check_cname"
    }

    fn run(&self, database: &Database, reporter: &mut dyn Reporter) -> bool {
        let checked = database.soa_owners();
        let filter = Filter::new().types([Type::A, Type::NS, Type::CNAME, Type::PTR]);
        let mut ok = true;
        for answer in database.records_of_type(Type::CNAME) {
            let target = match answer.rdata() {
                Rdata::Cname(target) => target,
                _ => continue,
            };
            if !domain_in(target, checked.iter().copied()) {
                continue;
            }
            if database.iquery_name(target, &filter).is_empty() {
                ok = false;
                reporter.error(format!(
                    "Missing target [A, NS, CNAME, PTR]: {} ({})",
                    target, answer,
                ));
            }
        }
        ok
    }
}

/// Checks that A records have reverse mappings.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckPtr;

impl Suite for CheckPtr {
    fn name(&self) -> &str {
        "check_ptr"
    }

    fn run(&self, database: &Database, reporter: &mut dyn Reporter) -> bool {
        let checked = database.soa_owners();
        let filter = Filter::new().types([Type::PTR, Type::CNAME]);
        let mut ok = true;
        for answer in database.records_of_type(Type::A) {
            if !domain_in(answer.owner(), checked.iter().copied()) {
                continue;
            }
            let address = match *answer.rdata() {
                Rdata::A(address) => address,
                _ => continue,
            };
            let lookup = Name::reverse_of(IpAddr::V4(address));
            if database.iquery_name(&lookup, &filter).is_empty() {
                ok = false;
                reporter.error(format!("Missing reverse [PTR, CNAME]: {} ({})", lookup, answer));
            }
        }
        ok
    }
}

/// Checks that SRV targets exist.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckSrv;

impl Suite for CheckSrv {
    fn name(&self) -> &str {
        "check_srv"
    }

    fn run(&self, database: &Database, reporter: &mut dyn Reporter) -> bool {
        let checked = database.soa_owners();
        let filter = Filter::new().types([Type::A, Type::NS, Type::CNAME]);
        let mut ok = true;
        for answer in database.records_of_type(Type::SRV) {
            let target = match answer.rdata() {
                Rdata::Srv { target, .. } => target,
                _ => continue,
            };
            if !domain_in(answer.owner(), checked.iter().copied())
                || !domain_in(target, checked.iter().copied())
            {
                debug!("Not checking {}", answer);
                continue;
            }
            if database.iquery_name(target, &filter).is_empty() {
                ok = false;
                reporter.error(format!("Missing target [A, NS, CNAME]: {}: ({})", target, answer));
            }
        }
        ok
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
