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

//! Test suites: checks of a built [`Database`].
//!
//! A [`Suite`] inspects a database and reports what it finds to a
//! [`Reporter`]. Suites only read the database, so several of them can
//! run at once against the same one with [`run_suites`].
//!
//! Three suites are built in (see [`builtin`]):
//!
//! * `check_cname`: every CNAME whose target lies in a zone with an SOA
//!   points at a name that has an A, NS, CNAME, or PTR record.
//! * `check_ptr`: every A record in a zone with an SOA has a PTR or
//!   CNAME record at its reverse-mapping name.
//! * `check_srv`: every SRV record in a zone with an SOA whose target
//!   lies in such a zone points at a name that has an A, NS, or CNAME
//!   record.

use std::fmt;
use std::panic;
use std::thread;

use crate::db::Database;

mod checks;
pub use checks::{CheckCname, CheckPtr, CheckSrv};

////////////////////////////////////////////////////////////////////////
// THE SUITE CONTRACT                                                 //
////////////////////////////////////////////////////////////////////////

/// A check of a [`Database`].
pub trait Suite: Send + Sync {
    /// The name the suite is selected by.
    fn name(&self) -> &str;

    /// Runs the suite. Returns whether the database passed.
    fn run(&self, database: &Database, reporter: &mut dyn Reporter) -> bool;
}

/// Receives the findings of a [`Suite`].
pub trait Reporter {
    fn report(&mut self, level: MessageLevel, message: String);

    fn error(&mut self, message: String) {
        self.report(MessageLevel::Error, message);
    }

    fn warning(&mut self, message: String) {
        self.report(MessageLevel::Warning, message);
    }

    fn info(&mut self, message: String) {
        self.report(MessageLevel::Info, message);
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A [`Reporter`] that keeps every message.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Messages {
    messages: Vec<(MessageLevel, String)>,
}

impl Messages {
    pub fn iter(&self) -> impl Iterator<Item = &(MessageLevel, String)> {
        self.messages.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(|(level, _)| *level == MessageLevel::Error)
            .map(|(_, message)| message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Reporter for Messages {
    fn report(&mut self, level: MessageLevel, message: String) {
        self.messages.push((level, message));
    }
}

////////////////////////////////////////////////////////////////////////
// RUNNING SUITES                                                     //
////////////////////////////////////////////////////////////////////////

/// The outcome of one suite run by [`run_suites`].
#[derive(Debug)]
pub struct SuiteResult {
    pub name: String,
    pub passed: bool,
    pub messages: Messages,
}

/// Runs `suites` concurrently against `database`, one thread per suite.
/// The results are in the order of `suites`.
pub fn run_suites(database: &Database, suites: &[&dyn Suite]) -> Vec<SuiteResult> {
    thread::scope(|scope| {
        let handles: Vec<_> = suites
            .iter()
            .map(|&suite| {
                scope.spawn(move || {
                    let mut messages = Messages::default();
                    let passed = suite.run(database, &mut messages);
                    SuiteResult {
                        name: suite.name().to_owned(),
                        passed,
                        messages,
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect()
    })
}

/// Returns the built-in suites.
pub fn builtin() -> Vec<Box<dyn Suite>> {
    vec![Box::new(CheckCname), Box::new(CheckPtr), Box::new(CheckSrv)]
}

/// Finds a built-in suite by name.
pub fn by_name(name: &str) -> Option<Box<dyn Suite>> {
    builtin().into_iter().find(|suite| suite.name() == name)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::database;

    struct Fails;

    impl Suite for Fails {
        fn name(&self) -> &str {
            "fails"
        }

        fn run(&self, database: &Database, reporter: &mut dyn Reporter) -> bool {
            reporter.info(format!("{} zones", database.zones().count()));
            reporter.error("always".into());
            false
        }
    }

    #[test]
    fn suites_are_found_by_name() {
        assert_eq!(by_name("check_ptr").unwrap().name(), "check_ptr");
        assert!(by_name("bogus").is_none());
    }

    #[test]
    fn run_suites_keeps_order_and_messages() {
        let database = database(
            "zone \"example.com\" { type master; file \"db.example\"; };",
            &[(
                "db.example",
                "@ 300 SOA ns hostmaster 1 3600 600 86400 300\n\
                 @ NS ns\n\
                 ns CNAME host\n\
                 host CNAME ns\n",
            )],
        );
        let cname = CheckCname;
        let results = run_suites(&database, &[&Fails, &cname]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "fails");
        assert!(!results[0].passed);
        assert_eq!(results[0].messages.errors().collect::<Vec<_>>(), ["always"]);
        assert_eq!(results[0].messages.iter().count(), 2);
        assert_eq!(results[1].name, "check_cname");
        assert!(results[1].passed);
    }
}
