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

//! Non-fatal findings of a build.

use std::fmt;

use log::warn;

use super::SemanticError;
use crate::grammar;
use crate::rr::Source;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Severity {
    /// Something was ignored, such as an unknown statement.
    Note,
    Warning,

    /// An error that a best-effort build downgraded; the offending
    /// entry was flagged or dropped.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Self::Note => "note",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,

    /// The downgraded error, for [`Severity::Error`] diagnostics that
    /// came from one.
    pub error: Option<SemanticError>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// The diagnostics of a build, in the order they were found. Each one
/// is also logged when it is recorded.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    /// Returns the errors downgraded by a best-effort build.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Error)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity == severity)
    }

    pub(crate) fn note(&mut self, message: String) {
        warn!("{}", message);
        self.push(Severity::Note, message, None);
    }

    pub(crate) fn warn(&mut self, source: Option<&Source>, message: impl fmt::Display) {
        let message = match source {
            Some(source) => format!("{}: {}", source, message),
            None => message.to_string(),
        };
        warn!("{}", message);
        self.push(Severity::Warning, message, None);
    }

    /// Records a semantic error that was downgraded.
    pub(crate) fn flag(&mut self, error: SemanticError) {
        let message = error.to_string();
        warn!("{} (ignored)", message);
        self.push(Severity::Error, message, Some(error));
    }

    /// Records a file that was skipped because it failed to parse.
    pub(crate) fn skipped(&mut self, error: &grammar::Error, what: impl fmt::Display) {
        let message = format!("{}; skipping {}", error, what);
        warn!("{}", message);
        self.push(Severity::Error, message, None);
    }

    fn push(&mut self, severity: Severity, message: String, error: Option<SemanticError>) {
        self.entries.push(Diagnostic {
            severity,
            message,
            error,
        });
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
