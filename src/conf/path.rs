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

//! Resolution of the paths named by `include`, `file`, and `$INCLUDE`.

use std::path::{Component, Path, PathBuf};

/// The directory a configuration is assumed to be installed in when no
/// other is given.
pub const DEFAULT_FAKE_ROOT: &str = "/etc/bind";

/// Maps paths written in a configuration onto the local file system.
///
/// A configuration copied off a name server still names files by their
/// paths on that server, such as `/etc/bind/zones/db.example`. The
/// *fake root* is the directory the configuration believes it lives in;
/// absolute paths below it are mapped below the *root directory*, the
/// local directory holding the root configuration file. Other absolute
/// paths are used as they are.
///
/// A relative path is tried, in order, against the `directory` option
/// (if set), against the root directory, and against the directory of
/// the file that refers to it. The first candidate that exists wins;
/// if none exists, the first candidate is returned so that the error
/// names a sensible path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathResolver {
    root_directory: PathBuf,
    fake_root: PathBuf,
    directory: Option<PathBuf>,
}

impl PathResolver {
    /// Creates a resolver for a configuration whose root file lives in
    /// `root_directory`.
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
            fake_root: PathBuf::from(DEFAULT_FAKE_ROOT),
            directory: None,
        }
    }

    pub fn with_fake_root(mut self, fake_root: impl Into<PathBuf>) -> Self {
        self.fake_root = fake_root.into();
        self
    }

    /// Sets the working directory given by the `directory` option. It is
    /// itself mapped through the fake root.
    pub fn with_directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.directory = Some(self.map_absolute(directory.as_ref()));
        self
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn fake_root(&self) -> &Path {
        &self.fake_root
    }

    /// Resolves `path`, written in the file `including_file`.
    pub fn resolve(&self, path: &str, including_file: &Path) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            return self.map_absolute(path);
        }
        let mut candidates = Vec::with_capacity(3);
        if let Some(ref directory) = self.directory {
            candidates.push(directory.join(path));
        }
        candidates.push(self.root_directory.join(path));
        if let Some(parent) = including_file.parent() {
            candidates.push(parent.join(path));
        }
        candidates
            .iter()
            .find(|candidate| candidate.is_file())
            .or_else(|| candidates.first())
            .cloned()
            .unwrap_or_else(|| path.to_owned())
    }

    /// Maps an absolute path below the fake root into the root
    /// directory. A relative `path` is taken relative to the root
    /// directory.
    fn map_absolute(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            return self.root_directory.join(path);
        }
        match path.strip_prefix(&self.fake_root) {
            Ok(rest) => {
                let mut mapped = self.root_directory.clone();
                mapped.extend(rest.components().filter(|c| matches!(c, Component::Normal(_))));
                mapped
            }
            Err(_) => path.to_owned(),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn absolute_paths_under_fake_root_are_mapped() {
        let resolver = PathResolver::new("/tmp/conf");
        assert_eq!(
            resolver.resolve("/etc/bind/zones/db.example", Path::new("/tmp/conf/named.conf")),
            PathBuf::from("/tmp/conf/zones/db.example"),
        );
        assert_eq!(
            resolver.resolve("/var/lib/bind/db.other", Path::new("/tmp/conf/named.conf")),
            PathBuf::from("/var/lib/bind/db.other"),
        );
    }

    #[test]
    fn fake_root_is_configurable() {
        let resolver = PathResolver::new("/srv/copy").with_fake_root("/usr/local/etc/namedb");
        assert_eq!(
            resolver.resolve("/usr/local/etc/namedb/master/db.a", Path::new("/srv/copy/named.conf")),
            PathBuf::from("/srv/copy/master/db.a"),
        );
    }

    #[test]
    fn relative_paths_prefer_existing_candidates() {
        let root = tempfile::tempdir().unwrap();
        let sub = root.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("only-here.conf"), "").unwrap();
        fs::write(root.path().join("both.conf"), "").unwrap();
        fs::write(sub.join("both.conf"), "").unwrap();

        let resolver = PathResolver::new(root.path());
        let including = sub.join("named.conf.local");
        assert_eq!(resolver.resolve("only-here.conf", &including), sub.join("only-here.conf"));
        assert_eq!(resolver.resolve("both.conf", &including), root.path().join("both.conf"));
        assert_eq!(resolver.resolve("missing.conf", &including), root.path().join("missing.conf"));
    }

    #[test]
    fn directory_option_takes_precedence() {
        let root = tempfile::tempdir().unwrap();
        let cache = root.path().join("cache");
        fs::create_dir(&cache).unwrap();
        fs::write(cache.join("db.a"), "").unwrap();
        fs::write(root.path().join("db.a"), "").unwrap();

        let resolver = PathResolver::new(root.path()).with_directory("/etc/bind/cache");
        assert_eq!(
            resolver.resolve("db.a", &root.path().join("named.conf")),
            cache.join("db.a"),
        );
    }
}
