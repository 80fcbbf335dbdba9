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


//! Implements the settings file.
//!
//! Settings are optional; command-line arguments take precedence over
//! them. An example:
//!
//! ```toml
//! fake_root = "/etc/bind"
//! cache_dir = "cache"
//! modules = ["check_cname", "check_ptr"]
//!
//! [build]
//! mode = "best-effort"
//! grammar_policy = "skip-file"
//! precedence = "declaration-order"
//!
//! [grammar]
//! unknown_statements = "reject"
//!
//! [query]
//! views = ["public"]
//! types = ["A", "AAAA"]
//! ```

use std::fmt::{self, Write};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize};

use bindscope::db::builder::DEFAULT_MAX_INCLUDE_DEPTH;
use bindscope::db::{BuildMode, BuildOptions, GrammarPolicy, ZonePrecedence};
use bindscope::grammar::UnknownStatementPolicy;
use bindscope::rr::Type;

////////////////////////////////////////////////////////////////////////
// SETTINGS LOADING                                                   //
////////////////////////////////////////////////////////////////////////

/// Loads the settings from the file given by `path`. A relative cache
/// directory is interpreted relative to the file's directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings> {
    let dir = match path.as_ref().parent() {
        Some(p) => p,
        None => return Err(anyhow!("the settings file path has no parent")),
    };
    let raw = fs::read(path.as_ref()).context("failed to read the settings file")?;
    let mut settings: Settings =
        toml::from_slice(&raw).context("failed to parse the settings file")?;

    if let Some(ref mut cache_dir) = settings.cache_dir {
        if cache_dir.is_relative() {
            *cache_dir = dir.join(&*cache_dir);
        }
    }
    Ok(settings)
}

/// Summarizes the settings in the log, if the debug log level is
/// enabled.
pub fn log_summary(settings: &Settings) {
    if !log_enabled!(Debug) {
        return;
    }
    let mut message = format!(
        "Settings:\n\
         Build mode:      {:?}\n\
         Grammar policy:  {:?}\n\
         Precedence:      {:?}\n\
         Include depth:   {}\n\
         Modules:         ",
        settings.build.mode,
        settings.build.grammar_policy,
        settings.build.precedence,
        settings.build.max_include_depth,
    );
    if settings.modules.is_empty() {
        message.push_str("none");
    } else {
        message.push_str(&settings.modules.join(", "));
    }
    if let Some(ref cache_dir) = settings.cache_dir {
        write!(message, "\nCache directory: {}", cache_dir.display()).unwrap();
    }
    debug!("{}", message);
}

////////////////////////////////////////////////////////////////////////
// SETTINGS FILE STRUCTURE                                            //
////////////////////////////////////////////////////////////////////////

/// The complete settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub log_level: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub fake_root: Option<PathBuf>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub grammar: GrammarSettings,
    #[serde(default)]
    pub query: QuerySettings,
}

/// How the database is built. Mirrors [`BuildOptions`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSettings {
    #[serde(default)]
    pub mode: ConfigBuildMode,
    #[serde(default)]
    pub grammar_policy: ConfigGrammarPolicy,
    #[serde(default)]
    pub precedence: ConfigPrecedence,
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,
    pub parallelism: Option<NonZeroUsize>,
}

fn default_max_include_depth() -> usize {
    DEFAULT_MAX_INCLUDE_DEPTH
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            mode: ConfigBuildMode::default(),
            grammar_policy: ConfigGrammarPolicy::default(),
            precedence: ConfigPrecedence::default(),
            max_include_depth: default_max_include_depth(),
            parallelism: None,
        }
    }
}

impl BuildSettings {
    /// Produces the [`BuildOptions`]. `best_effort` comes from the
    /// command line and overrides the configured mode.
    pub fn options(&self, best_effort: bool) -> BuildOptions {
        BuildOptions {
            mode: if best_effort {
                BuildMode::BestEffort
            } else {
                self.mode.into()
            },
            grammar_policy: self.grammar_policy.into(),
            precedence: self.precedence.into(),
            max_include_depth: self.max_include_depth,
            parallelism: self.parallelism,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrammarSettings {
    #[serde(default)]
    pub unknown_statements: ConfigUnknownStatementPolicy,
}

/// Defaults for the `query` command.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuerySettings {
    #[serde(default)]
    pub views: Vec<String>,
    #[serde(default)]
    pub types: Vec<ConfigType>,
}

////////////////////////////////////////////////////////////////////////
// DESERIALIZABLE ENUMS                                               //
////////////////////////////////////////////////////////////////////////

/// A deserializable wrapper over [`BuildMode`].
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigBuildMode {
    #[default]
    Strict,
    BestEffort,
}

impl From<ConfigBuildMode> for BuildMode {
    fn from(mode: ConfigBuildMode) -> Self {
        match mode {
            ConfigBuildMode::Strict => Self::Strict,
            ConfigBuildMode::BestEffort => Self::BestEffort,
        }
    }
}

/// A deserializable wrapper over [`GrammarPolicy`].
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigGrammarPolicy {
    #[default]
    Abort,
    SkipFile,
}

impl From<ConfigGrammarPolicy> for GrammarPolicy {
    fn from(policy: ConfigGrammarPolicy) -> Self {
        match policy {
            ConfigGrammarPolicy::Abort => Self::Abort,
            ConfigGrammarPolicy::SkipFile => Self::SkipFile,
        }
    }
}

/// A deserializable wrapper over [`ZonePrecedence`].
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigPrecedence {
    #[default]
    LongestApexFirst,
    DeclarationOrder,
}

impl From<ConfigPrecedence> for ZonePrecedence {
    fn from(precedence: ConfigPrecedence) -> Self {
        match precedence {
            ConfigPrecedence::LongestApexFirst => Self::LongestApexFirst,
            ConfigPrecedence::DeclarationOrder => Self::DeclarationOrder,
        }
    }
}

/// A deserializable wrapper over [`UnknownStatementPolicy`].
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigUnknownStatementPolicy {
    #[default]
    Note,
    Reject,
}

impl From<ConfigUnknownStatementPolicy> for UnknownStatementPolicy {
    fn from(policy: ConfigUnknownStatementPolicy) -> Self {
        match policy {
            ConfigUnknownStatementPolicy::Note => Self::Note,
            ConfigUnknownStatementPolicy::Reject => Self::Reject,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER BINDSCOPE TYPES FOR SERDE                            //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type
/// from [`bindscope`], using its [`FromStr`](std::str::FromStr)
/// implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper over a [`bindscope`]
        /// type.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigType, Type, "RR type");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_with_defaults() {
        let settings: Settings = toml::from_str(
            "modules = [\"check_ptr\"]\n\
             [build]\n\
             mode = \"best-effort\"\n\
             precedence = \"declaration-order\"\n\
             [query]\n\
             types = [\"a\", \"CNAME\"]\n",
        )
        .unwrap();
        let options = settings.build.options(false);
        assert_eq!(options.mode, BuildMode::BestEffort);
        assert_eq!(options.grammar_policy, GrammarPolicy::Abort);
        assert_eq!(options.precedence, ZonePrecedence::DeclarationOrder);
        assert_eq!(options.max_include_depth, DEFAULT_MAX_INCLUDE_DEPTH);
        let types: Vec<Type> = settings.query.types.iter().map(|t| t.0).collect();
        assert_eq!(types, [Type::A, Type::CNAME]);
    }

    #[test]
    fn unknown_settings_and_bad_types_are_rejected() {
        assert!(toml::from_str::<Settings>("bogus = 1\n").is_err());
        assert!(toml::from_str::<Settings>("[query]\ntypes = [\"NOPE\"]\n").is_err());
    }

    #[test]
    fn command_line_overrides_mode() {
        assert_eq!(BuildSettings::default().options(true).mode, BuildMode::BestEffort);
    }
}
