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


//! Implements command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// Offline analysis of BIND-style name server configurations
#[derive(Debug, Parser)]
#[clap(author, version, subcommand_precedence_over_arg = true)]
pub struct Args {
    /// Set the root configuration file(s)
    #[clap(required = true, value_name = "FILE")]
    pub config: Vec<PathBuf>,

    /// Cache parsed files in this directory
    #[clap(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Set the log level (overridden by RUST_LOG)
    #[clap(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Set the directory the configuration was installed in
    #[clap(long, value_name = "DIR")]
    pub fake_root: Option<PathBuf>,

    /// Read settings from a TOML file
    #[clap(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Run a test suite (may be repeated)
    #[clap(short, long = "module", value_name = "SUITE")]
    pub modules: Vec<String>,

    /// Record semantic errors as diagnostics instead of failing
    #[clap(long)]
    pub best_effort: bool,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query the database
    Query(QueryArgs),
}

#[derive(Debug, Parser)]
pub struct QueryArgs {
    /// The domain name (or, with --inexact, a glob)
    #[clap(value_name = "NAME")]
    pub name: String,

    /// Only answer from these views
    #[clap(long = "view", value_name = "VIEW")]
    pub views: Vec<String>,

    /// Only answer with these record types
    #[clap(long = "type", value_name = "TYPE", value_delimiter = ',')]
    pub types: Vec<String>,

    /// Match case-insensitively, following wildcards and globs
    #[clap(short, long)]
    pub inexact: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_subcommand_follows_config_paths() {
        let args = Args::try_parse_from([
            "bindscope",
            "--module",
            "check_cname",
            "named.conf",
            "other.conf",
            "query",
            "--type",
            "A,CNAME",
            "www.example.com",
        ])
        .unwrap();
        assert_eq!(args.config, [PathBuf::from("named.conf"), PathBuf::from("other.conf")]);
        assert_eq!(args.modules, ["check_cname"]);
        match args.command {
            Some(Command::Query(query)) => {
                assert_eq!(query.name, "www.example.com");
                assert_eq!(query.types, ["A", "CNAME"]);
                assert!(!query.inexact);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
