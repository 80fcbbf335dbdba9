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


//! Implements building the database and the commands that use it.

use std::fmt::Write;
use std::path::Path;
use std::process;

use anyhow::{anyhow, Context, Result};
use env_logger::Env;
use log::{error, info, warn};

use bindscope::cache::AstCache;
use bindscope::conf::PathResolver;
use bindscope::db::{BuildOutput, Builder, Database, Filter};
use bindscope::grammar::Grammar;
use bindscope::rr::Type;
use bindscope::suite::{self, MessageLevel, Suite, SuiteResult};

use crate::args::{Args, Command, QueryArgs};
use crate::settings::{self, Settings};

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Runs the command given by `args`.
pub fn run(args: Args) {
    // The settings may set the log level, so they are loaded before
    // logging is set up and any failure is reported afterwards.
    let settings = match args.settings {
        Some(ref path) => settings::load_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(Settings::default()),
    };
    let log_level = args
        .log_level
        .clone()
        .or_else(|| settings.as_ref().ok().and_then(|s| s.log_level.clone()))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned());
    env_logger::init_from_env(Env::new().default_filter_or(log_level));

    match settings.and_then(|settings| try_running(args, settings)) {
        Ok(true) => info!("Exiting with success."),
        Ok(false) => {
            error!("Not all test suites passed.");
            process::exit(1);
        }
        Err(e) => {
            let mut message = String::from("Failed to run:");
            for (i, cause) in e.chain().enumerate() {
                write!(message, "\n[{}] {}", i + 1, cause).unwrap();
            }
            message.push_str("\nExiting with failure.");
            error!("{}", message);
            process::exit(1);
        }
    }
}

/// Builds the database and runs the command. Returns whether every
/// test suite passed.
fn try_running(args: Args, settings: Settings) -> Result<bool> {
    info!(
        "bindscope v{}.{}.{} starting.",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        env!("CARGO_PKG_VERSION_PATCH"),
    );
    settings::log_summary(&settings);

    // Look the suites up first so that a typo fails fast.
    let modules = if args.modules.is_empty() {
        &settings.modules
    } else {
        &args.modules
    };
    let suites = modules
        .iter()
        .map(|name| suite::by_name(name).ok_or_else(|| anyhow!("unknown test suite {}", name)))
        .collect::<Result<Vec<_>>>()?;

    let output = build(&args, &settings).context("failed to build the database")?;
    let database = output.database;

    let passed = if suites.is_empty() {
        true
    } else {
        let suites: Vec<&dyn Suite> = suites.iter().map(|suite| &**suite).collect();
        report(&suite::run_suites(&database, &suites))
    };
    if let Some(Command::Query(ref query_args)) = args.command {
        query(&database, query_args, &settings)?;
    }
    Ok(passed)
}

fn build(args: &Args, settings: &Settings) -> Result<BuildOutput> {
    let root = args
        .config
        .first()
        .ok_or_else(|| anyhow!("no configuration file given"))?;
    let root_directory = root.parent().unwrap_or_else(|| Path::new("."));
    let mut resolver = PathResolver::new(root_directory);
    if let Some(fake_root) = args.fake_root.as_ref().or(settings.fake_root.as_ref()) {
        resolver = resolver.with_fake_root(fake_root);
    }

    let grammar =
        Grammar::default().with_unknown_statement_policy(settings.grammar.unknown_statements.into());
    let cache = args
        .cache_dir
        .as_ref()
        .or(settings.cache_dir.as_ref())
        .map(AstCache::new);
    let mut builder =
        Builder::new(&grammar, resolver).with_options(settings.build.options(args.best_effort));
    if let Some(ref cache) = cache {
        info!("Using the AST cache in {}.", cache.directory().display());
        builder = builder.with_cache(cache);
    }

    let output = builder.build(args.config.as_slice())?;
    if !output.diagnostics.is_empty() {
        warn!(
            "The build produced {} diagnostics ({} errors).",
            output.diagnostics.len(),
            output.diagnostics.errors().count(),
        );
    }
    Ok(output)
}

/// Logs the messages of the suites the way their level asks. Returns
/// whether every suite passed.
fn report(results: &[SuiteResult]) -> bool {
    let mut passed = true;
    for result in results {
        for (level, message) in result.messages.iter() {
            match level {
                MessageLevel::Error => error!(target: result.name.as_str(), "{}", message),
                MessageLevel::Warning => warn!(target: result.name.as_str(), "{}", message),
                MessageLevel::Info => info!(target: result.name.as_str(), "{}", message),
            }
        }
        if result.passed {
            info!("Suite {} passed.", result.name);
        } else {
            error!("Suite {} failed.", result.name);
            passed = false;
        }
    }
    passed
}

/// Prints the answers to a query, one per line.
fn query(database: &Database, args: &QueryArgs, settings: &Settings) -> Result<()> {
    let types = if args.types.is_empty() {
        settings.query.types.iter().map(|t| t.0).collect()
    } else {
        args.types
            .iter()
            .map(|t| t.parse::<Type>().map_err(|e| anyhow!("invalid RR type {}: {}", t, e)))
            .collect::<Result<Vec<_>>>()?
    };
    let views = if args.views.is_empty() {
        &settings.query.views
    } else {
        &args.views
    };
    let filter = Filter::new().views(views.iter().cloned()).types(types);

    let answers = if args.inexact {
        database.iquery(&args.name, &filter)
    } else {
        database.query(&args.name, &filter)
    };
    if answers.is_empty() {
        info!("No answers for {}.", args.name);
    }
    for answer in answers {
        println!("{}", answer);
    }
    Ok(())
}
