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


//! End-to-end tests: configuration files on disk are parsed (directly or
//! through the AST cache), built into a database, queried, and checked.

use std::fs;
use std::path::{Path, PathBuf};

use bindscope::cache::AstCache;
use bindscope::conf::PathResolver;
use bindscope::db::{Builder, Database, Filter};
use bindscope::grammar::Grammar;
use bindscope::name::Name;
use bindscope::rr::{Rdata, Type};
use bindscope::suite::{self, Suite};

const NAMED_CONF: &str = r#"
// The public view answers everyone.
options {
    directory "/etc/bind";
};

acl internal-nets { 10.0.0.0/8; !10.66.0.0/16; };

view "internal" {
    match-clients { internal-nets; };
    zone "corp.example.com" {
        type master;
        file "/etc/bind/zones/db.corp";
    };
};

view "public" {
    match-clients { any; };
    zone "example.com" {
        type master;
        file "zones/db.example.com";
    };
    zone "2.0.192.in-addr.arpa" {
        type master;
        file "zones/db.192.0.2";
    };
    include "/etc/bind/named.conf.extra";
};
"#;

const EXTRA_CONF: &str = r#"
zone "example.net" { type forward; forwarders { 192.0.2.53; }; };
"#;

const EXAMPLE_COM: &str = "$TTL 5w\n\
@ IN SOA ns1.example.com. hostmaster.example.com. (\n\
        2024010101 ; serial\n\
        1h         ; refresh\n\
        15m        ; retry\n\
        1w         ; expire\n\
        300 )      ; minimum\n\
@ NS ns1.example.com.\n\
www CNAME example.com.\n\
@ A 192.0.2.1\n\
ns1 A 192.0.2.53\n\
$INCLUDE zones/db.services services\n";

const SERVICES: &str = "_sip._tcp SRV 10 5 5060 sip\n\
sip 1h A 192.0.2.80\n";

const CORP: &str = "@ 300 SOA ns1 hostmaster 1 3600 600 86400 300\n\
@ NS ns1\n\
ns1 A 192.0.2.54\n";

const REVERSE: &str = "@ 1d SOA ns1.example.com. hostmaster.example.com. 1 3600 600 86400 300\n\
1 PTR example.com.\n\
53 PTR ns1.example.com.\n\
54 PTR ns1.example.com.\n\
80 PTR sip.services.example.com.\n";

struct Setup {
    dir: tempfile::TempDir,
    grammar: Grammar,
}

impl Setup {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, text: &str| {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        };
        write("named.conf", NAMED_CONF);
        write("named.conf.extra", EXTRA_CONF);
        write("zones/db.example.com", EXAMPLE_COM);
        write("zones/db.corp", CORP);
        write("zones/db.services", SERVICES);
        write("zones/db.192.0.2", REVERSE);
        Self {
            dir,
            grammar: Grammar::default(),
        }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("named.conf")
    }

    fn builder(&self) -> Builder {
        Builder::new(&self.grammar, PathResolver::new(self.dir.path()))
    }

    fn build(&self) -> Database {
        let output = self.builder().build(&[self.root()]).unwrap();
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        output.database
    }

    fn build_cached(&self, cache: &AstCache) -> Database {
        self.builder().with_cache(cache).build(&[self.root()]).unwrap().database
    }
}

/// Renders every record of a database, for comparisons.
fn dump(database: &Database) -> Vec<String> {
    database.records().iter().map(ToString::to_string).collect()
}

fn name(text: &str) -> Name {
    text.parse().unwrap()
}

#[test]
fn sample_scenario() {
    let database = Setup::new().build();
    let cname = Filter::new().view("public").rr_type(Type::CNAME);
    let answers = database.query("www.example.com", &cname);
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].rdata(), &Rdata::Cname(name("example.com.")));
    assert!(database
        .query("www.example.com", &Filter::new().rr_type(Type::A))
        .is_empty());
}

#[test]
fn views_get_their_own_zones() {
    let database = Setup::new().build();
    let names: Vec<&str> = database.views().map(|v| v.name()).collect();
    assert_eq!(names, ["internal", "public"]);
    assert_eq!(
        database.view("internal").unwrap().clients().to_string(),
        "{ 10.0.0.0/8; !10.66.0.0/16; }",
    );

    let found = |name: &str| -> Vec<(String, String)> {
        database
            .query(name, &Filter::new().rr_type(Type::A))
            .iter()
            .map(|a| (a.view().to_owned(), a.rdata().to_string()))
            .collect()
    };
    assert_eq!(found("ns1.corp.example.com"), [("internal".to_owned(), "192.0.2.54".to_owned())]);
    assert_eq!(found("ns1.example.com"), [("public".to_owned(), "192.0.2.53".to_owned())]);
    assert!(database.zone("public", &name("corp.example.com.")).is_none());
    assert!(database.zone("public", &name("example.net.")).unwrap().is_empty());
}

#[test]
fn ttls_and_includes_are_expanded() {
    let database = Setup::new().build();
    let zone = database.zone("public", &name("example.com.")).unwrap();
    assert_eq!(zone.soa().unwrap().ttl.seconds(), 3024000);
    let sip: Vec<u32> = zone
        .records_at(&name("sip.services.example.com."))
        .map(|r| r.ttl.seconds())
        .collect();
    assert_eq!(sip, [3600]);
    match zone.soa().unwrap().rdata {
        Rdata::Soa(ref soa) => {
            assert_eq!(soa.refresh, 3600);
            assert_eq!(soa.expire, 604800);
        }
        ref other => panic!("unexpected rdata {:?}", other),
    }
    let srv = zone
        .records_at(&name("_sip._tcp.services.example.com."))
        .next()
        .unwrap();
    assert!(srv.source.path.ends_with(Path::new("zones/db.services")));
    assert_eq!(srv.source.line, 1);
}

#[test]
fn recursion_is_explicit() {
    let database = Setup::new().build();
    let a = Filter::new().rr_type(Type::A);
    assert!(database.query("www.example.com.", &a).is_empty());
    let cname = database.query("www.example.com.", &Filter::new().rr_type(Type::CNAME));
    let target = match cname[0].rdata() {
        Rdata::Cname(target) => target,
        other => panic!("unexpected rdata {:?}", other),
    };
    let answers = database.query_name(target, &a.clone().view("public"));
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].rdata().to_string(), "192.0.2.1");
}

#[test]
fn cached_builds_match_parsed_builds() {
    let setup = Setup::new();
    let cache = AstCache::new(setup.dir.path().join("cache"));
    let parsed = dump(&setup.build());

    assert_eq!(dump(&setup.build_cached(&cache)), parsed);
    let first = cache.stats();
    assert_eq!(first.hits, 0);
    assert_eq!(first.writes, 6);

    assert_eq!(dump(&setup.build_cached(&cache)), parsed);
    assert_eq!(cache.stats().hits, 6);
}

#[test]
fn corrupt_cache_entries_are_reparsed() {
    let setup = Setup::new();
    let cache = AstCache::new(setup.dir.path().join("cache"));
    let parsed = dump(&setup.build_cached(&cache));

    let zone_file = setup.dir.path().join("zones/db.example.com");
    fs::write(cache.entry_path(&zone_file), b"not an AST").unwrap();
    let entry = cache.entry_path(&setup.root());
    let mut truncated = fs::read(&entry).unwrap();
    truncated.truncate(truncated.len() / 2);
    fs::write(&entry, truncated).unwrap();

    assert_eq!(dump(&setup.build_cached(&cache)), parsed);
    assert_eq!(cache.stats().corrupt, 2);
}

#[test]
fn changed_files_are_not_served_from_the_cache() {
    let setup = Setup::new();
    let cache = AstCache::new(setup.dir.path().join("cache"));
    setup.build_cached(&cache);

    let path = setup.dir.path().join("zones/db.services");
    fs::write(&path, format!("{}ldap A 192.0.2.89\n", SERVICES)).unwrap();
    let database = setup.build_cached(&cache);
    assert_eq!(cache.stats().stale, 1);
    assert_eq!(
        database
            .query("ldap.services.example.com", &Filter::new())
            .len(),
        1,
    );
}

#[test]
fn queries_are_deterministic_across_builds() {
    let setup = Setup::new();
    assert_eq!(dump(&setup.build()), dump(&setup.build()));
    let database = setup.build();
    let first = database.iquery("*.example.com", &Filter::new());
    for _ in 0..5 {
        assert_eq!(database.iquery("*.example.com", &Filter::new()), first);
    }
}

#[test]
fn builtin_suites_pass_on_a_consistent_configuration() {
    let database = Setup::new().build();
    let suites = suite::builtin();
    let suites: Vec<&dyn Suite> = suites.iter().map(|s| &**s).collect();
    for result in suite::run_suites(&database, &suites) {
        assert!(result.passed, "{}: {:?}", result.name, result.messages);
    }
}
