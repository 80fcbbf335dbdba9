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

//! The built-in record matchers.

use super::Fields;
use crate::grammar::{RecordMatcher, Result};
use crate::name::NameRef;
use crate::rr::{Rdata, Soa, Type};

type ParseFn = fn(&mut Fields) -> Result<Rdata<NameRef>>;

/// A record matcher backed by a plain function.
struct Builtin {
    mnemonic: &'static str,
    rr_type: Type,
    parse: ParseFn,
}

impl RecordMatcher for Builtin {
    fn mnemonic(&self) -> &str {
        self.mnemonic
    }

    fn rr_type(&self) -> Type {
        self.rr_type
    }

    fn parse_rdata(&self, fields: &mut Fields) -> Result<Rdata<NameRef>> {
        (self.parse)(fields)
    }
}

/// Returns the record matchers of the default grammar.
pub(crate) fn builtin_matchers() -> Vec<Box<dyn RecordMatcher>> {
    const BUILTINS: [(&str, Type, ParseFn); 12] = [
        ("SOA", Type::SOA, parse_soa),
        ("NS", Type::NS, parse_ns),
        ("A", Type::A, parse_a),
        ("AAAA", Type::AAAA, parse_aaaa),
        ("CNAME", Type::CNAME, parse_cname),
        ("MX", Type::MX, parse_mx),
        ("PTR", Type::PTR, parse_ptr),
        ("TXT", Type::TXT, parse_txt),
        ("SPF", Type::SPF, parse_txt),
        ("SRV", Type::SRV, parse_srv),
        ("AFSDB", Type::AFSDB, parse_afsdb),
        ("HINFO", Type::HINFO, parse_hinfo),
    ];
    BUILTINS
        .iter()
        .map(|&(mnemonic, rr_type, parse)| {
            Box::new(Builtin {
                mnemonic,
                rr_type,
                parse,
            }) as Box<dyn RecordMatcher>
        })
        .collect()
}

////////////////////////////////////////////////////////////////////////
// RDATA FORMATS                                                      //
////////////////////////////////////////////////////////////////////////

fn parse_a(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    fields.ipv4().map(Rdata::A)
}

fn parse_aaaa(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    fields.ipv6().map(Rdata::Aaaa)
}

fn parse_ns(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    fields.name().map(Rdata::Ns)
}

fn parse_cname(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    fields.name().map(Rdata::Cname)
}

fn parse_ptr(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    fields.name().map(Rdata::Ptr)
}

fn parse_mx(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    Ok(Rdata::Mx {
        preference: fields.u16()?,
        exchange: fields.name()?,
    })
}

/// Parses SOA RDATA. As in BIND, the four timers may be written as
/// durations such as `1h`.
fn parse_soa(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    Ok(Rdata::Soa(Soa {
        mname: fields.name()?,
        rname: fields.name()?,
        serial: fields.u32()?,
        refresh: fields.time()?.seconds(),
        retry: fields.time()?.seconds(),
        expire: fields.time()?.seconds(),
        minimum: fields.time()?.seconds(),
    }))
}

/// Parses one or more `<character-string>`s (TXT and SPF).
fn parse_txt(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    let mut strings = vec![fields.character_string()?];
    while !fields.at_end()? {
        strings.push(fields.character_string()?);
    }
    Ok(Rdata::Txt(strings))
}

fn parse_hinfo(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    Ok(Rdata::Hinfo {
        cpu: fields.character_string()?,
        os: fields.character_string()?,
    })
}

fn parse_srv(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    Ok(Rdata::Srv {
        priority: fields.u16()?,
        weight: fields.u16()?,
        port: fields.u16()?,
        target: fields.name()?,
    })
}

fn parse_afsdb(fields: &mut Fields) -> Result<Rdata<NameRef>> {
    Ok(Rdata::Afsdb {
        subtype: fields.u16()?,
        hostname: fields.name()?,
    })
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::tests::GRAMMAR;
    use super::super::{parse, ZoneStatement};
    use super::*;
    use crate::grammar::{Error, ErrorKind};

    fn rdata(line: &str) -> Rdata<NameRef> {
        match parse(line.as_bytes(), &GRAMMAR).unwrap().pop() {
            Some(ZoneStatement::Record(record)) => record.rdata,
            other => panic!("unexpected statement {:?}", other),
        }
    }

    fn name(text: &str) -> NameRef {
        text.parse().unwrap()
    }

    #[test]
    fn soa_timers_accept_durations() {
        assert_eq!(
            rdata("@ SOA ns1 hostmaster.example.test. ( 2024010101 1h 15m 1w 3600 )"),
            Rdata::Soa(Soa {
                mname: name("ns1"),
                rname: name("hostmaster.example.test."),
                serial: 2024010101,
                refresh: 3600,
                retry: 900,
                expire: 604800,
                minimum: 3600,
            }),
        );
    }

    #[test]
    fn address_records_work() {
        assert_eq!(
            rdata("host A 192.0.2.1"),
            Rdata::A("192.0.2.1".parse().unwrap()),
        );
        assert_eq!(
            rdata("host AAAA 2001:db8::1"),
            Rdata::Aaaa("2001:db8::1".parse().unwrap()),
        );
        assert!(matches!(
            parse(b"host A 2001:db8::1", &GRAMMAR),
            Err(Error::Syntax(details)) if matches!(details.kind(), ErrorKind::InvalidIpv4(_)),
        ));
    }

    #[test]
    fn name_records_work() {
        assert_eq!(rdata("@ NS ns1.example.test."), Rdata::Ns(name("ns1.example.test.")));
        assert_eq!(rdata("www CNAME @"), Rdata::Cname(NameRef::Origin));
        assert_eq!(rdata("1 PTR host"), Rdata::Ptr(name("host")));
        assert_eq!(
            rdata("@ MX 10 mail"),
            Rdata::Mx {
                preference: 10,
                exchange: name("mail"),
            },
        );
        assert_eq!(
            rdata("_ldap._tcp SRV 0 5 389 dc1"),
            Rdata::Srv {
                priority: 0,
                weight: 5,
                port: 389,
                target: name("dc1"),
            },
        );
        assert_eq!(
            rdata("@ AFSDB 1 afs"),
            Rdata::Afsdb {
                subtype: 1,
                hostname: name("afs"),
            },
        );
    }

    #[test]
    fn text_records_work() {
        assert_eq!(
            rdata("@ TXT \"v=spf1 mx -all\" second"),
            Rdata::Txt(vec![b"v=spf1 mx -all".to_vec(), b"second".to_vec()]),
        );
        assert_eq!(
            rdata("@ HINFO \"PC\" Linux"),
            Rdata::Hinfo {
                cpu: b"PC".to_vec(),
                os: b"Linux".to_vec(),
            },
        );
    }

    #[test]
    fn missing_fields_are_reported() {
        assert!(matches!(
            parse(b"@ MX 10\n", &GRAMMAR),
            Err(Error::Syntax(details)) if details.kind() == &ErrorKind::ExpectedName,
        ));
        assert!(matches!(
            parse(b"@ MX ten mail\n", &GRAMMAR),
            Err(Error::Syntax(details)) if matches!(details.kind(), ErrorKind::InvalidInt(_)),
        ));
    }
}
