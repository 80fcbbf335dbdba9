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

//! Typed record data.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::name::Name;
use crate::util::write_hex;

////////////////////////////////////////////////////////////////////////
// RDATA STRUCTURES                                                   //
////////////////////////////////////////////////////////////////////////

/// The type-specific data of a resource record.
///
/// `Rdata` is generic over the representation of embedded domain names.
/// Zone-file parsers produce `Rdata<NameRef>`, keeping names exactly as
/// written; the database builder converts that into `Rdata<Name>` (the
/// default) with [`Rdata::try_map_names`] once the origin in effect is
/// known.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Rdata<N = Name> {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(N),
    Cname(N),
    Ptr(N),
    Mx {
        preference: u16,
        exchange: N,
    },
    Soa(Soa<N>),
    Txt(Vec<Vec<u8>>),
    Hinfo {
        cpu: Vec<u8>,
        os: Vec<u8>,
    },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: N,
    },
    Afsdb {
        subtype: u16,
        hostname: N,
    },

    /// RDATA given in the generic `\#` form of [RFC 3597 § 5] for a
    /// type that has no registered record matcher.
    ///
    /// [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5
    Unknown(Vec<u8>),

    /// RDATA parsed by an extension record matcher, kept as its
    /// presentation-format fields.
    Fields(Vec<String>),
}

/// The RDATA of an SOA record.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Soa<N = Name> {
    pub mname: N,
    pub rname: N,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

////////////////////////////////////////////////////////////////////////
// NAME MAPPING AND ACCESSORS                                         //
////////////////////////////////////////////////////////////////////////

impl<N> Rdata<N> {
    /// Converts every embedded domain name with `f`, stopping at the
    /// first error.
    pub fn try_map_names<M, E, F>(&self, mut f: F) -> Result<Rdata<M>, E>
    where
        F: FnMut(&N) -> Result<M, E>,
    {
        Ok(match self {
            Self::A(address) => Rdata::A(*address),
            Self::Aaaa(address) => Rdata::Aaaa(*address),
            Self::Ns(name) => Rdata::Ns(f(name)?),
            Self::Cname(name) => Rdata::Cname(f(name)?),
            Self::Ptr(name) => Rdata::Ptr(f(name)?),
            Self::Mx {
                preference,
                exchange,
            } => Rdata::Mx {
                preference: *preference,
                exchange: f(exchange)?,
            },
            Self::Soa(soa) => Rdata::Soa(Soa {
                mname: f(&soa.mname)?,
                rname: f(&soa.rname)?,
                serial: soa.serial,
                refresh: soa.refresh,
                retry: soa.retry,
                expire: soa.expire,
                minimum: soa.minimum,
            }),
            Self::Txt(strings) => Rdata::Txt(strings.clone()),
            Self::Hinfo { cpu, os } => Rdata::Hinfo {
                cpu: cpu.clone(),
                os: os.clone(),
            },
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => Rdata::Srv {
                priority: *priority,
                weight: *weight,
                port: *port,
                target: f(target)?,
            },
            Self::Afsdb { subtype, hostname } => Rdata::Afsdb {
                subtype: *subtype,
                hostname: f(hostname)?,
            },
            Self::Unknown(octets) => Rdata::Unknown(octets.clone()),
            Self::Fields(fields) => Rdata::Fields(fields.clone()),
        })
    }

    /// Returns the domain name this record points at, for the types
    /// whose RDATA names another host: the NS, CNAME, or PTR target,
    /// the MX exchange, the SRV target, or the AFSDB hostname.
    pub fn target(&self) -> Option<&N> {
        match self {
            Self::Ns(name) | Self::Cname(name) | Self::Ptr(name) => Some(name),
            Self::Mx { exchange, .. } => Some(exchange),
            Self::Srv { target, .. } => Some(target),
            Self::Afsdb { hostname, .. } => Some(hostname),
            _ => None,
        }
    }

    /// Returns the SOA RDATA, if this is one.
    pub fn soa(&self) -> Option<&Soa<N>> {
        match self {
            Self::Soa(soa) => Some(soa),
            _ => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// PRESENTATION FORMAT                                                //
////////////////////////////////////////////////////////////////////////

/// Writes a `<character-string>` in quoted presentation format.
fn write_character_string(f: &mut fmt::Formatter, octets: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for octet in octets {
        match *octet {
            b'"' | b'\\' => write!(f, "\\{}", *octet as char)?,
            b' ' => f.write_str(" ")?,
            octet if octet.is_ascii_graphic() => write!(f, "{}", octet as char)?,
            octet => write!(f, "\\{:03}", octet)?,
        }
    }
    f.write_str("\"")
}

impl<N: fmt::Display> fmt::Display for Rdata<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::A(address) => address.fmt(f),
            Self::Aaaa(address) => address.fmt(f),
            Self::Ns(name) | Self::Cname(name) | Self::Ptr(name) => name.fmt(f),
            Self::Mx {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            Self::Soa(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum,
            ),
            Self::Txt(strings) => {
                for (i, string) in strings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write_character_string(f, string)?;
                }
                Ok(())
            }
            Self::Hinfo { cpu, os } => {
                write_character_string(f, cpu)?;
                f.write_str(" ")?;
                write_character_string(f, os)
            }
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target),
            Self::Afsdb { subtype, hostname } => write!(f, "{} {}", subtype, hostname),
            Self::Unknown(octets) => {
                // RFC 3597 § 5.
                write!(f, "\\# {}", octets.len())?;
                if !octets.is_empty() {
                    f.write_str(" ")?;
                    write_hex(f, octets)?;
                }
                Ok(())
            }
            Self::Fields(fields) => f.write_str(&fields.join(" ")),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::NameRef;

    #[test]
    fn names_are_mapped() {
        let origin: Name = "example.test.".parse().unwrap();
        let mx: Rdata<NameRef> = Rdata::Mx {
            preference: 10,
            exchange: "mail".parse().unwrap(),
        };
        let resolved = mx.try_map_names(|name| name.resolve(&origin)).unwrap();
        assert_eq!(resolved.to_string(), "10 mail.example.test.");
        assert_eq!(
            resolved.target(),
            Some(&"mail.example.test.".parse().unwrap()),
        );
    }

    #[test]
    fn character_strings_are_escaped() {
        let txt: Rdata = Rdata::Txt(vec![b"say \"hi\"".to_vec(), b"\x07".to_vec()]);
        assert_eq!(txt.to_string(), "\"say \\\"hi\\\"\" \"\\007\"");
    }

    #[test]
    fn unknown_rdata_uses_rfc3597_format() {
        let rdata: Rdata = Rdata::Unknown(vec![0xc0, 0x00, 0x02, 0x01]);
        assert_eq!(rdata.to_string(), "\\# 4 c0000201");
        assert_eq!(Rdata::<Name>::Unknown(vec![]).to_string(), "\\# 0");
    }
}
