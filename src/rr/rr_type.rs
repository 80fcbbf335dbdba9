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

//! Provides the [`Type`] structure for DNS RR types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::Caseless;

////////////////////////////////////////////////////////////////////////
// RR TYPES                                                           //
////////////////////////////////////////////////////////////////////////

/// Represents the RR type of a DNS record.
///
/// An RR type is an unsigned 16-bit integer, so this is basically a
/// wrapper around `u16` with nice [`Debug`](fmt::Debug),
/// [`Display`](fmt::Display), and [`FromStr`] implementations for
/// working with the textual representations of RR types. Constants are
/// provided for the types that the zone-file grammar understands out
/// of the box; any other type can still be written in the generic
/// `TYPEnnn` form of [RFC 3597 § 5] or registered by a grammar
/// extension under its own mnemonic.
///
/// [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Type(u16);

impl Type {
    pub const A: Type = Type(1);
    pub const NS: Type = Type(2);
    pub const CNAME: Type = Type(5);
    pub const SOA: Type = Type(6);
    pub const PTR: Type = Type(12);
    pub const HINFO: Type = Type(13);
    pub const MX: Type = Type(15);
    pub const TXT: Type = Type(16);
    pub const AFSDB: Type = Type(18);
    pub const AAAA: Type = Type(28);
    pub const SRV: Type = Type(33);
    pub const SPF: Type = Type(99);
    pub const CAA: Type = Type(257);

    /// Returns the mnemonic of this type, if it has one that this
    /// module knows about.
    pub fn mnemonic(self) -> Option<&'static str> {
        match self {
            Self::A => Some("A"),
            Self::NS => Some("NS"),
            Self::CNAME => Some("CNAME"),
            Self::SOA => Some("SOA"),
            Self::PTR => Some("PTR"),
            Self::HINFO => Some("HINFO"),
            Self::MX => Some("MX"),
            Self::TXT => Some("TXT"),
            Self::AFSDB => Some("AFSDB"),
            Self::AAAA => Some("AAAA"),
            Self::SRV => Some("SRV"),
            Self::SPF => Some("SPF"),
            Self::CAA => Some("CAA"),
            _ => None,
        }
    }
}

impl From<u16> for Type {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Type> for u16 {
    fn from(rr_type: Type) -> Self {
        rr_type.0
    }
}

impl FromStr for Type {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match Caseless(text) {
            Caseless("A") => Ok(Self::A),
            Caseless("NS") => Ok(Self::NS),
            Caseless("CNAME") => Ok(Self::CNAME),
            Caseless("SOA") => Ok(Self::SOA),
            Caseless("PTR") => Ok(Self::PTR),
            Caseless("HINFO") => Ok(Self::HINFO),
            Caseless("MX") => Ok(Self::MX),
            Caseless("TXT") => Ok(Self::TXT),
            Caseless("AFSDB") => Ok(Self::AFSDB),
            Caseless("AAAA") => Ok(Self::AAAA),
            Caseless("SRV") => Ok(Self::SRV),
            Caseless("SPF") => Ok(Self::SPF),
            Caseless("CAA") => Ok(Self::CAA),
            _ => {
                if text
                    .get(0..4)
                    .map_or(false, |prefix| prefix.eq_ignore_ascii_case("TYPE"))
                {
                    text[4..]
                        .parse::<u16>()
                        .map(Self::from)
                        .or(Err("type value is not a valid unsigned 16-bit integer"))
                } else {
                    Err("unknown type")
                }
            }
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.mnemonic() {
            Some(mnemonic) => f.write_str(mnemonic),
            None => write!(f, "TYPE{}", self.0), // RFC 3597 § 5
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_round_trip_case_insensitively() {
        for rr_type in [Type::A, Type::CNAME, Type::AFSDB, Type::SRV] {
            let text = rr_type.to_string().to_ascii_lowercase();
            assert_eq!(text.parse::<Type>().unwrap(), rr_type);
        }
    }

    #[test]
    fn displays_according_to_rfc3597() {
        assert_eq!(Type::from(65280).to_string(), "TYPE65280");
        assert_eq!("TYPE1".parse::<Type>().unwrap(), Type::A);
        assert_eq!("type65280".parse::<Type>().unwrap(), Type::from(65280));
    }

    #[test]
    fn rejects_unknown_mnemonics() {
        assert!("BOGUS".parse::<Type>().is_err());
        assert!("TYPE65536".parse::<Type>().is_err());
    }
}
