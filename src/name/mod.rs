// Copyright 2021 Matthew Ingwersen.
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

//! Implementation of data structures related to domain names.
//!
//! A configuration refers to domain names in three ways: fully
//! qualified (`www.example.com.`), relative to the current origin
//! (`www`), or as the origin itself (`@`). Parsers record the form that
//! was written as a [`NameRef`], which the database builder later
//! resolves into a normalized [`Name`] once the origin is known.

use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::util::nibble_to_ascii_hex_digit;

mod builder;
mod error;
mod relative;
pub use builder::NameBuilder;
pub use error::Error;
pub use relative::{NameRef, RelativeName};

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
const MAX_LABEL_LEN: usize = 63;

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// A normalized, fully qualified domain name.
///
/// Internally, a `Name` holds the uncompressed on-the-wire
/// representation of [RFC 1035 § 3.1] with all ASCII letters folded to
/// lower case. Since that representation is unique for each name (up to
/// case, which has already been folded), equality and hashing operate
/// on the raw octets. The length limits of a label (63 octets) and of
/// the whole name (255 octets) are enforced on construction.
///
/// `Name`s are constructed through the [`FromStr`] implementation,
/// through a [`NameBuilder`], or by resolving a [`NameRef`] or
/// [`RelativeName`] against an origin. The [`FromStr`] implementation
/// is lenient about the trailing dot: `example.com` and `example.com.`
/// parse to the same name.
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Name {
    wire: Box<[u8]>,
}

////////////////////////////////////////////////////////////////////////
// NAME PUBLIC API                                                    //
////////////////////////////////////////////////////////////////////////

impl Name {
    /// Returns the name of the DNS root, `.`.
    pub fn root() -> Self {
        Self { wire: Box::new([0u8]) }
    }

    /// Returns whether the `Name` is the DNS root `.`.
    pub fn is_root(&self) -> bool {
        self.wire.len() == 1
    }

    /// Returns whether the `Name` is a wildcard domain name (i.e.,
    /// whether its first label is `*`).
    pub fn is_wildcard(&self) -> bool {
        self.labels().next() == Some(&b"*"[..])
    }

    /// Returns an iterator over the non-null labels of this `Name`,
    /// from left to right.
    pub fn labels(&self) -> Labels {
        Labels {
            wire: &self.wire,
            position: 0,
        }
    }

    /// Returns the number of non-null labels in this `Name`. The root
    /// has zero labels.
    pub fn label_count(&self) -> usize {
        self.labels().count()
    }

    /// Returns the length of this `Name`'s on-the-wire representation.
    pub fn wire_len(&self) -> usize {
        self.wire.len()
    }

    /// Returns whether this `Name` is equal to or a subdomain of
    /// `other`.
    pub fn eq_or_subdomain_of(&self, other: &Name) -> bool {
        self.label_offsets()
            .any(|offset| self.wire[offset..] == *other.wire)
    }

    /// Returns whether this `Name` is a subdomain of `other`, but not
    /// equal to it.
    pub fn strict_subdomain_of(&self, other: &Name) -> bool {
        self != other && self.eq_or_subdomain_of(other)
    }

    /// Returns the immediate parent of this `Name`, or `None` for the
    /// root.
    pub fn parent(&self) -> Option<Name> {
        self.superdomain(1)
    }

    /// Returns the superdomain obtained by skipping the first `skip`
    /// labels of the `Name`, or `None` if there aren't enough labels.
    pub fn superdomain(&self, skip: usize) -> Option<Name> {
        self.label_offsets().nth(skip).map(|offset| Self {
            wire: self.wire[offset..].into(),
        })
    }

    /// Returns an iterator over this `Name` and all of its ancestors,
    /// ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Name> + '_ {
        self.label_offsets().map(|offset| Self {
            wire: self.wire[offset..].into(),
        })
    }

    /// Returns the name obtained by prepending `label` to this `Name`.
    pub fn prepend(&self, label: &[u8]) -> Result<Name, Error> {
        if label.is_empty() {
            return Err(Error::NullNonTerminal);
        } else if label.len() > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong);
        } else if self.wire.len() + label.len() + 1 > MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        }
        let mut wire = Vec::with_capacity(self.wire.len() + label.len() + 1);
        wire.push(label.len() as u8);
        wire.extend(label.iter().map(u8::to_ascii_lowercase));
        wire.extend_from_slice(&self.wire);
        Ok(Self { wire: wire.into() })
    }

    /// Returns the wildcard domain name `*.<self>`.
    pub fn wildcard_child(&self) -> Result<Name, Error> {
        self.prepend(b"*")
    }

    /// Returns the reverse-mapping name of `address`: a name under
    /// `in-addr.arpa.` for IPv4 ([RFC 1035 § 3.5]) or under
    /// `ip6.arpa.` for IPv6 ([RFC 3596 § 2.5]).
    ///
    /// [RFC 1035 § 3.5]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.5
    /// [RFC 3596 § 2.5]: https://datatracker.ietf.org/doc/html/rfc3596#section-2.5
    pub fn reverse_of(address: IpAddr) -> Name {
        let mut wire = Vec::with_capacity(MAX_WIRE_LEN);
        match address {
            IpAddr::V4(v4) => {
                for octet in v4.octets().iter().rev() {
                    let digits = octet.to_string();
                    wire.push(digits.len() as u8);
                    wire.extend_from_slice(digits.as_bytes());
                }
                wire.extend_from_slice(b"\x07in-addr\x04arpa\x00");
            }
            IpAddr::V6(v6) => {
                for octet in v6.octets().iter().rev() {
                    wire.extend_from_slice(&[1, nibble_to_ascii_hex_digit(octet & 0xf)]);
                    wire.extend_from_slice(&[1, nibble_to_ascii_hex_digit(octet >> 4)]);
                }
                wire.extend_from_slice(b"\x03ip6\x04arpa\x00");
            }
        }
        Self { wire: wire.into() }
    }

    /// Returns the offsets of the starts of all labels, including the
    /// null label.
    fn label_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        let mut next = Some(0);
        std::iter::from_fn(move || {
            let offset = next?;
            let len = self.wire[offset] as usize;
            next = if len == 0 { None } else { Some(offset + len + 1) };
            Some(offset)
        })
    }
}

////////////////////////////////////////////////////////////////////////
// ITERATION OVER A NAME'S LABELS                                     //
////////////////////////////////////////////////////////////////////////

/// An iterator over the non-null labels of a [`Name`] or
/// [`RelativeName`], as raw (lower-case) octets.
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    wire: &'a [u8],
    position: usize,
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.wire.get(self.position)? as usize;
        if len == 0 {
            None
        } else {
            let label = &self.wire[self.position + 1..self.position + 1 + len];
            self.position += len + 1;
            Some(label)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TRAIT IMPLEMENTATIONS                                              //
////////////////////////////////////////////////////////////////////////

/// Writes a label in presentation format, escaping octets as needed.
fn write_label(f: &mut fmt::Formatter, label: &[u8]) -> fmt::Result {
    for octet in label {
        match *octet {
            b'.' | b'\\' | b'"' | b'(' | b')' | b';' | b'@' | b'$' => {
                write!(f, "\\{}", *octet as char)?
            }
            octet if octet.is_ascii_graphic() => write!(f, "{}", octet as char)?,
            octet => write!(f, "\\{:03}", octet)?,
        }
    }
    Ok(())
}

/// Writes the labels of `wire` separated by dots (without the final
/// dot).
fn write_labels(f: &mut fmt::Formatter, labels: Labels) -> fmt::Result {
    for (i, label) in labels.enumerate() {
        if i > 0 {
            f.write_str(".")?;
        }
        write_label(f, label)?;
    }
    Ok(())
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            write_labels(f, self.labels())?;
            f.write_str(".")
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The [`Ord`] implementation for `Name` employs DNSSEC's canonical
/// ordering of domain names. Per [RFC 4034 § 6.1], `Name`s are ordered
/// as strings of labels read from right to left.
///
/// [RFC 4034 § 6.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.1
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        let ours: Vec<&[u8]> = self.labels().collect();
        let theirs: Vec<&[u8]> = other.labels().collect();
        ours.iter()
            .rev()
            .zip(theirs.iter().rev())
            .find_map(|(a, b)| Some(a.cmp(b)).filter(|ordering| ordering.is_ne()))
            .unwrap_or_else(|| ours.len().cmp(&theirs.len()))
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "." {
            return Ok(Self::root());
        }
        parse_into_builder(s)?.finish()
    }
}

/// Parses presentation-format text into a [`NameBuilder`], decoding
/// escape sequences. The text must be non-empty ASCII.
fn parse_into_builder(s: &str) -> Result<NameBuilder, Error> {
    if s.is_empty() {
        return Err(Error::StrEmpty);
    }

    let mut remaining_octets = s.as_bytes();
    let mut builder = NameBuilder::new();

    // NOTE: to check that the string is ASCII, it suffices to check
    // that each octet is ASCII as we go. This is because all
    // multi-byte characters start with an octet that is not ASCII.
    while let Some(&octet) = remaining_octets.first() {
        if octet == b'\\' {
            let (value, consumed) = parse_escape(&remaining_octets[1..])?;
            builder.try_push(value)?;
            remaining_octets = &remaining_octets[consumed + 1..];
        } else if octet == b'.' {
            builder.next_label()?;
            remaining_octets = &remaining_octets[1..];
        } else if !octet.is_ascii() {
            return Err(Error::StrNotAscii);
        } else {
            builder.try_push(octet)?;
            remaining_octets = &remaining_octets[1..];
        }
    }
    Ok(builder)
}

/// Parses an escape sequence. We expect `remaining_octets` to start
/// with the octet immediately *after* the backslash that introduces the
/// escape sequence.
fn parse_escape(remaining_octets: &[u8]) -> Result<(u8, usize), Error> {
    match remaining_octets {
        [] => Err(Error::InvalidEscape),
        [a, b, c, ..] if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() => {
            let value = 100 * (a - b'0') as usize + 10 * (b - b'0') as usize + (c - b'0') as usize;
            u8::try_from(value)
                .map(|value| (value, 3))
                .or(Err(Error::InvalidEscape))
        }
        [first, ..] if first.is_ascii_digit() => Err(Error::InvalidEscape),
        [first, ..] => Ok((*first, 1)),
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    #[test]
    fn root_is_root() {
        assert!(Name::root().is_root());
        assert_eq!(name("."), Name::root());
        assert_eq!(Name::root().to_string(), ".");
        assert_eq!(Name::root().label_count(), 0);
    }

    #[test]
    fn parsing_normalizes_case_and_trailing_dot() {
        assert_eq!(name("WWW.Example.COM"), name("www.example.com."));
        assert_eq!(name("WWW.Example.COM").to_string(), "www.example.com.");
    }

    #[test]
    fn parsing_rejects_bad_input() {
        assert_eq!("".parse::<Name>(), Err(Error::StrEmpty));
        assert_eq!("a..b".parse::<Name>(), Err(Error::NullNonTerminal));
        assert_eq!("ex\u{e4}mple.".parse::<Name>(), Err(Error::StrNotAscii));
        assert_eq!("a\\25".parse::<Name>(), Err(Error::InvalidEscape));
        assert_eq!("a\\256".parse::<Name>(), Err(Error::InvalidEscape));
        let long_label = "a".repeat(64);
        assert_eq!(long_label.parse::<Name>(), Err(Error::LabelTooLong));
        let long_name = ["a".repeat(63).as_str(); 4].join(".");
        assert_eq!(long_name.parse::<Name>(), Err(Error::NameTooLong));
    }

    #[test]
    fn escapes_are_canonicalized() {
        assert_eq!(name("a\\.b.test."), name("a\\046b.test."));
        assert_eq!(name("a\\.b.test.").label_count(), 2);
        assert_eq!(name("a\\046b.test.").to_string(), "a\\.b.test.");
        assert_eq!(name("a\\000b.test.").to_string(), "a\\000b.test.");
    }

    #[test]
    fn is_wildcard_works() {
        assert!(name("*.example.test.").is_wildcard());
        assert!(name("*.*.example.test.").is_wildcard());
        assert!(!name("x.*.example.test.").is_wildcard());
        assert!(!name("example.test.").is_wildcard());
    }

    #[test]
    fn superdomain_and_ancestors_work() {
        let subdomain = name("subdomain.example.test.");
        assert_eq!(subdomain.superdomain(0), Some(subdomain.clone()));
        assert_eq!(subdomain.parent(), Some(name("example.test.")));
        assert_eq!(subdomain.superdomain(3), Some(Name::root()));
        assert_eq!(subdomain.superdomain(4), None);
        let ancestors: Vec<String> = subdomain.ancestors().map(|n| n.to_string()).collect();
        assert_eq!(
            ancestors,
            ["subdomain.example.test.", "example.test.", "test.", "."],
        );
    }

    #[test]
    fn eq_or_subdomain_of_works() {
        let subdomain = name("subdomain.example.test.");
        let domain = name("example.test.");
        assert!(subdomain.eq_or_subdomain_of(&domain));
        assert!(domain.eq_or_subdomain_of(&domain));
        assert!(domain.eq_or_subdomain_of(&Name::root()));
        assert!(!domain.eq_or_subdomain_of(&subdomain));
        assert!(!name("badexample.test.").eq_or_subdomain_of(&domain));
        assert!(subdomain.strict_subdomain_of(&domain));
        assert!(!domain.strict_subdomain_of(&domain));
    }

    #[test]
    fn ordering_is_canonical() {
        let mut names = vec![
            name("z.example."),
            name("example."),
            name("a.example."),
            name("yljkjljk.a.example."),
        ];
        names.sort();
        assert_eq!(
            names,
            [
                name("example."),
                name("a.example."),
                name("yljkjljk.a.example."),
                name("z.example."),
            ],
        );
    }

    #[test]
    fn reverse_names_are_correct() {
        assert_eq!(
            Name::reverse_of("192.0.2.1".parse().unwrap()),
            name("1.2.0.192.in-addr.arpa."),
        );
        assert_eq!(
            Name::reverse_of("2001:db8::1".parse().unwrap()),
            name(
                "1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa."
            ),
        );
    }

    #[test]
    fn wildcard_child_works() {
        assert_eq!(
            name("example.test.").wildcard_child().unwrap(),
            name("*.example.test."),
        );
    }
}
