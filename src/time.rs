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

//! Time-duration literals.
//!
//! BIND accepts durations such as TTLs and SOA timers either as a bare
//! number of seconds or with unit suffixes: `s`, `m`, `h`, `d`, and
//! `w` (in either case). Several components may be concatenated, so
//! `1h30m` is 5400 seconds. The result must fit in 32 bits.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

/// The unit of a [`TimeLiteral`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Unit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl Unit {
    /// Returns the number of seconds in one of this unit.
    pub fn seconds(self) -> u32 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3600,
            Self::Days => 86400,
            Self::Weeks => 604800,
        }
    }

    fn from_suffix(suffix: u8) -> Option<Self> {
        match suffix.to_ascii_lowercase() {
            b's' => Some(Self::Seconds),
            b'm' => Some(Self::Minutes),
            b'h' => Some(Self::Hours),
            b'd' => Some(Self::Days),
            b'w' => Some(Self::Weeks),
            _ => None,
        }
    }

    fn suffix(self) -> char {
        match self {
            Self::Seconds => 's',
            Self::Minutes => 'm',
            Self::Hours => 'h',
            Self::Days => 'd',
            Self::Weeks => 'w',
        }
    }
}

/// A parsed duration.
///
/// A literal with a single component keeps the magnitude and unit that
/// were written (`5w` has magnitude 5 and unit [`Unit::Weeks`]). A
/// compound literal such as `1h30m` is normalized to seconds. In every
/// case, [`TimeLiteral::seconds`] cannot overflow, since that is checked
/// when parsing.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct TimeLiteral {
    magnitude: u32,
    unit: Unit,
}

impl TimeLiteral {
    /// Creates a literal representing `seconds` seconds.
    pub fn from_seconds(seconds: u32) -> Self {
        Self {
            magnitude: seconds,
            unit: Unit::Seconds,
        }
    }

    pub fn magnitude(&self) -> u32 {
        self.magnitude
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Returns the duration in seconds.
    pub fn seconds(&self) -> u32 {
        self.magnitude * self.unit.seconds()
    }
}

impl<'de> Deserialize<'de> for TimeLiteral {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename = "TimeLiteral")]
        struct Fields {
            magnitude: u32,
            unit: Unit,
        }

        let Fields { magnitude, unit } = Fields::deserialize(deserializer)?;
        if magnitude.checked_mul(unit.seconds()).is_none() {
            return Err(de::Error::custom(Error::Overflow));
        }
        Ok(Self { magnitude, unit })
    }
}

/// Errors that arise when parsing a [`TimeLiteral`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    Empty,
    MissingMagnitude,
    InvalidCharacter(char),
    Overflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Empty => f.write_str("empty duration"),
            Self::MissingMagnitude => f.write_str("unit suffix without a number"),
            Self::InvalidCharacter(c) => write!(f, "invalid character {:?} in duration", c),
            Self::Overflow => f.write_str("duration does not fit in 32 bits"),
        }
    }
}

impl std::error::Error for Error {}

impl FromStr for TimeLiteral {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Err(Error::Empty);
        }

        let mut components = Vec::new();
        let mut magnitude: Option<u32> = None;
        for c in text.chars() {
            if let Some(digit) = c.to_digit(10) {
                let value = magnitude
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|value| value.checked_add(digit))
                    .ok_or(Error::Overflow)?;
                magnitude = Some(value);
            } else if let Some(unit) = u8::try_from(c).ok().and_then(Unit::from_suffix) {
                components.push((magnitude.take().ok_or(Error::MissingMagnitude)?, unit));
            } else {
                return Err(Error::InvalidCharacter(c));
            }
        }

        // A trailing number without a unit counts as seconds.
        if let Some(magnitude) = magnitude {
            components.push((magnitude, Unit::Seconds));
        }

        let mut total: u32 = 0;
        for &(magnitude, unit) in &components {
            total = magnitude
                .checked_mul(unit.seconds())
                .and_then(|seconds| total.checked_add(seconds))
                .ok_or(Error::Overflow)?;
        }

        if let [(magnitude, unit)] = components[..] {
            Ok(Self { magnitude, unit })
        } else {
            Ok(Self::from_seconds(total))
        }
    }
}

impl fmt::Display for TimeLiteral {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.unit {
            Unit::Seconds => write!(f, "{}", self.magnitude),
            unit => write!(f, "{}{}", self.magnitude, unit.suffix()),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn seconds(text: &str) -> u32 {
        text.parse::<TimeLiteral>().unwrap().seconds()
    }

    #[test]
    fn simple_literals_convert() {
        assert_eq!(seconds("5w"), 3024000);
        assert_eq!(seconds("1h"), 3600);
        assert_eq!(seconds("90"), 90);
        assert_eq!(seconds("2D"), 172800);
        assert_eq!(seconds("15M"), 900);
        assert_eq!(seconds("30s"), 30);
    }

    #[test]
    fn compound_literals_convert() {
        assert_eq!(seconds("1h30m"), 5400);
        assert_eq!(seconds("1w2d"), 777600);
        assert_eq!(seconds("1m30"), 90);
    }

    #[test]
    fn simple_literals_keep_their_unit() {
        let literal: TimeLiteral = "5w".parse().unwrap();
        assert_eq!(literal.magnitude(), 5);
        assert_eq!(literal.unit(), Unit::Weeks);
        assert_eq!(literal.to_string(), "5w");
    }

    #[test]
    fn overflow_is_an_error() {
        assert_eq!("4294967296".parse::<TimeLiteral>(), Err(Error::Overflow));
        assert_eq!("7102w".parse::<TimeLiteral>(), Err(Error::Overflow));
        assert_eq!(seconds("4294967295"), u32::MAX);
    }

    #[test]
    fn malformed_literals_are_errors() {
        assert_eq!("".parse::<TimeLiteral>(), Err(Error::Empty));
        assert_eq!("h".parse::<TimeLiteral>(), Err(Error::MissingMagnitude));
        assert_eq!("1hh".parse::<TimeLiteral>(), Err(Error::MissingMagnitude));
        assert_eq!(
            "1y".parse::<TimeLiteral>(),
            Err(Error::InvalidCharacter('y')),
        );
    }
}
