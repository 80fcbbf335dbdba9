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

//! Crate-private utilities.

use std::fmt;

/// A wrapper around [`str`] references whose [`PartialEq`] and [`Eq`]
/// implementations are ASCII-case-insensitive.
pub struct Caseless<'a>(pub &'a str);

impl PartialEq for Caseless<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(other.0)
    }
}

impl Eq for Caseless<'_> {}

/// Converts a nibble into an ASCII hex character. Lower-case hex digits
/// are used. The passed value must be less than 16.
pub fn nibble_to_ascii_hex_digit(nibble: u8) -> u8 {
    assert!(nibble < 16);
    if nibble < 10 {
        b'0' + nibble
    } else {
        b'a' + nibble - 10
    }
}

/// Converts an ASCII hexadecimal digit to its numeric value. This
/// returns [`None`] if `digit` is not one of the ASCII characters
/// `0` through `9`, `A` through `F`, or `a` through `f`.
pub fn ascii_hex_digit_to_nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

/// Writes `octets` to `f` as a string of lower-case hex digits.
pub fn write_hex(f: &mut fmt::Formatter, octets: &[u8]) -> fmt::Result {
    for octet in octets {
        let high = nibble_to_ascii_hex_digit(octet >> 4) as char;
        let low = nibble_to_ascii_hex_digit(octet & 0xf) as char;
        write!(f, "{}{}", high, low)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_digit_conversion_is_symmetric() {
        for nibble in 0..16 {
            let digit = nibble_to_ascii_hex_digit(nibble);
            assert_eq!(ascii_hex_digit_to_nibble(digit), Some(nibble));
            assert_eq!(
                ascii_hex_digit_to_nibble(digit.to_ascii_uppercase()),
                Some(nibble),
            );
        }
        assert_eq!(ascii_hex_digit_to_nibble(b'g'), None);
    }
}
