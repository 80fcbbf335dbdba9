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

//! Implementation of the [`NameBuilder`] structure.

use arrayvec::ArrayVec;

use super::{Error, Name, RelativeName, MAX_LABEL_LEN, MAX_WIRE_LEN};

/// A facility to build [`Name`]s and [`RelativeName`]s octet by octet.
///
/// The `NameBuilder` accumulates the on-the-wire representation of a
/// name in a fixed-size buffer that is long enough to accomodate any
/// valid name, so that parsing a name from presentation format needs
/// only one heap allocation when the name is finished. Letters are
/// folded to lower case as they are pushed.
///
/// Octets are added to the current label using
/// [`NameBuilder::try_push`]. A new label is started using
/// [`NameBuilder::next_label`]. If any call to these methods would
/// result in an invalid domain name, an error is returned and the
/// builder's state is unchanged.
///
/// ```
/// use bindscope::name::{Name, NameBuilder};
/// let mut builder = NameBuilder::new();
/// builder.try_push_slice(b"Example").unwrap();
/// builder.next_label().unwrap();
/// builder.try_push_slice(b"test").unwrap();
/// assert_eq!(builder.finish().unwrap(), "example.test.".parse::<Name>().unwrap());
/// ```
pub struct NameBuilder {
    wire_repr: ArrayVec<u8, MAX_WIRE_LEN>,
    label_start: usize,
    label_len: u8,
}

impl NameBuilder {
    /// Constructs a new `NameBuilder`. If finished immediately, it
    /// produces the root name.
    pub fn new() -> Self {
        let mut wire_repr = ArrayVec::new();
        wire_repr.push(0);
        Self {
            wire_repr,
            label_start: 0,
            label_len: 0,
        }
    }

    /// Returns whether any octets or labels have been added.
    pub fn is_empty(&self) -> bool {
        self.wire_repr.len() == 1
    }

    /// Determines whether the name currently stored in the
    /// `NameBuilder` is terminated by the null label (i.e., the text
    /// seen so far ended with a dot).
    pub fn is_fully_qualified(&self) -> bool {
        self.label_len == 0
    }

    /// Tries to add the given octet to the current label.
    pub fn try_push(&mut self, octet: u8) -> Result<(), Error> {
        if self.label_len as usize >= MAX_LABEL_LEN {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_push(octet.to_ascii_lowercase()).is_ok() {
            self.label_len += 1;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Tries to add the given slice to the current label.
    pub fn try_push_slice(&mut self, octets: &[u8]) -> Result<(), Error> {
        if self.label_len as usize + octets.len() > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong);
        } else if self.wire_repr.remaining_capacity() < octets.len() {
            return Err(Error::NameTooLong);
        }
        for octet in octets {
            self.wire_repr.push(octet.to_ascii_lowercase());
        }
        self.label_len += octets.len() as u8;
        Ok(())
    }

    /// Finishes the current label and starts a new one. This fails if
    /// the current label is empty.
    pub fn next_label(&mut self) -> Result<(), Error> {
        if self.label_len == 0 {
            return Err(Error::NullNonTerminal);
        }
        self.wire_repr
            .try_push(0)
            .or(Err(Error::NameTooLong))?;
        self.wire_repr[self.label_start] = self.label_len;
        self.label_start = self.wire_repr.len() - 1;
        self.label_len = 0;
        Ok(())
    }

    /// Finishes the name as a fully qualified [`Name`]. If the last
    /// label was not terminated with a dot, it is terminated here.
    pub fn finish(mut self) -> Result<Name, Error> {
        if !self.is_fully_qualified() {
            self.next_label()?;
        }
        Ok(Name {
            wire: self.wire_repr.as_slice().into(),
        })
    }

    /// Finishes the name as a [`RelativeName`]. This fails if the text
    /// that was parsed ended with a dot.
    pub fn finish_relative(mut self) -> Result<RelativeName, Error> {
        if self.is_fully_qualified() {
            return Err(Error::NotRelative);
        }
        self.wire_repr[self.label_start] = self.label_len;
        Ok(RelativeName {
            wire: self.wire_repr.as_slice().into(),
        })
    }
}

impl Default for NameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
