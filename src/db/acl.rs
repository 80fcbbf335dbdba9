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

//! Client sets: the resolved form of a view's `match-clients` list.
//!
//! Clients are matched by token, not by address. An element of the
//! list that names an address or prefix becomes a token equal to its
//! text, `key name` becomes the token `key name`, and a reference to a
//! named `acl` is replaced by that ACL's tokens. The built-in ACLs
//! `any`, `none`, `localhost`, and `localnets` are tokens themselves.

use std::fmt;

/// The names of the ACLs that are always defined.
pub const BUILTIN_ACLS: [&str; 4] = ["any", "none", "localhost", "localnets"];

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ClientToken {
    pub negated: bool,
    pub token: String,
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        f.write_str(&self.token)
    }
}

/// An ordered list of client tokens. As in BIND, the first token that
/// matches a client decides whether it is accepted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClientSet {
    tokens: Vec<ClientToken>,
}

impl ClientSet {
    /// The set that matches every client, which is what a view
    /// without `match-clients` serves.
    pub fn any() -> Self {
        Self {
            tokens: vec![ClientToken {
                negated: false,
                token: "any".to_owned(),
            }],
        }
    }

    pub(crate) fn push(&mut self, token: ClientToken) {
        self.tokens.push(token);
    }

    pub fn tokens(&self) -> &[ClientToken] {
        &self.tokens
    }

    /// Whether the set can match no client at all: it has no
    /// non-negated token other than `none`.
    pub fn is_empty(&self) -> bool {
        !self.tokens.iter().any(|t| !t.negated && t.token != "none")
    }

    /// Whether a client identified by `token` is accepted.
    pub fn matches(&self, token: &str) -> bool {
        self.tokens
            .iter()
            .filter(|t| t.token != "none")
            .find(|t| t.token == "any" || t.token.eq_ignore_ascii_case(token))
            .map_or(false, |t| !t.negated)
    }
}

impl fmt::Display for ClientSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("{")?;
        for token in &self.tokens {
            write!(f, " {};", token)?;
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: &[&str]) -> ClientSet {
        let mut set = ClientSet::default();
        for text in tokens {
            let (negated, token) = match text.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, *text),
            };
            set.push(ClientToken {
                negated,
                token: token.to_owned(),
            });
        }
        set
    }

    #[test]
    fn emptiness_ignores_negations_and_none() {
        assert!(set(&[]).is_empty());
        assert!(set(&["none"]).is_empty());
        assert!(set(&["!any", "!10.0.0.0/8"]).is_empty());
        assert!(!set(&["!10.0.0.0/8", "any"]).is_empty());
        assert!(!ClientSet::any().is_empty());
    }

    #[test]
    fn first_matching_token_decides() {
        let clients = set(&["!10.1.0.0/16", "10.1.0.0/16", "key internal", "any"]);
        assert!(!clients.matches("10.1.0.0/16"));
        assert!(clients.matches("key internal"));
        assert!(clients.matches("192.0.2.1"));
        assert!(!set(&["none"]).matches("none"));
        assert_eq!(clients.to_string(), "{ !10.1.0.0/16; 10.1.0.0/16; key internal; any; }");
    }
}
