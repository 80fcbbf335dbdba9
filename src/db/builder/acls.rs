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

//! Resolution of `match-clients` lists into [`ClientSet`]s.

use std::collections::HashMap;

use super::collect::Located;
use super::Checker;
use crate::conf::{Acl, AclElement, AclElementKind};
use crate::db::{ClientSet, ClientToken, SemanticError, BUILTIN_ACLS};
use crate::rr::Source;

/// The declared ACLs, by name.
pub(super) struct AclTable<'c> {
    acls: HashMap<&'c str, &'c Located<Acl>>,
}

impl<'c> AclTable<'c> {
    /// Indexes `acls`. Of several ACLs with the same name, the first
    /// is kept; redefining a built-in ACL is also a duplicate.
    pub fn new(acls: &'c [Located<Acl>], checker: &mut Checker) -> Result<Self, SemanticError> {
        let mut table = HashMap::new();
        for acl in acls {
            let name = acl.node.name.as_str();
            if is_builtin(name) || table.contains_key(name) {
                checker.fail(SemanticError::DuplicateAcl {
                    acl: name.to_owned(),
                    source: acl.at(acl.node.line),
                })?;
            } else {
                table.insert(name, acl);
            }
        }
        Ok(Self { acls: table })
    }

    /// Resolves the address match list `elements`, written at `at`.
    pub fn resolve(
        &self,
        elements: &[AclElement],
        at: &Source,
        checker: &mut Checker,
    ) -> Result<ClientSet, SemanticError> {
        let mut set = ClientSet::default();
        self.expand(elements, false, at, &mut Vec::new(), &mut set, checker)?;
        Ok(set)
    }

    /// Appends the tokens of `elements` to `set`. A negation applies to
    /// every token of a negated nested list or ACL.
    fn expand(
        &self,
        elements: &[AclElement],
        negated: bool,
        at: &Source,
        stack: &mut Vec<&'c str>,
        set: &mut ClientSet,
        checker: &mut Checker,
    ) -> Result<(), SemanticError> {
        for element in elements {
            let negated = negated != element.negated;
            match element.kind {
                AclElementKind::Address(ref address) => set.push(ClientToken {
                    negated,
                    token: address.clone(),
                }),
                AclElementKind::Key(ref key) => set.push(ClientToken {
                    negated,
                    token: format!("key {}", key),
                }),
                AclElementKind::Nested(ref inner) => {
                    self.expand(inner, negated, at, stack, set, checker)?
                }
                AclElementKind::Reference(ref name) if is_builtin(name) => set.push(ClientToken {
                    negated,
                    token: name.to_ascii_lowercase(),
                }),
                AclElementKind::Reference(ref name) => match self.acls.get(name.as_str()) {
                    None => checker.fail(SemanticError::UnknownAcl {
                        acl: name.clone(),
                        source: at.clone(),
                    })?,
                    Some(acl) if stack.contains(&acl.node.name.as_str()) => {
                        checker.fail(SemanticError::AclCycle {
                            acl: name.clone(),
                            source: acl.at(acl.node.line),
                        })?
                    }
                    Some(&acl) => {
                        stack.push(&acl.node.name);
                        let at = acl.at(acl.node.line);
                        self.expand(&acl.node.elements, negated, &at, stack, set, checker)?;
                        stack.pop();
                    }
                },
            }
        }
        Ok(())
    }
}

fn is_builtin(name: &str) -> bool {
    BUILTIN_ACLS.iter().any(|builtin| builtin.eq_ignore_ascii_case(name))
}
