// Copyright 2020 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The parse forest as it is recorded while parsing.
//!
//! A growing node stands for the children consumed so far by the stack
//! nodes of one state over one span. Each of its alternatives is the growing
//! node it was grafted from, if any, plus its last child, so the child lists
//! of a rule are shared between all the derivations that extend them.
//! Branches are keyed by rule and span, and refer to the growing nodes of
//! the states that complete them.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::Arc,
};

use crate::{automaton::StateId, grammar::RuleId, sppt::Sppt};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GrowingId(usize);

/// A reference to a completed child.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ChildRef {
  /// A terminal-like rule and its start.
  Leaf(RuleId, usize),
  /// A non-terminal rule, its start and the position after it.
  Branch(RuleId, usize, usize),
}

#[derive(Clone, Debug)]
pub struct LeafMatch {
  pub end: usize,
  pub next: usize,
  pub embedded: Option<Arc<Sppt>>,
}

pub type GrowingAlternative = (Option<GrowingId>, ChildRef);

#[derive(Default)]
pub struct Forest {
  leaves: BTreeMap<(RuleId, usize), LeafMatch>,
  branches: BTreeMap<(RuleId, usize, usize), BTreeSet<(usize, GrowingId)>>,
  growing: Vec<BTreeSet<GrowingAlternative>>,
  growing_index: BTreeMap<(StateId, usize, usize), GrowingId>,
}

impl Forest {
  pub fn new() -> Self {
    Forest::default()
  }

  pub fn add_leaf(&mut self, rule: RuleId, start: usize, leaf: LeafMatch) {
    self.leaves.entry((rule, start)).or_insert(leaf);
  }

  pub fn leaf(&self, rule: RuleId, start: usize) -> Option<&LeafMatch> {
    self.leaves.get(&(rule, start))
  }

  /// Returns the growing node of a state over a span, and whether it is new.
  pub fn growing(
    &mut self,
    state: StateId,
    start: usize,
    pos: usize,
  ) -> (GrowingId, bool) {
    if let Some(id) = self.growing_index.get(&(state, start, pos)) {
      return (*id, false);
    }
    let id = GrowingId(self.growing.len());
    self.growing.push(BTreeSet::new());
    self.growing_index.insert((state, start, pos), id);
    (id, true)
  }

  pub fn add_growing_alternative(
    &mut self,
    growing: GrowingId,
    prev: Option<GrowingId>,
    child: ChildRef,
  ) -> bool {
    self.growing[growing.0].insert((prev, child))
  }

  pub fn growing_alternatives(
    &self,
    growing: GrowingId,
  ) -> &BTreeSet<GrowingAlternative> {
    &self.growing[growing.0]
  }

  /// Records that the children of `growing` derive `option` of `rule` over
  /// `start..next`.
  pub fn add_branch_alternative(
    &mut self,
    rule: RuleId,
    start: usize,
    next: usize,
    option: usize,
    growing: GrowingId,
  ) {
    self
      .branches
      .entry((rule, start, next))
      .or_default()
      .insert((option, growing));
  }

  pub fn branch_alternatives(
    &self,
    rule: RuleId,
    start: usize,
    next: usize,
  ) -> Option<&BTreeSet<(usize, GrowingId)>> {
    self.branches.get(&(rule, start, next))
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_growing_nodes_are_shared() {
    let mut forest = Forest::new();
    let state = StateId::from_index(3);
    let (a, new_a) = forest.growing(state, 0, 2);
    let (b, new_b) = forest.growing(state, 0, 2);
    assert_eq!(a, b);
    assert!(new_a && !new_b);

    let child = ChildRef::Leaf(RuleId::from_index(5), 1);
    assert!(forest.add_growing_alternative(a, None, child));
    assert!(!forest.add_growing_alternative(a, None, child));
    assert_eq!(forest.growing_alternatives(a).len(), 1);
  }

  #[test]
  fn test_branch_alternatives() {
    let mut forest = Forest::new();
    let rule = RuleId::from_index(3);
    let (g, _) = forest.growing(StateId::from_index(1), 0, 1);
    forest.add_branch_alternative(rule, 0, 1, 0, g);
    forest.add_branch_alternative(rule, 0, 1, 0, g);
    assert_eq!(forest.branch_alternatives(rule, 0, 1).unwrap().len(), 1);
    assert!(forest.branch_alternatives(rule, 0, 2).is_none());
  }
}
