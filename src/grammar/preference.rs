// Copyright 2019 Google LLC
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

//! Explicit preference rules.
//!
//! A preference rule is attached to a context rule and consulted whenever a
//! node of that rule packs more than one derivation. Each option names a
//! spine rule and option, and the terminals that may follow a completion of
//! that spine. Such a completion is an event; the associativity decides
//! whether derivations with more or fewer events are preferred.

use std::collections::BTreeSet;

use super::RuleId;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Associativity {
  /// The spine completes early: more events are better.
  Left,
  /// The spine completes late: fewer events are better.
  Right,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PreferenceOption {
  index: usize,
  spine: RuleId,
  option: usize,
  on: BTreeSet<RuleId>,
  associativity: Associativity,
}

impl PreferenceOption {
  pub(crate) fn new(
    index: usize,
    spine: RuleId,
    option: usize,
    on: BTreeSet<RuleId>,
    associativity: Associativity,
  ) -> Self {
    PreferenceOption {
      index,
      spine,
      option,
      on,
      associativity,
    }
  }

  /// The position of this option among all options of its rule set.
  pub fn index(&self) -> usize {
    self.index
  }

  pub fn spine(&self) -> RuleId {
    self.spine
  }

  pub fn option(&self) -> usize {
    self.option
  }

  pub fn on(&self) -> &BTreeSet<RuleId> {
    &self.on
  }

  pub fn associativity(&self) -> Associativity {
    self.associativity
  }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PreferenceRule {
  context: RuleId,
  options: Vec<PreferenceOption>,
}

impl PreferenceRule {
  pub(crate) fn new(context: RuleId, options: Vec<PreferenceOption>) -> Self {
    PreferenceRule { context, options }
  }

  pub fn context(&self) -> RuleId {
    self.context
  }

  /// The options in declaration order, which is also their precedence.
  pub fn options(&self) -> &[PreferenceOption] {
    &self.options
  }
}
