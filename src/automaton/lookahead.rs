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

use std::collections::BTreeSet;

use crate::{
  grammar::{RuleId, RuleSet},
  utils::{fmt::display_set, WasChanged},
};

/// A single member of a lookahead set.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum LookaheadSymbol {
  /// A terminal-like rule that must match next.
  Terminal(RuleId),
  /// Stands for the lookahead carried by the stack node below, filled in
  /// while parsing.
  Runtime,
  /// Matches any input, including the end of text.
  Any,
}

/// A set of lookahead symbols.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct LookaheadSet(BTreeSet<LookaheadSymbol>);

impl LookaheadSet {
  pub fn new() -> Self {
    LookaheadSet(BTreeSet::new())
  }

  pub fn runtime() -> Self {
    LookaheadSet::from_symbols(vec![LookaheadSymbol::Runtime])
  }

  pub fn any() -> Self {
    LookaheadSet::from_symbols(vec![LookaheadSymbol::Any])
  }

  pub fn end_of_text() -> Self {
    LookaheadSet::from_symbols(vec![LookaheadSymbol::Terminal(RuleId::EOT)])
  }

  pub fn from_symbols(
    symbols: impl IntoIterator<Item = LookaheadSymbol>,
  ) -> Self {
    LookaheadSet(symbols.into_iter().collect())
  }

  pub fn from_terminals(terminals: impl IntoIterator<Item = RuleId>) -> Self {
    LookaheadSet::from_symbols(
      terminals.into_iter().map(LookaheadSymbol::Terminal),
    )
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn contains(&self, symbol: &LookaheadSymbol) -> bool {
    self.0.contains(symbol)
  }

  pub fn has_runtime(&self) -> bool {
    self.contains(&LookaheadSymbol::Runtime)
  }

  pub fn iter(&self) -> impl Iterator<Item = &LookaheadSymbol> + '_ {
    self.0.iter()
  }

  /// The terminal-like rules in this set.
  pub fn terminals(&self) -> impl Iterator<Item = RuleId> + '_ {
    self.0.iter().filter_map(|sym| match sym {
      LookaheadSymbol::Terminal(t) => Some(*t),
      _ => None,
    })
  }

  pub fn insert(&mut self, symbol: LookaheadSymbol) -> WasChanged {
    WasChanged::from_changed(self.0.insert(symbol))
  }

  pub fn union_with(&mut self, other: &LookaheadSet) -> WasChanged {
    let mut changed = WasChanged::Unchanged;
    for sym in &other.0 {
      changed.merge(self.insert(*sym));
    }
    changed
  }

  /// Replaces `Runtime` with the members of `runtime`.
  pub fn resolve(&self, runtime: &LookaheadSet) -> LookaheadSet {
    if !self.has_runtime() {
      return self.clone();
    }
    let mut result: LookaheadSet = LookaheadSet::from_symbols(
      self
        .0
        .iter()
        .copied()
        .filter(|sym| *sym != LookaheadSymbol::Runtime),
    );
    result.union_with(runtime);
    result
  }

  /// Renders the set using rule names, in a stable order.
  pub fn display(&self, rules: &RuleSet) -> String {
    let mut names: Vec<String> = self
      .0
      .iter()
      .map(|sym| match sym {
        LookaheadSymbol::Terminal(t) => rules.name(*t).to_string(),
        LookaheadSymbol::Runtime => "<RT>".to_string(),
        LookaheadSymbol::Any => "<ANY>".to_string(),
      })
      .collect();
    names.sort();
    display_set(names).to_string()
  }
}
