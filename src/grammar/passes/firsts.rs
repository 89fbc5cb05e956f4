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

use std::collections::{BTreeMap, BTreeSet};

use crate::{
  grammar::RuleId,
  state::Calculus,
  utils::{change_iter, change_loop, CollectMap, WasChanged},
};

use super::{nullable::Nullable, Pass, PassContext};

/// For each rule, the terminal-like rules other than `<EMPTY>` that can
/// begin one of its derivations.
pub struct Firsts(BTreeMap<RuleId, BTreeSet<RuleId>>);

impl Firsts {
  pub fn first_set(&self, rule: RuleId) -> Option<&BTreeSet<RuleId>> {
    self.0.get(&rule)
  }

  pub fn first_sets(&self) -> &BTreeMap<RuleId, BTreeSet<RuleId>> {
    &self.0
  }
}

impl Pass for Firsts {
  fn run_pass(pass_map: &PassContext) -> Self {
    let rules = pass_map.rules();
    let nullables = pass_map.get_pass::<Nullable>();
    let calc = Calculus::new(rules, None);

    let mut firsts = CollectMap::new();
    for rule in rules.rules() {
      if rule.is_terminal_like() && rule.id() != RuleId::EMPTY {
        firsts.insert(rule.id(), rule.id());
      }
    }

    // The left corners of every option, looking through nullable prefixes.
    let corners: Vec<(RuleId, RuleId)> = rules
      .rules()
      .iter()
      .filter(|rule| rule.as_item().is_some() && !rule.is_terminal_like())
      .flat_map(|rule| {
        let calc = &calc;
        let nullables = &nullables;
        calc.start_positions(rule.id()).into_iter().flat_map(move |start| {
          calc
            .reachable_over(&start, |sym| nullables.is_nullable(sym))
            .into_iter()
            .filter_map(|rp| calc.expected(&rp))
            .map(move |sym| (rule.id(), sym))
            .collect::<Vec<_>>()
        })
      })
      .collect();

    change_loop(|| {
      change_iter(corners.iter(), |(head, sym)| {
        if *sym == RuleId::EMPTY {
          WasChanged::Unchanged
        } else if rules.is_terminal_like(*sym) {
          firsts.insert(*head, *sym)
        } else {
          firsts.insert_from_key_set(*head, sym)
        }
      })
    });

    Firsts(firsts.into_inner())
  }
}
