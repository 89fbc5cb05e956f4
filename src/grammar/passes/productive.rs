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
  grammar::RuleId,
  state::Calculus,
  utils::{change_iter, change_loop, WasChanged},
};

use super::{Pass, PassContext};

/// The rules that derive at least one finite string.
pub struct Productive(BTreeSet<RuleId>);

impl Productive {
  pub fn is_productive(&self, rule: RuleId) -> bool {
    self.0.contains(&rule)
  }

  pub fn productive_set(&self) -> &BTreeSet<RuleId> {
    &self.0
  }
}

impl Pass for Productive {
  fn run_pass(pass_map: &PassContext) -> Self {
    let rules = pass_map.rules();
    let calc = Calculus::new(rules, None);

    let mut productive: BTreeSet<_> = rules
      .rules()
      .iter()
      .filter(|r| r.is_terminal_like())
      .map(|r| r.id())
      .collect();

    change_loop(|| {
      change_iter(rules.rules().iter(), |rule| {
        if rule.as_item().is_none() || productive.contains(&rule.id()) {
          return WasChanged::Unchanged;
        }

        let derives = calc.start_positions(rule.id()).iter().any(|start| {
          calc
            .reachable_over(start, |sym| productive.contains(&sym))
            .iter()
            .any(|rp| rp.is_end())
        });

        WasChanged::from_changed(derives && productive.insert(rule.id()))
      })
    });

    Productive(productive)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::grammar::{build, ChoiceKind};

  #[test]
  fn test_self_recursion_is_unproductive() {
    let g = build(|b| {
      b.add_concatenation("Loop", |ib| {
        ib.add_ref("Loop").add_literal("a");
      })
      .add_choice("S", ChoiceKind::Ambiguous, |cb| {
        cb.add_option(|ob| {
          ob.add_ref("Loop");
        })
        .add_option(|ob| {
          ob.add_literal("b");
        });
      });
    })
    .unwrap();

    let pass_map = PassContext::new(&g);
    let productive = pass_map.get_pass::<Productive>();
    assert!(!productive.is_productive(g.find("Loop").unwrap()));
    assert!(productive.is_productive(g.find("S").unwrap()));
    assert!(!g.is_productive(g.find("Loop").unwrap()));
  }
}
