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

/// The rules that can derive the empty string.
pub struct Nullable(BTreeSet<RuleId>);

impl Nullable {
  pub fn is_nullable(&self, rule: RuleId) -> bool {
    self.0.contains(&rule)
  }

  pub fn nullable_set(&self) -> &BTreeSet<RuleId> {
    &self.0
  }
}

impl Pass for Nullable {
  fn run_pass(pass_map: &PassContext) -> Self {
    let rules = pass_map.rules();
    let calc = Calculus::new(rules, None);

    let mut nullable = BTreeSet::new();
    nullable.insert(RuleId::EMPTY);

    change_loop(|| {
      change_iter(rules.rules().iter(), |rule| {
        if rule.as_item().is_none()
          || rule.is_terminal_like()
          || nullable.contains(&rule.id())
        {
          return WasChanged::Unchanged;
        }

        let reaches_end =
          calc.start_positions(rule.id()).iter().any(|start| {
            calc
              .reachable_over(start, |sym| nullable.contains(&sym))
              .iter()
              .any(|rp| rp.is_end())
          });

        WasChanged::from_changed(reaches_end && nullable.insert(rule.id()))
      })
    });

    Nullable(nullable)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::grammar::{examples, passes::PassContext};

  #[test]
  fn test_simple_grammar() {
    let g = examples::make_abc();
    let pass_map = PassContext::new(&g);
    let nullables = pass_map.get_pass::<Nullable>();
    assert_eq!(
      nullables.nullable_set().iter().copied().collect::<Vec<_>>(),
      vec![RuleId::EMPTY]
    );
  }

  #[test]
  fn test_nullable_lists() {
    let g = examples::make_nullable();
    let pass_map = PassContext::new(&g);
    let nullables = pass_map.get_pass::<Nullable>();
    for name in &["S", "A", "B", "Opt"] {
      assert!(nullables.is_nullable(g.find(name).unwrap()), "{}", name);
    }
    assert!(!nullables.is_nullable(g.find("Plus").unwrap()));
    assert!(nullables.is_nullable(g.find("Twice").unwrap()));
  }
}
